//! Tick-driven simulation engine.
//!
//! This is the core of the simulator. It owns the scheduling context,
//! forks processes as they arrive, drives the policy once per tick, plays
//! each process's resource script, and retires processes once they have
//! executed their whole lifespan.
//!
//! One tick, in order:
//!
//! 1. fork every process whose `start_tick` has come;
//! 2. `schedule`, then retire the previous process if it is finished;
//! 3. issue the chosen process's requests due at its current age via
//!    `acquire`; a refusal blocks it and goes back to step 2;
//! 4. execute one tick: `age += 1`;
//! 5. count down the holds of the process and `release` the expired ones.

use std::cell::Cell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use tracing::{debug, info, trace, warn};

use crate::context::SchedCtx;
use crate::monitor::{Monitor, NoopMonitor, ProbeContext};
use crate::policy::{Policy, PolicyError};
use crate::process::{Process, ProcessStatus};
use crate::scenario::{ProcessDef, ResourceRequest, Scenario};
use crate::trace::{ExitKind, Trace, TraceKind};
use crate::types::{Pid, ResourceId, Tick};

thread_local! {
    static SIM_TICK: Cell<Tick> = const { Cell::new(0) };
}

/// The tick being simulated on this thread. Used by the log formatter.
pub fn sim_tick() -> Tick {
    SIM_TICK.with(|c| c.get())
}

/// Update the tick thread-local. Called by the engine at the start of
/// every tick so log lines carry simulated time.
pub fn set_sim_tick(tick: Tick) {
    SIM_TICK.with(|c| c.set(tick));
}

/// Errors that abort a simulation before it starts.
#[derive(Debug)]
pub enum SimError {
    Policy(PolicyError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Policy(e) => write!(f, "policy initialization failed: {e}"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Policy(e) => Some(e),
        }
    }
}

impl From<PolicyError> for SimError {
    fn from(e: PolicyError) -> Self {
        SimError::Policy(e)
    }
}

#[derive(Debug, Clone, Copy)]
struct Hold {
    resource: ResourceId,
    remaining: Tick,
}

/// Per-process resource script and the holds currently counting down.
#[derive(Debug, Clone)]
struct Script {
    requests: Vec<ResourceRequest>,
    holds: Vec<Hold>,
}

impl Script {
    fn new(def: &ProcessDef) -> Self {
        Script {
            requests: def.requests.clone(),
            holds: Vec::new(),
        }
    }

    fn holds(&self, resource: ResourceId) -> bool {
        self.holds.iter().any(|h| h.resource == resource)
    }

    /// Requests due at `age` that are not yet granted, in script order.
    fn due(&self, age: Tick) -> Vec<ResourceRequest> {
        self.requests
            .iter()
            .filter(|r| r.at == age && !self.holds(r.resource))
            .copied()
            .collect()
    }

    fn grant(&mut self, req: &ResourceRequest) {
        self.holds.push(Hold {
            resource: req.resource,
            remaining: req.duration,
        });
    }

    /// Count one executed tick against every hold and drop the expired
    /// ones, returned in acquisition order.
    fn expire(&mut self) -> Vec<ResourceId> {
        let mut expired = Vec::new();
        self.holds.retain_mut(|h| {
            h.remaining -= 1;
            if h.remaining == 0 {
                expired.push(h.resource);
                false
            } else {
                true
            }
        });
        expired
    }
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickOutcome {
    Ran,
    Idle,
    /// Nothing is left to run and nothing will arrive.
    Drained,
}

/// The main simulator.
pub struct Simulator<P: Policy> {
    policy: P,
}

impl<P: Policy> Simulator<P> {
    pub fn new(policy: P) -> Self {
        Simulator { policy }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Run a scenario and return the trace.
    pub fn run(&mut self, scenario: Scenario) -> Result<Trace, SimError> {
        self.run_with_monitor(scenario, &mut NoopMonitor)
    }

    /// Run a scenario, calling `monitor` at the end of every tick.
    pub fn run_with_monitor(
        &mut self,
        scenario: Scenario,
        monitor: &mut dyn Monitor,
    ) -> Result<Trace, SimError> {
        let mut ctx = SchedCtx::new(scenario.nr_resources, scenario.max_prio);
        let mut trace = Trace::new();
        let mut scripts: BTreeMap<Pid, Script> = BTreeMap::new();

        // Same-tick arrivals fork in scenario order.
        let mut arrivals: Vec<ProcessDef> = scenario.processes;
        arrivals.sort_by_key(|def| def.start_tick);
        let mut arrivals: VecDeque<ProcessDef> = arrivals.into();

        set_sim_tick(0);
        self.policy.initialize(&mut ctx)?;
        info!(
            policy = self.policy.name(),
            processes = arrivals.len(),
            resources = scenario.nr_resources,
            max_ticks = scenario.max_ticks,
            "simulation start"
        );

        let exit_kind = loop {
            let tick = ctx.ticks();
            set_sim_tick(tick);

            let finishing =
                arrivals.is_empty() && ctx.processes().all(Process::is_finished);
            if tick >= scenario.max_ticks && !finishing {
                break ExitKind::TickLimit;
            }

            self.fork_arrivals(&mut ctx, &mut arrivals, &mut scripts, &mut trace);
            let outcome =
                self.run_tick(&mut ctx, &mut scripts, &mut trace, !arrivals.is_empty());
            if outcome == TickOutcome::Drained {
                break ExitKind::Normal;
            }

            monitor.sample(&ProbeContext {
                tick,
                ctx: &ctx,
                trace: &trace,
            });
            if tracing::enabled!(tracing::Level::TRACE) {
                ctx.dump_status();
            }

            if outcome == TickOutcome::Idle
                && arrivals.is_empty()
                && ctx.nr_processes() > 0
                && ctx.processes().all(Process::is_blocked)
            {
                warn!(
                    blocked = ctx.nr_processes(),
                    "every live process is blocked"
                );
                break ExitKind::Deadlock;
            }

            ctx.advance_tick();
        };

        self.policy.finalize(&mut ctx);
        trace.finish(exit_kind, ctx.ticks());
        info!(exit = %exit_kind, ticks = ctx.ticks(), "simulation done");
        Ok(trace)
    }

    fn fork_arrivals(
        &mut self,
        ctx: &mut SchedCtx,
        arrivals: &mut VecDeque<ProcessDef>,
        scripts: &mut BTreeMap<Pid, Script>,
        trace: &mut Trace,
    ) {
        let tick = ctx.ticks();
        while arrivals.front().is_some_and(|def| def.start_tick <= tick) {
            let Some(def) = arrivals.pop_front() else {
                break;
            };
            debug!(
                pid = def.pid.0,
                lifespan = def.lifespan,
                prio = def.prio,
                "fork"
            );
            scripts.insert(def.pid, Script::new(&def));
            ctx.add_process(Process::new(def.pid, def.lifespan, def.prio));
            trace.record(tick, TraceKind::Forked { pid: def.pid });
            self.policy.forked(ctx, def.pid);
        }
    }

    fn run_tick(
        &mut self,
        ctx: &mut SchedCtx,
        scripts: &mut BTreeMap<Pid, Script>,
        trace: &mut Trace,
        arrivals_pending: bool,
    ) -> TickOutcome {
        let tick = ctx.ticks();
        loop {
            let prev = ctx.current;
            let next = self.policy.schedule(ctx);
            self.switch_to(ctx, prev, next, scripts, trace);

            let Some(pid) = next else {
                if ctx.nr_processes() == 0 && !arrivals_pending {
                    return TickOutcome::Drained;
                }
                trace.record(tick, TraceKind::Idle);
                debug!("idle");
                return TickOutcome::Idle;
            };

            if !self.acquire_due(ctx, scripts, pid, trace) {
                continue;
            }

            trace.record(tick, TraceKind::Scheduled { pid });
            let p = ctx.process_mut(pid);
            p.age += 1;
            trace!(pid = pid.0, age = p.age, prio = p.prio, "ran");
            self.release_due(ctx, scripts, pid, trace);
            return TickOutcome::Ran;
        }
    }

    /// Install the policy's choice as the running process and retire the
    /// previous one if it has finished.
    fn switch_to(
        &mut self,
        ctx: &mut SchedCtx,
        prev: Option<Pid>,
        next: Option<Pid>,
        scripts: &mut BTreeMap<Pid, Script>,
        trace: &mut Trace,
    ) {
        if let Some(pid) = next {
            let p = ctx.process(pid);
            assert!(
                p.has_remaining() && !p.is_blocked(),
                "{} picked pid {pid} which is {:?} at age {}/{}",
                self.policy.name(),
                p.status,
                p.age,
                p.lifespan()
            );
            assert!(
                !ctx.readyqueue.contains(pid),
                "{} picked pid {pid} without dequeuing it",
                self.policy.name()
            );
            ctx.process_mut(pid).status = ProcessStatus::Running;
        }
        ctx.current = next;

        if prev != next {
            debug!(
                prev = ?prev.map(|p| p.0),
                next = ?next.map(|p| p.0),
                "switch"
            );
        }

        let Some(prev) = prev.filter(|&p| Some(p) != next) else {
            return;
        };
        if ctx.process(prev).is_finished() {
            ctx.remove_process(prev);
            scripts.remove(&prev);
            trace.record(ctx.ticks(), TraceKind::Exited { pid: prev });
            debug!(pid = prev.0, "exit");
        }
    }

    /// Issue the requests `pid` has due at its current age. Returns false
    /// if one was refused and the process is now blocked.
    fn acquire_due(
        &mut self,
        ctx: &mut SchedCtx,
        scripts: &mut BTreeMap<Pid, Script>,
        pid: Pid,
        trace: &mut Trace,
    ) -> bool {
        let tick = ctx.ticks();
        let Some(script) = scripts.get_mut(&pid) else {
            return true;
        };
        for req in script.due(ctx.process(pid).age) {
            let resource = req.resource;
            if !self.policy.acquire(ctx, resource) {
                trace.record(tick, TraceKind::Blocked { pid, resource });
                return false;
            }
            script.grant(&req);
            trace.record(tick, TraceKind::Acquired { pid, resource });
        }
        true
    }

    fn release_due(
        &mut self,
        ctx: &mut SchedCtx,
        scripts: &mut BTreeMap<Pid, Script>,
        pid: Pid,
        trace: &mut Trace,
    ) {
        let tick = ctx.ticks();
        let Some(script) = scripts.get_mut(&pid) else {
            return;
        };
        for resource in script.expire() {
            let waiters = ctx.resource(resource).waitqueue.pids();
            self.policy.release(ctx, resource);
            trace.record(tick, TraceKind::Released { pid, resource });
            for waiter in waiters {
                if !ctx.resource(resource).waitqueue.contains(waiter) {
                    trace.record(
                        tick,
                        TraceKind::Woke {
                            pid: waiter,
                            resource,
                        },
                    );
                }
            }
        }
    }
}
