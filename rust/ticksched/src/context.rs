//! Scheduling context shared between the driver and the active policy.
//!
//! The driver owns one `SchedCtx` per simulation and lends it `&mut` to
//! each policy callback. It holds the process table, the current process,
//! the ready queue, the resource table and the tick counter. Policies may
//! read everything and mutate process status/priority, queues and resource
//! ownership; `age` and the tick counter are advanced by the driver.

use std::collections::BTreeMap;
use std::fmt;

use crate::process::{Process, ProcessStatus};
use crate::queue::ProcQueue;
use crate::resource::Resource;
use crate::types::{Pid, Prio, ResourceId, Tick};

/// Simulation state visible to scheduling policies.
#[derive(Debug, Clone)]
pub struct SchedCtx {
    processes: BTreeMap<Pid, Process>,
    /// The process selected for the current tick, if any.
    pub current: Option<Pid>,
    /// Processes eligible to run, in policy-significant order.
    pub readyqueue: ProcQueue,
    resources: Vec<Resource>,
    ticks: Tick,
    max_prio: Prio,
}

impl SchedCtx {
    pub fn new(nr_resources: usize, max_prio: Prio) -> Self {
        SchedCtx {
            processes: BTreeMap::new(),
            current: None,
            readyqueue: ProcQueue::new(),
            resources: (0..nr_resources).map(|_| Resource::new()).collect(),
            ticks: 0,
            max_prio,
        }
    }

    /// Monotonic tick counter.
    pub fn ticks(&self) -> Tick {
        self.ticks
    }

    pub(crate) fn advance_tick(&mut self) {
        self.ticks += 1;
    }

    /// The system-wide maximum priority (PCP ceiling).
    pub fn max_prio(&self) -> Prio {
        self.max_prio
    }

    /// Number of live (not yet retired) processes.
    pub fn nr_processes(&self) -> usize {
        self.processes.len()
    }

    /// Look up a live process.
    ///
    /// # Panics
    /// Panics if `pid` is not live. Every PID reachable from a queue, an
    /// owner slot or `current` must be live.
    pub fn process(&self, pid: Pid) -> &Process {
        self.processes
            .get(&pid)
            .unwrap_or_else(|| panic!("pid {pid} is not a live process"))
    }

    /// Mutable variant of [`SchedCtx::process`].
    pub fn process_mut(&mut self, pid: Pid) -> &mut Process {
        self.processes
            .get_mut(&pid)
            .unwrap_or_else(|| panic!("pid {pid} is not a live process"))
    }

    pub fn try_process(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(&pid)
    }

    /// All live processes in PID order.
    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    /// The current process record, if any.
    pub fn current_process(&self) -> Option<&Process> {
        self.current.map(|pid| self.process(pid))
    }

    /// Register a new process and append it to the ready queue.
    ///
    /// # Panics
    /// Panics if the PID is already live.
    pub fn add_process(&mut self, mut process: Process) {
        let pid = process.pid();
        assert!(
            !self.processes.contains_key(&pid),
            "pid {pid} forked twice"
        );
        process.status = ProcessStatus::Ready;
        self.processes.insert(pid, process);
        self.readyqueue.push_back(pid);
    }

    /// Drop a finished process from the table.
    ///
    /// # Panics
    /// Panics if the process is still queued anywhere, still owns a
    /// resource, or is the current process.
    pub fn remove_process(&mut self, pid: Pid) -> Process {
        assert!(self.current != Some(pid), "retiring current pid {pid}");
        assert!(
            !self.readyqueue.contains(pid),
            "retiring pid {pid} still in the ready queue"
        );
        for (i, r) in self.resources.iter().enumerate() {
            assert!(
                !r.is_owned_by(pid),
                "retiring pid {pid} still owns {}",
                ResourceId(i)
            );
            assert!(
                !r.waitqueue.contains(pid),
                "retiring pid {pid} still waits on {}",
                ResourceId(i)
            );
        }
        self.processes
            .remove(&pid)
            .unwrap_or_else(|| panic!("pid {pid} is not a live process"))
    }

    pub fn resource(&self, id: ResourceId) -> &Resource {
        &self.resources[id.0]
    }

    pub fn resource_mut(&mut self, id: ResourceId) -> &mut Resource {
        &mut self.resources[id.0]
    }

    /// All resources with their IDs.
    pub fn resources(&self) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.resources
            .iter()
            .enumerate()
            .map(|(i, r)| (ResourceId(i), r))
    }

    /// The resource whose wait queue holds `pid`, if any.
    pub fn blocked_on(&self, pid: Pid) -> Option<ResourceId> {
        self.resources()
            .find(|(_, r)| r.waitqueue.contains(pid))
            .map(|(id, _)| id)
    }

    /// Resources currently owned by `pid`.
    pub fn owned_by(&self, pid: Pid) -> Vec<ResourceId> {
        self.resources()
            .filter(|(_, r)| r.is_owned_by(pid))
            .map(|(id, _)| id)
            .collect()
    }

    /// Detach `pid` from the ready queue.
    ///
    /// # Panics
    /// Panics if `pid` is not in the ready queue.
    pub fn take_ready(&mut self, pid: Pid) {
        assert!(
            self.readyqueue.remove(pid),
            "pid {pid} is not in the ready queue"
        );
    }

    /// Demote `pid` to Ready and append it to the ready queue tail.
    pub fn requeue_tail(&mut self, pid: Pid) {
        self.process_mut(pid).status = ProcessStatus::Ready;
        self.readyqueue.push_back(pid);
    }

    /// Demote `pid` to Ready and put it at the ready queue head.
    pub fn requeue_head(&mut self, pid: Pid) {
        self.process_mut(pid).status = ProcessStatus::Ready;
        self.readyqueue.push_front(pid);
    }

    /// Verify the queue-partition and ownership invariants.
    ///
    /// Every live process must be in exactly one of {running, ready queue,
    /// one wait queue} with a matching status, at most one process may be
    /// Running, and no owner may wait on the resource it holds. An owner
    /// may be Blocked on a different resource (nested holds).
    ///
    /// A process that has just exhausted its lifespan stays `current` and
    /// Running until the driver retires it, so `current` may be Running
    /// even between ticks.
    pub fn check_invariants(&self) -> Result<(), String> {
        let running: Vec<Pid> = self
            .processes()
            .filter(|p| p.status == ProcessStatus::Running)
            .map(|p| p.pid())
            .collect();
        if running.len() > 1 {
            return Err(format!("more than one running process: {running:?}"));
        }
        if let Some(&pid) = running.first() {
            if self.current != Some(pid) {
                return Err(format!(
                    "pid {pid} is running but current is {:?}",
                    self.current
                ));
            }
        }

        for p in self.processes() {
            let pid = p.pid();
            let in_ready = self.readyqueue.contains(pid) as usize;
            let waits: usize = self
                .resources
                .iter()
                .filter(|r| r.waitqueue.contains(pid))
                .count();
            let is_running = (p.status == ProcessStatus::Running) as usize;
            if in_ready + waits + is_running != 1 {
                return Err(format!(
                    "pid {pid} ({:?}) is in {in_ready} ready queue(s), {waits} wait queue(s), running={is_running}",
                    p.status
                ));
            }
            let expected = match (in_ready, waits) {
                (1, _) => ProcessStatus::Ready,
                (_, 1) => ProcessStatus::Blocked,
                _ => ProcessStatus::Running,
            };
            if p.status != expected {
                return Err(format!(
                    "pid {pid} has status {:?} but is queued as {expected:?}",
                    p.status
                ));
            }
        }

        for (id, r) in self.resources() {
            if let Some(owner) = r.owner {
                let p = self
                    .try_process(owner)
                    .ok_or_else(|| format!("{id} owned by dead pid {owner}"))?;
                if p.is_blocked() && self.blocked_on(owner).is_none() {
                    return Err(format!("{id} owned by blocked pid {owner}"));
                }
                if r.waitqueue.contains(owner) {
                    return Err(format!("{id} owner pid {owner} waits on it"));
                }
            }
            for pid in r.waitqueue.iter() {
                if self.try_process(pid).is_none() {
                    return Err(format!("{id} wait queue holds dead pid {pid}"));
                }
            }
        }
        for pid in self.readyqueue.iter() {
            if self.try_process(pid).is_none() {
                return Err(format!("ready queue holds dead pid {pid}"));
            }
        }
        Ok(())
    }

    /// Log the whole scheduling state at debug level.
    pub fn dump_status(&self) {
        for line in self.to_string().lines() {
            tracing::debug!("{line}");
        }
    }
}

impl fmt::Display for SchedCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "***** tick {} *****", self.ticks)?;
        match self.current_process() {
            Some(p) => writeln!(
                f,
                " current: {} ({:?}) age {}/{} prio {}/{}",
                p.pid(),
                p.status,
                p.age,
                p.lifespan(),
                p.prio,
                p.prio_orig
            )?,
            None => writeln!(f, " current: none")?,
        }
        write!(f, " ready:")?;
        for pid in self.readyqueue.iter() {
            let p = self.process(pid);
            write!(f, " {}(prio {} age {}/{})", pid, p.prio, p.age, p.lifespan())?;
        }
        writeln!(f)?;
        for (id, r) in self.resources() {
            if r.is_free() && r.waitqueue.is_empty() {
                continue;
            }
            let owner = r.owner.map_or_else(|| "-".to_string(), |p| p.to_string());
            write!(f, " {id}: owner {owner} waiters")?;
            for pid in r.waitqueue.iter() {
                write!(f, " {pid}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with(pids: &[u32]) -> SchedCtx {
        let mut ctx = SchedCtx::new(4, 100);
        for &pid in pids {
            ctx.add_process(Process::new(Pid(pid), 5, 0));
        }
        ctx
    }

    #[test]
    fn test_add_process_enqueues_ready() {
        let ctx = ctx_with(&[1, 2]);
        assert_eq!(ctx.readyqueue.pids(), vec![Pid(1), Pid(2)]);
        assert_eq!(ctx.process(Pid(2)).status, ProcessStatus::Ready);
        assert!(ctx.check_invariants().is_ok());
    }

    #[test]
    fn test_invariants_catch_double_membership() {
        let mut ctx = ctx_with(&[1]);
        ctx.resource_mut(ResourceId(0)).waitqueue.push_back(Pid(1));
        let err = ctx.check_invariants().unwrap_err();
        assert!(err.contains("pid 1"), "unexpected error: {err}");
    }

    #[test]
    fn test_invariants_catch_two_running() {
        let mut ctx = ctx_with(&[1, 2]);
        for pid in [Pid(1), Pid(2)] {
            ctx.take_ready(pid);
            ctx.process_mut(pid).status = ProcessStatus::Running;
        }
        ctx.current = Some(Pid(1));
        let err = ctx.check_invariants().unwrap_err();
        assert!(err.contains("more than one running"), "unexpected error: {err}");
    }

    #[test]
    fn test_blocked_on_and_owned_by() {
        let mut ctx = ctx_with(&[1, 2]);
        ctx.take_ready(Pid(1));
        ctx.process_mut(Pid(1)).status = ProcessStatus::Running;
        ctx.current = Some(Pid(1));
        ctx.resource_mut(ResourceId(2)).owner = Some(Pid(1));
        ctx.take_ready(Pid(2));
        ctx.process_mut(Pid(2)).status = ProcessStatus::Blocked;
        ctx.resource_mut(ResourceId(2)).waitqueue.push_back(Pid(2));

        assert_eq!(ctx.owned_by(Pid(1)), vec![ResourceId(2)]);
        assert_eq!(ctx.blocked_on(Pid(2)), Some(ResourceId(2)));
        assert_eq!(ctx.blocked_on(Pid(1)), None);
        assert!(ctx.check_invariants().is_ok());
    }

    #[test]
    #[should_panic(expected = "still owns")]
    fn test_retiring_an_owner_panics() {
        let mut ctx = ctx_with(&[1]);
        ctx.take_ready(Pid(1));
        ctx.resource_mut(ResourceId(0)).owner = Some(Pid(1));
        ctx.remove_process(Pid(1));
    }
}
