//! Scenario definition and builder API.

use std::collections::BTreeSet;
use std::fmt;

use crate::types::{Pid, Prio, ResourceId, Tick, MAX_PRIO, NR_RESOURCES};

/// Tick limit used when a scenario does not set one.
pub const DEFAULT_MAX_TICKS: Tick = 10_000;

/// Largest resource table a scenario may ask for.
pub const MAX_RESOURCES: usize = 1 << 16;

/// One scripted resource hold: at `age == at` the process requests
/// `resource` and keeps it for `duration` executed ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRequest {
    pub resource: ResourceId,
    pub at: Tick,
    pub duration: Tick,
}

impl ResourceRequest {
    /// First age at which the resource is no longer held. Saturates, so an
    /// overflowing hold still compares past any lifespan.
    pub fn end(&self) -> Tick {
        self.at.saturating_add(self.duration)
    }
}

/// A process to be forked into the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDef {
    pub pid: Pid,
    /// Tick at which the driver forks the process.
    pub start_tick: Tick,
    pub lifespan: Tick,
    pub prio: Prio,
    /// Resource holds in script order.
    pub requests: Vec<ResourceRequest>,
}

impl ProcessDef {
    pub fn new(pid: Pid, lifespan: Tick) -> Self {
        ProcessDef {
            pid,
            start_tick: 0,
            lifespan,
            prio: 0,
            requests: Vec::new(),
        }
    }

    pub fn prio(mut self, prio: Prio) -> Self {
        self.prio = prio;
        self
    }

    pub fn start(mut self, tick: Tick) -> Self {
        self.start_tick = tick;
        self
    }

    /// Hold `resource` from age `at` for `duration` ticks.
    pub fn acquire(mut self, resource: usize, at: Tick, duration: Tick) -> Self {
        self.requests.push(ResourceRequest {
            resource: ResourceId(resource),
            at,
            duration,
        });
        self
    }
}

/// A complete simulation scenario: resource table, processes, and tick limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub nr_resources: usize,
    pub max_prio: Prio,
    pub max_ticks: Tick,
    pub processes: Vec<ProcessDef>,
}

/// Reasons a scenario is rejected by [`ScenarioBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    NoProcesses,
    TooManyResources(usize),
    DuplicatePid(Pid),
    ZeroLifespan(Pid),
    PrioOutOfRange {
        pid: Pid,
        prio: Prio,
        max_prio: Prio,
    },
    ResourceOutOfRange {
        pid: Pid,
        resource: ResourceId,
        nr_resources: usize,
    },
    ZeroDuration {
        pid: Pid,
        resource: ResourceId,
    },
    /// The hold would outlive the process.
    HoldPastLifespan {
        pid: Pid,
        resource: ResourceId,
        end: Tick,
        lifespan: Tick,
    },
    /// Two holds of the same resource by one process overlap.
    OverlappingHold {
        pid: Pid,
        resource: ResourceId,
    },
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::NoProcesses => write!(f, "scenario has no processes"),
            ScenarioError::TooManyResources(n) => {
                write!(f, "{n} resources requested, at most {MAX_RESOURCES} supported")
            }
            ScenarioError::DuplicatePid(pid) => write!(f, "pid {pid} defined more than once"),
            ScenarioError::ZeroLifespan(pid) => write!(f, "pid {pid} has a zero lifespan"),
            ScenarioError::PrioOutOfRange {
                pid,
                prio,
                max_prio,
            } => write!(f, "pid {pid} has prio {prio} above max_prio {max_prio}"),
            ScenarioError::ResourceOutOfRange {
                pid,
                resource,
                nr_resources,
            } => write!(
                f,
                "pid {pid} requests {resource} but only {nr_resources} resources exist"
            ),
            ScenarioError::ZeroDuration { pid, resource } => {
                write!(f, "pid {pid} holds {resource} for zero ticks")
            }
            ScenarioError::HoldPastLifespan {
                pid,
                resource,
                end,
                lifespan,
            } => write!(
                f,
                "pid {pid} holds {resource} until age {end} past its lifespan {lifespan}"
            ),
            ScenarioError::OverlappingHold { pid, resource } => {
                write!(f, "pid {pid} has overlapping holds of {resource}")
            }
        }
    }
}

impl std::error::Error for ScenarioError {}

/// Builder for constructing scenarios.
pub struct ScenarioBuilder {
    nr_resources: usize,
    max_prio: Prio,
    max_ticks: Tick,
    processes: Vec<ProcessDef>,
    next_pid: Pid,
}

impl Scenario {
    pub fn builder() -> ScenarioBuilder {
        ScenarioBuilder {
            nr_resources: NR_RESOURCES,
            max_prio: MAX_PRIO,
            max_ticks: DEFAULT_MAX_TICKS,
            processes: Vec::new(),
            next_pid: Pid(1),
        }
    }

    /// Sum of all lifespans: the busy ticks a complete run needs.
    pub fn total_work(&self) -> Tick {
        self.processes
            .iter()
            .fold(0, |acc: Tick, p| acc.saturating_add(p.lifespan))
    }
}

impl ScenarioBuilder {
    /// Set the size of the resource table.
    pub fn resources(mut self, n: usize) -> Self {
        self.nr_resources = n;
        self
    }

    /// Set the maximum priority (the PCP ceiling).
    pub fn max_prio(mut self, prio: Prio) -> Self {
        self.max_prio = prio;
        self
    }

    /// Stop the simulation after this many ticks.
    pub fn max_ticks(mut self, ticks: Tick) -> Self {
        self.max_ticks = ticks;
        self
    }

    /// Add a process with a full ProcessDef.
    pub fn process(mut self, def: ProcessDef) -> Self {
        // Saturate at u32::MAX: a further auto pid then fails as a duplicate
        // instead of wrapping to 0.
        if def.pid >= self.next_pid {
            self.next_pid = Pid(def.pid.0.saturating_add(1));
        }
        self.processes.push(def);
        self
    }

    /// Convenience: add a process forked at tick 0 with an auto-assigned PID.
    pub fn add_process(self, lifespan: Tick, prio: Prio) -> Self {
        let pid = self.next_pid;
        self.process(ProcessDef::new(pid, lifespan).prio(prio))
    }

    /// Validate and build the scenario.
    pub fn build(self) -> Result<Scenario, ScenarioError> {
        if self.processes.is_empty() {
            return Err(ScenarioError::NoProcesses);
        }
        if self.nr_resources > MAX_RESOURCES {
            return Err(ScenarioError::TooManyResources(self.nr_resources));
        }
        let mut seen = BTreeSet::new();
        for def in &self.processes {
            if !seen.insert(def.pid) {
                return Err(ScenarioError::DuplicatePid(def.pid));
            }
            self.validate_process(def)?;
        }
        Ok(Scenario {
            nr_resources: self.nr_resources,
            max_prio: self.max_prio,
            max_ticks: self.max_ticks,
            processes: self.processes,
        })
    }

    fn validate_process(&self, def: &ProcessDef) -> Result<(), ScenarioError> {
        let pid = def.pid;
        if def.lifespan == 0 {
            return Err(ScenarioError::ZeroLifespan(pid));
        }
        if def.prio > self.max_prio {
            return Err(ScenarioError::PrioOutOfRange {
                pid,
                prio: def.prio,
                max_prio: self.max_prio,
            });
        }
        for (i, req) in def.requests.iter().enumerate() {
            let resource = req.resource;
            if resource.0 >= self.nr_resources {
                return Err(ScenarioError::ResourceOutOfRange {
                    pid,
                    resource,
                    nr_resources: self.nr_resources,
                });
            }
            if req.duration == 0 {
                return Err(ScenarioError::ZeroDuration { pid, resource });
            }
            if req.end() > def.lifespan {
                return Err(ScenarioError::HoldPastLifespan {
                    pid,
                    resource,
                    end: req.end(),
                    lifespan: def.lifespan,
                });
            }
            let overlaps = def.requests[..i]
                .iter()
                .any(|o| o.resource == resource && o.at < req.end() && req.at < o.end());
            if overlaps {
                return Err(ScenarioError::OverlappingHold { pid, resource });
            }
        }
        Ok(())
    }
}
