//! Monitor trait for per-tick state sampling.
//!
//! Monitors are called by the engine at the end of every tick, after the
//! selected process ran and its expiring holds were released, enabling
//! probes to sample scheduling state into a time series.

use std::collections::BTreeMap;

use crate::context::SchedCtx;
use crate::trace::Trace;
use crate::types::{Pid, Prio, Tick};

/// Context passed to monitors at each tick.
pub struct ProbeContext<'a> {
    /// The tick that just completed.
    pub tick: Tick,
    /// Read-only scheduling state.
    pub ctx: &'a SchedCtx,
    /// Read-only access to the trace accumulated so far.
    pub trace: &'a Trace,
}

/// Trait for per-tick state sampling.
///
/// Implement this to read scheduling state at each tick and accumulate it
/// for post-simulation assertions.
pub trait Monitor {
    /// Called once per simulated tick.
    fn sample(&mut self, probe: &ProbeContext);
}

/// A monitor that samples nothing.
pub struct NoopMonitor;

impl Monitor for NoopMonitor {
    fn sample(&mut self, _probe: &ProbeContext) {}
}

/// Records every queue-partition or ownership violation seen by
/// [`SchedCtx::check_invariants`].
#[derive(Debug, Default)]
pub struct InvariantMonitor {
    pub samples: usize,
    pub violations: Vec<(Tick, String)>,
}

impl InvariantMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    /// Panics listing the violations, if any were recorded.
    pub fn assert_clean(&self) {
        assert!(
            self.violations.is_empty(),
            "{} invariant violation(s) over {} ticks: {:?}",
            self.violations.len(),
            self.samples,
            self.violations
        );
    }
}

impl Monitor for InvariantMonitor {
    fn sample(&mut self, probe: &ProbeContext) {
        self.samples += 1;
        if let Err(e) = probe.ctx.check_invariants() {
            self.violations.push((probe.tick, e));
        }
    }
}

/// Time series of every live process's effective priority.
#[derive(Debug, Default)]
pub struct PrioMonitor {
    pub samples: Vec<(Tick, BTreeMap<Pid, Prio>)>,
}

impl PrioMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Priority of `pid` at the end of each tick it was alive.
    pub fn history(&self, pid: Pid) -> Vec<(Tick, Prio)> {
        self.samples
            .iter()
            .filter_map(|(tick, prios)| prios.get(&pid).map(|&p| (*tick, p)))
            .collect()
    }
}

impl Monitor for PrioMonitor {
    fn sample(&mut self, probe: &ProbeContext) {
        let prios = probe
            .ctx
            .processes()
            .map(|p| (p.pid(), p.prio))
            .collect();
        self.samples.push((probe.tick, prios));
    }
}

/// Fan a probe out to several monitors.
pub struct Monitors<'a>(pub Vec<&'a mut dyn Monitor>);

impl Monitor for Monitors<'_> {
    fn sample(&mut self, probe: &ProbeContext) {
        for m in self.0.iter_mut() {
            m.sample(probe);
        }
    }
}
