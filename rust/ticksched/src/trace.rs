//! Trace event recording for the simulator.
//!
//! Every driver action (fork, run, resource grant/block/release, wakeup,
//! exit, idle tick) is recorded as a `TraceEvent` stamped with its tick.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{Pid, ResourceId, Tick};

/// A single trace event produced by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    /// Tick during which this event occurred.
    pub tick: Tick,
    /// The kind of event.
    pub kind: TraceKind,
}

/// The type of scheduling event recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    /// A process arrived and joined the ready queue.
    Forked { pid: Pid },
    /// A process executed this tick.
    Scheduled { pid: Pid },
    /// A process was granted a resource.
    Acquired { pid: Pid, resource: ResourceId },
    /// A process blocked on an owned resource.
    Blocked { pid: Pid, resource: ResourceId },
    /// A process returned a resource.
    Released { pid: Pid, resource: ResourceId },
    /// A waiter was moved back to the ready queue by a release.
    Woke { pid: Pid, resource: ResourceId },
    /// A process completed its lifespan and left the simulation.
    Exited { pid: Pid },
    /// Nothing ran this tick.
    Idle,
}

/// Why the simulation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Every process ran to completion.
    Normal,
    /// Live processes remain but all of them are blocked.
    Deadlock,
    /// The scenario's tick limit was reached first.
    TickLimit,
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitKind::Normal => "all processes exited",
            ExitKind::Deadlock => "deadlock",
            ExitKind::TickLimit => "tick limit reached",
        };
        f.write_str(s)
    }
}

/// A complete simulation trace, containing all events in tick order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    events: Vec<TraceEvent>,
    exit_kind: ExitKind,
    end_tick: Tick,
}

impl Trace {
    pub(crate) fn new() -> Self {
        Self {
            events: Vec::new(),
            exit_kind: ExitKind::Normal,
            end_tick: 0,
        }
    }

    pub(crate) fn record(&mut self, tick: Tick, kind: TraceKind) {
        self.events.push(TraceEvent { tick, kind });
    }

    pub(crate) fn finish(&mut self, exit_kind: ExitKind, end_tick: Tick) {
        self.exit_kind = exit_kind;
        self.end_tick = end_tick;
    }

    /// Get all events in chronological order.
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn exit_kind(&self) -> ExitKind {
        self.exit_kind
    }

    /// The tick at which the simulation stopped.
    pub fn end_tick(&self) -> Tick {
        self.end_tick
    }

    /// Who ran each tick, in order: `Some(pid)` or `None` for idle.
    pub fn run_sequence(&self) -> Vec<Option<Pid>> {
        self.events
            .iter()
            .filter_map(|e| match e.kind {
                TraceKind::Scheduled { pid } => Some(Some(pid)),
                TraceKind::Idle => Some(None),
                _ => None,
            })
            .collect()
    }

    /// Count the ticks a process executed.
    pub fn schedule_count(&self, pid: Pid) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, TraceKind::Scheduled { pid: p } if p == pid))
            .count()
    }

    /// Count the ticks nothing ran.
    pub fn idle_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, TraceKind::Idle))
            .count()
    }

    /// How many times a process blocked on a resource.
    pub fn block_count(&self, pid: Pid) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, TraceKind::Blocked { pid: p, .. } if p == pid))
            .count()
    }

    fn tick_of(&self, pred: impl Fn(&TraceKind) -> bool) -> Option<Tick> {
        self.events.iter().find(|e| pred(&e.kind)).map(|e| e.tick)
    }

    pub fn fork_tick(&self, pid: Pid) -> Option<Tick> {
        self.tick_of(|k| matches!(*k, TraceKind::Forked { pid: p } if p == pid))
    }

    /// Tick at which the driver retired the process, one past its last run.
    pub fn exit_tick(&self, pid: Pid) -> Option<Tick> {
        self.tick_of(|k| matches!(*k, TraceKind::Exited { pid: p } if p == pid))
    }

    /// Ticks from fork to exit.
    pub fn turnaround(&self, pid: Pid) -> Option<Tick> {
        Some(self.exit_tick(pid)? - self.fork_tick(pid)?)
    }

    /// Per-process statistics in PID order.
    pub fn summary(&self) -> TraceSummary {
        let mut processes: BTreeMap<Pid, ProcessSummary> = BTreeMap::new();
        let mut first_run: BTreeMap<Pid, Tick> = BTreeMap::new();
        for e in &self.events {
            match e.kind {
                TraceKind::Forked { pid } => {
                    processes.insert(
                        pid,
                        ProcessSummary {
                            pid,
                            forked: e.tick,
                            first_run: None,
                            exited: None,
                            ran: 0,
                            blocked: 0,
                        },
                    );
                }
                TraceKind::Scheduled { pid } => {
                    first_run.entry(pid).or_insert(e.tick);
                    if let Some(s) = processes.get_mut(&pid) {
                        s.ran += 1;
                    }
                }
                TraceKind::Blocked { pid, .. } => {
                    if let Some(s) = processes.get_mut(&pid) {
                        s.blocked += 1;
                    }
                }
                TraceKind::Exited { pid } => {
                    if let Some(s) = processes.get_mut(&pid) {
                        s.exited = Some(e.tick);
                    }
                }
                _ => {}
            }
        }
        for (pid, tick) in first_run {
            if let Some(s) = processes.get_mut(&pid) {
                s.first_run = Some(tick);
            }
        }
        TraceSummary {
            processes: processes.into_values().collect(),
            idle_ticks: self.idle_count(),
            end_tick: self.end_tick,
            exit_kind: self.exit_kind,
        }
    }

    /// Pretty-print the trace for debugging.
    pub fn dump(&self) {
        for event in &self.events {
            let desc = match &event.kind {
                TraceKind::Forked { pid } => format!("FORK     pid={}", pid.0),
                TraceKind::Scheduled { pid } => format!("SCHED    pid={}", pid.0),
                TraceKind::Acquired { pid, resource } => {
                    format!("ACQUIRE  pid={} res={}", pid.0, resource.0)
                }
                TraceKind::Blocked { pid, resource } => {
                    format!("BLOCK    pid={} res={}", pid.0, resource.0)
                }
                TraceKind::Released { pid, resource } => {
                    format!("RELEASE  pid={} res={}", pid.0, resource.0)
                }
                TraceKind::Woke { pid, resource } => {
                    format!("WAKE     pid={} res={}", pid.0, resource.0)
                }
                TraceKind::Exited { pid } => format!("EXIT     pid={}", pid.0),
                TraceKind::Idle => "IDLE".to_string(),
            };
            eprintln!("[{:>6}] {}", event.tick, desc);
        }
        eprintln!("[{:>6}] END      {}", self.end_tick, self.exit_kind);
    }
}

/// Statistics for one process over a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSummary {
    pub pid: Pid,
    pub forked: Tick,
    pub first_run: Option<Tick>,
    pub exited: Option<Tick>,
    /// Ticks executed.
    pub ran: usize,
    /// Times blocked on a resource.
    pub blocked: usize,
}

impl ProcessSummary {
    pub fn turnaround(&self) -> Option<Tick> {
        self.exited.map(|t| t - self.forked)
    }

    /// Ticks between fork and first execution.
    pub fn response(&self) -> Option<Tick> {
        self.first_run.map(|t| t - self.forked)
    }

    /// Ticks alive but not executing.
    pub fn waiting(&self) -> Option<Tick> {
        self.turnaround().map(|t| t - self.ran as Tick)
    }
}

/// Run-level statistics returned by [`Trace::summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSummary {
    pub processes: Vec<ProcessSummary>,
    pub idle_ticks: usize,
    pub end_tick: Tick,
    pub exit_kind: ExitKind,
}

impl fmt::Display for TraceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: Option<Tick>| v.map_or_else(|| "-".to_string(), |t| t.to_string());
        writeln!(
            f,
            "{:>6} {:>6} {:>6} {:>6} {:>8} {:>10} {:>8} {:>7}",
            "pid", "fork", "exit", "ran", "blocked", "turnaround", "response", "waiting"
        )?;
        for p in &self.processes {
            writeln!(
                f,
                "{:>6} {:>6} {:>6} {:>6} {:>8} {:>10} {:>8} {:>7}",
                p.pid,
                p.forked,
                opt(p.exited),
                p.ran,
                p.blocked,
                opt(p.turnaround()),
                opt(p.response()),
                opt(p.waiting())
            )?;
        }
        write!(
            f,
            "{} after {} ticks ({} idle)",
            self.exit_kind, self.end_tick, self.idle_ticks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Trace {
        let mut t = Trace::new();
        t.record(0, TraceKind::Forked { pid: Pid(1) });
        t.record(0, TraceKind::Scheduled { pid: Pid(1) });
        t.record(1, TraceKind::Forked { pid: Pid(2) });
        t.record(1, TraceKind::Scheduled { pid: Pid(1) });
        t.record(2, TraceKind::Exited { pid: Pid(1) });
        t.record(
            2,
            TraceKind::Blocked {
                pid: Pid(2),
                resource: ResourceId(0),
            },
        );
        t.record(2, TraceKind::Idle);
        t.finish(ExitKind::Deadlock, 2);
        t
    }

    #[test]
    fn test_queries() {
        let t = sample();
        assert_eq!(t.run_sequence(), vec![Some(Pid(1)), Some(Pid(1)), None]);
        assert_eq!(t.schedule_count(Pid(1)), 2);
        assert_eq!(t.schedule_count(Pid(2)), 0);
        assert_eq!(t.block_count(Pid(2)), 1);
        assert_eq!(t.turnaround(Pid(1)), Some(2));
        assert_eq!(t.turnaround(Pid(2)), None);
        assert_eq!(t.exit_kind(), ExitKind::Deadlock);
    }

    #[test]
    fn test_summary() {
        let s = sample().summary();
        assert_eq!(s.idle_ticks, 1);
        assert_eq!(s.processes.len(), 2);
        let p1 = &s.processes[0];
        assert_eq!((p1.ran, p1.turnaround(), p1.response()), (2, Some(2), Some(0)));
        assert_eq!(p1.waiting(), Some(0));
        let p2 = &s.processes[1];
        assert_eq!((p2.ran, p2.blocked, p2.first_run), (0, 1, None));
        assert!(s.to_string().ends_with("deadlock after 2 ticks (1 idle)"));
    }
}
