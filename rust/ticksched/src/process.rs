//! Process model shared by the driver and every policy.

use crate::types::{Pid, Prio, Tick};

/// The state a simulated process can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Sitting in the ready queue.
    Ready,
    /// Selected to execute in the current tick.
    Running,
    /// Sitting in exactly one resource's wait queue.
    Blocked,
}

/// A simulated process.
///
/// `pid` and `lifespan` are fixed at creation. `age` is advanced by the
/// driver only; `status` and `prio` are owned by the active policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pid: Pid,
    lifespan: Tick,
    /// Current process state.
    pub status: ProcessStatus,
    /// Ticks already executed.
    pub age: Tick,
    /// Effective priority, possibly aged or elevated.
    pub prio: Prio,
    /// Baseline priority the effective one is restored to.
    pub prio_orig: Prio,
}

impl Process {
    /// Create a freshly forked, ready process.
    pub fn new(pid: Pid, lifespan: Tick, prio: Prio) -> Self {
        Process {
            pid,
            lifespan,
            status: ProcessStatus::Ready,
            age: 0,
            prio,
            prio_orig: prio,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn lifespan(&self) -> Tick {
        self.lifespan
    }

    /// Ticks left before completion (`lifespan - age`).
    pub fn remaining(&self) -> Tick {
        self.lifespan.saturating_sub(self.age)
    }

    /// Whether the process still has lifetime left to execute.
    pub fn has_remaining(&self) -> bool {
        self.age < self.lifespan
    }

    pub fn is_blocked(&self) -> bool {
        self.status == ProcessStatus::Blocked
    }

    /// Whether the process has executed its whole lifespan.
    pub fn is_finished(&self) -> bool {
        self.age >= self.lifespan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_process_is_ready() {
        let p = Process::new(Pid(7), 4, 12);
        assert_eq!(p.pid(), Pid(7));
        assert_eq!(p.status, ProcessStatus::Ready);
        assert_eq!(p.prio, p.prio_orig);
        assert_eq!(p.remaining(), 4);
        assert!(p.has_remaining());
    }

    #[test]
    fn test_remaining_counts_down_to_finish() {
        let mut p = Process::new(Pid(1), 2, 0);
        p.age = 1;
        assert_eq!(p.remaining(), 1);
        assert!(!p.is_finished());
        p.age = 2;
        assert_eq!(p.remaining(), 0);
        assert!(p.is_finished());
        assert!(!p.has_remaining());
    }
}
