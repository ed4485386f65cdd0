//! Ordered process queues.
//!
//! The ready queue and every resource wait queue are a `ProcQueue`: an
//! insertion-ordered sequence of PIDs. Position is significant, since
//! several policies break ties by picking the earliest-queued entry. A PID
//! may appear at most once; inserting a queued PID is an invariant
//! violation.

use std::collections::VecDeque;

use crate::types::Pid;

/// An insertion-ordered queue of process IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcQueue {
    entries: VecDeque<Pid>,
}

impl ProcQueue {
    pub fn new() -> Self {
        ProcQueue {
            entries: VecDeque::new(),
        }
    }

    /// Append at the tail.
    ///
    /// # Panics
    /// Panics if `pid` is already queued.
    pub fn push_back(&mut self, pid: Pid) {
        assert!(!self.contains(pid), "pid {pid} is already queued");
        self.entries.push_back(pid);
    }

    /// Insert at the head.
    ///
    /// # Panics
    /// Panics if `pid` is already queued.
    pub fn push_front(&mut self, pid: Pid) {
        assert!(!self.contains(pid), "pid {pid} is already queued");
        self.entries.push_front(pid);
    }

    /// Remove and return the head.
    pub fn pop_front(&mut self) -> Option<Pid> {
        self.entries.pop_front()
    }

    pub fn front(&self) -> Option<Pid> {
        self.entries.front().copied()
    }

    /// Remove a specific PID from the queue. Returns true if found.
    pub fn remove(&mut self, pid: Pid) -> bool {
        match self.entries.iter().position(|&p| p == pid) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.entries.contains(&pid)
    }

    /// Number of queued processes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate PIDs from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = Pid> + '_ {
        self.entries.iter().copied()
    }

    /// Snapshot of all PIDs in queue order.
    pub fn pids(&self) -> Vec<Pid> {
        self.entries.iter().copied().collect()
    }
}
