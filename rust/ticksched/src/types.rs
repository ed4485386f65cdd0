//! Newtype wrappers and type aliases for domain concepts.
//!
//! Newtypes for identifiers (PIDs, resource IDs) prevent silent type
//! confusion between a process and the resource it is waiting on. Type
//! aliases for plain quantities (ticks, priorities) keep arithmetic cheap.

use std::fmt;

/// Process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u32);

/// Index into the fixed resource table, in `[0, nr_resources)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub usize);

/// Simulated time, in ticks.
pub type Tick = u64;

/// Scheduling priority. Higher value = higher priority.
pub type Prio = u32;

/// Default system-wide maximum priority (the PCP ceiling).
pub const MAX_PRIO: Prio = 100;

/// Default size of the resource table.
pub const NR_RESOURCES: usize = 32;

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}
