//! The scheduling policy interface and the closed set of policies.
//!
//! The driver owns the [`SchedCtx`] and calls into the active policy once
//! per tick (`schedule`) and whenever the running process requests or
//! returns a resource (`acquire` / `release`). Policies never see the
//! driver; everything they may touch is in the context.

use std::fmt;
use std::str::FromStr;

use crate::context::SchedCtx;
use crate::policies::{Fcfs, Pcp, Pip, Priority, PriorityAging, RoundRobin, Sjf, Stcf};
use crate::types::{Pid, ResourceId};

/// Fatal policy failure. Raised only by `initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The scheduling context cannot support this policy.
    Config(String),
    /// No policy is registered under the given name.
    Unknown(String),
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::Config(msg) => write!(f, "invalid policy configuration: {msg}"),
            PolicyError::Unknown(name) => write!(
                f,
                "unknown policy {name:?}; expected one of {}",
                PolicyKind::ALL
                    .iter()
                    .map(|k| k.key())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

impl std::error::Error for PolicyError {}

/// A pluggable scheduling policy.
///
/// Methods other than `schedule`, `acquire` and `release` have no-op
/// defaults for stateless policies.
pub trait Policy {
    /// Human-readable policy name.
    fn name(&self) -> &'static str;

    /// One-time setup before the first tick.
    fn initialize(&mut self, _ctx: &mut SchedCtx) -> Result<(), PolicyError> {
        Ok(())
    }

    /// Teardown after the last tick.
    fn finalize(&mut self, _ctx: &mut SchedCtx) {}

    /// Pick the process to run this tick, or `None` to idle.
    ///
    /// Called once per tick, and again within the same tick after an
    /// `acquire` that returned false. The returned process must no longer
    /// be in the ready queue. `ctx.current` is the process chosen on the
    /// previous call; it may be exhausted (`age == lifespan`) or Blocked.
    fn schedule(&mut self, ctx: &mut SchedCtx) -> Option<Pid>;

    /// The current process requests `resource`.
    ///
    /// Returns true if it now owns the resource. Otherwise the current
    /// process has been marked Blocked and placed in the resource's wait
    /// queue, and the driver will call `schedule` again.
    fn acquire(&mut self, ctx: &mut SchedCtx, resource: ResourceId) -> bool;

    /// The current process returns `resource`.
    ///
    /// # Panics
    /// Panics if the current process does not own `resource`.
    fn release(&mut self, ctx: &mut SchedCtx, resource: ResourceId);

    /// A new process was appended to the ready queue.
    fn forked(&mut self, _ctx: &mut SchedCtx, _pid: Pid) {}
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn initialize(&mut self, ctx: &mut SchedCtx) -> Result<(), PolicyError> {
        (**self).initialize(ctx)
    }

    fn finalize(&mut self, ctx: &mut SchedCtx) {
        (**self).finalize(ctx)
    }

    fn schedule(&mut self, ctx: &mut SchedCtx) -> Option<Pid> {
        (**self).schedule(ctx)
    }

    fn acquire(&mut self, ctx: &mut SchedCtx, resource: ResourceId) -> bool {
        (**self).acquire(ctx, resource)
    }

    fn release(&mut self, ctx: &mut SchedCtx, resource: ResourceId) {
        (**self).release(ctx, resource)
    }

    fn forked(&mut self, ctx: &mut SchedCtx, pid: Pid) {
        (**self).forked(ctx, pid)
    }
}

/// The closed set of available policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Fcfs,
    Sjf,
    Stcf,
    RoundRobin,
    Priority,
    PriorityAging,
    Pcp,
    Pip,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 8] = [
        PolicyKind::Fcfs,
        PolicyKind::Sjf,
        PolicyKind::Stcf,
        PolicyKind::RoundRobin,
        PolicyKind::Priority,
        PolicyKind::PriorityAging,
        PolicyKind::Pcp,
        PolicyKind::Pip,
    ];

    /// Short selector used on the command line.
    pub fn key(self) -> &'static str {
        match self {
            PolicyKind::Fcfs => "fcfs",
            PolicyKind::Sjf => "sjf",
            PolicyKind::Stcf => "stcf",
            PolicyKind::RoundRobin => "rr",
            PolicyKind::Priority => "prio",
            PolicyKind::PriorityAging => "pa",
            PolicyKind::Pcp => "pcp",
            PolicyKind::Pip => "pip",
        }
    }

    /// Construct a fresh instance of the policy.
    pub fn build(self) -> Box<dyn Policy> {
        match self {
            PolicyKind::Fcfs => Box::new(Fcfs),
            PolicyKind::Sjf => Box::new(Sjf),
            PolicyKind::Stcf => Box::new(Stcf),
            PolicyKind::RoundRobin => Box::new(RoundRobin),
            PolicyKind::Priority => Box::new(Priority),
            PolicyKind::PriorityAging => Box::new(PriorityAging::new()),
            PolicyKind::Pcp => Box::new(Pcp),
            PolicyKind::Pip => Box::new(Pip),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PolicyKind {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PolicyKind::ALL
            .into_iter()
            .find(|k| k.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| PolicyError::Unknown(s.to_string()))
    }
}
