//! Scheduling policy implementations.
//!
//! - [`Fcfs`]: first-come first-served, non-preemptive
//! - [`Sjf`]: shortest job first, non-preemptive
//! - [`Stcf`]: shortest time-to-completion first, preemptive
//! - [`RoundRobin`]: one-tick quantum
//! - [`Priority`]: preemptive priority with priority-ordered wakeups
//! - [`PriorityAging`]: priority with per-tick aging of waiting processes
//! - [`Pcp`]: priority ceiling protocol
//! - [`Pip`]: priority inheritance protocol

mod aging;
pub(crate) mod common;
mod fcfs;
mod pcp;
mod pip;
mod prio;
mod rr;
mod sjf;
mod stcf;

pub use aging::PriorityAging;
pub use fcfs::Fcfs;
pub use pcp::Pcp;
pub use pip::Pip;
pub use prio::Priority;
pub use rr::RoundRobin;
pub use sjf::Sjf;
pub use stcf::Stcf;
