//! ticksched - Deterministic tick-based simulator for teaching CPU schedulers.
//!
//! A single simulated CPU runs scripted processes one tick at a time under a
//! pluggable scheduling policy. Processes may hold shared resources for part
//! of their lifetime; contending for an owned resource blocks them, which is
//! where the priority-inversion protocols (PCP, PIP) come into play.
//!
//! # Architecture
//!
//! - **Engine**: tick loop that forks arrivals, drives the policy and plays
//!   resource scripts
//! - **Context**: process table, ready queue and resource table lent to the
//!   policy on every call
//! - **Policies**: FCFS, SJF, STCF, RR, Priority, Priority+Aging, PCP, PIP
//! - **Trace**: per-tick event log and run statistics
//!
//! # Usage
//!
//! ```rust
//! use ticksched::*;
//!
//! let scenario = Scenario::builder()
//!     .process(ProcessDef::new(Pid(1), 4).prio(1).acquire(0, 0, 3))
//!     .process(ProcessDef::new(Pid(2), 2).prio(9).start(1).acquire(0, 0, 1))
//!     .build()
//!     .unwrap();
//!
//! let trace = Simulator::new(PolicyKind::Pip.build()).run(scenario).unwrap();
//! assert_eq!(trace.exit_kind(), ExitKind::Normal);
//! ```

pub mod context;
pub mod engine;
pub mod fmt;
pub mod monitor;
pub mod policies;
pub mod policy;
pub mod process;
pub mod queue;
pub mod resource;
pub mod scenario;
pub mod trace;
pub mod types;
pub mod workload;

// Re-export the main public types for convenience.
pub use context::SchedCtx;
pub use engine::{sim_tick, SimError, Simulator};
pub use fmt::SimFormat;
pub use monitor::{InvariantMonitor, Monitor, Monitors, PrioMonitor, ProbeContext};
pub use policy::{Policy, PolicyError, PolicyKind};
pub use process::{Process, ProcessStatus};
pub use scenario::{ProcessDef, ResourceRequest, Scenario, ScenarioError};
pub use trace::{ExitKind, Trace, TraceEvent, TraceKind, TraceSummary};
pub use types::{Pid, Prio, ResourceId, Tick, MAX_PRIO, NR_RESOURCES};
pub use workload::{load_workload, parse_workload, WorkloadError};
