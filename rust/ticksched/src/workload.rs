//! Parser for JSON workload descriptions.
//!
//! A workload file is the serialized form of a [`Scenario`]:
//!
//! ```json
//! {
//!   "max_ticks": 200,
//!   "nr_resources": 4,
//!   "max_prio": 100,
//!   "processes": [
//!     { "pid": 1, "start": 0, "lifespan": 6, "prio": 10,
//!       "acquire": [ { "resource": 0, "at": 1, "duration": 3 } ] },
//!     { "pid": 2, "start": 2, "lifespan": 4 }
//!   ]
//! }
//! ```
//!
//! Every top-level field except `processes` is optional and falls back to
//! the [`ScenarioBuilder`](crate::scenario::ScenarioBuilder) default. Per
//! process, `start`, `prio` and `acquire` are optional. Unknown keys are
//! rejected so that typos do not silently change a run.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::scenario::{ProcessDef, ResourceRequest, Scenario, ScenarioError};
use crate::types::{Pid, Prio, ResourceId, Tick};

/// Errors from loading a workload.
#[derive(Debug)]
pub enum WorkloadError {
    /// The file could not be read.
    Io(std::io::Error),
    /// JSON parse error.
    Json(serde_json::Error),
    /// The workload parsed but describes an invalid scenario.
    Scenario(ScenarioError),
}

impl fmt::Display for WorkloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadError::Io(e) => write!(f, "cannot read workload: {e}"),
            WorkloadError::Json(e) => write!(f, "JSON parse error: {e}"),
            WorkloadError::Scenario(e) => write!(f, "invalid workload: {e}"),
        }
    }
}

impl std::error::Error for WorkloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkloadError::Io(e) => Some(e),
            WorkloadError::Json(e) => Some(e),
            WorkloadError::Scenario(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for WorkloadError {
    fn from(e: std::io::Error) -> Self {
        WorkloadError::Io(e)
    }
}

impl From<serde_json::Error> for WorkloadError {
    fn from(e: serde_json::Error) -> Self {
        WorkloadError::Json(e)
    }
}

impl From<ScenarioError> for WorkloadError {
    fn from(e: ScenarioError) -> Self {
        WorkloadError::Scenario(e)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkloadFile {
    max_ticks: Option<Tick>,
    nr_resources: Option<usize>,
    max_prio: Option<Prio>,
    processes: Vec<ProcessEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProcessEntry {
    pid: u32,
    #[serde(default)]
    start: Tick,
    lifespan: Tick,
    #[serde(default)]
    prio: Prio,
    #[serde(default)]
    acquire: Vec<AcquireEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AcquireEntry {
    resource: usize,
    at: Tick,
    duration: Tick,
}

impl From<ProcessEntry> for ProcessDef {
    fn from(e: ProcessEntry) -> Self {
        ProcessDef {
            pid: Pid(e.pid),
            start_tick: e.start,
            lifespan: e.lifespan,
            prio: e.prio,
            requests: e
                .acquire
                .into_iter()
                .map(|a| ResourceRequest {
                    resource: ResourceId(a.resource),
                    at: a.at,
                    duration: a.duration,
                })
                .collect(),
        }
    }
}

/// Parse a workload from a JSON string and validate it.
pub fn parse_workload(json: &str) -> Result<Scenario, WorkloadError> {
    let file: WorkloadFile = serde_json::from_str(json)?;

    let mut builder = Scenario::builder();
    if let Some(n) = file.nr_resources {
        builder = builder.resources(n);
    }
    if let Some(p) = file.max_prio {
        builder = builder.max_prio(p);
    }
    if let Some(t) = file.max_ticks {
        builder = builder.max_ticks(t);
    }
    for entry in file.processes {
        builder = builder.process(entry.into());
    }
    Ok(builder.build()?)
}

/// Read and parse a workload file.
pub fn load_workload(path: impl AsRef<Path>) -> Result<Scenario, WorkloadError> {
    let json = std::fs::read_to_string(path)?;
    parse_workload(&json)
}
