//! Contended resource records.

use crate::queue::ProcQueue;
use crate::types::Pid;

/// One entry of the fixed resource table.
///
/// At most one owner at a time. The wait queue holds Blocked processes in
/// the order the active policy put them there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    pub owner: Option<Pid>,
    pub waitqueue: ProcQueue,
}

impl Resource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_free(&self) -> bool {
        self.owner.is_none()
    }

    pub fn is_owned_by(&self, pid: Pid) -> bool {
        self.owner == Some(pid)
    }
}
