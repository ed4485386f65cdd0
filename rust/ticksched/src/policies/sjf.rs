use crate::context::SchedCtx;
use crate::policy::Policy;
use crate::types::{Pid, ResourceId};

use super::common::{fifo_acquire, fifo_release, pick_first_min, runnable_current};

/// Shortest job first, non-preemptive.
///
/// New picks go to the ready process with the smallest total lifespan;
/// equal lifespans keep queue order.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sjf;

impl Policy for Sjf {
    fn name(&self) -> &'static str {
        "Shortest-Job First"
    }

    fn schedule(&mut self, ctx: &mut SchedCtx) -> Option<Pid> {
        if let Some(pid) = runnable_current(ctx) {
            return Some(pid);
        }
        pick_first_min(ctx, |p| p.lifespan())
    }

    fn acquire(&mut self, ctx: &mut SchedCtx, resource: ResourceId) -> bool {
        fifo_acquire(ctx, resource)
    }

    fn release(&mut self, ctx: &mut SchedCtx, resource: ResourceId) {
        fifo_release(ctx, resource)
    }
}
