use tracing::trace;

use crate::context::SchedCtx;
use crate::policy::{Policy, PolicyError};
use crate::types::{Pid, ResourceId, Tick};

use super::common::{fifo_acquire, pick_max_prio, prio_release, runnable_current};

/// Priority scheduling with aging.
///
/// Once per tick, before selection, every ready process gains one level of
/// `prio`. The running process then rejoins at the ready queue tail and the
/// highest `prio` wins, ties to the earliest queued. The winner's aging
/// credit is spent: its `prio` drops back to `prio_orig`.
#[derive(Debug, Default, Clone)]
pub struct PriorityAging {
    /// Tick of the last aging pass. `schedule` is re-entered within a tick
    /// after a failed acquire and must not age twice.
    last_aged: Option<Tick>,
}

impl PriorityAging {
    pub fn new() -> Self {
        Self::default()
    }

    fn age_ready(&mut self, ctx: &mut SchedCtx) {
        let now = ctx.ticks();
        if self.last_aged == Some(now) {
            return;
        }
        self.last_aged = Some(now);
        for pid in ctx.readyqueue.pids() {
            let p = ctx.process_mut(pid);
            p.prio = p.prio.saturating_add(1);
            trace!(pid = pid.0, prio = p.prio, "aged");
        }
    }
}

impl Policy for PriorityAging {
    fn name(&self) -> &'static str {
        "Priority + aging"
    }

    fn initialize(&mut self, _ctx: &mut SchedCtx) -> Result<(), PolicyError> {
        self.last_aged = None;
        Ok(())
    }

    fn schedule(&mut self, ctx: &mut SchedCtx) -> Option<Pid> {
        self.age_ready(ctx);
        if let Some(cur) = runnable_current(ctx) {
            ctx.requeue_tail(cur);
        }
        let next = pick_max_prio(ctx)?;
        let p = ctx.process_mut(next);
        p.prio = p.prio_orig;
        Some(next)
    }

    fn acquire(&mut self, ctx: &mut SchedCtx, resource: ResourceId) -> bool {
        fifo_acquire(ctx, resource)
    }

    fn release(&mut self, ctx: &mut SchedCtx, resource: ResourceId) {
        prio_release(ctx, resource)
    }
}
