use tracing::debug;

use crate::context::SchedCtx;
use crate::policy::Policy;
use crate::types::{Pid, ResourceId};

use super::common::{fifo_acquire, find_max_prio, pick_max_prio, prio_release, runnable_current};

/// Preemptive priority scheduling.
///
/// The running process competes with the ready queue every tick as if it
/// were queued at the head: it is preempted only by a strictly higher
/// `prio`, and among ready processes the earliest queued wins a tie.
/// Wait queues are served highest `prio` first.
#[derive(Debug, Default, Clone, Copy)]
pub struct Priority;

/// Preemptive max-priority continuation shared with PIP.
pub(crate) fn schedule_preemptive(ctx: &mut SchedCtx) -> Option<Pid> {
    let Some(cur) = runnable_current(ctx) else {
        return pick_max_prio(ctx);
    };
    let Some(best) = find_max_prio(ctx, &ctx.readyqueue) else {
        return Some(cur);
    };
    if ctx.process(best).prio <= ctx.process(cur).prio {
        return Some(cur);
    }
    debug!(
        prev = cur.0,
        next = best.0,
        prev_prio = ctx.process(cur).prio,
        next_prio = ctx.process(best).prio,
        "preempting for higher priority"
    );
    ctx.take_ready(best);
    ctx.requeue_head(cur);
    Some(best)
}

impl Policy for Priority {
    fn name(&self) -> &'static str {
        "Priority"
    }

    fn schedule(&mut self, ctx: &mut SchedCtx) -> Option<Pid> {
        schedule_preemptive(ctx)
    }

    fn acquire(&mut self, ctx: &mut SchedCtx, resource: ResourceId) -> bool {
        fifo_acquire(ctx, resource)
    }

    fn release(&mut self, ctx: &mut SchedCtx, resource: ResourceId) {
        prio_release(ctx, resource)
    }
}
