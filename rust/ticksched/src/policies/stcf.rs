use tracing::debug;

use crate::context::SchedCtx;
use crate::policy::Policy;
use crate::process::ProcessStatus;
use crate::types::{Pid, ResourceId};

use super::common::{fifo_acquire, fifo_release, pick_first_min, runnable_current};

/// Shortest time-to-completion first (preemptive SJF).
///
/// Each tick the running process is compared against the ready queue by
/// remaining time (`lifespan - age`); the first ready process with strictly
/// less remaining time takes over and the running one goes to the tail.
/// A fresh pick (nothing running) uses the smallest *total* lifespan, as
/// SJF does.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stcf;

impl Policy for Stcf {
    fn name(&self) -> &'static str {
        "Shortest Time-to-Complete First"
    }

    fn schedule(&mut self, ctx: &mut SchedCtx) -> Option<Pid> {
        if let Some(cur) = runnable_current(ctx) {
            let remaining = ctx.process(cur).remaining();
            let shorter = ctx
                .readyqueue
                .iter()
                .find(|&pid| ctx.process(pid).remaining() < remaining);
            let Some(next) = shorter else {
                return Some(cur);
            };
            debug!(
                prev = cur.0,
                next = next.0,
                remaining,
                next_remaining = ctx.process(next).remaining(),
                "preempting for shorter remaining time"
            );
            ctx.requeue_tail(cur);
            ctx.take_ready(next);
            ctx.process_mut(next).status = ProcessStatus::Running;
            return Some(next);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::common::testing::*;

    #[test]
    fn test_preempts_for_strictly_shorter_remaining() {
        // Running: lifespan 6, age 2 => remaining 4. Ready: remaining 2.
        let mut ctx = ctx_with(&[(1, 6, 0), (2, 9, 0), (3, 2, 0)]);
        run(&mut ctx, Pid(1));
        ctx.process_mut(Pid(1)).age = 2;

        assert_eq!(Stcf.schedule(&mut ctx), Some(Pid(3)));
        assert_eq!(ctx.process(Pid(3)).status, ProcessStatus::Running);
        assert_eq!(ctx.process(Pid(1)).status, ProcessStatus::Ready);
        assert_eq!(ctx.readyqueue.pids(), vec![Pid(2), Pid(1)]);
    }

    #[test]
    fn test_equal_remaining_does_not_preempt() {
        let mut ctx = ctx_with(&[(1, 4, 0), (2, 2, 0)]);
        run(&mut ctx, Pid(1));
        ctx.process_mut(Pid(1)).age = 2;

        assert_eq!(Stcf.schedule(&mut ctx), Some(Pid(1)));
        assert_eq!(ctx.readyqueue.pids(), vec![Pid(2)]);
    }

    #[test]
    fn test_preempts_for_first_shorter_not_shortest() {
        let mut ctx = ctx_with(&[(1, 5, 0), (2, 4, 0), (3, 1, 0)]);
        run(&mut ctx, Pid(1));
        assert_eq!(Stcf.schedule(&mut ctx), Some(Pid(2)));
    }

    #[test]
    fn test_fresh_pick_uses_total_lifespan() {
        // Pid 1 has less remaining time but the larger total lifespan.
        let mut ctx = ctx_with(&[(1, 10, 0), (2, 4, 0)]);
        ctx.process_mut(Pid(1)).age = 9;
        assert_eq!(Stcf.schedule(&mut ctx), Some(Pid(2)));
    }
}
