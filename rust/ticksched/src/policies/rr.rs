use crate::context::SchedCtx;
use crate::policy::Policy;
use crate::types::{Pid, ResourceId};

use super::common::{fifo_acquire, fifo_release, pick_head, runnable_current};

/// Round robin with a one-tick quantum.
///
/// A process that still has lifetime left goes to the ready queue tail
/// after every tick, and the head runs next.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundRobin;

impl Policy for RoundRobin {
    fn name(&self) -> &'static str {
        "Round-Robin"
    }

    fn schedule(&mut self, ctx: &mut SchedCtx) -> Option<Pid> {
        if let Some(cur) = runnable_current(ctx) {
            ctx.requeue_tail(cur);
        }
        pick_head(ctx)
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
    fn test_rotates_every_tick() {
        let mut ctx = ctx_with(&[(1, 3, 0), (2, 3, 0), (3, 3, 0)]);
        let mut order = Vec::new();
        for _ in 0..9 {
            let next = RoundRobin.schedule(&mut ctx);
            adopt(&mut ctx, next);
            let pid = next.unwrap();
            ctx.process_mut(pid).age += 1;
            order.push(pid.0);
            if ctx.process(pid).is_finished() {
                ctx.current = None;
                ctx.remove_process(pid);
            }
        }
        assert_eq!(order, vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_lone_process_keeps_running() {
        let mut ctx = ctx_with(&[(1, 3, 0)]);
        run(&mut ctx, Pid(1));
        assert_eq!(RoundRobin.schedule(&mut ctx), Some(Pid(1)));
        assert!(ctx.readyqueue.is_empty());
    }
}
