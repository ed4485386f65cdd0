use crate::context::SchedCtx;
use crate::policy::Policy;
use crate::types::{Pid, ResourceId};

use super::common::{fifo_acquire, fifo_release, pick_head, runnable_current};

/// First-come first-served.
///
/// The running process keeps the CPU until it finishes or blocks; the next
/// one is the ready queue head. Resources are granted in request order.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fcfs;

impl Policy for Fcfs {
    fn name(&self) -> &'static str {
        "FCFS"
    }

    fn schedule(&mut self, ctx: &mut SchedCtx) -> Option<Pid> {
        if let Some(pid) = runnable_current(ctx) {
            return Some(pid);
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
    use crate::process::ProcessStatus;

    #[test]
    fn test_picks_head_from_idle() {
        let mut ctx = ctx_with(&[(1, 3, 0), (2, 1, 50)]);
        let next = Fcfs.schedule(&mut ctx);
        assert_eq!(next, Some(Pid(1)));
        assert_eq!(ctx.readyqueue.pids(), vec![Pid(2)]);
    }

    #[test]
    fn test_keeps_running_process() {
        let mut ctx = ctx_with(&[(1, 3, 0), (2, 1, 50)]);
        run(&mut ctx, Pid(1));
        ctx.process_mut(Pid(1)).age = 2;
        assert_eq!(Fcfs.schedule(&mut ctx), Some(Pid(1)));
        assert_eq!(ctx.readyqueue.pids(), vec![Pid(2)]);
    }

    #[test]
    fn test_moves_on_when_current_blocks_or_finishes() {
        let mut ctx = ctx_with(&[(1, 3, 0), (2, 3, 0), (3, 3, 0)]);
        run(&mut ctx, Pid(1));
        assert!(Fcfs.acquire(&mut ctx, ResourceId(0)));
        run(&mut ctx, Pid(2));
        assert!(!Fcfs.acquire(&mut ctx, ResourceId(0)));
        assert_eq!(ctx.process(Pid(2)).status, ProcessStatus::Blocked);
        assert_eq!(Fcfs.schedule(&mut ctx), Some(Pid(3)));

        run(&mut ctx, Pid(3));
        ctx.process_mut(Pid(3)).age = 3;
        assert_eq!(Fcfs.schedule(&mut ctx), None);
    }
}
