use tracing::debug;

use crate::context::SchedCtx;
use crate::policy::Policy;
use crate::types::{Pid, Prio, ResourceId};

use super::common::{disown, grant_or_block, wake_max_prio};
use super::prio::schedule_preemptive;

/// Priority scheduling with the priority inheritance protocol.
///
/// A resource owner runs at the highest priority among the processes
/// waiting on anything it holds, never below its own `prio_orig`. When the
/// owner is itself blocked, the donation is passed on to whoever holds
/// that resource, and so on down the chain. The effective priority is
/// recomputed whenever the set of waiters or held resources changes, so a
/// release drops exactly the donations that came through that resource.
///
/// Scheduling is the preemptive priority continuation of [`Priority`]:
/// the running process keeps the CPU unless a ready process has strictly
/// higher `prio`.
///
/// [`Priority`]: super::Priority
#[derive(Debug, Default, Clone, Copy)]
pub struct Pip;

/// `prio_orig` raised to the highest waiter over every resource `pid` owns.
fn effective_prio(ctx: &SchedCtx, pid: Pid) -> Prio {
    ctx.resources()
        .filter(|(_, r)| r.is_owned_by(pid))
        .flat_map(|(_, r)| r.waitqueue.iter())
        .map(|waiter| ctx.process(waiter).prio)
        .fold(ctx.process(pid).prio_orig, Prio::max)
}

/// Recompute `pid`'s priority and carry the change along the chain of
/// blocked owners.
fn propagate(ctx: &mut SchedCtx, mut pid: Pid) {
    // A chain cannot be longer than the number of live processes; the
    // bound also stops a wait-for cycle from spinning forever.
    for _ in 0..ctx.nr_processes() {
        let prio = effective_prio(ctx, pid);
        let p = ctx.process_mut(pid);
        if p.prio == prio {
            return;
        }
        debug!(pid = pid.0, from = p.prio, to = prio, "inherited priority");
        p.prio = prio;

        let Some(next) = ctx
            .blocked_on(pid)
            .and_then(|resource| ctx.resource(resource).owner)
        else {
            return;
        };
        pid = next;
    }
}

impl Policy for Pip {
    fn name(&self) -> &'static str {
        "Priority + PIP Protocol"
    }

    fn schedule(&mut self, ctx: &mut SchedCtx) -> Option<Pid> {
        schedule_preemptive(ctx)
    }

    fn acquire(&mut self, ctx: &mut SchedCtx, resource: ResourceId) -> bool {
        match grant_or_block(ctx, resource) {
            Some(owner) => {
                // Processes may still be queued from before a wakeup; the
                // new owner inherits from them.
                propagate(ctx, owner);
                true
            }
            None => {
                if let Some(owner) = ctx.resource(resource).owner {
                    propagate(ctx, owner);
                }
                false
            }
        }
    }

    fn release(&mut self, ctx: &mut SchedCtx, resource: ResourceId) {
        let owner = disown(ctx, resource);
        wake_max_prio(ctx, resource);
        propagate(ctx, owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::common::testing::*;
    use crate::process::ProcessStatus;

    #[test]
    fn test_owner_inherits_waiter_priority_and_restores() {
        let mut ctx = ctx_with(&[(1, 9, 1), (2, 9, 7), (3, 9, 4)]);
        let r = ResourceId(0);
        run(&mut ctx, Pid(1));
        assert!(Pip.acquire(&mut ctx, r));
        assert_eq!(ctx.process(Pid(1)).prio, 1);
        ctx.requeue_tail(Pid(1));

        run(&mut ctx, Pid(2));
        assert!(!Pip.acquire(&mut ctx, r));
        assert_eq!(ctx.process(Pid(1)).prio, 7);

        // Pid 1 now outranks pid 3 and gets picked back.
        assert_eq!(Pip.schedule(&mut ctx), Some(Pid(1)));
        adopt(&mut ctx, Some(Pid(1)));

        Pip.release(&mut ctx, r);
        assert_eq!(ctx.process(Pid(1)).prio, 1);
        assert_eq!(ctx.process(Pid(2)).status, ProcessStatus::Ready);
        assert_eq!(Pip.schedule(&mut ctx), Some(Pid(2)));
    }

    #[test]
    fn test_inherits_only_what_was_donated() {
        // Pid 1 holds R0 and R1; pid 2 (prio 5) waits on R0, pid 3 (prio 8)
        // on R1. Releasing R1 leaves the R0 donation in place.
        let mut ctx = ctx_with(&[(1, 9, 1), (2, 9, 5), (3, 9, 8)]);
        run(&mut ctx, Pid(1));
        assert!(Pip.acquire(&mut ctx, ResourceId(0)));
        assert!(Pip.acquire(&mut ctx, ResourceId(1)));
        run(&mut ctx, Pid(2));
        assert!(!Pip.acquire(&mut ctx, ResourceId(0)));
        run(&mut ctx, Pid(3));
        assert!(!Pip.acquire(&mut ctx, ResourceId(1)));
        assert_eq!(ctx.process(Pid(1)).prio, 8);

        run(&mut ctx, Pid(1));
        Pip.release(&mut ctx, ResourceId(1));
        assert_eq!(ctx.process(Pid(1)).prio, 5);
        Pip.release(&mut ctx, ResourceId(0));
        assert_eq!(ctx.process(Pid(1)).prio, 1);
    }

    #[test]
    fn test_donation_is_transitive() {
        // Pid 1 holds R0. Pid 2 holds R1 and blocks on R0. Pid 3 (prio 9)
        // blocks on R1: both pid 2 and pid 1 must rise to 9.
        let mut ctx = ctx_with(&[(1, 9, 1), (2, 9, 2), (3, 9, 9)]);
        run(&mut ctx, Pid(1));
        assert!(Pip.acquire(&mut ctx, ResourceId(0)));
        run(&mut ctx, Pid(2));
        assert!(Pip.acquire(&mut ctx, ResourceId(1)));
        assert!(!Pip.acquire(&mut ctx, ResourceId(0)));
        assert_eq!(ctx.process(Pid(1)).prio, 2);

        run(&mut ctx, Pid(3));
        assert!(!Pip.acquire(&mut ctx, ResourceId(1)));
        assert_eq!(ctx.process(Pid(2)).prio, 9);
        assert_eq!(ctx.process(Pid(1)).prio, 9);

        run(&mut ctx, Pid(1));
        Pip.release(&mut ctx, ResourceId(0));
        assert_eq!(ctx.process(Pid(1)).prio, 1);
        // Pid 2 still holds R1 with pid 3 waiting.
        assert_eq!(ctx.process(Pid(2)).prio, 9);
        assert_eq!(ctx.process(Pid(2)).status, ProcessStatus::Ready);
    }

    #[test]
    fn test_new_owner_inherits_from_remaining_waiters() {
        let mut ctx = ctx_with(&[(1, 9, 1), (2, 9, 3), (3, 9, 6), (4, 9, 2)]);
        let r = ResourceId(0);
        run(&mut ctx, Pid(1));
        assert!(Pip.acquire(&mut ctx, r));
        for pid in [Pid(2), Pid(3)] {
            run(&mut ctx, pid);
            assert!(!Pip.acquire(&mut ctx, r));
        }
        run(&mut ctx, Pid(1));
        Pip.release(&mut ctx, r);

        // Pid 3 was woken; pid 4 grabs the resource first and inherits
        // from pid 2 still waiting.
        run(&mut ctx, Pid(4));
        assert!(Pip.acquire(&mut ctx, r));
        assert_eq!(ctx.process(Pid(4)).prio, 3);
    }
}
