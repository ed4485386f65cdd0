//! Machinery shared by several policies.
//!
//! The FIFO resource discipline is the baseline every non-priority policy
//! delegates to. The priority-ordered release is shared by Priority,
//! Priority+Aging, PCP and PIP.

use std::cmp::Reverse;

use tracing::{debug, trace};

use crate::context::SchedCtx;
use crate::process::{Process, ProcessStatus};
use crate::queue::ProcQueue;
use crate::types::{Pid, ResourceId};

/// The current process if it should keep contending for the CPU: present,
/// not Blocked, and with lifetime left.
pub(crate) fn runnable_current(ctx: &SchedCtx) -> Option<Pid> {
    let p = ctx.current_process()?;
    if p.is_blocked() || !p.has_remaining() {
        return None;
    }
    Some(p.pid())
}

/// Pop the ready queue head.
pub(crate) fn pick_head(ctx: &mut SchedCtx) -> Option<Pid> {
    ctx.readyqueue.pop_front()
}

/// First process in `queue` with the smallest key.
pub(crate) fn find_first_min<K, F>(ctx: &SchedCtx, queue: &ProcQueue, key: F) -> Option<Pid>
where
    K: Ord,
    F: Fn(&Process) -> K,
{
    // min_by_key keeps the first of equal minima.
    queue.iter().min_by_key(|&pid| key(ctx.process(pid)))
}

/// First process in `queue` with the highest `prio`.
pub(crate) fn find_max_prio(ctx: &SchedCtx, queue: &ProcQueue) -> Option<Pid> {
    find_first_min(ctx, queue, |p| Reverse(p.prio))
}

/// Detach the first ready process with the smallest key.
pub(crate) fn pick_first_min<K, F>(ctx: &mut SchedCtx, key: F) -> Option<Pid>
where
    K: Ord,
    F: Fn(&Process) -> K,
{
    let pid = find_first_min(ctx, &ctx.readyqueue, key)?;
    ctx.take_ready(pid);
    Some(pid)
}

/// Detach the earliest-queued ready process with the highest `prio`.
pub(crate) fn pick_max_prio(ctx: &mut SchedCtx) -> Option<Pid> {
    let pid = find_max_prio(ctx, &ctx.readyqueue)?;
    ctx.take_ready(pid);
    Some(pid)
}

fn requester(ctx: &SchedCtx) -> Pid {
    ctx.current
        .unwrap_or_else(|| panic!("resource request without a current process"))
}

/// Take `resource` for the current process if it is free.
///
/// Returns the requester when ownership was granted; otherwise blocks the
/// requester at the wait queue tail and returns `None`.
pub(crate) fn grant_or_block(ctx: &mut SchedCtx, resource: ResourceId) -> Option<Pid> {
    let pid = requester(ctx);
    let r = ctx.resource_mut(resource);
    if r.is_free() {
        r.owner = Some(pid);
        trace!(pid = pid.0, resource = resource.0, "resource granted");
        return Some(pid);
    }
    let owner = r.owner;
    r.waitqueue.push_back(pid);
    ctx.process_mut(pid).status = ProcessStatus::Blocked;
    debug!(
        pid = pid.0,
        resource = resource.0,
        owner = ?owner.map(|p| p.0),
        "blocked on resource"
    );
    None
}

/// FCFS acquire: grant if free, else block at the wait queue tail.
pub(crate) fn fifo_acquire(ctx: &mut SchedCtx, resource: ResourceId) -> bool {
    grant_or_block(ctx, resource).is_some()
}

/// Clear ownership of `resource`.
///
/// # Panics
/// Panics unless the current process owns it.
pub(crate) fn disown(ctx: &mut SchedCtx, resource: ResourceId) -> Pid {
    let pid = requester(ctx);
    let r = ctx.resource_mut(resource);
    assert!(
        r.is_owned_by(pid),
        "pid {pid} releasing {resource} owned by {:?}",
        r.owner
    );
    r.owner = None;
    pid
}

/// Move `waiter` from the wait queue of `resource` to the ready queue tail.
///
/// # Panics
/// Panics if the waiter is not Blocked.
pub(crate) fn wake(ctx: &mut SchedCtx, resource: ResourceId, waiter: Pid) {
    assert_eq!(
        ctx.process(waiter).status,
        ProcessStatus::Blocked,
        "waking pid {waiter} which is not blocked"
    );
    ctx.resource_mut(resource).waitqueue.remove(waiter);
    ctx.requeue_tail(waiter);
    debug!(pid = waiter.0, resource = resource.0, "woke waiter");
}

/// FCFS release: wake the earliest-blocked waiter, if any.
pub(crate) fn fifo_release(ctx: &mut SchedCtx, resource: ResourceId) {
    disown(ctx, resource);
    if let Some(waiter) = ctx.resource(resource).waitqueue.front() {
        wake(ctx, resource, waiter);
    }
}

/// Wake the highest-priority waiter of `resource`, ties to the earliest
/// blocked. Ownership must already be cleared.
pub(crate) fn wake_max_prio(ctx: &mut SchedCtx, resource: ResourceId) {
    if let Some(waiter) = find_max_prio(ctx, &ctx.resource(resource).waitqueue) {
        wake(ctx, resource, waiter);
    }
}

/// Priority release: clear ownership and wake the highest-priority waiter.
pub(crate) fn prio_release(ctx: &mut SchedCtx, resource: ResourceId) {
    disown(ctx, resource);
    wake_max_prio(ctx, resource);
}

#[cfg(test)]
pub(crate) mod testing {
    //! Context builders for policy unit tests.

    use super::*;
    use crate::types::{Prio, Tick};

    /// (pid, lifespan, prio) triples enqueued in order.
    pub(crate) fn ctx_with(procs: &[(u32, Tick, Prio)]) -> SchedCtx {
        let mut ctx = SchedCtx::new(4, 100);
        for &(pid, lifespan, prio) in procs {
            ctx.add_process(Process::new(Pid(pid), lifespan, prio));
        }
        ctx
    }

    /// Make `pid` the running process, as the driver does after `schedule`.
    pub(crate) fn run(ctx: &mut SchedCtx, pid: Pid) {
        ctx.readyqueue.remove(pid);
        ctx.current = Some(pid);
        ctx.process_mut(pid).status = ProcessStatus::Running;
    }

    /// Adopt a policy decision the way the driver does.
    pub(crate) fn adopt(ctx: &mut SchedCtx, next: Option<Pid>) {
        ctx.current = next;
        if let Some(pid) = next {
            ctx.process_mut(pid).status = ProcessStatus::Running;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_find_max_prio_prefers_earliest_on_tie() {
        let ctx = ctx_with(&[(1, 5, 3), (2, 5, 7), (3, 5, 7), (4, 5, 1)]);
        assert_eq!(find_max_prio(&ctx, &ctx.readyqueue), Some(Pid(2)));
    }

    #[test]
    fn test_fifo_release_wakes_earliest_blocked() {
        let mut ctx = ctx_with(&[(1, 5, 0), (2, 5, 9), (3, 5, 0)]);
        let r = ResourceId(1);
        run(&mut ctx, Pid(1));
        assert!(fifo_acquire(&mut ctx, r));
        for pid in [Pid(3), Pid(2)] {
            run(&mut ctx, pid);
            assert!(!fifo_acquire(&mut ctx, r));
        }
        run(&mut ctx, Pid(1));
        fifo_release(&mut ctx, r);
        assert_eq!(ctx.resource(r).owner, None);
        assert_eq!(ctx.readyqueue.pids(), vec![Pid(3)]);
        assert_eq!(ctx.process(Pid(3)).status, ProcessStatus::Ready);
        assert_eq!(ctx.resource(r).waitqueue.pids(), vec![Pid(2)]);
    }

    #[test]
    fn test_release_with_no_waiters_touches_no_queue() {
        let mut ctx = ctx_with(&[(1, 5, 0), (2, 5, 0)]);
        let r = ResourceId(0);
        run(&mut ctx, Pid(1));
        assert!(fifo_acquire(&mut ctx, r));
        let ready_before = ctx.readyqueue.clone();
        prio_release(&mut ctx, r);
        assert!(ctx.resource(r).is_free());
        assert!(ctx.resource(r).waitqueue.is_empty());
        assert_eq!(ctx.readyqueue, ready_before);
        assert_eq!(ctx.process(Pid(1)).status, ProcessStatus::Running);
    }

    #[test]
    #[should_panic(expected = "releasing")]
    fn test_release_by_non_owner_panics() {
        let mut ctx = ctx_with(&[(1, 5, 0), (2, 5, 0)]);
        run(&mut ctx, Pid(1));
        assert!(fifo_acquire(&mut ctx, ResourceId(0)));
        ctx.process_mut(Pid(1)).status = ProcessStatus::Ready;
        run(&mut ctx, Pid(2));
        fifo_release(&mut ctx, ResourceId(0));
    }
}
