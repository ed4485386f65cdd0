use tracing::debug;

use crate::context::SchedCtx;
use crate::policy::{Policy, PolicyError};
use crate::types::{Pid, ResourceId};

use super::common::{disown, grant_or_block, pick_max_prio, runnable_current, wake_max_prio};

/// Priority scheduling with the priority ceiling protocol.
///
/// A process that takes a resource runs at `MAX_PRIO` until it releases
/// it, so no ready process can keep a resource holder off the CPU.
/// Scheduling requeues the running process at the tail and picks the
/// highest `prio`, ties to the earliest queued.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pcp;

impl Policy for Pcp {
    fn name(&self) -> &'static str {
        "Priority + PCP Protocol"
    }

    fn initialize(&mut self, ctx: &mut SchedCtx) -> Result<(), PolicyError> {
        if ctx.max_prio() == 0 {
            return Err(PolicyError::Config(
                "priority ceiling requires max_prio > 0".into(),
            ));
        }
        Ok(())
    }

    fn schedule(&mut self, ctx: &mut SchedCtx) -> Option<Pid> {
        if let Some(cur) = runnable_current(ctx) {
            ctx.requeue_tail(cur);
        }
        pick_max_prio(ctx)
    }

    fn acquire(&mut self, ctx: &mut SchedCtx, resource: ResourceId) -> bool {
        let Some(owner) = grant_or_block(ctx, resource) else {
            return false;
        };
        let ceiling = ctx.max_prio();
        ctx.process_mut(owner).prio = ceiling;
        debug!(pid = owner.0, resource = resource.0, prio = ceiling, "raised to ceiling");
        true
    }

    fn release(&mut self, ctx: &mut SchedCtx, resource: ResourceId) {
        let owner = disown(ctx, resource);
        let p = ctx.process_mut(owner);
        p.prio = p.prio_orig;
        debug!(pid = owner.0, resource = resource.0, prio = p.prio, "ceiling dropped");
        wake_max_prio(ctx, resource);
    }
}
