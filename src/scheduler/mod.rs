pub mod mlfq;

use crate::core::{Level, SimCtx, SlotId, Units};
use crate::dispatch::DispatchReply;
pub use mlfq::Mlfq;

/// Where a worker goes after its burst has been accounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Done,
    /// Blocked on I/O until the driver-assigned completion time.
    WaitIo { level: Level },
    Requeued { from: Level, to: Level },
}

pub trait Policy {
    fn init(ctx: &mut SimCtx) -> Self;

    /// File a newly admitted slot.
    fn admit(&mut self, ctx: &mut SimCtx, slot: SlotId);

    /// Take the next slot to run from the ready queues, if any.
    fn pick_next(&mut self, ctx: &mut SimCtx) -> Option<SlotId>;

    fn quantum(&self, ctx: &SimCtx, slot: SlotId) -> Units;

    /// Apply the outcome of a completed dispatch to `slot`'s level and queue
    /// membership.
    fn stopping(&mut self, ctx: &mut SimCtx, slot: SlotId, reply: &DispatchReply) -> Transition;

    /// Drop `slot` from any queue it still sits in (forced teardown).
    fn evict(&mut self, ctx: &mut SimCtx, slot: SlotId) {
        ctx.queues.remove(slot);
    }
}
