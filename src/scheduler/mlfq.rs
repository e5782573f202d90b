use super::{Policy, Transition};
use crate::core::{SimCtx, SlotId, Units};
use crate::dispatch::DispatchReply;

/// Strict-priority multi-level feedback queue.
///
/// New work starts at level 0. Using a whole quantum demotes one level, down
/// to the lowest queue. Being interrupted by I/O resets to level 0. There is
/// no aging beyond that reset.
pub struct Mlfq;

impl Policy for Mlfq {
    fn init(_ctx: &mut SimCtx) -> Self {
        Self
    }

    fn admit(&mut self, ctx: &mut SimCtx, slot: SlotId) {
        let level = ctx.table.record(slot).level;
        ctx.queues.push(level, slot);
    }

    fn pick_next(&mut self, ctx: &mut SimCtx) -> Option<SlotId> {
        ctx.queues.pop_highest().map(|(level, slot)| {
            debug_assert_eq!(ctx.table.record(slot).level, level);
            slot
        })
    }

    fn quantum(&self, ctx: &SimCtx, slot: SlotId) -> Units {
        ctx.queues.quantum(ctx.table.record(slot).level)
    }

    fn stopping(&mut self, ctx: &mut SimCtx, slot: SlotId, reply: &DispatchReply) -> Transition {
        if reply.finished {
            return Transition::Done;
        }

        let lowest = ctx.queues.lowest();
        let record = ctx.table.record_mut(slot);
        if reply.interrupted {
            record.level = 0;
            return Transition::WaitIo { level: 0 };
        }

        let from = record.level;
        let to = (from + 1).min(lowest);
        record.level = to;
        ctx.queues.push(to, slot);
        Transition::Requeued { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{QueueSet, SimTime, WorkerId};

    fn ctx(levels: usize, slots: usize) -> SimCtx {
        SimCtx::new(slots, QueueSet::new(levels, 10).unwrap())
    }

    #[test]
    fn full_quantum_demotes_to_floor() {
        let mut ctx = ctx(3, 1);
        let mut mlfq = Mlfq::init(&mut ctx);
        ctx.table.occupy(0, WorkerId(1), SimTime::ZERO);
        mlfq.admit(&mut ctx, 0);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let slot = mlfq.pick_next(&mut ctx).unwrap();
            let q = mlfq.quantum(&ctx, slot);
            seen.push(q);
            let t = mlfq.stopping(&mut ctx, slot, &DispatchReply::full(WorkerId(1), q));
            assert!(matches!(t, Transition::Requeued { .. }));
        }

        assert_eq!(seen, vec![10, 20, 40]);
        assert_eq!(ctx.table.record(0).level, 2);
        assert_eq!(ctx.queues.queue(2).len(), 1);
    }

    #[test]
    fn interrupt_resets_level_and_leaves_queues() {
        let mut ctx = ctx(3, 1);
        let mut mlfq = Mlfq::init(&mut ctx);
        ctx.table.occupy(0, WorkerId(1), SimTime::ZERO);
        ctx.table.record_mut(0).level = 2;
        mlfq.admit(&mut ctx, 0);

        let slot = mlfq.pick_next(&mut ctx).unwrap();
        let t = mlfq.stopping(&mut ctx, slot, &DispatchReply::interrupted(WorkerId(1), 3));
        assert_eq!(t, Transition::WaitIo { level: 0 });
        assert_eq!(ctx.table.record(0).level, 0);
        assert!(ctx.queues.is_empty());
    }

    #[test]
    fn finished_is_not_requeued() {
        let mut ctx = ctx(1, 1);
        let mut mlfq = Mlfq::init(&mut ctx);
        ctx.table.occupy(0, WorkerId(1), SimTime::ZERO);
        mlfq.admit(&mut ctx, 0);

        let slot = mlfq.pick_next(&mut ctx).unwrap();
        let t = mlfq.stopping(&mut ctx, slot, &DispatchReply::finished(WorkerId(1), 0));
        assert_eq!(t, Transition::Done);
        assert!(ctx.queues.is_empty());
    }
}
