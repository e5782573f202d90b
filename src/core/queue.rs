use std::collections::VecDeque;

use super::clock::Units;
use super::state::{Level, SlotId};

/// FIFO of table slots for one priority level.
#[derive(Debug)]
pub struct ReadyQueue {
    slots: VecDeque<SlotId>,
    quantum: Units,
}

impl ReadyQueue {
    pub fn new(quantum: Units) -> Self {
        Self {
            slots: VecDeque::new(),
            quantum,
        }
    }

    pub fn quantum(&self) -> Units {
        self.quantum
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.slots.contains(&slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.slots.iter().copied()
    }

    fn push_back(&mut self, slot: SlotId) {
        self.slots.push_back(slot);
    }

    fn pop_front(&mut self) -> Option<SlotId> {
        self.slots.pop_front()
    }

    fn remove(&mut self, slot: SlotId) -> bool {
        match self.slots.iter().position(|&s| s == slot) {
            Some(pos) => {
                self.slots.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// One ready queue per priority level. Level `i` grants
/// `quantum_factor * 2^i` units per dispatch.
#[derive(Debug)]
pub struct QueueSet {
    queues: Vec<ReadyQueue>,
}

impl QueueSet {
    /// Returns `None` if `levels` is zero or the deepest quantum overflows.
    pub fn new(levels: usize, quantum_factor: Units) -> Option<Self> {
        if levels == 0 {
            return None;
        }

        let mut queues = Vec::with_capacity(levels);
        for level in 0..levels {
            let scale = 1u64.checked_shl(u32::try_from(level).ok()?)?;
            queues.push(ReadyQueue::new(quantum_factor.checked_mul(scale)?));
        }

        Some(Self { queues })
    }

    pub fn levels(&self) -> usize {
        self.queues.len()
    }

    pub fn lowest(&self) -> Level {
        self.queues.len() - 1
    }

    pub fn quantum(&self, level: Level) -> Units {
        self.queues[level].quantum()
    }

    pub fn queue(&self, level: Level) -> &ReadyQueue {
        &self.queues[level]
    }

    pub fn queues(&self) -> &[ReadyQueue] {
        &self.queues
    }

    pub fn push(&mut self, level: Level, slot: SlotId) {
        debug_assert!(
            !self.contains(slot),
            "Slot {slot} already present in some queue"
        );
        self.queues[level].push_back(slot);
    }

    /// Pop from the highest-priority non-empty level.
    pub fn pop_highest(&mut self) -> Option<(Level, SlotId)> {
        self.queues
            .iter_mut()
            .enumerate()
            .find_map(|(level, q)| q.pop_front().map(|slot| (level, slot)))
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.queues.iter().any(|q| q.contains(slot))
    }

    pub fn remove(&mut self, slot: SlotId) -> bool {
        self.queues.iter_mut().any(|q| q.remove(slot))
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(ReadyQueue::is_empty)
    }

    pub fn len(&self) -> usize {
        self.queues.iter().map(ReadyQueue::len).sum()
    }
}
