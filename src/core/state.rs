use std::fmt;

use super::clock::{SimTime, Units};
use super::queue::QueueSet;

// Index into the process table
pub type SlotId = usize;
// Queue index, 0 is the highest priority
pub type Level = usize;

/// External identity of a worker. Never reused within a run, unlike slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Free,
    Ready,
    Running,
    WaitingIo,
}

/// Where a clock advance is charged for the slot that was picked this cycle.
/// Every other occupied slot is charged as ready-wait or I/O wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charge {
    Overhead,
    Burst,
}

#[derive(Debug, Clone)]
pub struct ProcessRecord {
    /// Current occupant, or the last one once the slot is freed.
    pub worker: Option<WorkerId>,
    pub exists: bool,
    pub waiting_on_io: bool,
    pub level: Level,
    pub last_burst: Units,
    pub cumulative_wait: SimTime,
    pub io_completion: SimTime,
    pub start_time: SimTime,
    pub cpu_time: SimTime,
    pub io_wait: SimTime,
    pub dispatch_overhead: SimTime,
}

impl ProcessRecord {
    fn empty() -> Self {
        Self {
            worker: None,
            exists: false,
            waiting_on_io: false,
            level: 0,
            last_burst: 0,
            cumulative_wait: SimTime::ZERO,
            io_completion: SimTime::ZERO,
            start_time: SimTime::ZERO,
            cpu_time: SimTime::ZERO,
            io_wait: SimTime::ZERO,
            dispatch_overhead: SimTime::ZERO,
        }
    }

    /// Everything charged to this slot since admission. Equals the time in
    /// system as long as the slot was charged on every clock advance.
    pub fn time_accounted(&self) -> Units {
        self.cpu_time.combined()
            + self.cumulative_wait.combined()
            + self.io_wait.combined()
            + self.dispatch_overhead.combined()
    }
}

#[derive(Debug)]
pub struct ProcessTable {
    records: Vec<ProcessRecord>,
    running: Option<SlotId>,
}

impl ProcessTable {
    pub fn new(slots: usize) -> Self {
        Self {
            records: (0..slots).map(|_| ProcessRecord::empty()).collect(),
            running: None,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, slot: SlotId) -> &ProcessRecord {
        &self.records[slot]
    }

    pub fn record_mut(&mut self, slot: SlotId) -> &mut ProcessRecord {
        &mut self.records[slot]
    }

    pub fn records(&self) -> &[ProcessRecord] {
        &self.records
    }

    pub fn running(&self) -> Option<SlotId> {
        self.running
    }

    pub fn state(&self, slot: SlotId) -> WorkerState {
        let record = &self.records[slot];
        if !record.exists {
            WorkerState::Free
        } else if self.running == Some(slot) {
            WorkerState::Running
        } else if record.waiting_on_io {
            WorkerState::WaitingIo
        } else {
            WorkerState::Ready
        }
    }

    pub fn free_slot(&self) -> Option<SlotId> {
        self.records.iter().position(|r| !r.exists)
    }

    pub fn occupied(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.exists)
            .map(|(slot, _)| slot)
    }

    pub fn occupied_count(&self) -> usize {
        self.records.iter().filter(|r| r.exists).count()
    }

    pub fn slot_of(&self, worker: WorkerId) -> Option<SlotId> {
        self.records
            .iter()
            .position(|r| r.exists && r.worker == Some(worker))
    }

    /// Reset `slot` for a newly admitted worker starting at `now`.
    pub fn occupy(&mut self, slot: SlotId, worker: WorkerId, now: SimTime) {
        let record = &mut self.records[slot];
        debug_assert!(!record.exists, "Slot {slot} already occupied");

        *record = ProcessRecord {
            worker: Some(worker),
            exists: true,
            start_time: now,
            ..ProcessRecord::empty()
        };
    }

    pub fn release(&mut self, slot: SlotId) {
        debug_assert_ne!(self.running, Some(slot), "Releasing running slot {slot}");
        let record = &mut self.records[slot];
        record.exists = false;
        record.waiting_on_io = false;
    }

    pub fn set_running(&mut self, slot: SlotId) {
        debug_assert!(
            self.running.is_none(),
            "Slot {:?} already running",
            self.running
        );
        debug_assert!(self.records[slot].exists, "Running free slot {slot}");
        self.running = Some(slot);
    }

    pub fn clear_running(&mut self) {
        self.running = None;
    }

    /// First slot flagged as waiting on I/O whose completion time has passed.
    pub fn io_returned(&self, now: SimTime) -> Option<SlotId> {
        self.records
            .iter()
            .position(|r| r.exists && r.waiting_on_io && now.at_least(&r.io_completion))
    }

    /// Charge `delta` to every occupied slot: `picked` gets it as `charge`,
    /// the rest as I/O wait or ready-wait depending on their flag.
    pub fn charge(&mut self, delta: Units, picked: Option<(SlotId, Charge)>) {
        for (slot, record) in self.records.iter_mut().enumerate() {
            if !record.exists {
                continue;
            }

            match picked {
                Some((p, Charge::Overhead)) if p == slot => record.dispatch_overhead.advance(delta),
                Some((p, Charge::Burst)) if p == slot => record.cpu_time.advance(delta),
                _ if record.waiting_on_io => record.io_wait.advance(delta),
                _ => record.cumulative_wait.advance(delta),
            }
        }
    }
}

/// Everything the scheduler mutates: the clock, the table and the queues.
/// Owned by the driver and lent to the policy; workers never see it.
#[derive(Debug)]
pub struct SimCtx {
    pub now: SimTime,
    pub table: ProcessTable,
    pub queues: QueueSet,
}

impl SimCtx {
    pub fn new(slots: usize, queues: QueueSet) -> Self {
        Self {
            now: SimTime::ZERO,
            table: ProcessTable::new(slots),
            queues,
        }
    }

    /// Advance the clock and charge the elapsed units to every occupied slot.
    pub fn advance_time(&mut self, delta: Units, picked: Option<(SlotId, Charge)>) {
        self.now.advance(delta);
        self.table.charge(delta, picked);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupy_resets_previous_occupant() {
        let mut table = ProcessTable::new(2);
        table.occupy(1, WorkerId(7), SimTime::new(0, 10));
        table.record_mut(1).level = 3;
        table.record_mut(1).cumulative_wait.advance(99);
        table.release(1);

        assert_eq!(table.free_slot(), Some(0));
        table.occupy(1, WorkerId(8), SimTime::new(1, 0));
        let r = table.record(1);
        assert_eq!(r.worker, Some(WorkerId(8)));
        assert_eq!(r.level, 0);
        assert_eq!(r.cumulative_wait, SimTime::ZERO);
        assert_eq!(r.start_time, SimTime::new(1, 0));
    }

    #[test]
    fn free_slot_none_when_full() {
        let mut table = ProcessTable::new(1);
        table.occupy(0, WorkerId(1), SimTime::ZERO);
        assert_eq!(table.free_slot(), None);
        table.release(0);
        assert_eq!(table.free_slot(), Some(0));
    }

    #[test]
    fn state_tracks_flags() {
        let mut table = ProcessTable::new(3);
        table.occupy(0, WorkerId(1), SimTime::ZERO);
        table.occupy(1, WorkerId(2), SimTime::ZERO);
        table.record_mut(1).waiting_on_io = true;
        table.set_running(0);

        assert_eq!(table.state(0), WorkerState::Running);
        assert_eq!(table.state(1), WorkerState::WaitingIo);
        assert_eq!(table.state(2), WorkerState::Free);
        table.clear_running();
        assert_eq!(table.state(0), WorkerState::Ready);
    }

    #[test]
    fn io_returned_requires_completion_time() {
        let mut table = ProcessTable::new(2);
        table.occupy(1, WorkerId(1), SimTime::ZERO);
        let r = table.record_mut(1);
        r.waiting_on_io = true;
        r.io_completion = SimTime::new(0, 500);

        assert_eq!(table.io_returned(SimTime::new(0, 499)), None);
        assert_eq!(table.io_returned(SimTime::new(0, 500)), Some(1));
    }

    #[test]
    fn charge_splits_by_role() {
        let mut table = ProcessTable::new(3);
        for slot in 0..3 {
            table.occupy(slot, WorkerId(slot as u64), SimTime::ZERO);
        }
        table.record_mut(2).waiting_on_io = true;

        table.charge(10, Some((0, Charge::Overhead)));
        table.charge(40, Some((0, Charge::Burst)));
        table.charge(5, None);

        assert_eq!(table.record(0).dispatch_overhead.combined(), 10);
        assert_eq!(table.record(0).cpu_time.combined(), 40);
        assert_eq!(table.record(0).cumulative_wait.combined(), 5);
        assert_eq!(table.record(1).cumulative_wait.combined(), 55);
        assert_eq!(table.record(2).io_wait.combined(), 55);
        for slot in 0..3 {
            assert_eq!(table.record(slot).time_accounted(), 55);
        }
    }
}
