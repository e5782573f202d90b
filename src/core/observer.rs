use super::queue::QueueSet;
use super::state::{ProcessTable, WorkerState};

/// Cross-checks the process table against the ready queues once per cycle.
#[derive(Debug, Default)]
pub struct Observer {
    cycle: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self { cycle: 0 }
    }

    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    pub fn observe(&mut self, table: &ProcessTable, queues: &QueueSet) {
        self.cycle += 1;

        debug_assert!(
            table.running().is_none(),
            "Slot {:?} still running between cycles",
            table.running()
        );

        for (level, queue) in queues.queues().iter().enumerate() {
            for slot in queue.iter() {
                debug_assert_eq!(
                    table.state(slot),
                    WorkerState::Ready,
                    "Slot {slot} in queue {level} must be Ready"
                );
                debug_assert_eq!(
                    table.record(slot).level,
                    level,
                    "Slot {slot} filed in queue {level} but records another level"
                );
            }
        }

        for slot in table.occupied() {
            let record = table.record(slot);
            debug_assert!(
                record.level < queues.levels(),
                "Slot {slot} level {} out of range",
                record.level
            );
            if !record.waiting_on_io {
                debug_assert!(
                    queues.contains(slot),
                    "Ready slot {slot} missing from every queue"
                );
            }
        }

        debug_assert!(
            queues.len() <= table.occupied_count(),
            "More queued entries than occupied slots"
        );
    }
}
