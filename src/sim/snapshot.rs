use std::fmt;

use crate::core::{ProcessRecord, SimCtx, SimTime, SlotId, WorkerId};

/// Read-only copy of the scheduler state taken between cycles.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub now: SimTime,
    pub records: Vec<ProcessRecord>,
    /// Slot ids per level, front of the queue first.
    pub queues: Vec<Vec<SlotId>>,
    /// Slot dispatched in the last cycle, if any.
    pub scheduled: Option<SlotId>,
}

impl StatusSnapshot {
    pub fn capture(ctx: &SimCtx, scheduled: Option<SlotId>) -> Self {
        Self {
            now: ctx.now,
            records: ctx.table.records().to_vec(),
            queues: ctx
                .queues
                .queues()
                .iter()
                .map(|q| q.iter().collect())
                .collect(),
            scheduled,
        }
    }

    fn worker(&self, slot: SlotId) -> WorkerId {
        self.records[slot].worker.unwrap_or(WorkerId(0))
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Process table:")?;
        for (slot, r) in self.records.iter().enumerate() {
            write!(f, "{slot:2} |")?;
            if r.exists {
                write!(
                    f,
                    "worker {:<6}|in system {:>14} |waiting {:>14}",
                    self.worker(slot),
                    SimTime::from_units(self.now.since(&r.start_time)),
                    r.cumulative_wait
                )?;
                if r.waiting_on_io {
                    write!(f, " *waiting on I/O*")?;
                }
            }
            writeln!(f)?;
        }

        write!(f, "I/O wait:")?;
        for (slot, r) in self.records.iter().enumerate() {
            if r.exists && r.waiting_on_io {
                write!(f, " |{}|", self.worker(slot))?;
            }
        }
        writeln!(f)?;

        for (level, queue) in self.queues.iter().enumerate() {
            write!(f, "Queue {level}:")?;
            for &slot in queue {
                write!(f, " |{}|", self.worker(slot))?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Simulated time: {}", self.now)?;
        write!(f, "Scheduled: ")?;
        match self.scheduled {
            Some(slot) => {
                write!(f, "|{}|", self.worker(slot))?;
                let r = &self.records[slot];
                if !r.exists {
                    write!(f, " *Finished*")?;
                } else if r.waiting_on_io {
                    write!(f, " *I/O*")?;
                }
                Ok(())
            }
            None => write!(f, "None"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::QueueSet;

    #[test]
    fn renders_queues_and_markers() {
        let mut ctx = SimCtx::new(3, QueueSet::new(2, 10).unwrap());
        ctx.table.occupy(0, WorkerId(11), SimTime::ZERO);
        ctx.table.occupy(1, WorkerId(12), SimTime::ZERO);
        ctx.table.record_mut(1).waiting_on_io = true;
        ctx.queues.push(1, 0);
        ctx.now.advance(5);

        let snap = StatusSnapshot::capture(&ctx, Some(1));
        let text = snap.to_string();
        assert!(text.contains("Queue 0:\n"));
        assert!(text.contains("Queue 1: |11|"));
        assert!(text.contains("I/O wait: |12|"));
        assert!(text.contains("Scheduled: |12| *I/O*"));
        assert_eq!(snap.queues, vec![vec![], vec![0]]);
    }

    #[test]
    fn nothing_scheduled() {
        let ctx = SimCtx::new(1, QueueSet::new(1, 10).unwrap());
        let text = StatusSnapshot::capture(&ctx, None).to_string();
        assert!(text.ends_with("Scheduled: None"));
    }
}
