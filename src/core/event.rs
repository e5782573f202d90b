use std::fmt;

use crate::core::{Level, SimTime, SlotId, Units, WorkerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedEvent {
    Admitted {
        slot: SlotId,
        worker: WorkerId,
        level: Level,
    },
    IoReturned {
        slot: SlotId,
        worker: WorkerId,
    },
    Dispatched {
        slot: SlotId,
        worker: WorkerId,
        level: Level,
        quantum: Units,
        overhead: Units,
    },
    Completed {
        slot: SlotId,
        worker: WorkerId,
        burst: Units,
        turnaround: Units,
    },
    Interrupted {
        slot: SlotId,
        worker: WorkerId,
        burst: Units,
        io_completion: SimTime,
    },
    Demoted {
        slot: SlotId,
        worker: WorkerId,
        burst: Units,
        from: Level,
        to: Level,
    },
    // Nothing runnable after admission and I/O checks
    CpuIdle {
        skipped: Units,
    },
}

impl fmt::Display for SchedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admitted {
                slot,
                worker,
                level,
            } => write!(f, "admit worker {worker} into slot {slot}, queue {level}"),
            Self::IoReturned { slot, worker } => {
                write!(f, "worker {worker} (slot {slot}) returned from I/O")
            }
            Self::Dispatched {
                worker,
                level,
                quantum,
                overhead,
                ..
            } => write!(
                f,
                "dispatch worker {worker} from queue {level}, quantum {quantum}ns, overhead {overhead}ns"
            ),
            Self::Completed {
                worker,
                burst,
                turnaround,
                ..
            } => write!(
                f,
                "worker {worker} finished after {burst}ns, turnaround {}",
                SimTime::from_units(*turnaround)
            ),
            Self::Interrupted {
                worker,
                burst,
                io_completion,
                ..
            } => write!(
                f,
                "worker {worker} interrupted after {burst}ns, I/O done at {io_completion}"
            ),
            Self::Demoted {
                worker,
                burst,
                from,
                to,
                ..
            } => write!(f, "worker {worker} used {burst}ns, queue {from} -> {to}"),
            Self::CpuIdle { skipped } => write!(f, "cpu idle, skipping {skipped}ns"),
        }
    }
}
