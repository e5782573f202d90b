pub mod clock;
pub mod event;
pub mod observer;
pub mod queue;
pub mod state;

pub use clock::{SimTime, UNITS_PER_SECOND, Units};
pub use event::SchedEvent;
pub use observer::Observer;
pub use queue::{QueueSet, ReadyQueue};
pub use state::{
    Charge, Level, ProcessRecord, ProcessTable, SimCtx, SlotId, WorkerId, WorkerState,
};
