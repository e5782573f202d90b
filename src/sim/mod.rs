pub mod config;
pub mod driver;
pub mod event_log;
pub mod snapshot;
pub mod stats;

pub use config::{MAX_SLOTS, OddsRange, SimConfig};
pub use driver::{BehaviorFactory, Sim};
pub use event_log::EventLog;
pub use snapshot::StatusSnapshot;
pub use stats::{Report, Stats, StopReason};
