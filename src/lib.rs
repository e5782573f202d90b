pub mod core;
pub mod dispatch;
pub mod error;
pub mod scheduler;
pub mod sim;
pub mod worker;

pub use error::{Result, SimError};
pub use scheduler::{Mlfq, Policy};
pub use sim::{Report, Sim, SimConfig, StopReason};
pub use worker::{Outcome, WorkerBehavior};
