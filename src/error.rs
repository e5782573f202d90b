use std::error::Error;
use std::fmt;
use std::io;

use crate::core::{SlotId, WorkerId};

#[derive(Debug)]
pub enum SimError {
    /// A run-scoped resource could not be set up.
    ResourceAcquisition { what: String, source: io::Error },
    /// The dispatch handshake broke down for `worker`.
    Channel { worker: WorkerId, reason: String },
    /// One entry per release step that failed during teardown.
    Teardown(Vec<String>),
    WorkerSpawn { slot: SlotId, source: io::Error },
    Config(String),
    Interrupted,
}

pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    pub fn channel(worker: WorkerId, reason: impl Into<String>) -> Self {
        Self::Channel {
            worker,
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceAcquisition { what, source } => {
                write!(f, "failed to acquire {what}: {source}")
            }
            Self::Channel { worker, reason } => {
                write!(f, "dispatch channel failure for worker {worker}: {reason}")
            }
            Self::Teardown(failures) => {
                write!(f, "teardown incomplete, resources may leak: {}", failures.join("; "))
            }
            Self::WorkerSpawn { slot, source } => {
                write!(f, "failed to start worker for slot {slot}: {source}")
            }
            Self::Config(reason) => write!(f, "invalid configuration: {reason}"),
            Self::Interrupted => write!(f, "simulation interrupted"),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ResourceAcquisition { source, .. } | Self::WorkerSpawn { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}
