use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::core::{SchedEvent, SimTime};
use crate::error::{Result, SimError};

/// Append-only event log with a line cap. Lines past the cap are dropped.
pub struct EventLog {
    sink: Option<BufWriter<File>>,
    lines: usize,
    max_lines: usize,
}

impl EventLog {
    /// Truncate or create `path` and start logging into it.
    pub fn create(path: &Path, max_lines: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|source| SimError::ResourceAcquisition {
                what: format!("event log {}", path.display()),
                source,
            })?;
        Ok(Self {
            sink: Some(BufWriter::new(file)),
            lines: 0,
            max_lines,
        })
    }

    /// Log that only counts lines; nothing is written.
    pub fn disabled(max_lines: usize) -> Self {
        Self {
            sink: None,
            lines: 0,
            max_lines,
        }
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn is_full(&self) -> bool {
        self.lines >= self.max_lines
    }

    pub fn record(&mut self, now: SimTime, event: &SchedEvent) -> io::Result<()> {
        debug!("[{now}] {event}");
        if self.is_full() {
            return Ok(());
        }
        self.lines += 1;
        match self.sink.as_mut() {
            Some(sink) => writeln!(sink, "[{now}] {event}"),
            None => Ok(()),
        }
    }

    /// Flush and close the file. Safe to call more than once.
    pub fn close(&mut self) -> io::Result<()> {
        match self.sink.take() {
            Some(mut sink) => sink.flush(),
            None => Ok(()),
        }
    }
}
