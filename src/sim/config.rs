use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{QueueSet, Units};
use crate::error::{Result, SimError};

pub const MAX_SLOTS: usize = 18;

// Number of values a preference file may carry
const PREF_FIELDS: usize = 14;

/// Inclusive range of 1-in-N odds; each worker draws its own N at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OddsRange {
    pub min: u32,
    pub max: u32,
}

impl OddsRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    pub slots: usize,
    pub levels: usize,
    /// Quantum of level 0; level `i` gets `quantum_factor << i`.
    pub quantum_factor: Units,
    /// Stop once the simulated clock reaches this many seconds.
    pub sim_seconds: u64,
    /// Stop once this much wall-clock time has passed.
    pub real_seconds: u64,
    pub max_total_workers: u64,
    /// Per-cycle scheduling overhead is drawn from `[1, overhead_max]`.
    pub overhead_max: Units,
    /// Idle skip is drawn from `[0, overhead_max * idle_factor)`.
    pub idle_factor: Units,
    /// Gap to the next admission is drawn from `[1, generation_max]`.
    pub generation_max: Units,
    /// I/O wait is drawn from `[1, max_io_wait]`.
    pub max_io_wait: Units,
    pub interrupt_odds: OddsRange,
    pub terminate_odds: OddsRange,
    pub max_log_lines: usize,
    pub log_path: Option<PathBuf>,
    pub cycle_delay: Duration,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            slots: MAX_SLOTS,
            levels: 4,
            quantum_factor: 10_000,
            sim_seconds: 2,
            real_seconds: 20,
            max_total_workers: 100,
            overhead_max: 1_000,
            idle_factor: 100,
            generation_max: 1_000_000,
            max_io_wait: 50_000_000,
            interrupt_odds: OddsRange::new(3, 6),
            terminate_odds: OddsRange::new(4, 10),
            max_log_lines: 1000,
            log_path: Some(PathBuf::from("mlfq.log")),
            cycle_delay: Duration::ZERO,
            seed: None,
        }
    }
}

fn check_odds(name: &str, odds: OddsRange) -> Result<()> {
    if odds.min == 0 {
        return Err(SimError::config(format!("{name} odds must be at least 1")));
    }
    if odds.min > odds.max {
        return Err(SimError::config(format!(
            "{name} odds range {}..={} is empty",
            odds.min, odds.max
        )));
    }
    Ok(())
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.slots == 0 || self.slots > MAX_SLOTS {
            return Err(SimError::config(format!(
                "slots must be within 1..={MAX_SLOTS}, got {}",
                self.slots
            )));
        }
        if self.max_total_workers == 0 {
            return Err(SimError::config("max total workers must be positive"));
        }
        if self.quantum_factor == 0 {
            return Err(SimError::config("quantum factor must be positive"));
        }
        if QueueSet::new(self.levels, self.quantum_factor).is_none() {
            return Err(SimError::config(format!(
                "{} levels with quantum factor {} cannot be represented",
                self.levels, self.quantum_factor
            )));
        }
        for (name, value) in [
            ("overhead_max", self.overhead_max),
            ("idle_factor", self.idle_factor),
            ("generation_max", self.generation_max),
            ("max_io_wait", self.max_io_wait),
        ] {
            if value == 0 {
                return Err(SimError::config(format!("{name} must be positive")));
            }
        }
        if self.overhead_max.checked_mul(self.idle_factor).is_none() {
            return Err(SimError::config("idle skip range overflows"));
        }
        check_odds("interrupt", self.interrupt_odds)?;
        check_odds("terminate", self.terminate_odds)?;
        Ok(())
    }

    pub fn real_budget(&self) -> Duration {
        Duration::from_secs(self.real_seconds)
    }

    /// Read a preference file on top of the defaults.
    pub fn from_pref_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            SimError::config(format!("cannot read preferences {}: {e}", path.display()))
        })?;
        let mut config = Self::default();
        config.apply_preferences(&text)?;
        Ok(config)
    }

    /// Preference text alternates a description line and a value line. Values
    /// fill fields in a fixed order; missing trailing values keep their
    /// current setting.
    pub fn apply_preferences(&mut self, text: &str) -> Result<()> {
        let values = text
            .lines()
            .enumerate()
            .filter(|(idx, _)| idx % 2 == 1)
            .map(|(idx, line)| {
                line.trim().parse::<u64>().map_err(|e| {
                    SimError::config(format!("preference line {}: {:?}: {e}", idx + 1, line))
                })
            })
            .collect::<Result<Vec<u64>>>()?;

        if values.len() > PREF_FIELDS {
            return Err(SimError::config(format!(
                "{} preference values given, at most {PREF_FIELDS} expected",
                values.len()
            )));
        }
        for (idx, v) in values.into_iter().enumerate() {
            match idx {
                0 => self.slots = to_usize(v)?,
                1 => self.levels = to_usize(v)?,
                2 => self.real_seconds = v,
                3 => self.sim_seconds = v,
                4 => self.generation_max = v,
                5 => self.quantum_factor = v,
                6 => self.overhead_max = v,
                7 => self.max_log_lines = to_usize(v)?,
                8 => self.interrupt_odds.min = to_u32(v)?,
                9 => self.interrupt_odds.max = to_u32(v)?,
                10 => self.terminate_odds.min = to_u32(v)?,
                11 => self.terminate_odds.max = to_u32(v)?,
                12 => self.cycle_delay = Duration::from_micros(v),
                _ => self.max_io_wait = v,
            }
        }
        Ok(())
    }
}

fn to_usize(v: u64) -> Result<usize> {
    usize::try_from(v).map_err(|_| SimError::config(format!("{v} does not fit")))
}

fn to_u32(v: u64) -> Result<u32> {
    u32::try_from(v).map_err(|_| SimError::config(format!("{v} does not fit in 32 bits")))
}
