use std::fmt;

use average::{Estimate, Mean};

use crate::core::{SimTime, Units};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    AdmissionCap,
    SimTimeExhausted,
    RealTimeExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdmissionCap => write!(f, "admission cap reached"),
            Self::SimTimeExhausted => write!(f, "simulated time ended"),
            Self::RealTimeExhausted => write!(f, "real time ended"),
        }
    }
}

pub struct Stats {
    pub admitted: u64,
    pub finished: u64,
    pub spawn_failures: u64,
    pub idle: SimTime,
    wait: Mean,
    turnaround: Mean,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            admitted: 0,
            finished: 0,
            spawn_failures: 0,
            idle: SimTime::ZERO,
            wait: Mean::new(),
            turnaround: Mean::new(),
        }
    }
}

fn mean_time(mean: &Mean) -> SimTime {
    if mean.is_empty() {
        SimTime::ZERO
    } else {
        SimTime::from_units(mean.estimate().round() as Units)
    }
}

impl Stats {
    pub fn record_finished(&mut self, wait: Units, turnaround: Units) {
        self.finished += 1;
        self.wait.add(wait as f64);
        self.turnaround.add(turnaround as f64);
    }

    pub fn record_idle(&mut self, units: Units) {
        self.idle.advance(units);
    }

    pub fn average_wait(&self) -> SimTime {
        mean_time(&self.wait)
    }

    pub fn average_turnaround(&self) -> SimTime {
        mean_time(&self.turnaround)
    }

    pub fn report(&self, stop: StopReason, clock: SimTime, cycles: u64) -> Report {
        Report {
            stop,
            clock,
            cycles,
            admitted: self.admitted,
            finished: self.finished,
            spawn_failures: self.spawn_failures,
            idle: self.idle,
            average_wait: self.average_wait(),
            average_turnaround: self.average_turnaround(),
        }
    }
}

/// Summary printed when a run ends normally. Averages cover finished workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub stop: StopReason,
    pub clock: SimTime,
    pub cycles: u64,
    pub admitted: u64,
    pub finished: u64,
    pub spawn_failures: u64,
    pub idle: SimTime,
    pub average_wait: SimTime,
    pub average_turnaround: SimTime,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stopped at {} after {} cycles: {}", self.clock, self.cycles, self.stop)?;
        writeln!(f, "Workers admitted: {}, finished: {}", self.admitted, self.finished)?;
        if self.spawn_failures > 0 {
            writeln!(f, "Workers that failed to start: {}", self.spawn_failures)?;
        }
        writeln!(f, "CPU idle: {}", self.idle)?;
        writeln!(f, "Average time waiting: {}", self.average_wait)?;
        write!(f, "Average turnaround: {}", self.average_turnaround)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_cover_finished_only() {
        let mut stats = Stats::default();
        stats.admitted = 3;
        stats.record_finished(100, 1_000);
        stats.record_finished(300, 3_000);
        stats.record_idle(50);

        let report = stats.report(StopReason::AdmissionCap, SimTime::new(1, 0), 12);
        assert_eq!(report.cycles, 12);
        assert_eq!(report.finished, 2);
        assert_eq!(report.spawn_failures, 0);
        assert_eq!(report.average_wait, SimTime::from_units(200));
        assert_eq!(report.average_turnaround, SimTime::from_units(2_000));
        assert_eq!(report.idle, SimTime::from_units(50));
    }

    #[test]
    fn empty_averages_are_zero() {
        let stats = Stats::default();
        assert_eq!(stats.average_wait(), SimTime::ZERO);
        assert_eq!(stats.average_turnaround(), SimTime::ZERO);
    }
}
