use std::cmp::Ordering;
use std::fmt;

/// Simulated nanoseconds.
pub type Units = u64;

pub const UNITS_PER_SECOND: Units = 1_000_000_000;

/// Logical `(seconds, nanoseconds)` clock.
///
/// `nanos` is kept in `[0, UNITS_PER_SECOND)` after every mutation. Deltas are
/// unsigned, so the clock can only move forward.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimTime {
    secs: u64,
    nanos: u32,
}

impl SimTime {
    pub const ZERO: SimTime = SimTime { secs: 0, nanos: 0 };

    pub fn new(secs: u64, nanos: u64) -> Self {
        let mut t = SimTime { secs, nanos: 0 };
        t.advance(nanos);
        t
    }

    pub fn from_units(units: Units) -> Self {
        Self::ZERO.after(units)
    }

    pub fn secs(&self) -> u64 {
        self.secs
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Move the clock forward by `delta` units, carrying whole seconds.
    pub fn advance(&mut self, delta: Units) {
        let total = self.nanos as u64 + delta % UNITS_PER_SECOND;
        let carry = delta / UNITS_PER_SECOND + total / UNITS_PER_SECOND;
        self.secs = self.secs.saturating_add(carry);
        self.nanos = (total % UNITS_PER_SECOND) as u32;
    }

    /// Copy of `self` advanced by `delta`.
    pub fn after(mut self, delta: Units) -> Self {
        self.advance(delta);
        self
    }

    pub fn at_least(&self, other: &SimTime) -> bool {
        self >= other
    }

    pub fn combined(&self) -> Units {
        self.secs
            .saturating_mul(UNITS_PER_SECOND)
            .saturating_add(self.nanos as u64)
    }

    /// Units elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn since(&self, earlier: &SimTime) -> Units {
        self.combined().saturating_sub(earlier.combined())
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.secs
            .cmp(&other.secs)
            .then_with(|| self.nanos.cmp(&other.nanos))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_carries_subsecond_overflow() {
        let mut t = SimTime::new(0, 999_999_999);
        t.advance(2);
        assert_eq!(t.secs(), 1);
        assert_eq!(t.nanos(), 1);
    }

    #[test]
    fn advance_by_multiple_seconds_keeps_remainder() {
        // A multi-second delta must not discard the existing nanoseconds.
        let mut t = SimTime::new(1, 500_000_000);
        t.advance(2 * UNITS_PER_SECOND + 600_000_000);
        assert_eq!(t, SimTime::new(4, 100_000_000));
    }

    #[test]
    fn new_normalizes_nanos() {
        let t = SimTime::new(3, 2_500_000_000);
        assert_eq!(t.secs(), 5);
        assert_eq!(t.nanos(), 500_000_000);
    }

    #[test]
    fn combined_is_monotonic_and_normalized() {
        let mut t = SimTime::ZERO;
        let mut last = t.combined();
        for delta in [0, 1, 999_999_999, UNITS_PER_SECOND, 3, 7 * UNITS_PER_SECOND + 11] {
            t.advance(delta);
            assert!((t.nanos() as u64) < UNITS_PER_SECOND);
            assert!(t.combined() >= last);
            assert_eq!(t.combined(), last + delta);
            last = t.combined();
        }
    }

    #[test]
    fn at_least_compares_both_fields() {
        let a = SimTime::new(1, 10);
        let b = SimTime::new(1, 20);
        assert!(b.at_least(&a));
        assert!(!a.at_least(&b));
        assert!(a.at_least(&a));
        assert!(SimTime::new(2, 0).at_least(&b));
    }

    #[test]
    fn since_saturates() {
        let a = SimTime::new(1, 0);
        let b = SimTime::new(0, 5);
        assert_eq!(a.since(&b), 999_999_995);
        assert_eq!(b.since(&a), 0);
    }

    #[test]
    fn display_pads_nanos() {
        assert_eq!(SimTime::new(2, 5).to_string(), "2.000000005");
    }
}
