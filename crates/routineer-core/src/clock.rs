//! Wall-clock abstraction.
//!
//! The execution timer derives elapsed time from wall-clock instants.
//! Injecting the clock keeps the timer free of hidden `Utc::now()` calls
//! so tests can drive pause/resume sequences deterministically.

use std::cell::Cell;

use chrono::{DateTime, Utc};

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests and simulations.
///
/// Time only moves when told to, so an entire timer lifecycle can be
/// replayed in microseconds.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Jump to an absolute instant. Moving backwards is allowed; the
    /// consumers are expected to clamp negative deltas themselves.
    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    /// Advance the clock by whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.now.set(self.now.get() + chrono::Duration::seconds(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance_secs(42);
        assert_eq!((clock.now() - start).num_seconds(), 42);
    }

    #[test]
    fn reference_to_clock_is_a_clock() {
        fn now_of<C: Clock>(c: C) -> DateTime<Utc> {
            c.now()
        }
        let clock = ManualClock::new(Utc::now());
        let _ = now_of(&clock);
    }
}
