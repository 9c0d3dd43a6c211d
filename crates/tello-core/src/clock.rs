//! Injectable clock abstraction.
//!
//! All date comparisons in the engine take `now` as an explicit parameter;
//! the runner draws it from an injected clock so tests can simulate
//! arbitrary dates without mocking system time globally.

use chrono::{DateTime, Utc};

/// Source of the current instant.
pub trait Clock {
    /// Return the current instant in UTC.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock pinned to a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    /// Create a clock that always reports `instant`.
    #[must_use]
    pub const fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.instant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_pinned_instant() {
        let instant = "2025-11-22T09:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let clock = FixedClock::new(instant);
        assert_eq!(clock.now_utc(), instant);
        assert_eq!(clock.now_utc(), instant);
    }
}
