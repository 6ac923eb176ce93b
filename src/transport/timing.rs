//! Clocks and deadlines.
//!
//! Every blocking operation computes a fresh [`Deadline`] from the injected
//! [`Clock`]. Deadlines are never carried from one operation to the next.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::core::Clock;

/// Clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give the
/// other to the client.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    elapsed_nanos: Arc<AtomicU64>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            elapsed_nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }
}

/// Absolute point in time after which an operation gives up.
///
/// A timeout too large to represent as an [`Instant`] yields a deadline that
/// never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(clock: &dyn Clock, timeout: Duration) -> Self {
        Self {
            at: clock.now().checked_add(timeout),
        }
    }

    /// The instant the deadline falls on, `None` if it never expires.
    pub fn at(&self) -> Option<Instant> {
        self.at
    }

    /// Check if the deadline has passed.
    ///
    /// Strictly later than the deadline; reaching it exactly is not expiry.
    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        self.at.is_some_and(|at| clock.now() > at)
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self, clock: &dyn Clock) -> Duration {
        match self.at {
            Some(at) => at.saturating_duration_since(clock.now()),
            None => Duration::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        let start = clock.now();

        other.advance(Duration::from_millis(250));

        assert_eq!(clock.now() - start, Duration::from_millis(250));
        assert_eq!(clock.elapsed(), Duration::from_millis(250));
    }

    #[test]
    fn test_deadline_not_expired_at_boundary() {
        let clock = ManualClock::new();
        let deadline = Deadline::after(&clock, Duration::from_secs(1));

        clock.advance(Duration::from_secs(1));
        assert!(!deadline.is_expired(&clock));
        assert_eq!(deadline.remaining(&clock), Duration::ZERO);

        clock.advance(Duration::from_nanos(1));
        assert!(deadline.is_expired(&clock));
    }

    #[test]
    fn test_unbounded_deadline_never_expires() {
        let clock = ManualClock::new();
        let deadline = Deadline::after(&clock, Duration::MAX);

        assert_eq!(deadline.at(), None);
        clock.advance(Duration::from_secs(86_400 * 365));
        assert!(!deadline.is_expired(&clock));
        assert_eq!(deadline.remaining(&clock), Duration::MAX);
    }

    #[test]
    fn test_deadline_remaining() {
        let clock = ManualClock::new();
        let deadline = Deadline::after(&clock, Duration::from_millis(100));

        clock.advance(Duration::from_millis(40));
        assert_eq!(deadline.remaining(&clock), Duration::from_millis(60));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
