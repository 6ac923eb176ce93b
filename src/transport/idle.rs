//! Idle strategies for unproductive polling cycles.

use std::thread;
use std::time::Duration;

use crate::core::IdleStrategy;

/// Default spin cycles before [`BackoffIdle`] starts yielding.
pub const DEFAULT_MAX_SPINS: u32 = 10;

/// Default yields before [`BackoffIdle`] starts parking.
pub const DEFAULT_MAX_YIELDS: u32 = 5;

/// Default first park period of [`BackoffIdle`].
pub const DEFAULT_MIN_PARK: Duration = Duration::from_micros(1);

/// Default park period cap of [`BackoffIdle`].
pub const DEFAULT_MAX_PARK: Duration = Duration::from_millis(1);

/// Does nothing; the loop runs flat out.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpIdle;

impl IdleStrategy for NoOpIdle {
    fn idle(&mut self) {}

    fn alias(&self) -> &'static str {
        "noop"
    }
}

/// Issues a spin-loop hint each idle cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusySpinIdle;

impl IdleStrategy for BusySpinIdle {
    fn idle(&mut self) {
        std::hint::spin_loop();
    }

    fn alias(&self) -> &'static str {
        "spin"
    }
}

/// Yields the thread each idle cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct YieldingIdle;

impl IdleStrategy for YieldingIdle {
    fn idle(&mut self) {
        thread::yield_now();
    }

    fn alias(&self) -> &'static str {
        "yield"
    }
}

/// Sleeps for a fixed period each idle cycle.
#[derive(Debug, Clone, Copy)]
pub struct SleepingIdle {
    period: Duration,
}

impl SleepingIdle {
    /// Create a strategy sleeping `period` per idle cycle.
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Sleep period.
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl IdleStrategy for SleepingIdle {
    fn idle(&mut self) {
        thread::sleep(self.period);
    }

    fn alias(&self) -> &'static str {
        "sleep"
    }
}

/// Phase of a [`BackoffIdle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPhase {
    /// Work was done recently.
    NotIdle,
    /// Spinning with spin-loop hints.
    Spinning,
    /// Yielding the thread.
    Yielding,
    /// Sleeping, period doubling up to the cap.
    Parking,
}

/// Spin, then yield, then park with exponential backoff.
///
/// Cheap on latency while work keeps arriving, cheap on CPU once it stops.
#[derive(Debug, Clone)]
pub struct BackoffIdle {
    max_spins: u32,
    max_yields: u32,
    min_park: Duration,
    max_park: Duration,
    phase: BackoffPhase,
    spins: u32,
    yields: u32,
    park_period: Duration,
}

impl Default for BackoffIdle {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_SPINS,
            DEFAULT_MAX_YIELDS,
            DEFAULT_MIN_PARK,
            DEFAULT_MAX_PARK,
        )
    }
}

impl BackoffIdle {
    /// Create a backoff strategy.
    ///
    /// `max_park` is raised to `min_park` if it is smaller.
    pub fn new(max_spins: u32, max_yields: u32, min_park: Duration, max_park: Duration) -> Self {
        Self {
            max_spins,
            max_yields,
            min_park,
            max_park: max_park.max(min_park),
            phase: BackoffPhase::NotIdle,
            spins: 0,
            yields: 0,
            park_period: min_park,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> BackoffPhase {
        self.phase
    }

    /// Period the next park will sleep for.
    pub fn park_period(&self) -> Duration {
        self.park_period
    }
}

impl IdleStrategy for BackoffIdle {
    fn idle(&mut self) {
        match self.phase {
            BackoffPhase::NotIdle => {
                self.phase = BackoffPhase::Spinning;
                self.spins = 1;
            }
            BackoffPhase::Spinning => {
                std::hint::spin_loop();
                self.spins = self.spins.saturating_add(1);
                if self.spins > self.max_spins {
                    self.phase = BackoffPhase::Yielding;
                    self.yields = 0;
                }
            }
            BackoffPhase::Yielding => {
                self.yields = self.yields.saturating_add(1);
                if self.yields > self.max_yields {
                    self.phase = BackoffPhase::Parking;
                    self.park_period = self.min_park;
                } else {
                    thread::yield_now();
                }
            }
            BackoffPhase::Parking => {
                thread::sleep(self.park_period);
                self.park_period = self.park_period.saturating_mul(2).min(self.max_park);
            }
        }
    }

    fn reset(&mut self) {
        self.phase = BackoffPhase::NotIdle;
        self.spins = 0;
        self.yields = 0;
        self.park_period = self.min_park;
    }

    fn alias(&self) -> &'static str {
        "backoff"
    }
}
