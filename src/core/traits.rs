//! Pluggable seams of the polling model.
//!
//! Every blocking operation is a loop on the calling thread. These traits
//! are the two policies injected into that loop: where "now" comes from,
//! and what to do when a cycle makes no progress.

use std::time::Instant;

/// Source of monotonic time for deadlines.
///
/// Implementations must never go backwards.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wait policy applied when a polling cycle does no work.
///
/// Trades latency for CPU: a busy spin reacts fastest, a parking strategy
/// costs least. Implementations are stateful so they can escalate across
/// consecutive idle cycles.
///
/// # Example
///
/// ```ignore
/// let mut idle = BackoffIdle::default();
/// loop {
///     let work = poll_something();
///     idle.idle_work(work);
/// }
/// ```
pub trait IdleStrategy: Send {
    /// Idle for one cycle that did no work.
    fn idle(&mut self);

    /// Idle if `work_count` is zero, otherwise reset.
    fn idle_work(&mut self, work_count: usize) {
        if work_count > 0 {
            self.reset();
        } else {
            self.idle();
        }
    }

    /// Forget any escalation state.
    fn reset(&mut self) {}

    /// Short name used in logs.
    fn alias(&self) -> &'static str;
}
