//! Archive client - Transport seams
//!
//! The archive client does not implement a transport. It consumes one
//! through the traits in this module and drives it cooperatively from the
//! caller's thread:
//!
//! - **Channels**: [`Subscription`] and [`Publication`], registered through a
//!   [`TransportClient`]
//! - **Housekeeping**: [`Housekeeping::invoke`], the duty-cycle task that keeps
//!   the transport client alive
//! - **Timing**: [`SystemClock`], [`ManualClock`], and [`Deadline`]
//! - **Idle policies**: [`BusySpinIdle`], [`YieldingIdle`], [`SleepingIdle`],
//!   [`BackoffIdle`], [`NoOpIdle`]
//!
//! # Polling model
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  caller thread                               │
//! │    poll channel ──► frame? ──► done          │
//! │        │ no work                             │
//! │        ▼                                     │
//! │    disconnected? deadline? ──► error         │
//! │        │                                     │
//! │        ▼                                     │
//! │    idle strategy ──► housekeeping ──► retry  │
//! └──────────────────────────────────────────────┘
//! ```

mod error;
mod idle;
#[cfg(any(test, feature = "loopback"))]
pub mod loopback;
mod timing;
mod traits;

pub use error::*;
pub use idle::*;
pub use timing::*;
pub use traits::*;
