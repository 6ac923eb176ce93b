//! # Archive Client
//!
//! Control-plane client for a remote recording archive reached over a
//! publish/subscribe transport. It opens a **control session**, correlates
//! responses with the requests that caused them, and collects batches of
//! recording descriptors:
//!
//! - **Cooperative**: no background threads; every blocking call polls on
//!   the caller's thread and drives the transport's housekeeping itself
//! - **Bounded**: each operation has its own deadline
//! - **Pluggable**: transport, clock, and idle strategy are injected
//! - **Typed failures**: timeouts, lost connectivity, and archive-reported
//!   errors are distinct [`ArchiveError`] variants
//!
//! ## Modules
//!
//! - [`core`]: Constants, error types, and the clock/idle traits
//! - [`transport`]: Transport seams, deadlines, idle strategies, and the
//!   in-memory loopback (`loopback` feature)
//! - [`codec`]: Control message encoding
//! - [`client`]: Context, request proxy, pollers, and the session engine
//!
//! ## Example Usage
//!
//! ```rust
//! use archive_client::prelude::*;
//! use archive_client::transport::loopback;
//!
//! # fn main() -> Result<(), ArchiveError> {
//! let (transport, archive) = loopback::pair();
//! archive.accept_sessions(7);
//!
//! let ctx = Context::new().transport(transport).idle_strategy(NoOpIdle);
//! let mut client = ArchiveClient::connect(ctx)?;
//! assert_eq!(client.control_session_id(), 7);
//!
//! let correlation_id = client.next_correlation_id();
//! archive.push_response(&ControlResponse::ok(7, correlation_id, 1001));
//! assert_eq!(client.poll_for_response(correlation_id)?, 1001);
//!
//! client.close()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod client;
pub mod codec;
pub mod core;
pub mod transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::{
        ArchiveClient, ArchiveConfig, Context, RecordingDescriptorConsumer, SessionState,
    };
    pub use crate::codec::{ControlResponse, ControlResponseCode, RecordingDescriptor};
    pub use crate::core::*;
    pub use crate::transport::{
        BackoffIdle, BusySpinIdle, Deadline, Housekeeping, NoOpIdle, Publication, SleepingIdle,
        Subscription, SystemClock, TransportClient, YieldingIdle,
    };
}

pub use crate::client::{ArchiveClient, ArchiveConfig, Context, SessionState};
pub use crate::core::{ArchiveError, ArchiveResult, ConfigError, ErrorKind};

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
#[cfg(test)]
pub(crate) fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .try_init();
}
