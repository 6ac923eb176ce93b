//! Archive client - Control session
//!
//! The session engine and the collaborators it drives:
//!
//! - [`ArchiveConfig`] and [`Context`]: settings, finalised once before use
//! - [`ArchiveProxy`]: encodes and offers control requests
//! - [`ControlResponsePoller`]: one response frame per poll
//! - [`RecordingDescriptorPoller`]: descriptor batches for one query
//! - [`ArchiveClient`]: handshake, correlated waits, and descriptor batches

mod archive;
mod config;
mod context;
mod descriptor_poller;
mod proxy;
mod response_poller;

pub use archive::*;
pub use config::*;
pub use context::*;
pub use descriptor_poller::*;
pub use proxy::*;
pub use response_poller::*;
