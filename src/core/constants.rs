//! Protocol and client constants.
//!
//! Wire values (schema id, template ids) are fixed by the archive protocol
//! and MUST NOT be changed. Client defaults may be overridden per
//! [`ArchiveConfig`](crate::client::ArchiveConfig).

use std::time::Duration;

// =============================================================================
// WIRE SCHEMA
// =============================================================================

/// Schema id carried in every archive control message header.
pub const ARCHIVE_SCHEMA_ID: u16 = 101;

/// Schema version written by this client.
pub const ARCHIVE_SCHEMA_VERSION: u16 = 1;

/// Size of the message header (block length, template, schema, version).
pub const MESSAGE_HEADER_SIZE: usize = 8;

/// Size of the length prefix in front of variable-length string fields.
pub const VAR_DATA_LENGTH_SIZE: usize = 4;

/// Semantic version of the control protocol spoken by this client.
pub const PROTOCOL_SEMANTIC_VERSION: i32 = semantic_version(1, 0, 0);

/// Compose a semantic version into the single `i32` carried on the wire.
pub const fn semantic_version(major: u8, minor: u8, patch: u8) -> i32 {
    ((major as i32) << 16) | ((minor as i32) << 8) | (patch as i32)
}

// =============================================================================
// TEMPLATE IDS
// =============================================================================

/// Control response (archive -> client).
pub const TEMPLATE_CONTROL_RESPONSE: u16 = 1;

/// Connect request (client -> archive).
pub const TEMPLATE_CONNECT_REQUEST: u16 = 2;

/// Close session request (client -> archive).
pub const TEMPLATE_CLOSE_SESSION_REQUEST: u16 = 3;

/// Recording descriptor (archive -> client).
pub const TEMPLATE_RECORDING_DESCRIPTOR: u16 = 22;

// =============================================================================
// CLIENT DEFAULTS
// =============================================================================

/// Maximum fragments consumed by a single poll of the response channel.
pub const FRAGMENT_LIMIT: usize = 10;

/// Offer attempts for requests sent on an established session.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Deadline applied to every blocking operation.
pub const DEFAULT_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Channel the archive listens on for control requests.
pub const DEFAULT_CONTROL_REQUEST_CHANNEL: &str = "aeron:udp?endpoint=localhost:8010";

/// Stream id for control requests.
pub const DEFAULT_CONTROL_REQUEST_STREAM_ID: i32 = 10;

/// Channel the archive sends control responses to.
pub const DEFAULT_CONTROL_RESPONSE_CHANNEL: &str = "aeron:udp?endpoint=localhost:8020";

/// Stream id for control responses.
pub const DEFAULT_CONTROL_RESPONSE_STREAM_ID: i32 = 20;

/// Sentinel for ids that have not been assigned yet.
pub const NULL_VALUE: i64 = -1;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Overrides the control request channel.
pub const ENV_CONTROL_CHANNEL: &str = "AERON_ARCHIVE_CONTROL_CHANNEL";

/// Overrides the control request stream id.
pub const ENV_CONTROL_STREAM_ID: &str = "AERON_ARCHIVE_CONTROL_STREAM_ID";

/// Overrides the control response channel.
pub const ENV_CONTROL_RESPONSE_CHANNEL: &str = "AERON_ARCHIVE_CONTROL_RESPONSE_CHANNEL";

/// Overrides the control response stream id.
pub const ENV_CONTROL_RESPONSE_STREAM_ID: &str = "AERON_ARCHIVE_CONTROL_RESPONSE_STREAM_ID";

/// Overrides the message timeout, in nanoseconds.
pub const ENV_MESSAGE_TIMEOUT: &str = "AERON_ARCHIVE_MESSAGE_TIMEOUT";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_version_packing() {
        assert_eq!(semantic_version(1, 0, 0), 0x0001_0000);
        assert_eq!(semantic_version(0, 2, 3), 0x0000_0203);
        assert_eq!(PROTOCOL_SEMANTIC_VERSION >> 16, 1);
    }
}
