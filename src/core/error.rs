//! Error types for the archive client.

use thiserror::Error;

use crate::codec::CodecError;
use crate::transport::TransportError;

/// Errors raised while validating or concluding a [`Context`](crate::client::Context).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A channel URI was empty.
    #[error("{0} must not be empty")]
    EmptyChannel(&'static str),

    /// The message timeout was zero.
    #[error("message timeout must be greater than zero")]
    ZeroTimeout,

    /// The fragment limit was zero.
    #[error("fragment limit must be greater than zero")]
    ZeroFragmentLimit,

    /// A setting could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Setting (environment variable) name.
        key: &'static str,
        /// Raw value that failed to parse.
        value: String,
    },

    /// No transport client was supplied.
    #[error("no transport client supplied")]
    MissingTransport,

    /// `conclude()` was called more than once.
    #[error("context has already been concluded")]
    AlreadyConcluded,

    /// The context was used before `conclude()`.
    #[error("context has not been concluded")]
    NotConcluded,
}

/// Broad category of an [`ArchiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The response channel never connected, or dropped mid-wait.
    Connectivity,
    /// A deadline elapsed.
    Timeout,
    /// The archive answered with a failure code.
    Protocol,
    /// The operation is not supported by this client.
    Unimplemented,
    /// Misuse of the client (bad configuration, closed session).
    Usage,
    /// The transport refused a registration.
    Transport,
}

/// Errors surfaced by archive client operations.
///
/// Frame mismatches (foreign session, foreign correlation id, unexpected
/// template) are never errors; they are filtered while polling.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The response subscription did not connect before the deadline.
    #[error("failed to establish response connection on {channel}, stream id: {stream_id}")]
    ResponseChannelNotConnected {
        /// Response channel URI.
        channel: String,
        /// Response stream id.
        stream_id: i32,
    },

    /// The transport did not resolve a subscription or publication in time.
    #[error("timed out resolving {resource} on {channel}, stream id: {stream_id}")]
    RegistrationTimeout {
        /// `"subscription"` or `"publication"`.
        resource: &'static str,
        /// Channel URI.
        channel: String,
        /// Stream id.
        stream_id: i32,
    },

    /// The connect request could not be sent.
    #[error("cannot connect to archive: {channel}")]
    ConnectFailed {
        /// Response channel the connect request named.
        channel: String,
    },

    /// The response subscription lost its connection while waiting.
    #[error("subscription to archive is not connected")]
    NotConnected,

    /// The request publication is no longer connected.
    #[error("connection to the archive is no longer available")]
    PublicationNotConnected,

    /// The request publication has been closed.
    #[error("connection to the archive has been closed")]
    PublicationClosed,

    /// The request publication reached its maximum position.
    #[error("offer failed due to max position being reached")]
    MaxPositionExceeded,

    /// No matching response arrived before the deadline.
    #[error("awaiting response for correlation id: {correlation_id}")]
    ResponseTimeout {
        /// Correlation id of the outstanding request.
        correlation_id: i64,
    },

    /// The descriptor batch did not complete before the deadline.
    #[error("awaiting recording descriptors: correlation id: {correlation_id}")]
    DescriptorTimeout {
        /// Correlation id of the outstanding query.
        correlation_id: i64,
    },

    /// The archive answered with an error response.
    #[error(
        "response for correlation id: {correlation_id}, error: {message}, relevant id: {relevant_id}"
    )]
    Remote {
        /// Correlation id of the request.
        correlation_id: i64,
        /// Error text supplied by the archive.
        message: String,
        /// Diagnostic id supplied by the archive.
        relevant_id: i64,
    },

    /// The archive answered with a code this client does not expect.
    #[error("unexpected response: code={code}, correlation id: {correlation_id}")]
    UnexpectedCode {
        /// Correlation id of the request.
        correlation_id: i64,
        /// Raw response code.
        code: i32,
    },

    /// The operation is deliberately not supported.
    #[error("not implemented: {0}")]
    Unimplemented(&'static str),

    /// The session has been closed.
    #[error("control session {control_session_id} is closed")]
    SessionClosed {
        /// Id of the closed session.
        control_session_id: i64,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A request could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ArchiveError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::ResponseChannelNotConnected { .. }
            | ArchiveError::ConnectFailed { .. }
            | ArchiveError::NotConnected
            | ArchiveError::PublicationNotConnected
            | ArchiveError::PublicationClosed
            | ArchiveError::MaxPositionExceeded => ErrorKind::Connectivity,
            ArchiveError::RegistrationTimeout { .. }
            | ArchiveError::ResponseTimeout { .. }
            | ArchiveError::DescriptorTimeout { .. } => ErrorKind::Timeout,
            ArchiveError::Remote { .. }
            | ArchiveError::UnexpectedCode { .. }
            | ArchiveError::Codec(_) => ErrorKind::Protocol,
            ArchiveError::Unimplemented(_) => ErrorKind::Unimplemented,
            ArchiveError::SessionClosed { .. } | ArchiveError::Config(_) => ErrorKind::Usage,
            ArchiveError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Check if a deadline elapsed.
    ///
    /// The response channel failing to connect counts as both a timeout and
    /// a connectivity failure.
    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
            || matches!(self, ArchiveError::ResponseChannelNotConnected { .. })
    }

    /// Check if the transport connection was never established or was lost.
    pub fn is_connectivity(&self) -> bool {
        self.kind() == ErrorKind::Connectivity
    }

    /// Check if the archive itself reported the failure.
    pub fn is_protocol(&self) -> bool {
        self.kind() == ErrorKind::Protocol
    }

    /// Correlation id the failure refers to, when there is one.
    pub fn correlation_id(&self) -> Option<i64> {
        match self {
            ArchiveError::ResponseTimeout { correlation_id }
            | ArchiveError::DescriptorTimeout { correlation_id }
            | ArchiveError::Remote { correlation_id, .. }
            | ArchiveError::UnexpectedCode { correlation_id, .. } => Some(*correlation_id),
            _ => None,
        }
    }
}

/// Result type for archive client operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_message_carries_text_and_relevant_id() {
        let err = ArchiveError::Remote {
            correlation_id: 7,
            message: "no such recording".into(),
            relevant_id: 42,
        };
        let text = err.to_string();
        assert!(text.contains("no such recording"));
        assert!(text.contains("42"));
        assert!(err.is_protocol());
        assert_eq!(err.correlation_id(), Some(7));
    }

    #[test]
    fn test_timeout_classification() {
        assert!(ArchiveError::ResponseTimeout { correlation_id: 1 }.is_timeout());
        assert!(ArchiveError::DescriptorTimeout { correlation_id: 1 }.is_timeout());
        assert!(!ArchiveError::NotConnected.is_timeout());

        let channel = ArchiveError::ResponseChannelNotConnected {
            channel: "aeron:ipc".into(),
            stream_id: 20,
        };
        assert!(channel.is_timeout());
        assert!(channel.is_connectivity());
        assert!(channel.to_string().contains("aeron:ipc"));
        assert!(channel.to_string().contains("20"));
    }

    #[test]
    fn test_connectivity_classification() {
        assert!(ArchiveError::NotConnected.is_connectivity());
        assert!(ArchiveError::PublicationClosed.is_connectivity());
        assert!(
            ArchiveError::ConnectFailed {
                channel: "aeron:ipc".into()
            }
            .is_connectivity()
        );
        assert!(!ArchiveError::Unimplemented("async connect").is_connectivity());
    }

    #[test]
    fn test_unexpected_code_surfaces_raw_value() {
        let err = ArchiveError::UnexpectedCode {
            correlation_id: 3,
            code: 99,
        };
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("code=99"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: ArchiveError = ConfigError::MissingTransport.into();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.correlation_id(), None);
    }
}
