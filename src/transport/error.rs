//! Transport layer error types.

use thiserror::Error;

use super::traits::RegistrationId;

/// Errors reported by a transport client when registering channels.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The channel URI is not acceptable to the transport.
    #[error("invalid channel: {0:?}")]
    InvalidChannel(String),

    /// The registration id was never issued by this client.
    #[error("unknown registration id: {0}")]
    UnknownRegistration(RegistrationId),

    /// The transport rejected the registration.
    #[error("registration failed on {channel}, stream id: {stream_id}: {reason}")]
    RegistrationFailed {
        /// Channel URI.
        channel: String,
        /// Stream id.
        stream_id: i32,
        /// Transport-supplied reason.
        reason: String,
    },
}

/// Outcome of a publication offer that did not append the message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OfferError {
    /// No subscriber is connected.
    #[error("publication is not connected")]
    NotConnected,

    /// Flow control is holding the publication back.
    #[error("publication is back pressured")]
    BackPressured,

    /// An administrative action (e.g. term rotation) interrupted the offer.
    #[error("offer interrupted by administrative action")]
    AdminAction,

    /// The publication has been closed.
    #[error("publication is closed")]
    Closed,

    /// The publication reached its maximum position.
    #[error("publication reached its maximum position")]
    MaxPositionExceeded,
}

impl OfferError {
    /// Check if repeating the offer may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OfferError::NotConnected | OfferError::BackPressured | OfferError::AdminAction
        )
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
