//! Codec error types.

use thiserror::Error;

/// Control message encoding/decoding errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input data is shorter than required.
    #[error("message too short: expected {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum bytes required.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// The header names a schema other than the archive's.
    #[error("schema mismatch: expected {expected}, got {actual}")]
    SchemaMismatch {
        /// Archive schema id.
        expected: u16,
        /// Schema id found in the header.
        actual: u16,
    },

    /// The header names a different message than the one being decoded.
    #[error("template mismatch: expected {expected}, got {actual}")]
    TemplateMismatch {
        /// Template being decoded.
        expected: u16,
        /// Template id found in the header.
        actual: u16,
    },

    /// The announced block is shorter than this message's fixed fields.
    #[error("block too short for template {template_id}: {block_length} < {required}")]
    BlockTooShort {
        /// Template id.
        template_id: u16,
        /// Block length announced by the header.
        block_length: u16,
        /// Bytes of fixed fields this client reads.
        required: u16,
    },

    /// A string field is not valid UTF-8.
    #[error("field {0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    /// A string field does not fit its length prefix.
    #[error("field {0} is too long to encode")]
    FieldTooLong(&'static str),
}
