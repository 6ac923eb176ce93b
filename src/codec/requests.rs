//! Control requests (client -> archive).

use super::buffer::{Reader, put_var_string};
use super::error::CodecError;
use super::header::MessageHeader;
use crate::core::{
    MESSAGE_HEADER_SIZE, PROTOCOL_SEMANTIC_VERSION, TEMPLATE_CLOSE_SESSION_REQUEST,
    TEMPLATE_CONNECT_REQUEST,
};

/// Request to open a control session.
///
/// Wire format (after the header):
/// ```text
/// +0   Correlation Id      (i64 LE)
/// +8   Response Stream Id  (i32 LE)
/// +12  Version             (i32 LE)
/// +16  Response Channel    (u32 LE length + UTF-8)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Correlation id the archive echoes in its response.
    pub correlation_id: i64,
    /// Stream the archive should respond on.
    pub response_stream_id: i32,
    /// Semantic version of the client protocol.
    pub version: i32,
    /// Channel the archive should respond on.
    pub response_channel: String,
}

impl ConnectRequest {
    /// Fixed block length.
    pub const BLOCK_LENGTH: u16 = 16;

    /// Connect request at this client's protocol version.
    pub fn new(correlation_id: i64, response_stream_id: i32, response_channel: &str) -> Self {
        Self {
            correlation_id,
            response_stream_id,
            version: PROTOCOL_SEMANTIC_VERSION,
            response_channel: response_channel.to_owned(),
        }
    }

    /// Append wire format to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        MessageHeader::new(TEMPLATE_CONNECT_REQUEST, Self::BLOCK_LENGTH).encode_into(buf);
        buf.extend_from_slice(&self.correlation_id.to_le_bytes());
        buf.extend_from_slice(&self.response_stream_id.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
        put_var_string(buf, "response_channel", &self.response_channel)
    }

    /// Decode a complete message.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let header = MessageHeader::decode_archive(data)?;
        header.expect(TEMPLATE_CONNECT_REQUEST, Self::BLOCK_LENGTH)?;

        let mut reader = Reader::new(data, MESSAGE_HEADER_SIZE);
        let correlation_id = reader.i64()?;
        let response_stream_id = reader.i32()?;
        let version = reader.i32()?;
        reader.seek(header.var_data_offset());
        let response_channel = reader.var_string("response_channel")?;

        Ok(Self {
            correlation_id,
            response_stream_id,
            version,
            response_channel,
        })
    }
}

/// Request to close a control session.
///
/// Wire format (after the header):
/// ```text
/// +0   Control Session Id  (i64 LE)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseSessionRequest {
    /// Session to close.
    pub control_session_id: i64,
}

impl CloseSessionRequest {
    /// Fixed block length.
    pub const BLOCK_LENGTH: u16 = 8;

    /// Append wire format to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        MessageHeader::new(TEMPLATE_CLOSE_SESSION_REQUEST, Self::BLOCK_LENGTH).encode_into(buf);
        buf.extend_from_slice(&self.control_session_id.to_le_bytes());
    }

    /// Decode a complete message.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let header = MessageHeader::decode_archive(data)?;
        header.expect(TEMPLATE_CLOSE_SESSION_REQUEST, Self::BLOCK_LENGTH)?;

        let mut reader = Reader::new(data, MESSAGE_HEADER_SIZE);
        Ok(Self {
            control_session_id: reader.i64()?,
        })
    }
}
