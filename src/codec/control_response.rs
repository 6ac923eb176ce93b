//! Control response message (archive -> client).

use super::buffer::{Reader, put_var_string};
use super::error::CodecError;
use super::header::MessageHeader;
use crate::core::{MESSAGE_HEADER_SIZE, TEMPLATE_CONTROL_RESPONSE};

/// Outcome code carried by a [`ControlResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlResponseCode {
    /// Request succeeded.
    Ok,
    /// Request failed; the response carries an error message.
    Error,
    /// No recording matched; also ends a descriptor query early.
    RecordingUnknown,
    /// The named subscription does not exist.
    SubscriptionUnknown,
    /// Any value this client does not know.
    Unknown(i32),
}

impl ControlResponseCode {
    /// Wire value.
    pub fn value(self) -> i32 {
        match self {
            ControlResponseCode::Ok => 0,
            ControlResponseCode::Error => 1,
            ControlResponseCode::RecordingUnknown => 2,
            ControlResponseCode::SubscriptionUnknown => 3,
            ControlResponseCode::Unknown(raw) => raw,
        }
    }
}

impl From<i32> for ControlResponseCode {
    fn from(raw: i32) -> Self {
        match raw {
            0 => ControlResponseCode::Ok,
            1 => ControlResponseCode::Error,
            2 => ControlResponseCode::RecordingUnknown,
            3 => ControlResponseCode::SubscriptionUnknown,
            other => ControlResponseCode::Unknown(other),
        }
    }
}

/// Response to a control request.
///
/// Wire format (after the header):
/// ```text
/// +0   Control Session Id (i64 LE)
/// +8   Correlation Id     (i64 LE)
/// +16  Relevant Id        (i64 LE)
/// +24  Code               (i32 LE)
/// +28  Error Message      (u32 LE length + UTF-8)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlResponse {
    /// Session the response belongs to.
    pub control_session_id: i64,
    /// Request the response answers.
    pub correlation_id: i64,
    /// Result payload, e.g. the id of a created resource, or a diagnostic id on error.
    pub relevant_id: i64,
    /// Outcome.
    pub code: ControlResponseCode,
    /// Error text, empty unless `code` is an error.
    pub error_message: String,
}

impl ControlResponse {
    /// Fixed block length.
    pub const BLOCK_LENGTH: u16 = 28;

    /// Successful response.
    pub fn ok(control_session_id: i64, correlation_id: i64, relevant_id: i64) -> Self {
        Self {
            control_session_id,
            correlation_id,
            relevant_id,
            code: ControlResponseCode::Ok,
            error_message: String::new(),
        }
    }

    /// Error response.
    pub fn error(
        control_session_id: i64,
        correlation_id: i64,
        relevant_id: i64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            control_session_id,
            correlation_id,
            relevant_id,
            code: ControlResponseCode::Error,
            error_message: message.into(),
        }
    }

    /// Encode to wire format.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(
            MESSAGE_HEADER_SIZE + Self::BLOCK_LENGTH as usize + 4 + self.error_message.len(),
        );
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Append wire format to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        MessageHeader::new(TEMPLATE_CONTROL_RESPONSE, Self::BLOCK_LENGTH).encode_into(buf);
        buf.extend_from_slice(&self.control_session_id.to_le_bytes());
        buf.extend_from_slice(&self.correlation_id.to_le_bytes());
        buf.extend_from_slice(&self.relevant_id.to_le_bytes());
        buf.extend_from_slice(&self.code.value().to_le_bytes());
        put_var_string(buf, "error_message", &self.error_message)
    }

    /// Decode a complete message.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let header = MessageHeader::decode_archive(data)?;
        Self::decode_body(&header, data)
    }

    /// Decode the message after its header has been read.
    pub fn decode_body(header: &MessageHeader, data: &[u8]) -> Result<Self, CodecError> {
        header.expect(TEMPLATE_CONTROL_RESPONSE, Self::BLOCK_LENGTH)?;

        let mut reader = Reader::new(data, MESSAGE_HEADER_SIZE);
        let control_session_id = reader.i64()?;
        let correlation_id = reader.i64()?;
        let relevant_id = reader.i64()?;
        let code = ControlResponseCode::from(reader.i32()?);

        reader.seek(header.var_data_offset());
        let error_message = reader.var_string("error_message")?;

        Ok(Self {
            control_session_id,
            correlation_id,
            relevant_id,
            code,
            error_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_roundtrip() {
        let response = ControlResponse::error(5, 9, 42, "no such recording");
        let decoded = ControlResponse::decode(&response.encode().unwrap()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_unknown_code_preserved() {
        let mut response = ControlResponse::ok(1, 2, 3);
        response.code = ControlResponseCode::from(77);

        let decoded = ControlResponse::decode(&response.encode().unwrap()).unwrap();
        assert_eq!(decoded.code, ControlResponseCode::Unknown(77));
        assert_eq!(decoded.code.value(), 77);
    }

    #[test]
    fn test_decode_longer_block_from_newer_sender() {
        let response = ControlResponse::ok(1, 2, 3);
        let encoded = response.encode().unwrap();

        // Splice 4 unknown bytes onto the end of the fixed block.
        let block_end = MESSAGE_HEADER_SIZE + ControlResponse::BLOCK_LENGTH as usize;
        let mut extended = encoded[..block_end].to_vec();
        extended.extend_from_slice(&[0xAA; 4]);
        extended.extend_from_slice(&encoded[block_end..]);
        extended[0..2].copy_from_slice(&(ControlResponse::BLOCK_LENGTH + 4).to_le_bytes());

        assert_eq!(ControlResponse::decode(&extended).unwrap(), response);
    }

    #[test]
    fn test_decode_truncated_block() {
        let encoded = ControlResponse::ok(1, 2, 3).encode().unwrap();
        let result = ControlResponse::decode(&encoded[..20]);
        assert!(matches!(result, Err(CodecError::TooShort { .. })));
    }
}
