//! Recording descriptor message (archive -> client).

use super::buffer::{Reader, put_var_string};
use super::error::CodecError;
use super::header::MessageHeader;
use crate::core::{MESSAGE_HEADER_SIZE, TEMPLATE_RECORDING_DESCRIPTOR};

/// Metadata describing one recorded stream.
///
/// Delivered one per frame in answer to a recording query, tagged with the
/// query's correlation id.
///
/// Wire format (after the header):
/// ```text
/// +0   Control Session Id   (i64 LE)
/// +8   Correlation Id       (i64 LE)
/// +16  Recording Id         (i64 LE)
/// +24  Start Timestamp      (i64 LE)
/// +32  Stop Timestamp       (i64 LE)
/// +40  Start Position       (i64 LE)
/// +48  Stop Position        (i64 LE)
/// +56  Initial Term Id      (i32 LE)
/// +60  Segment File Length  (i32 LE)
/// +64  Term Buffer Length   (i32 LE)
/// +68  MTU Length           (i32 LE)
/// +72  Session Id           (i32 LE)
/// +76  Stream Id            (i32 LE)
/// +80  Stripped Channel, Original Channel, Source Identity (var strings)
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingDescriptor {
    /// Session the query was issued on.
    pub control_session_id: i64,
    /// Query this descriptor answers.
    pub correlation_id: i64,
    /// Archive-assigned recording id.
    pub recording_id: i64,
    /// Wall-clock start of the recording, epoch milliseconds.
    pub start_timestamp: i64,
    /// Wall-clock stop of the recording, epoch milliseconds.
    pub stop_timestamp: i64,
    /// Stream position the recording starts at.
    pub start_position: i64,
    /// Stream position the recording stops at.
    pub stop_position: i64,
    /// Initial term id of the recorded stream.
    pub initial_term_id: i32,
    /// Length of each segment file on disk.
    pub segment_file_length: i32,
    /// Term buffer length of the recorded stream.
    pub term_buffer_length: i32,
    /// MTU of the recorded stream.
    pub mtu_length: i32,
    /// Transport session id of the recorded stream.
    pub session_id: i32,
    /// Stream id of the recorded stream.
    pub stream_id: i32,
    /// Channel URI with transient parameters removed.
    pub stripped_channel: String,
    /// Channel URI as given when recording started.
    pub original_channel: String,
    /// Identity of the source the stream came from.
    pub source_identity: String,
}

impl RecordingDescriptor {
    /// Fixed block length.
    pub const BLOCK_LENGTH: u16 = 80;

    /// Encode to wire format.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(
            MESSAGE_HEADER_SIZE
                + Self::BLOCK_LENGTH as usize
                + 12
                + self.stripped_channel.len()
                + self.original_channel.len()
                + self.source_identity.len(),
        );
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Append wire format to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        MessageHeader::new(TEMPLATE_RECORDING_DESCRIPTOR, Self::BLOCK_LENGTH).encode_into(buf);
        for value in [
            self.control_session_id,
            self.correlation_id,
            self.recording_id,
            self.start_timestamp,
            self.stop_timestamp,
            self.start_position,
            self.stop_position,
        ] {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        for value in [
            self.initial_term_id,
            self.segment_file_length,
            self.term_buffer_length,
            self.mtu_length,
            self.session_id,
            self.stream_id,
        ] {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        put_var_string(buf, "stripped_channel", &self.stripped_channel)?;
        put_var_string(buf, "original_channel", &self.original_channel)?;
        put_var_string(buf, "source_identity", &self.source_identity)
    }

    /// Decode a complete message.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let header = MessageHeader::decode_archive(data)?;
        Self::decode_body(&header, data)
    }

    /// Decode the message after its header has been read.
    pub fn decode_body(header: &MessageHeader, data: &[u8]) -> Result<Self, CodecError> {
        header.expect(TEMPLATE_RECORDING_DESCRIPTOR, Self::BLOCK_LENGTH)?;

        let mut reader = Reader::new(data, MESSAGE_HEADER_SIZE);
        let mut descriptor = Self {
            control_session_id: reader.i64()?,
            correlation_id: reader.i64()?,
            recording_id: reader.i64()?,
            start_timestamp: reader.i64()?,
            stop_timestamp: reader.i64()?,
            start_position: reader.i64()?,
            stop_position: reader.i64()?,
            initial_term_id: reader.i32()?,
            segment_file_length: reader.i32()?,
            term_buffer_length: reader.i32()?,
            mtu_length: reader.i32()?,
            session_id: reader.i32()?,
            stream_id: reader.i32()?,
            ..Self::default()
        };

        reader.seek(header.var_data_offset());
        descriptor.stripped_channel = reader.var_string("stripped_channel")?;
        descriptor.original_channel = reader.var_string("original_channel")?;
        descriptor.source_identity = reader.var_string("source_identity")?;

        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordingDescriptor {
        RecordingDescriptor {
            control_session_id: 3,
            correlation_id: 11,
            recording_id: 7,
            start_timestamp: 1_000,
            stop_timestamp: 2_000,
            start_position: 0,
            stop_position: 65_536,
            initial_term_id: 5,
            segment_file_length: 128 * 1024 * 1024,
            term_buffer_length: 64 * 1024,
            mtu_length: 1408,
            session_id: 99,
            stream_id: 1001,
            stripped_channel: "aeron:udp?endpoint=localhost:40123".into(),
            original_channel: "aeron:udp?endpoint=localhost:40123|term-length=65536".into(),
            source_identity: "127.0.0.1:51234".into(),
        }
    }

    #[test]
    fn test_descriptor_fields_survive_encoding() {
        let descriptor = sample();
        let encoded = descriptor.encode().unwrap();
        assert_eq!(&encoded[2..4], &TEMPLATE_RECORDING_DESCRIPTOR.to_le_bytes());
        assert_eq!(RecordingDescriptor::decode(&encoded).unwrap(), descriptor);
    }

    #[test]
    fn test_decode_rejects_control_response() {
        let encoded = crate::codec::ControlResponse::ok(1, 2, 3).encode().unwrap();
        assert!(matches!(
            RecordingDescriptor::decode(&encoded),
            Err(CodecError::TemplateMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_missing_source_identity() {
        let mut encoded = sample().encode().unwrap();
        let identity_len = sample().source_identity.len();
        encoded.truncate(encoded.len() - identity_len);

        assert!(matches!(
            RecordingDescriptor::decode(&encoded),
            Err(CodecError::TooShort { .. })
        ));
    }
}
