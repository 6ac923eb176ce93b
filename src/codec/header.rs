//! Message header shared by every control message.

use super::buffer::Reader;
use super::error::CodecError;
use crate::core::{ARCHIVE_SCHEMA_ID, ARCHIVE_SCHEMA_VERSION, MESSAGE_HEADER_SIZE};

/// Header in front of every control message.
///
/// Wire format (8 bytes):
/// ```text
/// +0  Block Length (u16 LE)
/// +2  Template Id  (u16 LE)
/// +4  Schema Id    (u16 LE)
/// +6  Version      (u16 LE)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Length of the fixed-size block following the header.
    pub block_length: u16,
    /// Message type.
    pub template_id: u16,
    /// Schema the message belongs to.
    pub schema_id: u16,
    /// Schema version of the sender.
    pub version: u16,
}

impl MessageHeader {
    /// Header for an archive message written by this client.
    pub fn new(template_id: u16, block_length: u16) -> Self {
        Self {
            block_length,
            template_id,
            schema_id: ARCHIVE_SCHEMA_ID,
            version: ARCHIVE_SCHEMA_VERSION,
        }
    }

    /// Append the header to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.block_length.to_le_bytes());
        buf.extend_from_slice(&self.template_id.to_le_bytes());
        buf.extend_from_slice(&self.schema_id.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
    }

    /// Decode a header from the start of `data`. Does not check the schema.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() < MESSAGE_HEADER_SIZE {
            return Err(CodecError::TooShort {
                expected: MESSAGE_HEADER_SIZE,
                actual: data.len(),
            });
        }

        let mut reader = Reader::new(data, 0);
        Ok(Self {
            block_length: reader.u16()?,
            template_id: reader.u16()?,
            schema_id: reader.u16()?,
            version: reader.u16()?,
        })
    }

    /// Decode a header and require the archive schema.
    pub fn decode_archive(data: &[u8]) -> Result<Self, CodecError> {
        let header = Self::decode(data)?;
        if header.schema_id != ARCHIVE_SCHEMA_ID {
            return Err(CodecError::SchemaMismatch {
                expected: ARCHIVE_SCHEMA_ID,
                actual: header.schema_id,
            });
        }
        Ok(header)
    }

    /// Require this header to describe `template_id` with at least
    /// `required` bytes of fixed block.
    pub(crate) fn expect(&self, template_id: u16, required: u16) -> Result<(), CodecError> {
        if self.template_id != template_id {
            return Err(CodecError::TemplateMismatch {
                expected: template_id,
                actual: self.template_id,
            });
        }
        if self.block_length < required {
            return Err(CodecError::BlockTooShort {
                template_id,
                block_length: self.block_length,
                required,
            });
        }
        Ok(())
    }

    /// Offset of the first var-data field.
    pub fn var_data_offset(&self) -> usize {
        MESSAGE_HEADER_SIZE + self.block_length as usize
    }
}
