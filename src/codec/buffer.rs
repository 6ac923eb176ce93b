//! Cursor helpers shared by the message codecs.

use super::error::CodecError;
use crate::core::VAR_DATA_LENGTH_SIZE;

/// Forward-only little-endian reader over one message.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let end = self.offset + N;
        let bytes = self.data.get(self.offset..end).ok_or(CodecError::TooShort {
            expected: end,
            actual: self.data.len(),
        })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.offset = end;
        Ok(out)
    }

    pub(crate) fn u16(&mut self) -> Result<u16, CodecError> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    pub(crate) fn i32(&mut self) -> Result<i32, CodecError> {
        self.take::<4>().map(i32::from_le_bytes)
    }

    pub(crate) fn u32(&mut self) -> Result<u32, CodecError> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    pub(crate) fn i64(&mut self) -> Result<i64, CodecError> {
        self.take::<8>().map(i64::from_le_bytes)
    }

    /// Jump to an absolute offset (start of var data).
    pub(crate) fn seek(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub(crate) fn var_string(&mut self, field: &'static str) -> Result<String, CodecError> {
        let len = self.u32()? as usize;
        let end = self.offset + len;
        let bytes = self.data.get(self.offset..end).ok_or(CodecError::TooShort {
            expected: end,
            actual: self.data.len(),
        })?;
        self.offset = end;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8(field))
    }
}

pub(crate) fn put_var_string(
    buf: &mut Vec<u8>,
    field: &'static str,
    value: &str,
) -> Result<(), CodecError> {
    let len = u32::try_from(value.len()).map_err(|_| CodecError::FieldTooLong(field))?;
    buf.reserve(VAR_DATA_LENGTH_SIZE + value.len());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_reports_short_input() {
        let data = [1u8, 0, 0];
        let mut reader = Reader::new(&data, 0);
        assert_eq!(
            reader.i32(),
            Err(CodecError::TooShort {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_var_string_truncated() {
        let mut buf = Vec::new();
        put_var_string(&mut buf, "channel", "aeron:ipc").unwrap();
        buf.truncate(buf.len() - 2);

        let mut reader = Reader::new(&buf, 0);
        assert!(matches!(
            reader.var_string("channel"),
            Err(CodecError::TooShort { .. })
        ));
    }

    #[test]
    fn test_var_string_invalid_utf8() {
        let mut buf = 2u32.to_le_bytes().to_vec();
        buf.extend_from_slice(&[0xC3, 0x28]);

        let mut reader = Reader::new(&buf, 0);
        assert_eq!(
            reader.var_string("error_message"),
            Err(CodecError::InvalidUtf8("error_message"))
        );
    }
}
