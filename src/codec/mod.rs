//! Canonical Byte Codec
//!
//! Primitive read/write operations for the Aurum wire and storage format.
//! Every multi-byte integer is little-endian; byte slices are prefixed
//! with a 32-bit signed length where a length of `0` marks an absent
//! optional field.
//!
//! ## String Framing
//!
//! Strings are framed the way a standard binary writer frames them: a
//! 7-bit-encoded unsigned varint carrying the UTF-8 byte length, followed
//! by the UTF-8 bytes. Each `1xxxxxxx` prefix byte contributes seven low
//! bits (least-significant group first); a `0xxxxxxx` byte terminates the
//! prefix. Existing on-the-wire headers depend on this exact framing, so
//! it is reproduced bit-for-bit.

use thiserror::Error;

/// Errors raised while decoding a wire buffer
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unexpected end of buffer: needed {needed} more bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("invalid length prefix: {0}")]
    InvalidLength(i64),

    #[error("string length prefix exceeds 32 bits")]
    VarintOverflow,

    #[error("invalid utf-8 in string field: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("payload of {size} bytes exceeds the {max} byte ceiling")]
    Oversize { size: usize, max: usize },

    #[error("unsupported version {0}")]
    UnsupportedVersion(i32),

    #[error("signer identifier of {0} bytes is neither an address nor a public key")]
    InvalidSigner(usize),
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Append-only writer producing the canonical byte stream
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a byte slice with a 32-bit signed length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_i32(bytes.len() as i32);
        self.buf.extend_from_slice(bytes);
    }

    /// Write an optional byte slice. Absent values are encoded as a
    /// zero length prefix and nothing else.
    pub fn write_opt_bytes(&mut self, bytes: Option<&[u8]>) {
        match bytes {
            Some(b) if !b.is_empty() => self.write_bytes(b),
            _ => self.write_i32(0),
        }
    }

    /// Write a string with the 7-bit-varint byte-length prefix.
    pub fn write_string(&mut self, value: &str) {
        let mut len = value.len() as u32;
        loop {
            let mut byte = (len & 0x7f) as u8;
            len >>= 7;
            if len != 0 {
                byte |= 0x80;
            }
            self.buf.push(byte);
            if len == 0 {
                break;
            }
        }
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor-style reader over a canonical byte stream
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, count: usize) -> CodecResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(CodecError::UnexpectedEof {
                needed: count,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_i32(&mut self) -> CodecResult<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> CodecResult<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_i64(&mut self) -> CodecResult<i64> {
        let bytes = self.take(8)?;
        Ok(i64::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Read a length-prefixed byte slice. The length must be positive.
    pub fn read_bytes(&mut self) -> CodecResult<Vec<u8>> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(CodecError::InvalidLength(len as i64));
        }
        Ok(self.take(len as usize)?.to_vec())
    }

    /// Read an optional length-prefixed byte slice; a zero length means
    /// the field is absent.
    pub fn read_opt_bytes(&mut self) -> CodecResult<Option<Vec<u8>>> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(CodecError::InvalidLength(len as i64));
        }
        if len == 0 {
            return Ok(None);
        }
        Ok(Some(self.take(len as usize)?.to_vec()))
    }

    /// Read an element count. Negative counts are malformed.
    pub fn read_count(&mut self) -> CodecResult<usize> {
        let count = self.read_i32()?;
        if count < 0 {
            return Err(CodecError::InvalidLength(count as i64));
        }
        Ok(count as usize)
    }

    /// Read a 7-bit-varint-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> CodecResult<String> {
        let mut len: u32 = 0;
        let mut shift = 0u32;
        loop {
            if shift > 28 {
                return Err(CodecError::VarintOverflow);
            }
            let byte = self.take(1)?[0];
            len |= ((byte & 0x7f) as u32) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        let bytes = self.take(len as usize)?.to_vec();
        Ok(String::from_utf8(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_round_trip() {
        let mut w = ByteWriter::new();
        w.write_u32(0xdead_beef);
        w.write_i32(-7);
        w.write_u64(u64::MAX - 1);
        w.write_i64(i64::MIN);

        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u32().unwrap(), 0xdead_beef);
        assert_eq!(r.read_i32().unwrap(), -7);
        assert_eq!(r.read_u64().unwrap(), u64::MAX - 1);
        assert_eq!(r.read_i64().unwrap(), i64::MIN);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_integers_are_little_endian() {
        let mut w = ByteWriter::new();
        w.write_u32(1);
        w.write_u64(0x0102_0304_0506_0708);

        let bytes = w.into_bytes();
        assert_eq!(&bytes[..4], &[1, 0, 0, 0]);
        assert_eq!(&bytes[4..], &[8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_optional_bytes_absent_is_zero_length() {
        let mut w = ByteWriter::new();
        w.write_opt_bytes(None);
        w.write_opt_bytes(Some(&[0xaa, 0xbb]));

        let bytes = w.into_bytes();
        assert_eq!(&bytes[..4], &[0, 0, 0, 0]);

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_opt_bytes().unwrap(), None);
        assert_eq!(r.read_opt_bytes().unwrap(), Some(vec![0xaa, 0xbb]));
    }

    #[test]
    fn test_string_framing_short() {
        // Lengths under 128 use a single prefix byte.
        let mut w = ByteWriter::new();
        w.write_string("abc");

        let bytes = w.into_bytes();
        assert_eq!(bytes, vec![3, b'a', b'b', b'c']);
    }

    #[test]
    fn test_string_framing_multibyte_prefix() {
        // 300 = 0b10_0101100 -> low seven bits first: 0xAC 0x02.
        let long = "x".repeat(300);
        let mut w = ByteWriter::new();
        w.write_string(&long);

        let bytes = w.into_bytes();
        assert_eq!(bytes[0], 0xac);
        assert_eq!(bytes[1], 0x02);
        assert_eq!(bytes.len(), 302);

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_string().unwrap(), long);
    }

    #[test]
    fn test_string_round_trip_utf8() {
        let mut w = ByteWriter::new();
        w.write_string("tx-Ω-400");
        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_string().unwrap(), "tx-Ω-400");
    }

    #[test]
    fn test_random_payload_round_trip() {
        let payload: [u8; 32] = rand::random();
        let mut w = ByteWriter::new();
        w.write_bytes(&payload);
        w.write_opt_bytes(Some(&payload));

        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_bytes().unwrap(), payload);
        assert_eq!(r.read_opt_bytes().unwrap(), Some(payload.to_vec()));
    }

    #[test]
    fn test_truncated_buffer_fails() {
        let mut w = ByteWriter::new();
        w.write_bytes(&[1, 2, 3, 4, 5]);
        let mut bytes = w.into_bytes();
        bytes.truncate(6);

        let mut r = ByteReader::new(&bytes);
        assert!(matches!(
            r.read_bytes(),
            Err(CodecError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_negative_length_prefix_fails() {
        let mut w = ByteWriter::new();
        w.write_i32(-1);
        let bytes = w.into_bytes();

        let mut r = ByteReader::new(&bytes);
        assert!(matches!(r.read_bytes(), Err(CodecError::InvalidLength(-1))));
    }

    #[test]
    fn test_varint_overflow_fails() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        let mut r = ByteReader::new(&bytes);
        assert!(matches!(r.read_string(), Err(CodecError::VarintOverflow)));
    }
}
