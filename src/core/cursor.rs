//! Binary cursor shared by the transaction envelope and the per-type asset codecs.
//!
//! # Wire conventions
//! - Integers are little-endian unless the `_be` variant is used.
//! - Strings are UTF-8 prefixed by a single length byte counting bytes, not characters.
//! - An absent optional string is written as a lone zero length byte.
//! - Fixed-size hashes are written raw and surfaced off-wire as lowercase hex.
//!
//! # Invariants
//! - The reader never panics on short input: every read checks the remaining length first.
//! - Nothing written through `ByteWriter` can exceed the 255-byte length prefix; oversize fields are rejected.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

use crate::error::MagistrateError;

/// Largest payload a one-byte length prefix can describe.
pub const MAX_VAR_LENGTH: usize = u8::MAX as usize;

/// Errors produced while encoding or decoding transaction bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unexpected end of input at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("Field {field} is {len} bytes long, maximum is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Field {field} must be {expected} bytes, got {got}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Field {field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    #[error("Field {field} is not valid hex: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    #[error("Unknown {field} value {value}")]
    UnknownVariant { field: &'static str, value: u8 },

    #[error("Non-canonical encoding: {0}")]
    NonCanonical(String),

    #[error("Asset does not belong to transaction type {expected}")]
    AssetMismatch { expected: &'static str },

    #[error("Invalid transaction header byte {0:#04x}")]
    InvalidHeader(u8),

    #[error("Unsupported transaction version {0}")]
    UnsupportedVersion(u8),

    #[error("Vendor field is not supported by this transaction type")]
    UnexpectedVendorField,

    #[error("{0} trailing bytes after transaction body")]
    TrailingBytes(usize),
}

impl From<CodecError> for MagistrateError {
    fn from(err: CodecError) -> Self {
        MagistrateError::Codec(err)
    }
}

/// Append-only writer over a growable buffer.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: BytesMut,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_u16_le(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    pub fn write_u16_be(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    pub fn write_u32_le(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub fn write_u32_be(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    pub fn write_u64_le(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    pub fn write_u64_be(&mut self, value: u64) {
        self.buf.put_u64(value);
    }

    /// Writes raw bytes with no length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Writes a one-byte length followed by `bytes`.
    pub fn write_var_bytes(&mut self, field: &'static str, bytes: &[u8]) -> Result<(), CodecError> {
        let len = u8::try_from(bytes.len()).map_err(|_| CodecError::FieldTooLong {
            field,
            len: bytes.len(),
            max: MAX_VAR_LENGTH,
        })?;
        self.buf.put_u8(len);
        self.buf.put_slice(bytes);
        Ok(())
    }

    pub fn write_var_str(&mut self, field: &'static str, value: &str) -> Result<(), CodecError> {
        self.write_var_bytes(field, value.as_bytes())
    }

    /// Absent (or empty) values collapse to a single zero byte.
    pub fn write_optional_str(&mut self, field: &'static str, value: Option<&str>) -> Result<(), CodecError> {
        match value {
            Some(v) => self.write_var_str(field, v),
            None => {
                self.buf.put_u8(0);
                Ok(())
            }
        }
    }

    /// Decodes `hex_value` and writes exactly `len` raw bytes.
    pub fn write_hex_fixed(&mut self, field: &'static str, hex_value: &str, len: usize) -> Result<(), CodecError> {
        let bytes = decode_hex(field, hex_value)?;
        if bytes.len() != len {
            return Err(CodecError::InvalidLength {
                field,
                expected: len,
                got: bytes.len(),
            });
        }
        self.buf.put_slice(&bytes);
        Ok(())
    }

    /// Decodes `hex_value` and writes it length-prefixed.
    pub fn write_hex_var(&mut self, field: &'static str, hex_value: &str) -> Result<(), CodecError> {
        let bytes = decode_hex(field, hex_value)?;
        self.write_var_bytes(field, &bytes)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// Bounds-checked reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_exhausted(&self) -> bool {
        !self.buf.has_remaining()
    }

    pub fn ensure_exhausted(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }

    fn ensure(&self, needed: usize) -> Result<(), CodecError> {
        if self.buf.remaining() < needed {
            return Err(CodecError::UnexpectedEof {
                offset: self.offset,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        self.ensure(1)?;
        self.offset += 1;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16_le(&mut self) -> Result<u16, CodecError> {
        self.ensure(2)?;
        self.offset += 2;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_u16_be(&mut self) -> Result<u16, CodecError> {
        self.ensure(2)?;
        self.offset += 2;
        Ok(self.buf.get_u16())
    }

    pub fn read_u32_le(&mut self) -> Result<u32, CodecError> {
        self.ensure(4)?;
        self.offset += 4;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_u32_be(&mut self) -> Result<u32, CodecError> {
        self.ensure(4)?;
        self.offset += 4;
        Ok(self.buf.get_u32())
    }

    pub fn read_u64_le(&mut self) -> Result<u64, CodecError> {
        self.ensure(8)?;
        self.offset += 8;
        Ok(self.buf.get_u64_le())
    }

    pub fn read_u64_be(&mut self) -> Result<u64, CodecError> {
        self.ensure(8)?;
        self.offset += 8;
        Ok(self.buf.get_u64())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        self.ensure(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        self.offset += len;
        Ok(head)
    }

    pub fn read_var_bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_u8()? as usize;
        self.read_bytes(len)
    }

    pub fn read_var_str(&mut self, field: &'static str) -> Result<String, CodecError> {
        let bytes = self.read_var_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8 { field })
    }

    /// A zero length byte decodes to `None`.
    pub fn read_optional_str(&mut self, field: &'static str) -> Result<Option<String>, CodecError> {
        let value = self.read_var_str(field)?;
        Ok(if value.is_empty() { None } else { Some(value) })
    }

    pub fn read_hex_fixed(&mut self, len: usize) -> Result<String, CodecError> {
        Ok(hex::encode(self.read_bytes(len)?))
    }

    /// A zero length byte decodes to `None`.
    pub fn read_hex_var(&mut self) -> Result<Option<String>, CodecError> {
        let bytes = self.read_var_bytes()?;
        Ok(if bytes.is_empty() { None } else { Some(hex::encode(bytes)) })
    }
}

fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, CodecError> {
    hex::decode(value).map_err(|e| CodecError::InvalidHex {
        field,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_endianness() {
        let mut writer = ByteWriter::new();
        writer.write_u16_le(0x0102);
        writer.write_u16_be(0x0102);
        writer.write_u32_le(1);
        writer.write_u64_be(1);
        assert_eq!(
            writer.as_slice(),
            &[0x02, 0x01, 0x01, 0x02, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]
        );

        let bytes = writer.into_vec();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u16_le().unwrap(), 0x0102);
        assert_eq!(reader.read_u16_be().unwrap(), 0x0102);
        assert_eq!(reader.read_u32_le().unwrap(), 1);
        assert_eq!(reader.read_u64_be().unwrap(), 1);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_var_str_counts_bytes() {
        let mut writer = ByteWriter::new();
        writer.write_var_str("name", "é").unwrap();
        assert_eq!(writer.as_slice(), &[2, 0xc3, 0xa9]);
    }

    #[test]
    fn test_var_str_too_long() {
        let mut writer = ByteWriter::new();
        let long = "a".repeat(256);
        let err = writer.write_var_str("name", &long).unwrap_err();
        assert_eq!(
            err,
            CodecError::FieldTooLong {
                field: "name",
                len: 256,
                max: 255
            }
        );
        assert!(writer.is_empty());
    }

    #[test]
    fn test_optional_absent_and_empty_are_identical() {
        let mut absent = ByteWriter::new();
        absent.write_optional_str("vat", None).unwrap();
        let mut empty = ByteWriter::new();
        empty.write_optional_str("vat", Some("")).unwrap();
        assert_eq!(absent.as_slice(), empty.as_slice());

        let bytes = absent.into_vec();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_optional_str("vat").unwrap(), None);
    }

    #[test]
    fn test_hex_fixed_requires_exact_length() {
        let mut writer = ByteWriter::new();
        let err = writer.write_hex_fixed("genesisHash", "abcd", 32).unwrap_err();
        assert!(matches!(err, CodecError::InvalidLength { expected: 32, got: 2, .. }));
        assert!(matches!(
            writer.write_hex_fixed("genesisHash", "zz", 1),
            Err(CodecError::InvalidHex { .. })
        ));
    }

    #[test]
    fn test_reader_reports_eof_without_panicking() {
        let bytes = [3u8, b'a'];
        let mut reader = ByteReader::new(&bytes);
        let err = reader.read_var_str("name").unwrap_err();
        assert_eq!(
            err,
            CodecError::UnexpectedEof {
                offset: 1,
                needed: 3,
                remaining: 1
            }
        );
    }

    #[test]
    fn test_invalid_utf8() {
        let bytes = [1u8, 0xff];
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(
            reader.read_var_str("name").unwrap_err(),
            CodecError::InvalidUtf8 { field: "name" }
        );
    }

    #[test]
    fn test_ensure_exhausted() {
        let bytes = [1u8, 2, 3];
        let mut reader = ByteReader::new(&bytes);
        reader.read_u8().unwrap();
        assert_eq!(reader.position(), 1);
        assert_eq!(reader.ensure_exhausted(), Err(CodecError::TrailingBytes(2)));
    }
}
