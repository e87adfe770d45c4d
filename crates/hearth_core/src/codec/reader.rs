//! Little-endian reader over a borrowed buffer.

use crate::error::{CodecError, CodecResult};

/// Reads fixed-width little-endian fields from a byte slice.
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader at the start of `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Bytes consumed so far.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Bytes left to read.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    #[inline]
    fn take(&mut self, needed: usize) -> CodecResult<&'a [u8]> {
        if needed > self.remaining() {
            return Err(CodecError::UnexpectedEnd {
                needed,
                offset: self.position,
                remaining: self.remaining(),
            });
        }
        let buffer = self.buffer;
        let start = self.position;
        self.position += needed;
        Ok(&buffer[start..start + needed])
    }

    #[inline]
    fn take_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads a bool (any non-zero byte is `true`).
    #[inline]
    pub fn read_bool(&mut self) -> CodecResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a little-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> CodecResult<u16> {
        self.take_array().map(u16::from_le_bytes)
    }

    /// Reads a little-endian u32.
    #[inline]
    pub fn read_u32(&mut self) -> CodecResult<u32> {
        self.take_array().map(u32::from_le_bytes)
    }

    /// Reads a little-endian u64.
    #[inline]
    pub fn read_u64(&mut self) -> CodecResult<u64> {
        self.take_array().map(u64::from_le_bytes)
    }

    /// Reads a little-endian i64.
    #[inline]
    pub fn read_i64(&mut self) -> CodecResult<i64> {
        self.take_array().map(i64::from_le_bytes)
    }

    /// Reads a little-endian f32.
    #[inline]
    pub fn read_f32(&mut self) -> CodecResult<f32> {
        self.take_array().map(f32::from_le_bytes)
    }

    /// Reads exactly `N` raw bytes.
    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        self.take_array()
    }

    /// Reads `len` raw bytes.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        self.take(len)
    }

    /// Reads a `u16`-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> CodecResult<&'a str> {
        let len = usize::from(self.read_u16()?);
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }
}
