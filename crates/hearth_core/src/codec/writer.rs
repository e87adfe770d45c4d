//! Little-endian writer over a caller-owned buffer.

use crate::error::{CodecError, CodecResult};

/// Writes fixed-width little-endian fields into a borrowed buffer.
///
/// Never allocates; the caller rents the buffer (usually from a
/// [`crate::BufferPool`]) and the writer only tracks the cursor.
pub struct ByteWriter<'a> {
    buffer: &'a mut [u8],
    position: usize,
}

impl<'a> ByteWriter<'a> {
    /// Creates a writer positioned at the start of `buffer`.
    #[must_use]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Bytes written so far.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Bytes still available.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// Returns the written prefix.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    #[inline]
    fn reserve(&mut self, needed: usize) -> CodecResult<&mut [u8]> {
        if needed > self.remaining() {
            return Err(CodecError::BufferTooSmall {
                needed,
                offset: self.position,
                capacity: self.buffer.len(),
            });
        }
        let start = self.position;
        self.position += needed;
        Ok(&mut self.buffer[start..start + needed])
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> CodecResult<()> {
        self.reserve(1)?[0] = value;
        Ok(())
    }

    /// Writes a bool as one byte (0 or 1).
    #[inline]
    pub fn write_bool(&mut self, value: bool) -> CodecResult<()> {
        self.write_u8(u8::from(value))
    }

    /// Writes a u16 in little-endian format.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> CodecResult<()> {
        self.reserve(2)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Writes a u32 in little-endian format.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> CodecResult<()> {
        self.reserve(4)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Writes a u64 in little-endian format.
    #[inline]
    pub fn write_u64(&mut self, value: u64) -> CodecResult<()> {
        self.reserve(8)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Writes an i64 in little-endian format.
    #[inline]
    pub fn write_i64(&mut self, value: i64) -> CodecResult<()> {
        self.reserve(8)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Writes a f32 in little-endian format.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> CodecResult<()> {
        self.reserve(4)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Writes raw bytes with no length prefix.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.reserve(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Writes a sequence length as a u16 prefix.
    ///
    /// # Errors
    ///
    /// [`CodecError::TooLong`] if `len` exceeds `u16::MAX`.
    pub fn write_len_u16(&mut self, len: usize) -> CodecResult<()> {
        let len = u16::try_from(len).map_err(|_| CodecError::TooLong {
            len,
            max: usize::from(u16::MAX),
        })?;
        self.write_u16(len)
    }

    /// Writes a string as `u16` length + UTF-8 bytes.
    ///
    /// # Errors
    ///
    /// [`CodecError::TooLong`] if the string exceeds `u16::MAX` bytes; use
    /// [`truncate_utf8`] first when truncation is acceptable.
    pub fn write_str(&mut self, value: &str) -> CodecResult<()> {
        self.write_len_u16(value.len())?;
        self.write_bytes(value.as_bytes())
    }
}

/// Encoded size of a string written with [`ByteWriter::write_str`].
#[inline]
#[must_use]
pub const fn str_size(value: &str) -> usize {
    2 + value.len()
}

/// Longest prefix of `value` that is at most `max_bytes` long and ends on a
/// character boundary.
#[must_use]
pub fn truncate_utf8(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
