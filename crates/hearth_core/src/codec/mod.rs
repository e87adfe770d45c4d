//! # Byte Codec
//!
//! The contract every wire-visible type implements.
//!
//! ## Layout Rules
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────┐
//! │ Header (fixed, per family)   │ Payload (type-specific)      │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! - All integers and floats are little-endian, fixed width
//! - Strings are `u16` length + UTF-8 bytes
//! - `write_to` must write exactly `size_of` bytes; [`ByteSerializable::encode`]
//!   enforces this and fails with [`CodecError::SizeMismatch`] otherwise

mod reader;
mod writer;

pub use reader::ByteReader;
pub use writer::{str_size, truncate_utf8, ByteWriter};

use crate::error::{CodecError, CodecResult};

/// Two-method binary codec contract.
///
/// Implementors report their encoded size up front so callers can rent a
/// correctly sized buffer before writing.
pub trait ByteSerializable {
    /// Exact number of bytes `write_to` will produce.
    fn size_of(&self) -> usize;

    /// Writes the value at the writer's current position.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::BufferTooSmall`] if the writer runs out of room.
    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()>;

    /// Encodes into `buf` from offset zero and returns the bytes written.
    ///
    /// # Errors
    ///
    /// Propagates writer errors, and returns [`CodecError::SizeMismatch`]
    /// when the written length disagrees with `size_of`.
    fn encode(&self, buf: &mut [u8]) -> CodecResult<usize> {
        let expected = self.size_of();
        let mut out = ByteWriter::new(buf);
        self.write_to(&mut out)?;
        let written = out.position();
        if written != expected {
            return Err(CodecError::SizeMismatch { expected, written });
        }
        Ok(written)
    }
}

/// Encodes a value into a freshly allocated vector.
///
/// Prefer [`crate::BufferPool::encode`] on hot paths.
///
/// # Errors
///
/// Same as [`ByteSerializable::encode`].
pub fn encode_to_vec<T: ByteSerializable + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let mut buf = vec![0u8; value.size_of()];
    let written = value.encode(&mut buf)?;
    buf.truncate(written);
    Ok(buf)
}

impl<T: ByteSerializable + ?Sized> ByteSerializable for &T {
    fn size_of(&self) -> usize {
        (**self).size_of()
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        (**self).write_to(out)
    }
}
