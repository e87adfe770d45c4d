//! # Codec Error Types
//!
//! Wire-format errors. These indicate a broken codec implementation or a
//! truncated buffer and are never recovered from silently.

use thiserror::Error;

/// Errors raised while encoding or decoding wire records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The destination buffer cannot hold the next field.
    #[error("buffer too small: need {needed} bytes at offset {offset}, capacity {capacity}")]
    BufferTooSmall {
        /// Bytes the write required.
        needed: usize,
        /// Offset the write started at.
        offset: usize,
        /// Total buffer capacity.
        capacity: usize,
    },

    /// A type wrote a different number of bytes than its `size_of` promised.
    #[error("size mismatch: size_of reported {expected} bytes but write_to wrote {written}")]
    SizeMismatch {
        /// Value returned by `size_of`.
        expected: usize,
        /// Bytes actually written.
        written: usize,
    },

    /// The source buffer ended before the field was complete.
    #[error("unexpected end of input: need {needed} bytes at offset {offset}, have {remaining}")]
    UnexpectedEnd {
        /// Bytes the read required.
        needed: usize,
        /// Offset the read started at.
        offset: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// A length-prefixed string was not valid UTF-8.
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,

    /// A string or sequence does not fit its length prefix.
    #[error("field too long: {len} exceeds {max}")]
    TooLong {
        /// Actual length.
        len: usize,
        /// Maximum the prefix can express.
        max: usize,
    },

    /// A discriminant byte named no known variant.
    #[error("unknown {kind} variant {value}")]
    UnknownVariant {
        /// Type being decoded.
        kind: &'static str,
        /// Discriminant read.
        value: u8,
    },
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
