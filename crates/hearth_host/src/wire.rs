//! # Wire Headers
//!
//! Fixed headers of the four record families. Layout and field order are
//! part of the wire contract ([`hearth_core::WIRE_VERSION`]).
//!
//! ```text
//! command:  correlation_id:[u8;16]  sender_id:i64                                  (24 bytes)
//! result:   tick:i64  sender_id:i64  success:u8  error_len:u16  error:[u8;len]    (19 + len)
//! event:    tick:i64                                                               (8 bytes)
//! snapshot: tick:i64                                                               (8 bytes)
//! ```
//!
//! Payloads follow the header immediately and are type-specific.

use std::fmt;

use hearth_core::{truncate_utf8, ByteReader, ByteSerializable, ByteWriter, CodecResult};

/// Simulation tick number. Starts at 1 for the first step.
pub type Tick = i64;

/// Opaque 16-byte id a producer uses to match results to commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(pub [u8; 16]);

impl CorrelationId {
    /// All zeros.
    pub const NIL: Self = Self([0; 16]);

    /// Builds an id from a 128-bit integer (little-endian bytes).
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_le_bytes())
    }

    /// The id as a 128-bit integer.
    #[must_use]
    pub const fn as_u128(&self) -> u128 {
        u128::from_le_bytes(self.0)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Header of every command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommandHeader {
    /// Producer-chosen correlation id.
    pub correlation_id: CorrelationId,
    /// Connection / player that sent the command.
    pub sender_id: i64,
}

impl CommandHeader {
    /// Encoded size.
    pub const SIZE: usize = 16 + 8;

    /// Creates a header.
    #[must_use]
    pub const fn new(correlation_id: CorrelationId, sender_id: i64) -> Self {
        Self {
            correlation_id,
            sender_id,
        }
    }

    /// Decodes a header.
    ///
    /// # Errors
    ///
    /// [`hearth_core::CodecError::UnexpectedEnd`] on short input.
    pub fn read_from(input: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            correlation_id: CorrelationId(input.read_array()?),
            sender_id: input.read_i64()?,
        })
    }
}

impl ByteSerializable for CommandHeader {
    fn size_of(&self) -> usize {
        Self::SIZE
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        out.write_bytes(&self.correlation_id.0)?;
        out.write_i64(self.sender_id)
    }
}

/// Header of every result.
///
/// Error text longer than `u16::MAX` bytes is truncated on a character
/// boundary when encoded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultHeader {
    /// Tick the command was handled in.
    pub tick: Tick,
    /// Sender of the command this answers.
    pub sender_id: i64,
    /// Whether the command succeeded.
    pub success: bool,
    /// Human-readable failure reason; empty on success.
    pub error: String,
}

impl ResultHeader {
    /// Fixed part of the encoded size.
    pub const FIXED_SIZE: usize = 8 + 8 + 1 + 2;

    /// Successful result header.
    #[must_use]
    pub fn ok(tick: Tick, sender_id: i64) -> Self {
        Self {
            tick,
            sender_id,
            success: true,
            error: String::new(),
        }
    }

    /// Failed result header.
    #[must_use]
    pub fn failure(tick: Tick, sender_id: i64, error: impl Into<String>) -> Self {
        Self {
            tick,
            sender_id,
            success: false,
            error: error.into(),
        }
    }

    fn wire_error(&self) -> &str {
        truncate_utf8(&self.error, usize::from(u16::MAX))
    }

    /// Decodes a header.
    ///
    /// # Errors
    ///
    /// Short input or invalid UTF-8 in the error text.
    pub fn read_from(input: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            tick: input.read_i64()?,
            sender_id: input.read_i64()?,
            success: input.read_bool()?,
            error: input.read_str()?.to_string(),
        })
    }
}

impl ByteSerializable for ResultHeader {
    fn size_of(&self) -> usize {
        Self::FIXED_SIZE + self.wire_error().len()
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        out.write_i64(self.tick)?;
        out.write_i64(self.sender_id)?;
        out.write_bool(self.success)?;
        out.write_str(self.wire_error())
    }
}

/// Header of every event and every snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickHeader {
    /// Tick the record was produced in.
    pub tick: Tick,
}

/// Event header.
pub type EventHeader = TickHeader;

/// Snapshot header.
pub type SnapshotHeader = TickHeader;

impl TickHeader {
    /// Encoded size.
    pub const SIZE: usize = 8;

    /// Creates a header.
    #[must_use]
    pub const fn new(tick: Tick) -> Self {
        Self { tick }
    }

    /// Decodes a header.
    ///
    /// # Errors
    ///
    /// Short input.
    pub fn read_from(input: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(Self { tick: input.read_i64()? })
    }
}

impl ByteSerializable for TickHeader {
    fn size_of(&self) -> usize {
        Self::SIZE
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        out.write_i64(self.tick)
    }
}

/// A command record.
pub trait WireCommand: ByteSerializable + Send + 'static {
    /// Fixed header.
    fn header(&self) -> &CommandHeader;
}

/// A result record.
pub trait WireResult: ByteSerializable + Send + 'static {
    /// Fixed header.
    fn header(&self) -> &ResultHeader;
}

/// An event record.
pub trait WireEvent: ByteSerializable + Send + 'static {
    /// Fixed header.
    fn header(&self) -> &EventHeader;
}

/// A snapshot record. Shared read-only across threads once published.
pub trait WireSnapshot: ByteSerializable + Send + Sync + 'static {
    /// Fixed header.
    fn header(&self) -> &SnapshotHeader;
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::{encode_to_vec, CodecError};

    #[test]
    fn test_command_header_layout() {
        let header = CommandHeader::new(CorrelationId::from_u128(0x0f0e_0d0c_0b0a_0908_0706_0504_0302_0100), -1);
        let bytes = encode_to_vec(&header).unwrap();
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[..16], &(0u8..16).collect::<Vec<_>>()[..]);
        assert_eq!(&bytes[16..], &[0xff; 8]);

        let decoded = CommandHeader::read_from(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_result_header_layout() {
        let header = ResultHeader::failure(3, 9, "no slot");
        let bytes = encode_to_vec(&header).unwrap();
        assert_eq!(bytes.len(), 19 + 7);
        assert_eq!(&bytes[..8], &3i64.to_le_bytes());
        assert_eq!(&bytes[8..16], &9i64.to_le_bytes());
        assert_eq!(bytes[16], 0);
        assert_eq!(&bytes[17..19], &7u16.to_le_bytes());
        assert_eq!(&bytes[19..], b"no slot");
    }

    #[test]
    fn test_result_error_truncated_on_char_boundary() {
        // 'é' is two bytes; 40_000 of them straddle the u16 limit
        let header = ResultHeader::failure(1, 1, "é".repeat(40_000));
        let size = header.size_of();
        assert_eq!(size, ResultHeader::FIXED_SIZE + 65_534);

        let bytes = encode_to_vec(&header).unwrap();
        assert_eq!(bytes.len(), size);
        let decoded = ResultHeader::read_from(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(decoded.error.chars().count(), 32_767);
    }

    #[test]
    fn test_tick_header() {
        let bytes = encode_to_vec(&TickHeader::new(42)).unwrap();
        assert_eq!(bytes, 42i64.to_le_bytes());
        let err = TickHeader::read_from(&mut ByteReader::new(&bytes[..4])).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEnd { .. }));
    }

    #[test]
    fn test_correlation_display() {
        assert_eq!(CorrelationId::from_u128(0xab).to_string(), format!("ab{}", "0".repeat(30)));
        assert_eq!(CorrelationId::from_u128(77).as_u128(), 77);
    }
}
