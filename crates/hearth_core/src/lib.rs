//! # HEARTH Core
//!
//! Low-level primitives shared by the simulation host and the ability system:
//!
//! - **Codec**: the two-method [`ByteSerializable`] contract (`size_of`, `write_to`)
//!   with little-endian [`ByteWriter`] / [`ByteReader`] helpers
//! - **Memory**: [`BufferPool`] so steady-state encoding never touches the allocator
//! - **Sync**: [`SnapshotSlot`], a lock-free "latest value" cell for handing
//!   immutable snapshots from the simulation thread to any number of readers
//!
//! ## Example
//!
//! ```rust,ignore
//! use hearth_core::{BufferPool, ByteSerializable};
//!
//! let pool = BufferPool::new(16);
//! let bytes = pool.encode(&record)?; // exactly record.size_of() bytes
//! socket.send(&bytes)?;
//! // buffer returns to the pool when `bytes` drops
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod error;
pub mod memory;
pub mod sync;

pub use codec::{encode_to_vec, str_size, truncate_utf8, ByteReader, ByteSerializable, ByteWriter};
pub use error::{CodecError, CodecResult};
pub use memory::{BufferPool, PoolStats, PooledBuffer};
pub use sync::SnapshotSlot;

/// Version of the wire header layout.
///
/// Any change to header field order or width must bump this.
pub const WIRE_VERSION: u16 = 1;
