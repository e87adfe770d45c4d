//! # Buffer Pool
//!
//! Free-list of byte buffers shared between threads.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::codec::ByteSerializable;
use crate::error::CodecResult;

/// Pool of reusable byte buffers.
///
/// Cloning the pool is cheap and yields another handle to the same free
/// list, so the encode side and the send side can live on different threads.
///
/// # Example
///
/// ```rust,ignore
/// let pool = BufferPool::new(32);
///
/// // Rent - O(1), no allocation once warm
/// let bytes = pool.encode(&snapshot)?;
/// transport.send(&bytes);
///
/// // Return - happens in Drop
/// drop(bytes);
/// ```
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    /// Free list of idle buffers.
    free_list: Mutex<Vec<Vec<u8>>>,
    /// Maximum number of idle buffers retained.
    capacity: usize,
    /// Counters.
    stats: Mutex<PoolStats>,
}

/// Usage counters for a [`BufferPool`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Rents served from the free list.
    pub hits: u64,
    /// Rents that had to allocate.
    pub misses: u64,
    /// Returns dropped because the free list was full.
    pub discarded: u64,
}

impl BufferPool {
    /// Creates a pool that keeps at most `capacity` idle buffers.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        Self {
            inner: Arc::new(PoolInner {
                free_list: Mutex::new(Vec::with_capacity(capacity)),
                capacity,
                stats: Mutex::new(PoolStats::default()),
            }),
        }
    }

    /// Maximum number of idle buffers kept.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of idle buffers currently in the free list.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.inner.free_list.lock().len()
    }

    /// Returns a copy of the usage counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        *self.inner.stats.lock()
    }

    /// Rents a zeroed buffer of exactly `len` bytes.
    #[must_use]
    pub fn rent(&self, len: usize) -> PooledBuffer {
        let recycled = self.inner.free_list.lock().pop();
        let mut bytes = {
            let mut stats = self.inner.stats.lock();
            if let Some(buf) = recycled {
                stats.hits += 1;
                buf
            } else {
                stats.misses += 1;
                Vec::with_capacity(len)
            }
        };
        bytes.clear();
        bytes.resize(len, 0);

        PooledBuffer {
            bytes,
            pool: Arc::clone(&self.inner),
        }
    }

    /// Encodes `value` into a rented buffer sized by its `size_of`.
    ///
    /// # Errors
    ///
    /// Propagates [`ByteSerializable::encode`] errors; a size mismatch is a
    /// bug in the value's codec and is never papered over.
    pub fn encode<T: ByteSerializable + ?Sized>(&self, value: &T) -> CodecResult<PooledBuffer> {
        let mut buf = self.rent(value.size_of());
        let written = value.encode(&mut buf.bytes)?;
        buf.bytes.truncate(written);
        Ok(buf)
    }
}

impl PoolInner {
    fn give_back(&self, bytes: Vec<u8>) {
        let mut free = self.free_list.lock();
        if free.len() < self.capacity {
            free.push(bytes);
        } else {
            drop(free);
            self.stats.lock().discarded += 1;
        }
    }
}

/// A buffer rented from a [`BufferPool`]; returned automatically on drop.
pub struct PooledBuffer {
    bytes: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl PooledBuffer {
    /// Copies the contents out, for callers that must own the bytes.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for PooledBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let bytes = std::mem::take(&mut self.bytes);
        self.pool.give_back(bytes);
    }
}
