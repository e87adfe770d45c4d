//! # Snapshot Slot
//!
//! Lock-free single-value publication for immutable snapshots.
//!
//! ## Safety Note
//!
//! This module requires unsafe code to move `Arc`s through an `AtomicPtr`.
//! All unsafe blocks are documented with the invariant they rely on.

#![allow(unsafe_code)]
//!
//! ## Reclamation
//!
//! ```text
//!   reader:  e = epoch ─► readers[e % 2] += 1 ─► epoch still e? ─► load ptr
//!            ─► bump strong count ─► readers[e % 2] -= 1
//!   writer:  swap ptr ─► retire old at epoch e
//!            ─► readers[(e - 1) % 2] == 0? ─► drop retired before e, epoch = e + 1
//! ```
//!
//! Readers register under the epoch they observed, so the writer only has
//! to wait for the *previous* epoch's counter to drain before it may drop
//! what was retired under it. New readers land in the other counter, which
//! keeps a steady stream of loads from pinning every retired value.
//! Every counter and pointer access is `SeqCst`.

use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Latest-value cell: one publisher, any number of non-blocking readers.
///
/// ## Usage
///
/// ```rust,ignore
/// let slot = SnapshotSlot::new();
///
/// // Simulation thread
/// slot.publish(Arc::new(snapshot));
///
/// // Any thread - never blocks, never tears
/// if let Some(latest) = slot.load() {
///     render(&latest);
/// }
/// ```
pub struct SnapshotSlot<T> {
    /// Current value, produced by `Arc::into_raw`. Null before first publish.
    current: AtomicPtr<T>,
    /// Reclamation epoch. Only advanced with `retired` locked.
    epoch: AtomicUsize,
    /// Readers inside the load section, split by the parity of their epoch.
    readers: [AtomicUsize; 2],
    /// Swapped-out values tagged with the epoch they were retired in.
    retired: Mutex<Vec<(usize, Arc<T>)>>,
    /// Number of publishes, for diagnostics.
    generation: AtomicUsize,
}

impl<T> SnapshotSlot<T> {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: AtomicPtr::new(ptr::null_mut()),
            epoch: AtomicUsize::new(0),
            readers: [AtomicUsize::new(0), AtomicUsize::new(0)],
            retired: Mutex::new(Vec::new()),
            generation: AtomicUsize::new(0),
        }
    }

    /// Number of values published so far.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation.load(Ordering::Relaxed)
    }

    /// Number of retired values not yet reclaimed.
    #[must_use]
    pub fn retired_count(&self) -> usize {
        self.retired.lock().len()
    }

    /// Returns the most recently published value, or `None` before the first
    /// publish. Never blocks.
    #[must_use]
    pub fn load(&self) -> Option<Arc<T>> {
        let counter = loop {
            let epoch = self.epoch.load(Ordering::SeqCst);
            let counter = &self.readers[epoch & 1];
            counter.fetch_add(1, Ordering::SeqCst);
            if self.epoch.load(Ordering::SeqCst) == epoch {
                break counter;
            }
            // The writer advanced under us; register again under the new epoch.
            counter.fetch_sub(1, Ordering::SeqCst);
        };

        let raw = self.current.load(Ordering::SeqCst);
        let value = if raw.is_null() {
            None
        } else {
            // SAFETY: `raw` came from `Arc::into_raw` in `publish`. We are
            // counted under an epoch no older than the one `raw` can be
            // retired in, and the writer drops a retired value only after
            // that epoch's counter has drained, so the allocation is live and
            // its strong count is at least one.
            unsafe {
                Arc::increment_strong_count(raw);
                Some(Arc::from_raw(raw))
            }
        };
        counter.fetch_sub(1, Ordering::SeqCst);
        value
    }

    /// Publishes `value` as the latest. Intended for a single writer thread;
    /// concurrent writers are safe but serialize on the retire list.
    pub fn publish(&self, value: Arc<T>) {
        let raw = Arc::into_raw(value).cast_mut();
        let mut retired = self.retired.lock();
        let old = self.current.swap(raw, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::Relaxed);
        if !old.is_null() {
            // SAFETY: `old` was produced by `Arc::into_raw` and the slot owned
            // exactly one strong count for it, which we now take back.
            let value = unsafe { Arc::from_raw(old) };
            retired.push((self.epoch.load(Ordering::SeqCst), value));
        }
        self.reclaim(&mut retired);
    }

    /// Removes the current value, returning it.
    pub fn take(&self) -> Option<Arc<T>> {
        let mut retired = self.retired.lock();
        let old = self.current.swap(ptr::null_mut(), Ordering::SeqCst);
        let taken = if old.is_null() {
            None
        } else {
            // SAFETY: as in `publish`, we reclaim the slot's own strong count.
            let value = unsafe { Arc::from_raw(old) };
            retired.push((self.epoch.load(Ordering::SeqCst), Arc::clone(&value)));
            Some(value)
        };
        self.reclaim(&mut retired);
        taken
    }

    /// Advances the epoch at most twice, dropping everything retired before
    /// each epoch whose readers have drained. Two rounds empty the list when
    /// no reader is inside `load`.
    fn reclaim(&self, retired: &mut Vec<(usize, Arc<T>)>) {
        for _ in 0..2 {
            let epoch = self.epoch.load(Ordering::SeqCst);
            if self.readers[epoch.wrapping_add(1) & 1].load(Ordering::SeqCst) != 0 {
                break;
            }
            retired.retain(|(retired_in, _)| *retired_in >= epoch);
            self.epoch.store(epoch.wrapping_add(1), Ordering::SeqCst);
        }
    }
}

impl<T> Default for SnapshotSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SnapshotSlot<T> {
    fn drop(&mut self) {
        let raw = *self.current.get_mut();
        if !raw.is_null() {
            // SAFETY: `&mut self` means no reader is inside `load`; we release
            // the slot's own strong count.
            drop(unsafe { Arc::from_raw(raw) });
        }
    }
}
