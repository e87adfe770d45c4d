//! # Synchronization Primitives
//!
//! ## The Problem
//!
//! ```text
//! Simulation thread:  builds snapshot N+1
//! Consumer thread:    reads snapshot N
//!
//! Without synchronization: torn reads
//! With a Mutex:            the simulation waits on a slow consumer
//! ```
//!
//! ## The Solution: Publish a Pointer
//!
//! ```text
//! Simulation: build immutable snapshot → Arc → atomic pointer swap (release)
//! Consumer:   atomic pointer load (acquire) → clone Arc
//! ```
//!
//! The snapshot is fully built before it becomes reachable, so a reader
//! sees either the previous snapshot or the new one, never a partial one.

mod snapshot_slot;

pub use snapshot_slot::SnapshotSlot;
