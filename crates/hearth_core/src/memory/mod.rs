//! # Memory Management
//!
//! Reusable encode buffers for zero-allocation serialization.
//!
//! ## Design Philosophy
//!
//! Buffers are rented per message and returned on drop. Once the pool is
//! warm, steady-state encoding performs:
//! - No heap allocations
//! - No frees
//! - One uncontended lock per rent/return

mod pool;

pub use pool::{BufferPool, PoolStats, PooledBuffer};
