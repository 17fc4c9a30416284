//! nexus-alloc - Size-class pool allocator and raw-storage toolkit.
//!
//! The building blocks the nexus containers sit on:
//!
//! - [`Pool`]: segregated free lists over bump-allocated arena chunks. Small
//!   requests (up to 256 bytes by default) are rounded to 16-byte size classes
//!   and recycled; anything larger goes to the system heap.
//! - [`Allocator`]: the typed, stateless allocator interface containers are
//!   generic over, with [`PoolAllocator`] (per-layout thread-local pools) and
//!   [`System`] implementations.
//! - [`raw`] and [`uninit`]: construct/destroy in place, and all-or-nothing
//!   algorithms that fill uninitialized storage.
//! - [`traits`]: compile-time type predicates used to pick fast paths.
//!
//! # Example
//!
//! ```
//! use nexus_alloc::{Pool, PoolBuilder};
//!
//! // Default geometry: 16 classes of 16..=256 bytes, 4 KiB chunks
//! let mut pool = Pool::new();
//! let block = pool.allocate(48, 8).unwrap();
//! unsafe { pool.deallocate(block, 48, 8) };
//!
//! // Custom geometry
//! let pool = PoolBuilder::default()
//!     .max_bytes(512)
//!     .block_size(64 * 1024)
//!     .build()
//!     .unwrap();
//! assert_eq!(pool.class_count(), 32);
//! ```

mod allocator;
mod meta;
mod pool;
mod sys;

pub mod raw;
pub mod traits;
pub mod uninit;

pub use allocator::{AllocError, Allocator, PoolAllocator, System, handle_alloc_error};
pub use meta::{BLOCK_UNIT, MAX_ALIGN, MAX_CLASSES};
pub use pool::{DEFAULT_BLOCK_SIZE, DEFAULT_MAX_BYTES, Pool, PoolBuilder, PoolError, PoolStats};
