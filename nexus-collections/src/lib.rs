//! Allocator-aware generic containers.
//!
//! Owning, element-generic data structures built on the `nexus-alloc`
//! substrate. Every container is generic over an [`Allocator`] and defaults to
//! [`PoolAllocator`], which recycles small node and buffer blocks through
//! per-layout size-class pools.
//!
//! # Containers
//!
//! | Container | Layout | Notes |
//! |-----------|--------|-------|
//! | [`Vector`] | contiguous buffer | amortized O(1) `push_back`, slice access |
//! | [`Deque`] | map of fixed-size buffers | O(1) at both ends, stable element addresses on end pushes |
//! | [`List`] | doubly linked, sentinel header | O(1) splice, stable merge sort |
//! | [`Map`], [`MultiMap`], [`Set`], [`MultiSet`] | red-black tree | ordered by a [`Compare`](compare::Compare) |
//! | [`UnorderedMap`], [`UnorderedMultiMap`], [`UnorderedSet`], [`UnorderedMultiSet`] | chained hash table | prime bucket counts, load factor 1 |
//! | [`Stack`], [`Queue`], [`PriorityQueue`] | adapters | over any suitable sequence |
//!
//! # Failure model
//!
//! - Allocation failure: infallible methods abort through
//!   [`handle_alloc_error`](nexus_alloc::handle_alloc_error); every growing
//!   method has a `try_*` twin returning [`Error::OutOfMemory`].
//! - Bad index or missing key: `at`/`at_mut` return [`Error::OutOfRange`] or
//!   [`Error::KeyNotFound`]; `Index` panics.
//! - Empty containers: `front`, `back`, `top` and `pop_*` return `None`.
//! - A panicking `Clone`, `Default`, comparator or hasher unwinds through the
//!   container, which first rolls back. Operations that allocate or copy a
//!   batch of elements give the strong guarantee: afterwards the container
//!   compares equal to what it held before the call.
//!
//! # Quick Start
//!
//! ```
//! use nexus_collections::{Deque, Map, Vector};
//!
//! let mut v: Vector<u32> = Vector::new();
//! v.push_back(1);
//! v.insert_slice(1, &[2, 3]);
//! assert_eq!(v.as_slice(), &[1, 2, 3]);
//!
//! let mut d: Deque<u32> = Deque::new();
//! d.push_front(0);
//! d.push_back(9);
//! assert_eq!(d.front(), Some(&0));
//!
//! let mut prices: Map<&str, u64> = Map::new();
//! prices.insert("bid", 100);
//! prices.insert("ask", 101);
//! assert_eq!(prices.keys().copied().collect::<Vec<_>>(), ["ask", "bid"]);
//! ```
//!
//! # Positions
//!
//! Besides Rust iterators, each container exposes cursors implementing the
//! [`cursor`] traits: forward for hash tables, bidirectional for lists and
//! trees, random access for deques and for the raw element pointers of a
//! [`Vector`]. [`cursor::distance`] and
//! [`cursor::advance`] pick the cheapest walk for the cursor's category.
//!
//! [`Allocator`]: nexus_alloc::Allocator
//! [`PoolAllocator`]: nexus_alloc::PoolAllocator

#![warn(missing_docs)]

mod error;
mod raw_buf;
#[cfg(test)]
mod testing;

pub mod adapters;
pub mod compare;
pub mod cursor;
pub mod deque;
pub mod hashtable;
pub mod heap;
pub mod list;
pub mod map;
pub mod rbtree;
pub mod set;
pub mod unordered;
pub mod vector;

pub use adapters::{Queue, SequenceBack, SequenceFront, Stack};
pub use deque::Deque;
pub use error::{Error, ErrorKind};
pub use hashtable::HashTable;
pub use heap::{HeapStorage, PriorityQueue};
pub use list::List;
pub use map::{Map, MultiMap};
pub use rbtree::RbTree;
pub use set::{MultiSet, Set};
pub use unordered::{UnorderedMap, UnorderedMultiMap, UnorderedMultiSet, UnorderedSet};
pub use vector::Vector;
