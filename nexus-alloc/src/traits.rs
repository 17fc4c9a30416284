//! Compile-time type predicates.
//!
//! Containers and the uninitialized-memory algorithms branch on these to pick
//! fast paths (skip destructor loops, byte fills, dangling storage for ZSTs).

use std::mem;

use crate::meta::MAX_ALIGN;

/// Dropping a `T` runs no code.
#[inline]
pub const fn is_trivially_destructible<T>() -> bool {
    !mem::needs_drop::<T>()
}

/// `T` occupies exactly one byte.
#[inline]
pub const fn is_byte_sized<T>() -> bool {
    mem::size_of::<T>() == 1
}

/// `T` occupies no memory.
#[inline]
pub const fn is_zero_sized<T>() -> bool {
    mem::size_of::<T>() == 0
}

/// `T` can be served from pool size classes.
#[inline]
pub const fn fits_max_align<T>() -> bool {
    mem::align_of::<T>() <= MAX_ALIGN
}
