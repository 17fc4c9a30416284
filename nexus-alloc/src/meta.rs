//! Size-class bookkeeping for the pool allocator.
//!
//! This module holds the pure arithmetic that maps a request to a route
//! (zero-sized, small size class, or system heap) plus the free-list cell
//! layout. The actual memory operations live in `pool.rs` - this module is
//! purely bookkeeping.

use core::ptr;

/// Largest fundamental alignment handed out by the pool.
pub const MAX_ALIGN: usize = 16;

/// Granularity of the size classes. Class `i` serves blocks of
/// `(i + 1) * BLOCK_UNIT` bytes.
pub const BLOCK_UNIT: usize = MAX_ALIGN;

/// Upper bound on the number of size classes a pool can be configured with.
pub const MAX_CLASSES: usize = 64;

/// A free block, reinterpreted as a link cell in its class free list.
#[repr(C)]
pub(crate) struct FreeBlock {
    pub next: *mut FreeBlock,
}

const _: () = assert!(core::mem::size_of::<FreeBlock>() <= BLOCK_UNIT);
const _: () = assert!(core::mem::align_of::<FreeBlock>() <= MAX_ALIGN);

/// Where a request of a given size and alignment is served from.
///
/// Allocation and deallocation both classify through [`classify`], so a
/// block always returns to the place it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Route {
    /// Zero bytes. No memory is touched.
    Zero,
    /// Served from size class `n`.
    Small(usize),
    /// Served from (and returned to) the system heap.
    Large,
}

/// Round `bytes` up to the next multiple of [`BLOCK_UNIT`].
#[inline]
pub(crate) const fn align_up(bytes: usize) -> usize {
    (bytes + BLOCK_UNIT - 1) & !(BLOCK_UNIT - 1)
}

/// Free-list index serving a request of `bytes` (`bytes > 0`).
#[inline]
pub(crate) const fn class_index(bytes: usize) -> usize {
    debug_assert!(bytes > 0);
    align_up(bytes) / BLOCK_UNIT - 1
}

/// Block size of size class `class`.
#[inline]
pub(crate) const fn class_size(class: usize) -> usize {
    (class + 1) * BLOCK_UNIT
}

/// Pure classification of a request.
///
/// Anything over-aligned or larger than `max_bytes` bypasses the pool.
#[inline]
pub(crate) const fn classify(bytes: usize, align: usize, max_bytes: usize) -> Route {
    if bytes == 0 {
        Route::Zero
    } else if align > MAX_ALIGN || bytes > max_bytes {
        Route::Large
    } else {
        Route::Small(class_index(bytes))
    }
}

/// Push `block` onto the free list rooted at `head`.
///
/// # Safety
///
/// `block` must point to at least `BLOCK_UNIT` writable bytes aligned to
/// `MAX_ALIGN` that nothing else references.
#[inline]
pub(crate) unsafe fn push_free(head: &mut *mut FreeBlock, block: *mut u8) {
    let cell = block.cast::<FreeBlock>();
    unsafe { ptr::write(cell, FreeBlock { next: *head }) };
    *head = cell;
}

/// Pop a block from the free list rooted at `head`, or null if empty.
///
/// # Safety
///
/// Every cell reachable from `head` must have been pushed by [`push_free`].
#[inline]
pub(crate) unsafe fn pop_free(head: &mut *mut FreeBlock) -> *mut u8 {
    let cell = *head;
    if cell.is_null() {
        return ptr::null_mut();
    }
    *head = unsafe { (*cell).next };
    cell.cast()
}
