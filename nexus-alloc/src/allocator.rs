//! Typed allocator interface used by the containers.

use std::alloc::Layout;
use std::cell::RefCell;
use std::collections::HashMap;
use std::mem;
use std::ptr::NonNull;

use crate::meta::{self, Route};
use crate::pool::{DEFAULT_MAX_BYTES, Pool};
use crate::sys;

// =============================================================================
// AllocError
// =============================================================================

/// Memory could not be obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocError {
    /// Size of the failed request in bytes (saturated on overflow).
    pub bytes: usize,
}

impl std::fmt::Display for AllocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "memory allocation of {} bytes failed", self.bytes)
    }
}

impl std::error::Error for AllocError {}

// =============================================================================
// Allocator trait
// =============================================================================

/// Stateless typed allocator.
///
/// Every instance of an allocator type compares equal to every other, so
/// memory obtained through one instance may be released through any other.
/// Element-type rebinding is the generic parameter of each method.
///
/// # Safety
///
/// Implementations must return memory valid for `n` values of `T`, aligned for
/// `T`, and must accept any pointer they returned (with the same `T` and `n`)
/// in [`Allocator::deallocate`].
pub unsafe trait Allocator: Clone + Default + PartialEq {
    /// Obtain storage for `n` values of `T`.
    ///
    /// `n == 0` or a zero-sized `T` returns a dangling, aligned pointer.
    /// A byte count that overflows `usize` is reported as an error.
    fn allocate<T>(&self, n: usize) -> Result<NonNull<T>, AllocError>;

    /// Release storage obtained from [`Allocator::allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate::<T>(n)` on an allocator of this type,
    /// with the same `n`. Any live values must already have been dropped.
    unsafe fn deallocate<T>(&self, ptr: NonNull<T>, n: usize);

    /// Largest `n` for which [`Allocator::allocate`] can succeed.
    #[inline]
    fn max_size<T>(&self) -> usize {
        match mem::size_of::<T>() {
            0 => usize::MAX,
            size => usize::MAX / size,
        }
    }
}

#[inline]
fn array_bytes<T>(n: usize) -> Result<usize, AllocError> {
    mem::size_of::<T>()
        .checked_mul(n)
        .ok_or(AllocError { bytes: usize::MAX })
}

// =============================================================================
// PoolAllocator
// =============================================================================

thread_local! {
    // Leaked so the pools outlive every container on this thread, including
    // ones dropped during thread-local destruction.
    static POOLS: &'static RefCell<HashMap<(usize, usize), Pool>> =
        Box::leak(Box::new(RefCell::new(HashMap::new())));
}

/// Allocator backed by a per-element-layout [`Pool`].
///
/// All element types with the same size and alignment share one pool per
/// thread. Pools are never torn down: arena chunks stay with the process.
///
/// A pooled block released on another thread joins that thread's pool for the
/// same layout, or is leaked with a `warn!` if that thread has none. Blocks
/// above [`DEFAULT_MAX_BYTES`] or over-aligned come from the system heap and
/// go straight back to it from any thread.
///
/// ```
/// use nexus_alloc::{Allocator, PoolAllocator};
///
/// let alloc = PoolAllocator;
/// let ptr = alloc.allocate::<u64>(4).unwrap();
/// unsafe {
///     ptr.as_ptr().write(7);
///     assert_eq!(*ptr.as_ptr(), 7);
///     alloc.deallocate(ptr, 4);
/// }
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PoolAllocator;

impl PoolAllocator {
    /// Run `f` against the pool serving elements of type `T`.
    fn with_pool<T, R>(f: impl FnOnce(&mut Pool) -> R) -> R {
        let layout = Layout::new::<T>();
        POOLS.with(|pools| {
            let mut pools = pools.borrow_mut();
            let pool = pools
                .entry((layout.size(), layout.align()))
                .or_insert_with(Pool::new);
            f(pool)
        })
    }

    /// Snapshot of the shared pool's counters for element type `T`.
    pub fn stats<T>() -> crate::PoolStats {
        Self::with_pool::<T, _>(|pool| pool.stats())
    }
}

unsafe impl Allocator for PoolAllocator {
    fn allocate<T>(&self, n: usize) -> Result<NonNull<T>, AllocError> {
        let bytes = array_bytes::<T>(n)?;
        if bytes == 0 {
            return Ok(NonNull::dangling());
        }
        Self::with_pool::<T, _>(|pool| pool.allocate(bytes, mem::align_of::<T>()))
            .map(NonNull::cast)
    }

    unsafe fn deallocate<T>(&self, ptr: NonNull<T>, n: usize) {
        let bytes = mem::size_of::<T>() * n;
        let layout = Layout::new::<T>();
        match meta::classify(bytes, layout.align(), DEFAULT_MAX_BYTES) {
            Route::Zero => {}
            // Large blocks never touch a pool, so any thread can free them.
            Route::Large => unsafe { sys::free_large(ptr.cast(), bytes, layout.align()) },
            Route::Small(_) => {
                let pushed = POOLS
                    .try_with(|pools| {
                        let mut pools = pools.borrow_mut();
                        match pools.get_mut(&(layout.size(), layout.align())) {
                            Some(pool) => {
                                unsafe { pool.deallocate(ptr.cast(), bytes, layout.align()) };
                                true
                            }
                            None => false,
                        }
                    })
                    .unwrap_or(false);
                if !pushed {
                    log::warn!(
                        "pool allocator: leaking {bytes}-byte block freed on a thread without a pool for its layout"
                    );
                }
            }
        }
    }
}

// =============================================================================
// System
// =============================================================================

/// Allocator that forwards to the global heap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct System;

unsafe impl Allocator for System {
    fn allocate<T>(&self, n: usize) -> Result<NonNull<T>, AllocError> {
        let layout = Layout::array::<T>(n).map_err(|_| AllocError { bytes: usize::MAX })?;
        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr.cast()).ok_or(AllocError {
            bytes: layout.size(),
        })
    }

    unsafe fn deallocate<T>(&self, ptr: NonNull<T>, n: usize) {
        let size = mem::size_of::<T>() * n;
        if size == 0 {
            return;
        }
        // SAFETY: the same layout was validated by allocate
        let layout = unsafe { Layout::from_size_align_unchecked(size, mem::align_of::<T>()) };
        unsafe { std::alloc::dealloc(ptr.as_ptr().cast(), layout) }
    }
}

/// Abort on allocation failure the way `std` collections do.
///
/// Containers use this to build infallible methods on top of `try_*` ones.
#[inline]
pub fn handle_alloc_error(err: AllocError) -> ! {
    let layout = Layout::from_size_align(err.bytes.min(isize::MAX as usize), 1)
        .unwrap_or(Layout::new::<u8>());
    std::alloc::handle_alloc_error(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    #[repr(align(32))]
    struct Wide([u8; 32]);

    #[test]
    fn zero_length_is_dangling() {
        let ptr = PoolAllocator.allocate::<u64>(0).unwrap();
        assert_eq!(ptr, NonNull::dangling());
        unsafe { PoolAllocator.deallocate(ptr, 0) };
    }

    #[test]
    fn zero_sized_type_is_dangling() {
        let ptr = PoolAllocator.allocate::<()>(1000).unwrap();
        assert_eq!(ptr, NonNull::dangling());
        let ptr = System.allocate::<()>(1000).unwrap();
        assert_eq!(ptr, NonNull::dangling());
    }

    #[test]
    fn overflowing_count_is_an_error() {
        assert!(PoolAllocator.allocate::<u64>(usize::MAX).is_err());
        assert!(System.allocate::<u64>(usize::MAX).is_err());
    }

    #[test]
    fn max_size_by_element() {
        assert_eq!(PoolAllocator.max_size::<u8>(), usize::MAX);
        assert_eq!(PoolAllocator.max_size::<u64>(), usize::MAX / 8);
        assert_eq!(PoolAllocator.max_size::<()>(), usize::MAX);
    }

    #[test]
    fn allocators_compare_equal() {
        assert_eq!(PoolAllocator, PoolAllocator::default());
        assert_eq!(System, System::default());
    }

    #[test]
    fn pool_allocator_reuses_blocks() {
        #[derive(Clone, Copy)]
        #[allow(dead_code)]
        struct Marker([u64; 3]);

        let a = PoolAllocator.allocate::<Marker>(1).unwrap();
        unsafe { PoolAllocator.deallocate(a, 1) };
        let b = PoolAllocator.allocate::<Marker>(1).unwrap();
        assert_eq!(a, b);
        unsafe { PoolAllocator.deallocate(b, 1) };
    }

    #[test]
    fn pool_allocator_respects_alignment() {
        let ptr = PoolAllocator.allocate::<Wide>(3).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 32, 0);
        unsafe { PoolAllocator.deallocate(ptr, 3) };
    }

    #[test]
    fn pool_allocator_large_arrays() {
        let n = 10_000;
        let ptr = PoolAllocator.allocate::<u32>(n).unwrap();
        unsafe {
            for i in 0..n {
                ptr.as_ptr().add(i).write(i as u32);
            }
            assert_eq!(*ptr.as_ptr().add(n - 1), (n - 1) as u32);
            PoolAllocator.deallocate(ptr, n);
        }
    }

    #[test]
    fn large_block_freed_on_another_thread() {
        let n = 1024;
        let ptr = PoolAllocator.allocate::<u64>(n).unwrap();
        let small = PoolAllocator.allocate::<u64>(2).unwrap();
        let addrs = (ptr.as_ptr() as usize, small.as_ptr() as usize);

        let created = std::thread::spawn(move || {
            let ptr = NonNull::new(addrs.0 as *mut u64).unwrap();
            let small = NonNull::new(addrs.1 as *mut u64).unwrap();
            unsafe {
                PoolAllocator.deallocate(ptr, n);
                PoolAllocator.deallocate(small, 2);
            }
            POOLS.with(|pools| pools.borrow().len())
        })
        .join()
        .unwrap();

        // Neither release creates a pool on the freeing thread.
        assert_eq!(created, 0);
    }

    #[test]
    fn system_roundtrip() {
        let ptr = System.allocate::<u16>(100).unwrap();
        unsafe {
            ptr.as_ptr().write_bytes(0, 100);
            System.deallocate(ptr, 100);
        }
    }

    #[test]
    fn alloc_error_display() {
        assert_eq!(
            AllocError { bytes: 64 }.to_string(),
            "memory allocation of 64 bytes failed"
        );
    }
}
