//! Owned, uninitialized allocation used while building replacement storage.

use std::mem;
use std::ptr::NonNull;

use nexus_alloc::Allocator;

use crate::Error;

/// Allocate room for `n` values of `T`, reporting oversize requests as
/// [`Error::LengthError`].
#[inline]
pub(crate) fn allocate<T, A: Allocator>(alloc: &A, n: usize) -> Result<NonNull<T>, Error> {
    let max = alloc.max_size::<T>();
    if n > max {
        return Err(Error::LengthError { requested: n, max });
    }
    Ok(alloc.allocate::<T>(n)?)
}

/// Storage for `cap` values that is released on drop unless committed.
///
/// Holds no initialized values; whoever writes into it is responsible for
/// dropping them before the guard runs.
pub(crate) struct RawBuf<'a, T, A: Allocator> {
    ptr: NonNull<T>,
    cap: usize,
    alloc: &'a A,
}

impl<'a, T, A: Allocator> RawBuf<'a, T, A> {
    #[inline]
    pub(crate) fn new(alloc: &'a A, cap: usize) -> Result<Self, Error> {
        let ptr = allocate::<T, A>(alloc, cap)?;
        Ok(Self { ptr, cap, alloc })
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Keep the allocation; the caller now owns it.
    #[inline]
    pub(crate) fn into_raw(self) -> NonNull<T> {
        let ptr = self.ptr;
        mem::forget(self);
        ptr
    }
}

impl<T, A: Allocator> Drop for RawBuf<'_, T, A> {
    fn drop(&mut self) {
        unsafe { self.alloc.deallocate(self.ptr, self.cap) }
    }
}
