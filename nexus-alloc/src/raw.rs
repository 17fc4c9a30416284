//! Raw-storage primitives: construct and destroy values in place.

use std::ptr;

use crate::traits::is_trivially_destructible;

/// Write `value` into uninitialized storage.
///
/// # Safety
///
/// `p` must be valid for writes and aligned for `T`. Any value already at `p`
/// is overwritten without being dropped.
#[inline]
pub unsafe fn construct<T>(p: *mut T, value: T) {
    unsafe { ptr::write(p, value) }
}

/// Write `T::default()` into uninitialized storage.
///
/// # Safety
///
/// Same as [`construct`].
#[inline]
pub unsafe fn construct_default<T: Default>(p: *mut T) {
    unsafe { ptr::write(p, T::default()) }
}

/// Drop the value at `p`, leaving the storage uninitialized.
///
/// # Safety
///
/// `p` must point to an initialized `T` that is not used afterwards.
#[inline]
pub unsafe fn destroy<T>(p: *mut T) {
    unsafe { ptr::drop_in_place(p) }
}

/// Drop `len` consecutive values starting at `first`.
///
/// A no-op when `T` needs no drop.
///
/// # Safety
///
/// `first..first + len` must hold initialized values that are not used
/// afterwards.
#[inline]
pub unsafe fn destroy_range<T>(first: *mut T, len: usize) {
    if is_trivially_destructible::<T>() || len == 0 {
        return;
    }
    unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(first, len)) }
}

/// Address of `value`, independent of any `Deref` on `T`.
#[inline]
pub fn addressof<T: ?Sized>(value: &T) -> *const T {
    ptr::from_ref(value)
}
