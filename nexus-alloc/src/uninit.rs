//! Algorithms that construct values into uninitialized storage.
//!
//! Every function here is all-or-nothing: if a `Clone`, `Default`, generator
//! or source iterator panics part way through, the values this call already
//! constructed are dropped before the panic continues. Values that existed
//! before the call are never touched by the rollback.
//!
//! Relocation (`uninit_move*`) is a bitwise copy and cannot fail. The source
//! is logically uninitialized afterwards.
//!
//! These are library-level primitives. `nexus_collections::Vector` builds on
//! `uninit_copy`, `uninit_fill_n` and `value_construct`; the move, backward,
//! bitwise and `Copy`-fill variants are public for callers managing their own
//! raw storage.

use std::mem;
use std::ptr;

use crate::raw;
use crate::traits::is_byte_sized;

// =============================================================================
// Rollback guards
// =============================================================================

/// Tracks `[start, start + len)` while it is being constructed front to back.
struct Partial<T> {
    start: *mut T,
    len: usize,
}

impl<T> Partial<T> {
    #[inline]
    fn new(start: *mut T) -> Self {
        Self { start, len: 0 }
    }

    /// Construct one more value at the end of the tracked range.
    #[inline]
    unsafe fn push(&mut self, value: T) {
        unsafe { raw::construct(self.start.add(self.len), value) };
        self.len += 1;
    }

    /// Keep the constructed values and return one past the last.
    #[inline]
    fn commit(self) -> *mut T {
        let end = unsafe { self.start.add(self.len) };
        mem::forget(self);
        end
    }
}

impl<T> Drop for Partial<T> {
    fn drop(&mut self) {
        unsafe { raw::destroy_range(self.start, self.len) }
    }
}

/// Tracks `[end - len, end)` while it is being constructed back to front.
struct PartialBack<T> {
    end: *mut T,
    len: usize,
}

impl<T> PartialBack<T> {
    #[inline]
    unsafe fn push_front(&mut self, value: T) {
        self.len += 1;
        unsafe { raw::construct(self.end.sub(self.len), value) };
    }

    #[inline]
    fn commit(self) -> *mut T {
        let first = unsafe { self.end.sub(self.len) };
        mem::forget(self);
        first
    }
}

impl<T> Drop for PartialBack<T> {
    fn drop(&mut self) {
        unsafe { raw::destroy_range(self.end.sub(self.len), self.len) }
    }
}

// =============================================================================
// Copy
// =============================================================================

/// Clone every element of `src` into `dst`. Returns one past the last written.
///
/// # Safety
///
/// `dst` must be valid for `src.len()` writes and must not overlap `src`.
pub unsafe fn uninit_copy<T: Clone>(src: &[T], dst: *mut T) -> *mut T {
    let mut guard = Partial::new(dst);
    for value in src {
        unsafe { guard.push(value.clone()) };
    }
    guard.commit()
}

/// Clone the first `n` items yielded by `src` into `dst`.
///
/// # Panics
///
/// Panics (after rolling back) if `src` yields fewer than `n` items.
///
/// # Safety
///
/// `dst` must be valid for `n` writes and must not alias any yielded item.
pub unsafe fn uninit_copy_n<'a, T, I>(src: I, n: usize, dst: *mut T) -> *mut T
where
    T: Clone + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut guard = Partial::new(dst);
    let mut src = src.into_iter();
    while guard.len < n {
        let value = src.next().expect("source yielded fewer than n items");
        unsafe { guard.push(value.clone()) };
    }
    guard.commit()
}

/// Move up to `max` values out of `iter` into `dst`.
///
/// Returns one past the last written. A panicking iterator drops the values
/// already written.
///
/// # Safety
///
/// `dst` must be valid for `max` writes.
pub unsafe fn uninit_copy_iter<T, I>(iter: I, dst: *mut T, max: usize) -> *mut T
where
    I: IntoIterator<Item = T>,
{
    let mut guard = Partial::new(dst);
    for value in iter.into_iter().take(max) {
        unsafe { guard.push(value) };
    }
    guard.commit()
}

/// Bitwise copy for `Copy` types. Cannot fail.
///
/// # Safety
///
/// `dst` must be valid for `src.len()` writes and must not overlap `src`.
#[inline]
pub unsafe fn uninit_copy_bitwise<T: Copy>(src: &[T], dst: *mut T) -> *mut T {
    unsafe {
        ptr::copy_nonoverlapping(src.as_ptr(), dst, src.len());
        dst.add(src.len())
    }
}

/// Clone `src` so that its last element lands just before `dst_end`.
///
/// Elements are cloned last to first. Returns the new first position.
///
/// # Safety
///
/// `[dst_end - src.len(), dst_end)` must be valid for writes and must not
/// overlap `src`.
pub unsafe fn uninit_copy_backward<T: Clone>(src: &[T], dst_end: *mut T) -> *mut T {
    let mut guard = PartialBack {
        end: dst_end,
        len: 0,
    };
    for value in src.iter().rev() {
        unsafe { guard.push_front(value.clone()) };
    }
    guard.commit()
}

// =============================================================================
// Move (relocation)
// =============================================================================

/// Relocate `[first, last)` to `dst`. Returns one past the last written.
///
/// # Safety
///
/// `first..last` must be initialized, `dst` valid for `last - first` writes.
/// The ranges may overlap. The source must be treated as uninitialized
/// afterwards.
#[inline]
pub unsafe fn uninit_move<T>(first: *const T, last: *const T, dst: *mut T) -> *mut T {
    let n = unsafe { last.offset_from(first) } as usize;
    unsafe { uninit_move_n(first, n, dst) }
}

/// Relocate `n` values starting at `first` to `dst`.
///
/// # Safety
///
/// See [`uninit_move`].
#[inline]
pub unsafe fn uninit_move_n<T>(first: *const T, n: usize, dst: *mut T) -> *mut T {
    unsafe {
        ptr::copy(first, dst, n);
        dst.add(n)
    }
}

/// Relocate `n` values starting at `first` so the last lands just before
/// `dst_end`. Returns the new first position.
///
/// # Safety
///
/// See [`uninit_move`].
#[inline]
pub unsafe fn uninit_move_backward<T>(first: *const T, n: usize, dst_end: *mut T) -> *mut T {
    unsafe {
        let dst = dst_end.sub(n);
        ptr::copy(first, dst, n);
        dst
    }
}

// =============================================================================
// Fill
// =============================================================================

/// Clone `value` into every slot of `[first, last)`.
///
/// # Safety
///
/// The range must be valid for writes.
#[inline]
pub unsafe fn uninit_fill<T: Clone>(first: *mut T, last: *mut T, value: &T) {
    let n = unsafe { last.offset_from(first) } as usize;
    unsafe { uninit_fill_n(first, n, value) };
}

/// Clone `value` into `n` slots starting at `first`. Returns one past the last.
///
/// # Safety
///
/// `first` must be valid for `n` writes and must not alias `value`.
pub unsafe fn uninit_fill_n<T: Clone>(first: *mut T, n: usize, value: &T) -> *mut T {
    let mut guard = Partial::new(first);
    while guard.len < n {
        unsafe { guard.push(value.clone()) };
    }
    guard.commit()
}

/// Fill `n` slots with a `Copy` value. Single-byte types become a memset.
///
/// # Safety
///
/// `first` must be valid for `n` writes.
pub unsafe fn uninit_fill_copy<T: Copy>(first: *mut T, n: usize, value: T) -> *mut T {
    unsafe {
        if is_byte_sized::<T>() {
            let byte: u8 = mem::transmute_copy(&value);
            ptr::write_bytes(first.cast::<u8>(), byte, n);
        } else {
            for i in 0..n {
                ptr::write(first.add(i), value);
            }
        }
        first.add(n)
    }
}

// =============================================================================
// Default / generated construction
// =============================================================================

/// Construct `n` default values starting at `first`.
///
/// # Safety
///
/// `first` must be valid for `n` writes.
pub unsafe fn default_construct<T: Default>(first: *mut T, n: usize) -> *mut T {
    unsafe { value_construct(first, n, T::default) }
}

/// Construct `n` values produced by `f` starting at `first`.
///
/// # Safety
///
/// `first` must be valid for `n` writes.
pub unsafe fn value_construct<T, F>(first: *mut T, n: usize, mut f: F) -> *mut T
where
    F: FnMut() -> T,
{
    let mut guard = Partial::new(first);
    while guard.len < n {
        unsafe { guard.push(f()) };
    }
    guard.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::mem::MaybeUninit;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::rc::Rc;

    /// Clone panics once `budget` clones have been made. Tracks live count.
    struct Fragile {
        value: u32,
        live: Rc<Cell<isize>>,
        budget: Rc<Cell<usize>>,
    }

    impl Fragile {
        fn new(value: u32, live: &Rc<Cell<isize>>, budget: &Rc<Cell<usize>>) -> Self {
            live.set(live.get() + 1);
            Self {
                value,
                live: live.clone(),
                budget: budget.clone(),
            }
        }
    }

    impl Clone for Fragile {
        fn clone(&self) -> Self {
            if self.budget.get() == 0 {
                panic!("clone budget exhausted");
            }
            self.budget.set(self.budget.get() - 1);
            Fragile::new(self.value, &self.live, &self.budget)
        }
    }

    impl Drop for Fragile {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    fn buffer<T, const N: usize>() -> [MaybeUninit<T>; N] {
        [const { MaybeUninit::uninit() }; N]
    }

    fn fixtures(n: u32, budget: usize) -> (Vec<Fragile>, Rc<Cell<isize>>, Rc<Cell<usize>>) {
        let live = Rc::new(Cell::new(0));
        let budget = Rc::new(Cell::new(budget));
        let src = (0..n).map(|v| Fragile::new(v, &live, &budget)).collect();
        (src, live, budget)
    }

    #[test]
    fn copy_clones_in_order() {
        let src = vec![String::from("a"), String::from("b"), String::from("c")];
        let mut dst = buffer::<String, 3>();
        let first = dst.as_mut_ptr().cast::<String>();
        unsafe {
            let end = uninit_copy(&src, first);
            assert_eq!(end.offset_from(first), 3);
            let out = std::slice::from_raw_parts(first, 3);
            assert_eq!(out, &src[..]);
            raw::destroy_range(first, 3);
        }
    }

    #[test]
    fn copy_rolls_back_on_panic() {
        let (src, live, _budget) = fixtures(5, 3);
        let mut dst = buffer::<Fragile, 5>();
        let first = dst.as_mut_ptr().cast::<Fragile>();

        let result = catch_unwind(AssertUnwindSafe(|| unsafe { uninit_copy(&src, first) }));
        assert!(result.is_err());
        // Only the source survives
        assert_eq!(live.get(), 5);
        drop(src);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn copy_n_takes_prefix() {
        let src = [1, 2, 3, 4, 5];
        let mut dst = buffer::<i32, 3>();
        let first = dst.as_mut_ptr().cast::<i32>();
        unsafe {
            uninit_copy_n(src.iter(), 3, first);
            assert_eq!(std::slice::from_raw_parts(first, 3), &[1, 2, 3]);
        }
    }

    #[test]
    fn copy_n_short_source_panics_and_rolls_back() {
        let (src, live, _budget) = fixtures(2, 10);
        let mut dst = buffer::<Fragile, 4>();
        let first = dst.as_mut_ptr().cast::<Fragile>();

        let result = catch_unwind(AssertUnwindSafe(|| unsafe {
            uninit_copy_n(src.iter(), 4, first)
        }));
        assert!(result.is_err());
        assert_eq!(live.get(), 2);
    }

    #[test]
    fn copy_iter_respects_max() {
        let mut dst = buffer::<u64, 4>();
        let first = dst.as_mut_ptr().cast::<u64>();
        unsafe {
            let end = uninit_copy_iter(10..100u64, first, 4);
            assert_eq!(end.offset_from(first), 4);
            assert_eq!(std::slice::from_raw_parts(first, 4), &[10, 11, 12, 13]);

            let end = uninit_copy_iter(0..2u64, first, 4);
            assert_eq!(end.offset_from(first), 2);
        }
    }

    #[test]
    fn copy_bitwise() {
        let src = [7u16; 9];
        let mut dst = buffer::<u16, 9>();
        let first = dst.as_mut_ptr().cast::<u16>();
        unsafe {
            uninit_copy_bitwise(&src, first);
            assert_eq!(std::slice::from_raw_parts(first, 9), &src);
        }
    }

    #[test]
    fn copy_backward_fills_tail() {
        let src = [1, 2, 3];
        let mut dst = buffer::<i32, 5>();
        let base = dst.as_mut_ptr().cast::<i32>();
        unsafe {
            let first = uninit_copy_backward(&src, base.add(5));
            assert_eq!(first, base.add(2));
            assert_eq!(std::slice::from_raw_parts(first, 3), &[1, 2, 3]);
        }
    }

    #[test]
    fn copy_backward_rolls_back_on_panic() {
        let (src, live, _budget) = fixtures(4, 2);
        let mut dst = buffer::<Fragile, 4>();
        let end = unsafe { dst.as_mut_ptr().cast::<Fragile>().add(4) };

        let result = catch_unwind(AssertUnwindSafe(|| unsafe {
            uninit_copy_backward(&src, end)
        }));
        assert!(result.is_err());
        assert_eq!(live.get(), 4);
    }

    #[test]
    fn move_overlapping_forward_and_backward() {
        let mut data = [1, 2, 3, 4, 5, 0, 0];
        let p = data.as_mut_ptr();
        unsafe {
            // shift right by two
            uninit_move_backward(p, 5, p.add(7));
        }
        assert_eq!(&data[2..], &[1, 2, 3, 4, 5]);

        let p = data.as_mut_ptr();
        unsafe {
            uninit_move(p.add(2), p.add(7), p);
        }
        assert_eq!(&data[..5], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn fill_clones_value() {
        let mut dst = buffer::<String, 3>();
        let first = dst.as_mut_ptr().cast::<String>();
        let last = unsafe { first.add(3) };
        let value = String::from("x");
        unsafe {
            uninit_fill(first, last, &value);
            assert!(std::slice::from_raw_parts(first, 3).iter().all(|s| s == "x"));
            raw::destroy_range(first, 3);
        }
    }

    #[test]
    fn fill_n_rolls_back_on_panic() {
        let (src, live, _budget) = fixtures(1, 3);
        let mut dst = buffer::<Fragile, 6>();
        let first = dst.as_mut_ptr().cast::<Fragile>();

        let result = catch_unwind(AssertUnwindSafe(|| unsafe {
            uninit_fill_n(first, 6, &src[0])
        }));
        assert!(result.is_err());
        assert_eq!(live.get(), 1);
    }

    #[test]
    fn fill_copy_bytes_and_words() {
        let mut bytes = buffer::<u8, 64>();
        let first = bytes.as_mut_ptr().cast::<u8>();
        unsafe {
            uninit_fill_copy(first, 64, 0x5A);
            assert!(std::slice::from_raw_parts(first, 64).iter().all(|&b| b == 0x5A));
        }

        let mut flags = buffer::<bool, 8>();
        let first = flags.as_mut_ptr().cast::<bool>();
        unsafe {
            uninit_fill_copy(first, 8, true);
            assert!(std::slice::from_raw_parts(first, 8).iter().all(|&b| b));
        }

        let mut words = buffer::<u32, 5>();
        let first = words.as_mut_ptr().cast::<u32>();
        unsafe {
            uninit_fill_copy(first, 5, 0xDEAD_BEEF);
            assert_eq!(std::slice::from_raw_parts(first, 5), &[0xDEAD_BEEF; 5]);
        }
    }

    #[test]
    fn default_and_value_construct() {
        let mut dst = buffer::<Vec<u8>, 3>();
        let first = dst.as_mut_ptr().cast::<Vec<u8>>();
        unsafe {
            default_construct(first, 3);
            assert!(std::slice::from_raw_parts(first, 3).iter().all(Vec::is_empty));
            raw::destroy_range(first, 3);
        }

        let mut counter = 0;
        let mut dst = buffer::<i32, 4>();
        let first = dst.as_mut_ptr().cast::<i32>();
        unsafe {
            value_construct(first, 4, || {
                counter += 10;
                counter
            });
            assert_eq!(std::slice::from_raw_parts(first, 4), &[10, 20, 30, 40]);
        }
    }

    #[test]
    fn value_construct_rolls_back_on_panic() {
        let live = Rc::new(Cell::new(0));
        let budget = Rc::new(Cell::new(0));
        let mut made = 0;
        let mut dst = buffer::<Fragile, 5>();
        let first = dst.as_mut_ptr().cast::<Fragile>();

        let result = catch_unwind(AssertUnwindSafe(|| unsafe {
            value_construct(first, 5, || {
                made += 1;
                if made == 4 {
                    panic!("generator failed");
                }
                Fragile::new(made, &live, &budget)
            })
        }));
        assert!(result.is_err());
        assert_eq!(live.get(), 0);
    }
}
