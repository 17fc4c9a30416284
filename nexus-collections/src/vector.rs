//! Contiguous growable array over a typed allocator.
//!
//! Every growth is a fresh allocation: existing elements are relocated
//! bitwise (which cannot fail) and the old storage released. Inserts clone
//! the new values before any existing element moves, so a panicking `Clone`
//! leaves the vector exactly as it was.
//!
//! # Example
//!
//! ```
//! use nexus_collections::Vector;
//!
//! let mut v: Vector<u32> = Vector::new();
//! v.push_back(1);
//! v.push_back(4);
//! v.insert_n(1, 2, &7);
//! assert_eq!(v.as_slice(), &[1, 7, 7, 4]);
//!
//! assert_eq!(v.erase(0), 1);
//! assert_eq!(v.pop_back(), Some(4));
//! assert_eq!(v, [7, 7]);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop};
use std::ops::{Deref, DerefMut, Index, IndexMut, Range, RangeBounds};
use std::ptr::{self, NonNull};
use std::slice::{self, SliceIndex};

use nexus_alloc::uninit::{uninit_copy, uninit_fill_n, value_construct};
use nexus_alloc::{Allocator, PoolAllocator};

use crate::Error;
use crate::error::{infallible, out_of_range};
use crate::raw_buf::{self, RawBuf};

/// Growable contiguous array.
///
/// Growth doubles the capacity (`max(1, 2 * cap)`, or the required length if
/// larger). Zero-sized element types never allocate and report a capacity of
/// `usize::MAX`.
pub struct Vector<T, A: Allocator = PoolAllocator> {
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, A: Allocator + Send> Send for Vector<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for Vector<T, A> {}

// =============================================================================
// Construction (default allocator)
// =============================================================================

impl<T> Vector<T> {
    /// Creates an empty vector. Does not allocate.
    #[inline]
    pub fn new() -> Self {
        Self::new_in(PoolAllocator)
    }

    /// Creates an empty vector with room for exactly `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, PoolAllocator)
    }

    /// Fallible [`Vector::with_capacity`].
    pub fn try_with_capacity(capacity: usize) -> Result<Self, Error> {
        Self::try_with_capacity_in(capacity, PoolAllocator)
    }

    /// Creates a vector holding `n` clones of `value`.
    pub fn from_elem(n: usize, value: &T) -> Self
    where
        T: Clone,
    {
        Self::from_elem_in(n, value, PoolAllocator)
    }

    /// Creates a vector holding clones of `src`.
    pub fn from_slice(src: &[T]) -> Self
    where
        T: Clone,
    {
        Self::from_slice_in(src, PoolAllocator)
    }
}

impl<T> Default for Vector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator> Vector<T, A> {
    const IS_ZST: bool = mem::size_of::<T>() == 0;

    /// Creates an empty vector using `alloc`.
    #[inline]
    pub fn new_in(alloc: A) -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            cap: if Self::IS_ZST { usize::MAX } else { 0 },
            alloc,
            _marker: PhantomData,
        }
    }

    /// [`Vector::with_capacity`] with an explicit allocator.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        infallible(Self::try_with_capacity_in(capacity, alloc))
    }

    /// [`Vector::try_with_capacity`] with an explicit allocator.
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, Error> {
        let mut v = Self::new_in(alloc);
        v.try_reserve(capacity)?;
        Ok(v)
    }

    /// [`Vector::from_elem`] with an explicit allocator.
    pub fn from_elem_in(n: usize, value: &T, alloc: A) -> Self
    where
        T: Clone,
    {
        let mut v = Self::with_capacity_in(n, alloc);
        // A panicking clone leaves len at 0 and the buffer is released on drop
        unsafe { uninit_fill_n(v.ptr.as_ptr(), n, value) };
        v.len = n;
        v
    }

    /// [`Vector::from_slice`] with an explicit allocator.
    pub fn from_slice_in(src: &[T], alloc: A) -> Self
    where
        T: Clone,
    {
        let mut v = Self::with_capacity_in(src.len(), alloc);
        unsafe { uninit_copy(src, v.ptr.as_ptr()) };
        v.len = src.len();
        v
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if there are no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements the current storage can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Largest length the allocator can serve.
    #[inline]
    pub fn max_size(&self) -> usize {
        self.alloc.max_size::<T>()
    }

    /// The allocator.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Pointer to the first element (dangling when nothing is allocated).
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Mutable pointer to the first element.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// The elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// First element.
    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.as_slice().first()
    }

    /// Mutable first element.
    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.as_mut_slice().first_mut()
    }

    /// Last element.
    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// Mutable last element.
    #[inline]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.as_mut_slice().last_mut()
    }

    /// Checked element access.
    #[inline]
    pub fn at(&self, index: usize) -> Result<&T, Error> {
        let len = self.len;
        self.as_slice()
            .get(index)
            .ok_or(Error::OutOfRange { index, len })
    }

    /// Checked mutable element access.
    #[inline]
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, Error> {
        let len = self.len;
        self.as_mut_slice()
            .get_mut(index)
            .ok_or(Error::OutOfRange { index, len })
    }

    /// Iterator over references.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Iterator over mutable references.
    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    // =========================================================================
    // Capacity
    // =========================================================================

    /// Grow the storage to exactly `new_cap` if it is currently smaller.
    ///
    /// Unlike `Vec::reserve`, the argument is a total capacity, not an
    /// additional count.
    pub fn reserve(&mut self, new_cap: usize) {
        infallible(self.try_reserve(new_cap));
    }

    /// Fallible [`Vector::reserve`]. On error the vector is unchanged.
    pub fn try_reserve(&mut self, new_cap: usize) -> Result<(), Error> {
        if new_cap > self.cap {
            self.reallocate(new_cap)?;
        }
        Ok(())
    }

    /// Release unused capacity.
    pub fn shrink_to_fit(&mut self) {
        if Self::IS_ZST || self.cap == self.len {
            return;
        }
        if self.len == 0 {
            self.release();
            self.ptr = NonNull::dangling();
            self.cap = 0;
            return;
        }
        // Best effort: the old buffer stays if allocation fails
        if let Err(err) = self.reallocate(self.len) {
            log::debug!("vector: shrink_to_fit kept capacity {}: {err}", self.cap);
        }
    }

    /// Capacity to grow to so that `extra` more elements fit.
    fn grown_capacity(&self, extra: usize) -> Result<usize, Error> {
        let max = self.max_size();
        let needed = self.len.checked_add(extra).ok_or(Error::LengthError {
            requested: usize::MAX,
            max,
        })?;
        if needed > max {
            return Err(Error::LengthError {
                requested: needed,
                max,
            });
        }
        let doubled = self.cap.saturating_mul(2).max(1).min(max);
        Ok(needed.max(doubled))
    }

    /// Move the elements into a fresh buffer of `new_cap` slots.
    fn reallocate(&mut self, new_cap: usize) -> Result<(), Error> {
        debug_assert!(new_cap >= self.len);
        let new = raw_buf::allocate::<T, A>(&self.alloc, new_cap)?;
        unsafe { ptr::copy_nonoverlapping(self.ptr.as_ptr(), new.as_ptr(), self.len) };
        self.release();
        self.ptr = new;
        self.cap = new_cap;
        Ok(())
    }

    /// Return the buffer to the allocator. Elements must already be moved out.
    fn release(&mut self) {
        if !Self::IS_ZST && self.cap > 0 {
            unsafe { self.alloc.deallocate(self.ptr, self.cap) };
        }
    }

    // =========================================================================
    // Push / pop
    // =========================================================================

    /// Append `value`.
    #[inline]
    pub fn push_back(&mut self, value: T) {
        infallible(self.try_push_back(value));
    }

    /// Fallible [`Vector::push_back`]. On error the vector is unchanged.
    #[inline]
    pub fn try_push_back(&mut self, value: T) -> Result<(), Error> {
        if self.len == self.cap {
            let new_cap = self.grown_capacity(1)?;
            self.reallocate(new_cap)?;
        }
        unsafe { ptr::write(self.ptr.as_ptr().add(self.len), value) };
        self.len += 1;
        Ok(())
    }

    /// Remove and return the last element.
    #[inline]
    pub fn pop_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(unsafe { ptr::read(self.ptr.as_ptr().add(self.len)) })
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert `value` before `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, value: T) {
        infallible(self.try_insert(index, value));
    }

    /// Fallible [`Vector::insert`].
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<(), Error> {
        self.check_insert_index(index)?;
        self.try_push_back(value)?;
        self.as_mut_slice()[index..].rotate_right(1);
        Ok(())
    }

    /// Insert `n` clones of `value` before `index`.
    ///
    /// If a clone panics the vector is left unchanged.
    pub fn insert_n(&mut self, index: usize, n: usize, value: &T)
    where
        T: Clone,
    {
        infallible(self.try_insert_n(index, n, value));
    }

    /// Fallible [`Vector::insert_n`].
    pub fn try_insert_n(&mut self, index: usize, n: usize, value: &T) -> Result<(), Error>
    where
        T: Clone,
    {
        self.check_insert_index(index)?;
        unsafe {
            self.insert_constructed(index, n, |dst| {
                uninit_fill_n(dst, n, value);
            })
        }
    }

    /// Insert clones of `src` before `index`.
    ///
    /// If a clone panics the vector is left unchanged.
    pub fn insert_slice(&mut self, index: usize, src: &[T])
    where
        T: Clone,
    {
        infallible(self.try_insert_slice(index, src));
    }

    /// Fallible [`Vector::insert_slice`].
    pub fn try_insert_slice(&mut self, index: usize, src: &[T]) -> Result<(), Error>
    where
        T: Clone,
    {
        self.check_insert_index(index)?;
        unsafe {
            self.insert_constructed(index, src.len(), |dst| {
                uninit_copy(src, dst);
            })
        }
    }

    /// Insert clones of `self[range]` before `index`.
    ///
    /// The source elements are copied out first, so the range may overlap
    /// the insertion point.
    pub fn insert_range<R>(&mut self, index: usize, range: R)
    where
        T: Clone,
        R: RangeBounds<usize>,
    {
        let range = slice_range(range, self.len);
        let staged = Vector::from_slice_in(&self.as_slice()[range], self.alloc.clone());
        self.insert_slice(index, &staged);
    }

    /// Insert every item of `iter` before `index`, in order.
    ///
    /// If the iterator panics, the items already taken from it are dropped and
    /// the contents are as before the call.
    pub fn insert_iter<I>(&mut self, index: usize, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        if index > self.len {
            out_of_range(index, self.len);
        }

        struct Rollback<'a, T, A: Allocator> {
            vec: &'a mut Vector<T, A>,
            old_len: usize,
        }

        impl<T, A: Allocator> Drop for Rollback<'_, T, A> {
            fn drop(&mut self) {
                self.vec.truncate(self.old_len);
            }
        }

        let guard = Rollback {
            old_len: self.len,
            vec: self,
        };
        for value in iter {
            guard.vec.push_back(value);
        }
        let added = guard.vec.len - guard.old_len;
        guard.vec.as_mut_slice()[index..].rotate_right(added);
        mem::forget(guard);
    }

    /// Place `n` values before `index`, constructed by `fill` straight into
    /// their destination.
    ///
    /// `fill` must construct exactly `n` values at the pointer it is given, or
    /// construct nothing and panic.
    unsafe fn insert_constructed<F>(&mut self, index: usize, n: usize, fill: F) -> Result<(), Error>
    where
        F: FnOnce(*mut T),
    {
        if n == 0 {
            return Ok(());
        }

        if self.cap - self.len >= n {
            // Build in the spare capacity, then rotate into place
            fill(unsafe { self.ptr.as_ptr().add(self.len) });
            self.len += n;
            self.as_mut_slice()[index..].rotate_right(n);
            return Ok(());
        }

        let new_cap = self.grown_capacity(n)?;
        let buf = RawBuf::<T, A>::new(&self.alloc, new_cap)?;
        let dst = buf.as_ptr();
        unsafe {
            fill(dst.add(index));
            let src = self.ptr.as_ptr();
            ptr::copy_nonoverlapping(src, dst, index);
            ptr::copy_nonoverlapping(src.add(index), dst.add(index + n), self.len - index);
        }
        let new = buf.into_raw();
        self.release();
        self.ptr = new;
        self.cap = new_cap;
        self.len += n;
        Ok(())
    }

    #[inline]
    fn check_insert_index(&self, index: usize) -> Result<(), Error> {
        if index > self.len {
            return Err(Error::OutOfRange {
                index,
                len: self.len,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Erase
    // =========================================================================

    /// Remove and return the element at `index`, shifting the tail down.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn erase(&mut self, index: usize) -> T {
        match self.try_erase(index) {
            Ok(value) => value,
            Err(_) => out_of_range(index, self.len),
        }
    }

    /// Fallible [`Vector::erase`].
    pub fn try_erase(&mut self, index: usize) -> Result<T, Error> {
        if index >= self.len {
            return Err(Error::OutOfRange {
                index,
                len: self.len,
            });
        }
        unsafe {
            let p = self.ptr.as_ptr().add(index);
            let value = ptr::read(p);
            ptr::copy(p.add(1), p, self.len - index - 1);
            self.len -= 1;
            Ok(value)
        }
    }

    /// Remove the elements in `range`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn erase_range<R: RangeBounds<usize>>(&mut self, range: R) {
        let range = slice_range(range, self.len);
        self.erase_span(range);
    }

    /// Fallible [`Vector::erase_range`].
    pub fn try_erase_range(&mut self, range: Range<usize>) -> Result<(), Error> {
        if range.start > range.end || range.end > self.len {
            return Err(Error::OutOfRange {
                index: range.end.max(range.start),
                len: self.len,
            });
        }
        self.erase_span(range);
        Ok(())
    }

    fn erase_span(&mut self, range: Range<usize>) {
        let Range { start, end } = range;
        if start == end {
            return;
        }

        // Close the gap even if a destructor panics
        struct CloseGap<'a, T, A: Allocator> {
            vec: &'a mut Vector<T, A>,
            start: usize,
            end: usize,
            tail: usize,
        }

        impl<T, A: Allocator> Drop for CloseGap<'_, T, A> {
            fn drop(&mut self) {
                unsafe {
                    let base = self.vec.ptr.as_ptr();
                    ptr::copy(base.add(self.end), base.add(self.start), self.tail);
                }
                self.vec.len = self.start + self.tail;
            }
        }

        let tail = self.len - end;
        self.len = start;
        let guard = CloseGap {
            vec: self,
            start,
            end,
            tail,
        };
        unsafe {
            let first = guard.vec.ptr.as_ptr().add(start);
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(first, end - start));
        }
        drop(guard);
    }

    /// Keep only the elements for which `keep` returns `true`, in order.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.retain_mut(|value| keep(value));
    }

    /// [`Vector::retain`] with mutable access.
    pub fn retain_mut<F>(&mut self, mut keep: F)
    where
        F: FnMut(&mut T) -> bool,
    {
        struct Backshift<'a, T, A: Allocator> {
            vec: &'a mut Vector<T, A>,
            processed: usize,
            deleted: usize,
            original: usize,
        }

        impl<T, A: Allocator> Drop for Backshift<'_, T, A> {
            fn drop(&mut self) {
                if self.deleted > 0 {
                    unsafe {
                        let base = self.vec.ptr.as_ptr();
                        ptr::copy(
                            base.add(self.processed),
                            base.add(self.processed - self.deleted),
                            self.original - self.processed,
                        );
                    }
                }
                self.vec.len = self.original - self.deleted;
            }
        }

        let original = self.len;
        self.len = 0;
        let mut g = Backshift {
            vec: self,
            processed: 0,
            deleted: 0,
            original,
        };

        while g.processed < original {
            let cur = unsafe { g.vec.ptr.as_ptr().add(g.processed) };
            if keep(unsafe { &mut *cur }) {
                if g.deleted > 0 {
                    unsafe { ptr::copy_nonoverlapping(cur, cur.sub(g.deleted), 1) };
                }
                g.processed += 1;
            } else {
                g.processed += 1;
                g.deleted += 1;
                unsafe { ptr::drop_in_place(cur) };
            }
        }
    }

    /// Drop the elements past `len`.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = self.len - len;
        self.len = len;
        unsafe {
            let first = self.ptr.as_ptr().add(len);
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(first, tail));
        }
    }

    /// Drop every element. Capacity is kept.
    #[inline]
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    // =========================================================================
    // Resize / assign
    // =========================================================================

    /// Resize to `new_len`, filling with `T::default()`.
    pub fn resize(&mut self, new_len: usize)
    where
        T: Default,
    {
        self.resize_with(new_len, T::default);
    }

    /// Resize to `new_len`, filling with values produced by `f`.
    ///
    /// If `f` panics, the values it already produced are dropped and the
    /// length is unchanged.
    pub fn resize_with<F>(&mut self, new_len: usize, f: F)
    where
        F: FnMut() -> T,
    {
        if new_len <= self.len {
            self.truncate(new_len);
            return;
        }
        let extra = new_len - self.len;
        self.make_room(extra);
        unsafe { value_construct(self.ptr.as_ptr().add(self.len), extra, f) };
        self.len = new_len;
    }

    /// Resize to `new_len`, filling with clones of `value`.
    pub fn resize_value(&mut self, new_len: usize, value: &T)
    where
        T: Clone,
    {
        if new_len <= self.len {
            self.truncate(new_len);
            return;
        }
        let extra = new_len - self.len;
        self.make_room(extra);
        unsafe { uninit_fill_n(self.ptr.as_ptr().add(self.len), extra, value) };
        self.len = new_len;
    }

    fn make_room(&mut self, extra: usize) {
        if self.cap - self.len < extra {
            let new_cap = infallible(self.grown_capacity(extra));
            infallible(self.reallocate(new_cap));
        }
    }

    /// Replace the contents with `n` clones of `value`.
    pub fn assign_n(&mut self, n: usize, value: &T)
    where
        T: Clone,
    {
        *self = Self::from_elem_in(n, value, self.alloc.clone());
    }

    /// Replace the contents with clones of `src`.
    pub fn assign_slice(&mut self, src: &[T])
    where
        T: Clone,
    {
        *self = Self::from_slice_in(src, self.alloc.clone());
    }

    /// Replace the contents with the items of `iter`.
    pub fn assign_iter<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut fresh = Self::new_in(self.alloc.clone());
        fresh.extend(iter);
        *self = fresh;
    }

    /// Exchange contents with `other` in O(1).
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }
}

/// Resolve a range against `len`, panicking like slice indexing does.
#[track_caller]
pub(crate) fn slice_range<R: RangeBounds<usize>>(range: R, len: usize) -> Range<usize> {
    use std::ops::Bound;
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s + 1,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => e + 1,
        Bound::Excluded(&e) => e,
        Bound::Unbounded => len,
    };
    if start > end {
        panic!("range start {start} is past range end {end}");
    }
    if end > len {
        out_of_range(end, len);
    }
    start..end
}

impl<T, A: Allocator> Drop for Vector<T, A> {
    fn drop(&mut self) {
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.len));
        }
        self.release();
    }
}

// =============================================================================
// Trait impls
// =============================================================================

impl<T, A: Allocator> Deref for Vector<T, A> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for Vector<T, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, I: SliceIndex<[T]>, A: Allocator> Index<I> for Vector<T, A> {
    type Output = I::Output;

    #[inline]
    fn index(&self, index: I) -> &Self::Output {
        Index::index(self.as_slice(), index)
    }
}

impl<T, I: SliceIndex<[T]>, A: Allocator> IndexMut<I> for Vector<T, A> {
    #[inline]
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        IndexMut::index_mut(self.as_mut_slice(), index)
    }
}

impl<T: Clone, A: Allocator> Clone for Vector<T, A> {
    fn clone(&self) -> Self {
        Self::from_slice_in(self.as_slice(), self.alloc.clone())
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Vector<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, A: Allocator> PartialEq for Vector<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: PartialEq, A: Allocator, const N: usize> PartialEq<[T; N]> for Vector<T, A> {
    fn eq(&self, other: &[T; N]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq, A: Allocator> PartialEq<[T]> for Vector<T, A> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: Eq, A: Allocator> Eq for Vector<T, A> {}

impl<T: PartialOrd, A: Allocator> PartialOrd for Vector<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.as_slice().partial_cmp(other.as_slice())
    }
}

impl<T: Ord, A: Allocator> Ord for Vector<T, A> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<T: Hash, A: Allocator> Hash for Vector<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl<T, A: Allocator> Extend<T> for Vector<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        if lower > 0 {
            self.make_room(lower);
        }
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<'a, T: Clone + 'a, A: Allocator> Extend<&'a T> for Vector<T, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().cloned());
    }
}

impl<T, A: Allocator> FromIterator<T> for Vector<T, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut v = Self::new_in(A::default());
        v.extend(iter);
        v
    }
}

impl<T: Clone> From<&[T]> for Vector<T> {
    fn from(src: &[T]) -> Self {
        Self::from_slice(src)
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a Vector<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Vector<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, A: Allocator> IntoIterator for Vector<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        let this = ManuallyDrop::new(self);
        IntoIter {
            ptr: this.ptr,
            cap: this.cap,
            // SAFETY: `this` is never dropped, so the allocator is moved out once
            alloc: unsafe { ptr::read(&this.alloc) },
            head: 0,
            tail: this.len,
            _marker: PhantomData,
        }
    }
}

// =============================================================================
// IntoIter
// =============================================================================

/// Owning iterator over a [`Vector`].
pub struct IntoIter<T, A: Allocator = PoolAllocator> {
    ptr: NonNull<T>,
    cap: usize,
    alloc: A,
    head: usize,
    tail: usize,
    _marker: PhantomData<T>,
}

impl<T, A: Allocator> IntoIter<T, A> {
    /// The elements not yet yielded.
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr().add(self.head), self.tail - self.head) }
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        if self.head == self.tail {
            return None;
        }
        let value = unsafe { ptr::read(self.ptr.as_ptr().add(self.head)) };
        self.head += 1;
        Some(value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.tail - self.head;
        (n, Some(n))
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        if self.head == self.tail {
            return None;
        }
        self.tail -= 1;
        Some(unsafe { ptr::read(self.ptr.as_ptr().add(self.tail)) })
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: Allocator> Drop for IntoIter<T, A> {
    fn drop(&mut self) {
        unsafe {
            let first = self.ptr.as_ptr().add(self.head);
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(first, self.tail - self.head));
            if mem::size_of::<T>() != 0 && self.cap > 0 {
                self.alloc.deallocate(self.ptr, self.cap);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Bomb;
    use nexus_alloc::System;
    use std::cell::Cell;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::rc::Rc;

    fn values(v: &Vector<Bomb>) -> Vec<i32> {
        v.iter().map(|b| b.value).collect()
    }

    // =========================================================================
    // Basics
    // =========================================================================

    #[test]
    fn new_is_empty_without_storage() {
        let v: Vector<u64> = Vector::new();
        assert!(v.is_empty());
        assert_eq!(v.capacity(), 0);
        assert_eq!(v.front(), None);
    }

    #[test]
    fn push_back_doubles_capacity() {
        let mut v: Vector<u32> = Vector::new();
        let mut caps = Vec::new();
        for i in 0..17 {
            v.push_back(i);
            caps.push(v.capacity());
        }
        assert_eq!(&caps[..5], &[1, 2, 4, 4, 8]);
        assert_eq!(v.capacity(), 32);
        assert!(v.iter().copied().eq(0..17));
    }

    #[test]
    fn pop_back_until_empty() {
        let mut v: Vector<i32> = [1, 2, 3].into_iter().collect();
        assert_eq!(v.pop_back(), Some(3));
        assert_eq!(v.pop_back(), Some(2));
        assert_eq!(v.pop_back(), Some(1));
        assert_eq!(v.pop_back(), None);
    }

    #[test]
    fn with_capacity_is_exact() {
        let v: Vector<u8> = Vector::with_capacity(37);
        assert_eq!(v.capacity(), 37);
        assert_eq!(v.len(), 0);
    }

    #[test]
    fn at_reports_out_of_range() {
        let v: Vector<i32> = Vector::from_slice(&[1, 2]);
        assert_eq!(v.at(1), Ok(&2));
        assert_eq!(v.at(2), Err(Error::OutOfRange { index: 2, len: 2 }));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn index_panics_out_of_bounds() {
        let v: Vector<i32> = Vector::from_slice(&[1, 2]);
        let _ = v[5];
    }

    #[test]
    fn zero_sized_elements() {
        let mut v: Vector<()> = Vector::new();
        for _ in 0..1000 {
            v.push_back(());
        }
        assert_eq!(v.len(), 1000);
        assert_eq!(v.capacity(), usize::MAX);
        v.insert_n(10, 5, &());
        assert_eq!(v.len(), 1005);
        v.erase_range(0..500);
        assert_eq!(v.len(), 505);
    }

    #[test]
    fn system_allocator() {
        let mut v: Vector<String, System> = Vector::new_in(System);
        v.push_back("a".into());
        v.push_back("b".into());
        assert_eq!(v.as_slice(), &["a", "b"]);
    }

    // =========================================================================
    // Insert / erase
    // =========================================================================

    #[test]
    fn insert_middle_and_ends() {
        let mut v: Vector<i32> = Vector::from_slice(&[1, 3]);
        v.insert(1, 2);
        v.insert(0, 0);
        v.insert(4, 4);
        assert_eq!(v, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn insert_n_without_growth() {
        let mut v: Vector<i32> = Vector::with_capacity(10);
        v.extend([1, 2, 3]);
        v.insert_n(1, 3, &9);
        assert_eq!(v, [1, 9, 9, 9, 2, 3]);
        assert_eq!(v.capacity(), 10);
    }

    #[test]
    fn insert_n_with_growth() {
        let mut v: Vector<i32> = Vector::from_slice(&[1, 2, 3]);
        v.insert_n(2, 10, &0);
        assert_eq!(v.len(), 13);
        assert_eq!(&v[..3], &[1, 2, 0]);
        assert_eq!(&v[11..], &[0, 3]);
    }

    #[test]
    fn insert_slice_and_range() {
        let mut v: Vector<i32> = Vector::from_slice(&[1, 2, 3, 4]);
        v.insert_slice(2, &[7, 8]);
        assert_eq!(v, [1, 2, 7, 8, 3, 4]);

        // Range overlapping the insertion point
        v.insert_range(1, 0..3);
        assert_eq!(v, [1, 1, 2, 7, 2, 7, 8, 3, 4]);
    }

    #[test]
    fn insert_iter_preserves_order() {
        let mut v: Vector<i32> = Vector::from_slice(&[0, 10]);
        v.insert_iter(1, 1..5);
        assert_eq!(v, [0, 1, 2, 3, 4, 10]);
    }

    #[test]
    fn insert_past_end_is_error() {
        let mut v: Vector<i32> = Vector::new();
        assert_eq!(
            v.try_insert(1, 5),
            Err(Error::OutOfRange { index: 1, len: 0 })
        );
    }

    #[test]
    fn erase_and_erase_range() {
        let mut v: Vector<i32> = (0..10).collect();
        assert_eq!(v.erase(3), 3);
        v.erase_range(2..5);
        assert_eq!(v, [0, 1, 6, 7, 8, 9]);
        v.erase_range(..);
        assert!(v.is_empty());
        assert_eq!(
            v.try_erase_range(0..1),
            Err(Error::OutOfRange { index: 1, len: 0 })
        );
    }

    #[test]
    fn insert_then_erase_roundtrip() {
        let original: Vector<i32> = (0..20).collect();
        let mut v = original.clone();
        v.insert_slice(7, &[100, 200, 300]);
        v.erase_range(7..10);
        assert_eq!(v, original);
    }

    #[test]
    fn retain_keeps_order() {
        let mut v: Vector<i32> = (0..10).collect();
        v.retain(|x| x % 3 == 0);
        assert_eq!(v, [0, 3, 6, 9]);
    }

    // =========================================================================
    // Capacity
    // =========================================================================

    #[test]
    fn reserve_is_exact_and_monotonic() {
        let mut v: Vector<u64> = Vector::new();
        v.reserve(10);
        assert_eq!(v.capacity(), 10);
        v.reserve(5);
        assert_eq!(v.capacity(), 10);
    }

    #[test]
    fn reserve_beyond_max_is_length_error() {
        let mut v: Vector<u64> = Vector::new();
        let max = v.max_size();
        assert_eq!(
            v.try_reserve(max + 1),
            Err(Error::LengthError {
                requested: max + 1,
                max
            })
        );
        assert_eq!(v.capacity(), 0);
    }

    #[test]
    fn shrink_to_fit_releases_slack() {
        let mut v: Vector<u32> = Vector::with_capacity(64);
        v.extend(0..5);
        v.shrink_to_fit();
        assert_eq!(v.capacity(), 5);
        v.clear();
        v.shrink_to_fit();
        assert_eq!(v.capacity(), 0);
    }

    thread_local! {
        static REFUSE: Cell<bool> = const { Cell::new(false) };
    }

    /// System heap that refuses every request while `REFUSE` is set.
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Refusing;

    unsafe impl Allocator for Refusing {
        fn allocate<T>(&self, n: usize) -> Result<NonNull<T>, nexus_alloc::AllocError> {
            if REFUSE.with(Cell::get) {
                return Err(nexus_alloc::AllocError {
                    bytes: mem::size_of::<T>() * n,
                });
            }
            System.allocate(n)
        }

        unsafe fn deallocate<T>(&self, ptr: NonNull<T>, n: usize) {
            unsafe { System.deallocate(ptr, n) }
        }
    }

    #[test]
    fn shrink_to_fit_keeps_buffer_when_allocation_fails() {
        let mut v: Vector<u32, Refusing> = Vector::with_capacity_in(64, Refusing);
        v.extend(0..5);

        REFUSE.with(|r| r.set(true));
        v.shrink_to_fit();
        REFUSE.with(|r| r.set(false));

        assert_eq!(v.capacity(), 64);
        assert_eq!(v, [0, 1, 2, 3, 4]);
        v.shrink_to_fit();
        assert_eq!(v.capacity(), 5);
    }

    #[test]
    fn resize_variants() {
        let mut v: Vector<i32> = Vector::new();
        v.resize(3);
        assert_eq!(v, [0, 0, 0]);
        v.resize_value(5, &7);
        assert_eq!(v, [0, 0, 0, 7, 7]);
        let mut n = 0;
        v.resize_with(7, || {
            n += 1;
            n
        });
        assert_eq!(v, [0, 0, 0, 7, 7, 1, 2]);
        v.resize(2);
        assert_eq!(v, [0, 0]);
    }

    #[test]
    fn assign_replaces_contents() {
        let mut v: Vector<i32> = (0..4).collect();
        v.assign_n(2, &9);
        assert_eq!(v, [9, 9]);
        v.assign_slice(&[1, 2, 3]);
        assert_eq!(v, [1, 2, 3]);
        v.assign_iter(5..7);
        assert_eq!(v, [5, 6]);
    }

    // =========================================================================
    // Strong guarantee
    // =========================================================================

    #[test]
    fn insert_n_panic_leaves_vector_unchanged() {
        let budget = Rc::new(Cell::new(usize::MAX));
        let live = Rc::new(Cell::new(0));
        let mut v: Vector<Bomb> = Vector::new();
        for i in 0..5 {
            v.push_back(Bomb::new(i, &budget, &live));
        }
        let seed = Bomb::new(99, &budget, &live);

        for spare in [false, true] {
            if spare {
                v.reserve(64);
            }
            let cap = v.capacity();
            budget.set(2);
            let result = catch_unwind(AssertUnwindSafe(|| v.insert_n(2, 4, &seed)));
            assert!(result.is_err());
            assert_eq!(values(&v), [0, 1, 2, 3, 4]);
            assert_eq!(v.capacity(), cap);
            assert_eq!(live.get(), 6);
        }
    }

    #[test]
    fn resize_panic_rolls_back() {
        let budget = Rc::new(Cell::new(usize::MAX));
        let live = Rc::new(Cell::new(0));
        let mut v: Vector<Bomb> = Vector::new();
        v.push_back(Bomb::new(1, &budget, &live));
        let seed = Bomb::new(0, &budget, &live);

        budget.set(3);
        let result = catch_unwind(AssertUnwindSafe(|| v.resize_value(10, &seed)));
        assert!(result.is_err());
        assert_eq!(values(&v), [1]);
        assert_eq!(live.get(), 2);
    }

    #[test]
    fn clone_panic_leaks_nothing() {
        let budget = Rc::new(Cell::new(usize::MAX));
        let live = Rc::new(Cell::new(0));
        let mut v: Vector<Bomb> = Vector::new();
        for i in 0..8 {
            v.push_back(Bomb::new(i, &budget, &live));
        }
        budget.set(5);
        let result = catch_unwind(AssertUnwindSafe(|| v.clone()));
        assert!(result.is_err());
        assert_eq!(live.get(), 8);
    }

    #[test]
    fn insert_iter_panic_rolls_back() {
        let mut v: Vector<String> = Vector::from_slice(&["a".to_string(), "b".to_string()]);
        let result = catch_unwind(AssertUnwindSafe(|| {
            v.insert_iter(
                1,
                (0..5).map(|i| {
                    if i == 3 {
                        panic!("iterator failed");
                    }
                    i.to_string()
                }),
            )
        }));
        assert!(result.is_err());
        assert_eq!(v.as_slice(), &["a", "b"]);
    }

    // =========================================================================
    // Traits
    // =========================================================================

    #[test]
    fn clone_is_independent() {
        let a: Vector<String> = Vector::from_slice(&["x".to_string(), "y".to_string()]);
        let mut b = a.clone();
        assert_eq!(a, b);
        b[0].push('!');
        assert_ne!(a, b);
        assert_eq!(a[0], "x");
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a: Vector<i32> = Vector::from_slice(&[1, 2, 3]);
        let b: Vector<i32> = Vector::from_slice(&[1, 3]);
        let c: Vector<i32> = Vector::from_slice(&[1, 2]);
        assert!(a < b);
        assert!(c < a);
    }

    #[test]
    fn into_iter_drops_remaining() {
        let live = Rc::new(Cell::new(0));
        let budget = Rc::new(Cell::new(usize::MAX));
        let mut v: Vector<Bomb> = Vector::new();
        for i in 0..6 {
            v.push_back(Bomb::new(i, &budget, &live));
        }
        let mut it = v.into_iter();
        assert_eq!(it.next().map(|b| b.value), Some(0));
        assert_eq!(it.next_back().map(|b| b.value), Some(5));
        assert_eq!(it.len(), 4);
        drop(it);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn swap_exchanges_contents() {
        let mut a: Vector<i32> = Vector::from_slice(&[1]);
        let mut b: Vector<i32> = Vector::from_slice(&[2, 3]);
        a.swap(&mut b);
        assert_eq!(a, [2, 3]);
        assert_eq!(b, [1]);
    }
}
