//! Double-ended queue over fixed-size segments.
//!
//! Elements live in equally sized buffers (`max(1, 512 / size_of::<T>())`
//! slots each). A central map holds the buffer pointers, with the live ones
//! kept roughly centered so both ends can grow without moving elements:
//!
//! ```text
//!   map:  [ .. | b0 | b1 | b2 | .. ]
//!                 |    |    |
//!                 v    v    v
//!         [ · · s e ][e e e e][e f · · ]
//!               ^ start             ^ finish (one past last)
//! ```
//!
//! Push and pop at either end are O(1) amortized and never move existing
//! elements. Inserting in the middle shifts whichever side is shorter.
//!
//! # Example
//!
//! ```
//! use nexus_collections::Deque;
//!
//! let mut d: Deque<i32> = Deque::new();
//! d.push_back(2);
//! d.push_front(1);
//! d.push_back(3);
//! assert_eq!(d.iter().copied().collect::<Vec<_>>(), [1, 2, 3]);
//!
//! d.insert(1, 10);
//! assert_eq!(d[1], 10);
//! assert_eq!(d.pop_front(), Some(1));
//! ```

mod iter;
mod raw;

pub use iter::{Cursor, IntoIter, Iter, IterMut};
pub use raw::{DEQUE_BUF_BYTES, buffer_len};

use std::cmp;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem;
use std::ops::{Index, IndexMut, Range, RangeBounds};
use std::ptr::{self, NonNull};

use nexus_alloc::{Allocator, PoolAllocator};

use crate::Error;
use crate::error::{infallible, out_of_range};
use crate::raw_buf;
use crate::vector::slice_range;

use raw::{INITIAL_MAP_SIZE, RawPos};

/// Segmented double-ended queue.
///
/// Storage is created lazily: an empty, never-used deque holds no map and no
/// buffers. Once created, at least the buffer holding `start` is kept until
/// the deque is dropped or [`Deque::shrink_to_fit`] is called while empty.
pub struct Deque<T, A: Allocator = PoolAllocator> {
    map: *mut *mut T,
    map_size: usize,
    start: RawPos<T>,
    finish: RawPos<T>,
    alloc: A,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, A: Allocator + Send> Send for Deque<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for Deque<T, A> {}

impl<T> Deque<T> {
    /// Creates an empty deque. Does not allocate.
    #[inline]
    pub fn new() -> Self {
        Self::new_in(PoolAllocator)
    }

    /// Creates a deque holding `n` default values.
    pub fn with_len(n: usize) -> Self
    where
        T: Default,
    {
        Self::with_len_in(n, PoolAllocator)
    }

    /// Creates a deque holding `n` clones of `value`.
    pub fn from_elem(n: usize, value: &T) -> Self
    where
        T: Clone,
    {
        Self::from_elem_in(n, value, PoolAllocator)
    }
}

impl<T> Default for Deque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator> Deque<T, A> {
    const N: usize = buffer_len::<T>();

    /// Creates an empty deque using `alloc`.
    #[inline]
    pub fn new_in(alloc: A) -> Self {
        Self {
            map: ptr::null_mut(),
            map_size: 0,
            start: RawPos::null(),
            finish: RawPos::null(),
            alloc,
            _marker: PhantomData,
        }
    }

    /// [`Deque::with_len`] with an explicit allocator.
    pub fn with_len_in(n: usize, alloc: A) -> Self
    where
        T: Default,
    {
        infallible(Self::build(n, alloc, T::default))
    }

    /// [`Deque::from_elem`] with an explicit allocator.
    pub fn from_elem_in(n: usize, value: &T, alloc: A) -> Self
    where
        T: Clone,
    {
        infallible(Self::build(n, alloc, || value.clone()))
    }

    /// Build a deque of `n` values produced by `next`, sized up front.
    fn build<F>(n: usize, alloc: A, mut next: F) -> Result<Self, Error>
    where
        F: FnMut() -> T,
    {
        let mut deque = Self::new_in(alloc);
        if n == 0 {
            return Ok(deque);
        }
        deque.initialize_map(n)?;

        // On unwind, finish is pulled back to the constructed prefix and the
        // untouched trailing buffers are released.
        struct Built<'a, T, A: Allocator> {
            deque: &'a mut Deque<T, A>,
            built: usize,
            last: *mut *mut T,
        }

        impl<T, A: Allocator> Drop for Built<'_, T, A> {
            fn drop(&mut self) {
                let d = &mut *self.deque;
                d.finish = d.start.offset(self.built as isize);
                let mut node = d.finish.node.wrapping_add(1);
                while node <= self.last {
                    unsafe {
                        d.free_buffer(*node);
                        node = node.add(1);
                    }
                }
            }
        }

        let last = deque.finish.node;
        let mut guard = Built {
            deque: &mut deque,
            built: 0,
            last,
        };
        let mut pos = guard.deque.start;
        while guard.built < n {
            unsafe { ptr::write(pos.ptr(), next()) };
            guard.built += 1;
            pos.inc();
        }
        drop(guard);
        Ok(deque)
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.finish.distance_from(self.start) as usize
    }

    /// `true` if there are no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.finish
    }

    /// Largest length the allocator can serve.
    #[inline]
    pub fn max_size(&self) -> usize {
        self.alloc.max_size::<T>()
    }

    /// Number of slots in the buffer map (0 before first use).
    #[inline]
    pub fn map_size(&self) -> usize {
        self.map_size
    }

    /// Number of element buffers currently allocated.
    #[inline]
    pub fn buffer_count(&self) -> usize {
        if self.map.is_null() {
            0
        } else {
            self.node_index(self.finish.node) - self.node_index(self.start.node) + 1
        }
    }

    /// First element.
    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// Mutable first element.
    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.get_mut(0)
    }

    /// Last element.
    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Mutable last element.
    #[inline]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.len().checked_sub(1).and_then(|i| self.get_mut(i))
    }

    /// Element at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.len() {
            Some(unsafe { &*self.slot(index) })
        } else {
            None
        }
    }

    /// Mutable element at `index`.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.len() {
            Some(unsafe { &mut *self.slot(index) })
        } else {
            None
        }
    }

    /// Checked element access.
    pub fn at(&self, index: usize) -> Result<&T, Error> {
        let len = self.len();
        self.get(index).ok_or(Error::OutOfRange { index, len })
    }

    /// Checked mutable element access.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, Error> {
        let len = self.len();
        self.get_mut(index).ok_or(Error::OutOfRange { index, len })
    }

    /// Iterator over references.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.start, self.finish, self.len())
    }

    /// Iterator over mutable references.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(self.start, self.finish, self.len())
    }

    /// Random-access cursor at the first element.
    #[inline]
    pub fn cursor_begin(&self) -> Cursor<'_, T> {
        Cursor::new(self.start)
    }

    /// Random-access cursor one past the last element.
    #[inline]
    pub fn cursor_end(&self) -> Cursor<'_, T> {
        Cursor::new(self.finish)
    }

    /// Cursor at `index` (`index == len` gives the end cursor).
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn cursor_at(&self, index: usize) -> Cursor<'_, T> {
        if index > self.len() {
            out_of_range(index, self.len());
        }
        Cursor::new(self.start.offset(index as isize))
    }

    /// Address of the slot at logical `index`.
    ///
    /// # Safety
    ///
    /// `index` must be below `len` (or equal, for a non-dereferenced end slot).
    #[inline]
    unsafe fn slot(&self, index: usize) -> *mut T {
        unsafe { self.start.offset(index as isize).ptr() }
    }

    #[inline]
    fn node_index(&self, node: *mut *mut T) -> usize {
        unsafe { node.offset_from(self.map) as usize }
    }

    // =========================================================================
    // Storage management
    // =========================================================================

    fn allocate_buffer(&self) -> Result<*mut T, Error> {
        raw_buf::allocate::<T, A>(&self.alloc, Self::N).map(NonNull::as_ptr)
    }

    /// # Safety
    ///
    /// `buf` must come from `allocate_buffer` and hold no live values.
    unsafe fn free_buffer(&self, buf: *mut T) {
        unsafe { self.alloc.deallocate(NonNull::new_unchecked(buf), Self::N) }
    }

    fn allocate_map(&self, slots: usize) -> Result<*mut *mut T, Error> {
        raw_buf::allocate::<*mut T, A>(&self.alloc, slots).map(NonNull::as_ptr)
    }

    unsafe fn free_map(&mut self) {
        if !self.map.is_null() {
            unsafe {
                self.alloc
                    .deallocate(NonNull::new_unchecked(self.map), self.map_size)
            };
            self.map = ptr::null_mut();
            self.map_size = 0;
        }
    }

    /// Create the map and enough buffers for `num_elements` slots.
    ///
    /// `start..finish` then spans `num_elements` uninitialized slots. On
    /// error nothing is kept.
    fn initialize_map(&mut self, num_elements: usize) -> Result<(), Error> {
        debug_assert!(self.map.is_null());
        let max = self.max_size();
        if num_elements > max {
            return Err(Error::LengthError {
                requested: num_elements,
                max,
            });
        }

        let num_nodes = num_elements / Self::N + 1;
        let map_size = cmp::max(INITIAL_MAP_SIZE, num_nodes.saturating_add(2));
        let map = self.allocate_map(map_size)?;

        unsafe {
            let nstart = map.add((map_size - num_nodes) / 2);
            for i in 0..num_nodes {
                match self.allocate_buffer() {
                    Ok(buf) => *nstart.add(i) = buf,
                    Err(err) => {
                        for j in 0..i {
                            self.free_buffer(*nstart.add(j));
                        }
                        self.alloc.deallocate(NonNull::new_unchecked(map), map_size);
                        return Err(err);
                    }
                }
            }

            self.map = map;
            self.map_size = map_size;
            self.start = RawPos::new(nstart, 0);
            self.finish = RawPos::new(nstart.add(num_nodes - 1), num_elements % Self::N);
        }
        Ok(())
    }

    #[inline]
    fn ensure_map(&mut self) -> Result<(), Error> {
        if self.map.is_null() {
            self.initialize_map(0)?;
        }
        Ok(())
    }

    /// Make room in the map for `nodes_to_add` more buffers after `finish`.
    #[inline]
    fn reserve_map_at_back(&mut self, nodes_to_add: usize) -> Result<(), Error> {
        let used = self.node_index(self.finish.node) + 1;
        if nodes_to_add > self.map_size - used {
            self.reallocate_map(nodes_to_add, false)?;
        }
        Ok(())
    }

    /// Make room in the map for `nodes_to_add` more buffers before `start`.
    #[inline]
    fn reserve_map_at_front(&mut self, nodes_to_add: usize) -> Result<(), Error> {
        if nodes_to_add > self.node_index(self.start.node) {
            self.reallocate_map(nodes_to_add, true)?;
        }
        Ok(())
    }

    /// Re-center the live buffer pointers, or move them to a larger map.
    ///
    /// The map is only re-centered when it is more than twice the size the
    /// live nodes need; otherwise it grows to
    /// `map_size + max(map_size, nodes_to_add) + 2`.
    fn reallocate_map(&mut self, nodes_to_add: usize, add_at_front: bool) -> Result<(), Error> {
        let old_num_nodes = self.node_index(self.finish.node) - self.node_index(self.start.node) + 1;
        let new_num_nodes = old_num_nodes.saturating_add(nodes_to_add);
        let front_gap = if add_at_front { nodes_to_add } else { 0 };

        let new_nstart = if self.map_size > new_num_nodes.saturating_mul(2) {
            unsafe {
                let new_nstart = self.map.add((self.map_size - new_num_nodes) / 2 + front_gap);
                ptr::copy(self.start.node, new_nstart, old_num_nodes);
                log::trace!(
                    "deque: re-centered {} buffers in map of {} slots",
                    old_num_nodes,
                    self.map_size
                );
                new_nstart
            }
        } else {
            let new_map_size = self
                .map_size
                .saturating_add(cmp::max(self.map_size, nodes_to_add))
                .saturating_add(2);
            let new_map = self.allocate_map(new_map_size)?;
            unsafe {
                let new_nstart = new_map.add((new_map_size - new_num_nodes) / 2 + front_gap);
                ptr::copy_nonoverlapping(self.start.node, new_nstart, old_num_nodes);
                log::trace!(
                    "deque: map grown from {} to {} slots",
                    self.map_size,
                    new_map_size
                );
                self.free_map();
                self.map = new_map;
                self.map_size = new_map_size;
                new_nstart
            }
        };

        self.start.node = new_nstart;
        self.finish.node = unsafe { new_nstart.add(old_num_nodes - 1) };
        Ok(())
    }

    /// Allocate buffers so `n` more elements fit before `start`.
    ///
    /// Returns the number of buffers added (they sit just before
    /// `start.node`). On error nothing is kept.
    fn reserve_elements_at_front(&mut self, n: usize) -> Result<usize, Error> {
        self.ensure_map()?;
        let vacancies = self.start.idx;
        if n <= vacancies {
            return Ok(0);
        }
        let new_nodes = (n - vacancies).div_ceil(Self::N);
        self.reserve_map_at_front(new_nodes)?;
        for i in 1..=new_nodes {
            match self.allocate_buffer() {
                Ok(buf) => unsafe { *self.start.node.sub(i) = buf },
                Err(err) => {
                    for j in 1..i {
                        unsafe { self.free_buffer(*self.start.node.sub(j)) };
                    }
                    return Err(err);
                }
            }
        }
        Ok(new_nodes)
    }

    /// Allocate buffers so `n` more elements fit after `finish`.
    ///
    /// Returns the number of buffers added (they sit just after
    /// `finish.node`). On error nothing is kept.
    fn reserve_elements_at_back(&mut self, n: usize) -> Result<usize, Error> {
        self.ensure_map()?;
        let vacancies = Self::N - self.finish.idx - 1;
        if n <= vacancies {
            return Ok(0);
        }
        let new_nodes = (n - vacancies).div_ceil(Self::N);
        self.reserve_map_at_back(new_nodes)?;
        for i in 1..=new_nodes {
            match self.allocate_buffer() {
                Ok(buf) => unsafe { *self.finish.node.add(i) = buf },
                Err(err) => {
                    for j in 1..i {
                        unsafe { self.free_buffer(*self.finish.node.add(j)) };
                    }
                    return Err(err);
                }
            }
        }
        Ok(new_nodes)
    }

    // =========================================================================
    // Push / pop
    // =========================================================================

    /// Append `value`.
    #[inline]
    pub fn push_back(&mut self, value: T) {
        infallible(self.try_push_back(value));
    }

    /// Fallible [`Deque::push_back`]. On error the deque is unchanged.
    pub fn try_push_back(&mut self, value: T) -> Result<(), Error> {
        self.ensure_map()?;
        if self.finish.idx + 1 < Self::N {
            unsafe { ptr::write(self.finish.ptr(), value) };
            self.finish.idx += 1;
        } else {
            self.reserve_map_at_back(1)?;
            let buf = self.allocate_buffer()?;
            unsafe {
                let next = self.finish.node.add(1);
                *next = buf;
                ptr::write(self.finish.ptr(), value);
                self.finish = RawPos::new(next, 0);
            }
        }
        Ok(())
    }

    /// Prepend `value`.
    #[inline]
    pub fn push_front(&mut self, value: T) {
        infallible(self.try_push_front(value));
    }

    /// Fallible [`Deque::push_front`]. On error the deque is unchanged.
    pub fn try_push_front(&mut self, value: T) -> Result<(), Error> {
        self.ensure_map()?;
        if self.start.idx > 0 {
            self.start.idx -= 1;
            unsafe { ptr::write(self.start.ptr(), value) };
        } else {
            self.reserve_map_at_front(1)?;
            let buf = self.allocate_buffer()?;
            unsafe {
                let prev = self.start.node.sub(1);
                *prev = buf;
                self.start = RawPos::new(prev, Self::N - 1);
                ptr::write(self.start.ptr(), value);
            }
        }
        Ok(())
    }

    /// Remove and return the last element.
    #[inline]
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { self.pop_back_unchecked() })
    }

    unsafe fn pop_back_unchecked(&mut self) -> T {
        unsafe {
            if self.finish.idx == 0 {
                self.free_buffer(*self.finish.node);
                self.finish = RawPos::new(self.finish.node.sub(1), Self::N - 1);
            } else {
                self.finish.idx -= 1;
            }
            ptr::read(self.finish.ptr())
        }
    }

    /// Remove and return the first element.
    #[inline]
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { self.pop_front_unchecked() })
    }

    unsafe fn pop_front_unchecked(&mut self) -> T {
        unsafe {
            let value = ptr::read(self.start.ptr());
            if self.start.idx + 1 == Self::N {
                self.free_buffer(*self.start.node);
                self.start = RawPos::new(self.start.node.add(1), 0);
            } else {
                self.start.idx += 1;
            }
            value
        }
    }

    // =========================================================================
    // Rotation (element swaps, cannot fail)
    // =========================================================================

    fn reverse(&mut self, mut lo: usize, mut hi: usize) {
        while lo + 1 < hi {
            hi -= 1;
            unsafe { ptr::swap(self.slot(lo), self.slot(hi)) };
            lo += 1;
        }
    }

    /// Rotate `[lo, hi)` so its last `k` elements come first.
    fn rotate_right(&mut self, lo: usize, hi: usize, k: usize) {
        debug_assert!(lo <= hi && k <= hi - lo);
        if k == 0 || k == hi - lo {
            return;
        }
        self.reverse(lo, hi);
        self.reverse(lo, lo + k);
        self.reverse(lo + k, hi);
    }

    /// Rotate `[lo, hi)` so its first `k` elements go last.
    fn rotate_left(&mut self, lo: usize, hi: usize, k: usize) {
        self.rotate_right(lo, hi, hi - lo - k);
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert `value` before `index`, shifting the shorter side.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, value: T) {
        infallible(self.try_insert(index, value));
    }

    /// Fallible [`Deque::insert`].
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<(), Error> {
        let len = self.len();
        if index > len {
            return Err(Error::OutOfRange { index, len });
        }
        if index < len - index {
            self.try_push_front(value)?;
            self.rotate_left(0, index + 1, 1);
        } else {
            self.try_push_back(value)?;
            self.rotate_right(index, len + 1, 1);
        }
        Ok(())
    }

    /// Insert `n` clones of `value` before `index`.
    ///
    /// If a clone panics the deque is left unchanged and any buffers acquired
    /// for the insert are released.
    pub fn insert_n(&mut self, index: usize, n: usize, value: &T)
    where
        T: Clone,
    {
        infallible(self.try_insert_n(index, n, value));
    }

    /// Fallible [`Deque::insert_n`].
    pub fn try_insert_n(&mut self, index: usize, n: usize, value: &T) -> Result<(), Error>
    where
        T: Clone,
    {
        self.insert_constructed(index, n, || value.clone())
    }

    /// Insert clones of `src` before `index`, with the same guarantee as
    /// [`Deque::insert_n`].
    pub fn insert_slice(&mut self, index: usize, src: &[T])
    where
        T: Clone,
    {
        infallible(self.try_insert_slice(index, src));
    }

    /// Fallible [`Deque::insert_slice`].
    pub fn try_insert_slice(&mut self, index: usize, src: &[T]) -> Result<(), Error>
    where
        T: Clone,
    {
        let mut i = 0;
        self.insert_constructed(index, src.len(), || {
            let value = src[i].clone();
            i += 1;
            value
        })
    }

    /// Insert every item of `iter` before `index`, in order.
    ///
    /// If the iterator panics the items already taken are dropped and the
    /// contents are as before the call.
    pub fn insert_iter<I>(&mut self, index: usize, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let len = self.len();
        if index > len {
            out_of_range(index, len);
        }

        struct Rollback<'a, T, A: Allocator> {
            deque: &'a mut Deque<T, A>,
            added: usize,
            front: bool,
        }

        impl<T, A: Allocator> Drop for Rollback<'_, T, A> {
            fn drop(&mut self) {
                for _ in 0..self.added {
                    let value = if self.front {
                        self.deque.pop_front()
                    } else {
                        self.deque.pop_back()
                    };
                    drop(value);
                }
            }
        }

        let front = index < len - index;
        let mut guard = Rollback {
            deque: self,
            added: 0,
            front,
        };
        for value in iter {
            if front {
                guard.deque.push_front(value);
            } else {
                guard.deque.push_back(value);
            }
            guard.added += 1;
        }
        let added = guard.added;
        if front {
            // pushed in reverse ahead of the prefix
            guard.deque.reverse(0, added);
            guard.deque.rotate_left(0, added + index, added);
        } else {
            guard.deque.rotate_right(index, len + added, added);
        }
        mem::forget(guard);
    }

    /// Construct `n` values from `next` into fresh slots on the shorter side,
    /// then rotate them into place.
    fn insert_constructed<F>(&mut self, index: usize, n: usize, mut next: F) -> Result<(), Error>
    where
        F: FnMut() -> T,
    {
        let len = self.len();
        if index > len {
            return Err(Error::OutOfRange { index, len });
        }
        if n == 0 {
            return Ok(());
        }
        let max = self.max_size();
        if n > max - len {
            return Err(Error::LengthError {
                requested: len.saturating_add(n),
                max,
            });
        }

        // Destroys what was built and releases the buffers acquired for it.
        struct Staged<'a, T, A: Allocator> {
            alloc: &'a A,
            first: RawPos<T>,
            built: usize,
            nodes: *mut *mut T,
            new_nodes: usize,
        }

        impl<T, A: Allocator> Drop for Staged<'_, T, A> {
            fn drop(&mut self) {
                let mut pos = self.first;
                for _ in 0..self.built {
                    unsafe { ptr::drop_in_place(pos.ptr()) };
                    pos.inc();
                }
                for i in 0..self.new_nodes {
                    unsafe {
                        let buf = *self.nodes.add(i);
                        self.alloc
                            .deallocate(NonNull::new_unchecked(buf), buffer_len::<T>());
                    }
                }
            }
        }

        if index < len - index {
            let new_nodes = self.reserve_elements_at_front(n)?;
            let new_start = self.start.offset(-(n as isize));
            let mut staged = Staged {
                alloc: &self.alloc,
                first: new_start,
                built: 0,
                nodes: self.start.node.wrapping_sub(new_nodes),
                new_nodes,
            };
            let mut pos = new_start;
            while staged.built < n {
                unsafe { ptr::write(pos.ptr(), next()) };
                staged.built += 1;
                pos.inc();
            }
            mem::forget(staged);

            self.start = new_start;
            self.rotate_left(0, n + index, n);
        } else {
            let new_nodes = self.reserve_elements_at_back(n)?;
            let old_finish = self.finish;
            let mut staged = Staged {
                alloc: &self.alloc,
                first: old_finish,
                built: 0,
                nodes: old_finish.node.wrapping_add(1),
                new_nodes,
            };
            let mut pos = old_finish;
            while staged.built < n {
                unsafe { ptr::write(pos.ptr(), next()) };
                staged.built += 1;
                pos.inc();
            }
            mem::forget(staged);

            self.finish = old_finish.offset(n as isize);
            self.rotate_right(index, len + n, n);
        }
        Ok(())
    }

    // =========================================================================
    // Erase
    // =========================================================================

    /// Remove and return the element at `index`, shifting the shorter side.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn erase(&mut self, index: usize) -> T {
        match self.try_erase(index) {
            Ok(value) => value,
            Err(_) => out_of_range(index, self.len()),
        }
    }

    /// Fallible [`Deque::erase`].
    pub fn try_erase(&mut self, index: usize) -> Result<T, Error> {
        let len = self.len();
        if index >= len {
            return Err(Error::OutOfRange { index, len });
        }
        if index < len - index - 1 {
            self.rotate_right(0, index + 1, 1);
            Ok(unsafe { self.pop_front_unchecked() })
        } else {
            self.rotate_left(index, len, 1);
            Ok(unsafe { self.pop_back_unchecked() })
        }
    }

    /// Remove the elements in `range`, shifting the shorter side.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn erase_range<R: RangeBounds<usize>>(&mut self, range: R) {
        let range = slice_range(range, self.len());
        self.erase_span(range);
    }

    /// Fallible [`Deque::erase_range`].
    pub fn try_erase_range(&mut self, range: Range<usize>) -> Result<(), Error> {
        let len = self.len();
        if range.start > range.end || range.end > len {
            return Err(Error::OutOfRange {
                index: range.end.max(range.start),
                len,
            });
        }
        self.erase_span(range);
        Ok(())
    }

    fn erase_span(&mut self, range: Range<usize>) {
        let Range { start, end } = range;
        let k = end - start;
        if k == 0 {
            return;
        }
        let len = self.len();
        if start < len - end {
            self.rotate_right(0, end, k);
            for _ in 0..k {
                drop(unsafe { self.pop_front_unchecked() });
            }
        } else {
            self.rotate_left(start, len, k);
            for _ in 0..k {
                drop(unsafe { self.pop_back_unchecked() });
            }
        }
    }

    /// Drop every element. The buffer holding `start` is kept.
    pub fn clear(&mut self) {
        while let Some(value) = self.pop_back() {
            drop(value);
        }
    }

    /// Drop elements past `len`.
    pub fn truncate(&mut self, len: usize) {
        while self.len() > len {
            drop(self.pop_back());
        }
    }

    // =========================================================================
    // Resize
    // =========================================================================

    /// Resize to `new_len`, filling with `T::default()`.
    pub fn resize(&mut self, new_len: usize)
    where
        T: Default,
    {
        self.resize_with(new_len, T::default);
    }

    /// Resize to `new_len`, filling with clones of `value`.
    pub fn resize_value(&mut self, new_len: usize, value: &T)
    where
        T: Clone,
    {
        self.resize_with(new_len, || value.clone());
    }

    /// Resize to `new_len`, filling with values produced by `f`.
    ///
    /// If `f` panics, the values it already produced are dropped and the
    /// length is unchanged.
    pub fn resize_with<F>(&mut self, new_len: usize, f: F)
    where
        F: FnMut() -> T,
    {
        let len = self.len();
        if new_len <= len {
            self.truncate(new_len);
        } else {
            infallible(self.insert_constructed(len, new_len - len, f));
        }
    }

    /// Release storage held by an empty deque.
    ///
    /// A non-empty deque only holds the buffers its elements occupy.
    pub fn shrink_to_fit(&mut self) {
        if self.is_empty() && !self.map.is_null() {
            unsafe {
                self.free_buffer(*self.start.node);
                self.free_map();
            }
            self.start = RawPos::null();
            self.finish = RawPos::null();
        }
    }

    /// Exchange contents with `other` in O(1).
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Check the map/buffer invariants.
    ///
    /// Used by tests; O(buffers).
    pub fn verify(&self) -> Result<(), &'static str> {
        if self.map.is_null() {
            if self.map_size != 0 || !self.start.node.is_null() || !self.finish.node.is_null() {
                return Err("storage-less deque has dangling state");
            }
            return Ok(());
        }
        if self.map_size < INITIAL_MAP_SIZE {
            return Err("map smaller than the minimum");
        }
        let map_end = self.map.wrapping_add(self.map_size);
        if self.start.node < self.map || self.finish.node >= map_end {
            return Err("live nodes outside the map");
        }
        if self.start.node > self.finish.node {
            return Err("start node after finish node");
        }
        if self.start.idx >= Self::N || self.finish.idx >= Self::N {
            return Err("position not normalized");
        }
        if self.finish.distance_from(self.start) < 0 {
            return Err("finish before start");
        }
        let mut node = self.start.node;
        while node <= self.finish.node {
            if unsafe { *node }.is_null() {
                return Err("live node without a buffer");
            }
            node = node.wrapping_add(1);
        }
        Ok(())
    }
}

impl<T, A: Allocator> Drop for Deque<T, A> {
    fn drop(&mut self) {
        self.clear();
        self.shrink_to_fit();
    }
}

// =============================================================================
// Trait impls
// =============================================================================

impl<T, A: Allocator> Index<usize> for Deque<T, A> {
    type Output = T;

    #[inline]
    #[track_caller]
    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => out_of_range(index, self.len()),
        }
    }
}

impl<T, A: Allocator> IndexMut<usize> for Deque<T, A> {
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len();
        match self.get_mut(index) {
            Some(value) => value,
            None => out_of_range(index, len),
        }
    }
}

impl<T: Clone, A: Allocator> Clone for Deque<T, A> {
    fn clone(&self) -> Self {
        let mut src = self.iter();
        infallible(Self::build(self.len(), self.alloc.clone(), || match src.next() {
            Some(value) => value.clone(),
            None => unreachable!("source shorter than its length"),
        }))
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Deque<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, A: Allocator> PartialEq for Deque<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq, A: Allocator> Eq for Deque<T, A> {}

impl<T: PartialOrd, A: Allocator> PartialOrd for Deque<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord, A: Allocator> Ord for Deque<T, A> {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Hash, A: Allocator> Hash for Deque<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for value in self {
            value.hash(state);
        }
    }
}

impl<T, A: Allocator> Extend<T> for Deque<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<'a, T: Clone + 'a, A: Allocator> Extend<&'a T> for Deque<T, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().cloned());
    }
}

impl<T, A: Allocator> FromIterator<T> for Deque<T, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut deque = Self::new_in(A::default());
        deque.extend(iter);
        deque
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a Deque<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Deque<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}

impl<T, A: Allocator> IntoIterator for Deque<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        IntoIter::new(self)
    }
}
