use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use nexus_alloc::Allocator;

use super::Deque;
use super::raw::RawPos;
use crate::cursor::{BidirectionalPosition, Category, Position, RandomAccessPosition};

// =============================================================================
// Cursor
// =============================================================================

/// Random-access position into a [`Deque`].
///
/// Borrowing the deque keeps the buffers in place for the cursor's lifetime.
/// Moving past either end is allowed, but only positions in `[begin, end)`
/// may be read.
pub struct Cursor<'a, T> {
    pos: RawPos<T>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Cursor<'a, T> {
    #[inline]
    pub(super) fn new(pos: RawPos<T>) -> Self {
        Self {
            pos,
            _marker: PhantomData,
        }
    }

    /// Element at this position.
    ///
    /// # Safety
    ///
    /// The cursor must lie within the deque's `[begin, end)`.
    #[inline]
    pub unsafe fn get(&self) -> &'a T {
        unsafe { &*self.pos.ptr() }
    }
}

impl<T> Clone for Cursor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Cursor<'_, T> {}

impl<T> PartialEq for Cursor<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}

impl<T> Eq for Cursor<'_, T> {}

impl<T> fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.pos).finish()
    }
}

impl<T> Position for Cursor<'_, T> {
    const CATEGORY: Category = Category::RandomAccess;
    type Value = T;

    #[inline]
    fn step(&mut self) {
        self.pos.inc();
    }

    #[inline]
    fn as_ptr(&self) -> *const T {
        if self.pos.node.is_null() {
            return std::ptr::null();
        }
        unsafe { self.pos.ptr() }
    }

    #[inline]
    fn distance_to(&self, last: &Self) -> isize {
        last.pos.distance_from(self.pos)
    }

    #[inline]
    fn advance_by(&mut self, n: isize) {
        self.jump(n);
    }
}

impl<T> BidirectionalPosition for Cursor<'_, T> {
    #[inline]
    fn step_back(&mut self) {
        self.pos.dec();
    }
}

impl<T> RandomAccessPosition for Cursor<'_, T> {
    #[inline]
    fn jump(&mut self, n: isize) {
        self.pos = self.pos.offset(n);
    }

    #[inline]
    fn distance_from(&self, origin: &Self) -> isize {
        self.pos.distance_from(origin.pos)
    }
}

// =============================================================================
// Borrowing iterators
// =============================================================================

/// Iterator over `&T`, front to back.
pub struct Iter<'a, T> {
    front: RawPos<T>,
    back: RawPos<T>,
    remaining: usize,
    _marker: PhantomData<&'a T>,
}

unsafe impl<T: Sync> Send for Iter<'_, T> {}
unsafe impl<T: Sync> Sync for Iter<'_, T> {}

impl<T> Iter<'_, T> {
    #[inline]
    pub(super) fn new(front: RawPos<T>, back: RawPos<T>, remaining: usize) -> Self {
        Self {
            front,
            back,
            remaining,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self::new(self.front, self.back, self.remaining)
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let item = unsafe { &*self.front.ptr() };
        self.front.inc();
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }

    fn nth(&mut self, n: usize) -> Option<&'a T> {
        if n >= self.remaining {
            self.front = self.back;
            self.remaining = 0;
            return None;
        }
        self.front = self.front.offset(n as isize);
        self.remaining -= n;
        self.next()
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.back.dec();
        Some(unsafe { &*self.back.ptr() })
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

/// Iterator over `&mut T`, front to back.
pub struct IterMut<'a, T> {
    front: RawPos<T>,
    back: RawPos<T>,
    remaining: usize,
    _marker: PhantomData<&'a mut T>,
}

unsafe impl<T: Send> Send for IterMut<'_, T> {}
unsafe impl<T: Sync> Sync for IterMut<'_, T> {}

impl<T> IterMut<'_, T> {
    #[inline]
    pub(super) fn new(front: RawPos<T>, back: RawPos<T>, remaining: usize) -> Self {
        Self {
            front,
            back,
            remaining,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let item = unsafe { &mut *self.front.ptr() };
        self.front.inc();
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.back.dec();
        Some(unsafe { &mut *self.back.ptr() })
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}
impl<T> FusedIterator for IterMut<'_, T> {}

// =============================================================================
// Owning iterator
// =============================================================================

/// Owning iterator; pops from the deque it consumed.
pub struct IntoIter<T, A: Allocator> {
    deque: Deque<T, A>,
}

impl<T, A: Allocator> IntoIter<T, A> {
    pub(super) fn new(deque: Deque<T, A>) -> Self {
        Self { deque }
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.deque.pop_front()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.deque.len();
        (len, Some(len))
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        self.deque.pop_back()
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}
impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}
