//! Binary heap algorithms and the priority queue built on them.
//!
//! The heap is laid out implicitly over any [`HeapStorage`]: the children of
//! position `i` are `2i + 1` and `2i + 2`. Ordering comes from a
//! [`Compare`]; with the default [`Less`] the greatest element sits at
//! position zero (a max-heap).
//!
//! Every reordering step is a swap of two slots, so a comparator that panics
//! midway leaves the storage a permutation of its previous contents. The
//! heap property may be lost in that case; nothing leaks or double-drops.

use std::fmt;

use nexus_alloc::Allocator;

use crate::adapters::SequenceBack;
use crate::compare::{Compare, Less};
use crate::{Deque, Error, Vector};

/// Random-access sequence the heap algorithms can reorder.
pub trait HeapStorage: SequenceBack {
    /// Element at `index`.
    ///
    /// # Panics
    ///
    /// If `index >= len()`.
    fn get(&self, index: usize) -> &Self::Item;

    /// Exchange the elements at `a` and `b`.
    fn swap(&mut self, a: usize, b: usize);
}

impl<T, A: Allocator> HeapStorage for Vector<T, A> {
    #[inline]
    fn get(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        self.as_mut_slice().swap(a, b);
    }
}

impl<T, A: Allocator> HeapStorage for Deque<T, A> {
    #[inline]
    fn get(&self, index: usize) -> &T {
        &self[index]
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let pa: *mut T = &mut self[a];
        let pb: *mut T = &mut self[b];
        // Safety: distinct indices address distinct live elements.
        unsafe { std::ptr::swap(pa, pb) };
    }
}

// =============================================================================
// Algorithms
// =============================================================================

#[inline]
fn precedes<S: HeapStorage, C: Compare<S::Item>>(s: &S, cmp: &C, a: usize, b: usize) -> bool {
    cmp.less(s.get(a), s.get(b))
}

/// Move the element at `pos` toward the root until its parent no longer
/// orders before it.
fn sift_up<S: HeapStorage, C: Compare<S::Item>>(s: &mut S, cmp: &C, floor: usize, pos: usize) {
    let mut hole = pos;
    while hole > floor {
        let parent = (hole - 1) / 2;
        if precedes(s, cmp, parent, hole) {
            s.swap(parent, hole);
            hole = parent;
        } else {
            break;
        }
    }
}

/// Restore the heap over `[0, len)` below `pos`.
///
/// Phase one walks the element down to a leaf along the larger child
/// without comparing against it; phase two sifts it back up.
fn sift_down<S: HeapStorage, C: Compare<S::Item>>(s: &mut S, cmp: &C, pos: usize, len: usize) {
    let mut hole = pos;
    loop {
        let left = 2 * hole + 1;
        if left >= len {
            break;
        }
        let right = left + 1;
        let larger = if right < len && precedes(s, cmp, left, right) {
            right
        } else {
            left
        };
        s.swap(hole, larger);
        hole = larger;
    }
    sift_up(s, cmp, pos, hole);
}

/// Add the last element of `s` to the heap formed by the ones before it.
pub fn push_heap<S: HeapStorage, C: Compare<S::Item>>(s: &mut S, cmp: &C) {
    let len = s.len();
    if len > 1 {
        sift_up(s, cmp, 0, len - 1);
    }
}

/// Move the top of the heap to the last position and re-heap the rest.
pub fn pop_heap<S: HeapStorage, C: Compare<S::Item>>(s: &mut S, cmp: &C) {
    let len = s.len();
    if len > 1 {
        s.swap(0, len - 1);
        sift_down(s, cmp, 0, len - 1);
    }
}

/// Arrange `s` into a heap in O(n).
pub fn make_heap<S: HeapStorage, C: Compare<S::Item>>(s: &mut S, cmp: &C) {
    let len = s.len();
    for pos in (0..len / 2).rev() {
        sift_down(s, cmp, pos, len);
    }
}

/// `true` if `s` satisfies the heap property under `cmp`.
pub fn is_heap<S: HeapStorage, C: Compare<S::Item>>(s: &S, cmp: &C) -> bool {
    (1..s.len()).all(|i| !precedes(s, cmp, (i - 1) / 2, i))
}

// =============================================================================
// PriorityQueue
// =============================================================================

/// Heap-ordered queue yielding the greatest element (under `Cmp`) first.
///
/// ```
/// use nexus_collections::PriorityQueue;
/// use nexus_collections::compare::Greater;
///
/// let mut pq: PriorityQueue<u32> = [3, 9, 1].into_iter().collect();
/// assert_eq!(pq.pop(), Some(9));
///
/// let mut min: PriorityQueue<u32, Greater> = PriorityQueue::new();
/// min.extend([3, 9, 1]);
/// assert_eq!(min.top(), Some(&1));
/// ```
pub struct PriorityQueue<T, Cmp = Less, C: HeapStorage<Item = T> = Deque<T>> {
    c: C,
    cmp: Cmp,
}

impl<T, Cmp: Compare<T> + Default, C: HeapStorage<Item = T> + Default> PriorityQueue<T, Cmp, C> {
    /// Creates an empty queue.
    #[inline]
    pub fn new() -> Self {
        Self {
            c: C::default(),
            cmp: Cmp::default(),
        }
    }
}

impl<T, Cmp: Compare<T>, C: HeapStorage<Item = T> + Default> PriorityQueue<T, Cmp, C> {
    /// Creates an empty queue ordered by `cmp`.
    #[inline]
    pub fn with_compare(cmp: Cmp) -> Self {
        Self {
            c: C::default(),
            cmp,
        }
    }
}

impl<T, Cmp: Compare<T>, C: HeapStorage<Item = T>> PriorityQueue<T, Cmp, C> {
    /// Heapify an existing container.
    pub fn from_container(mut c: C, cmp: Cmp) -> Self {
        make_heap(&mut c, &cmp);
        Self { c, cmp }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.c.len()
    }

    /// `true` if there are no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.c.is_empty()
    }

    /// Greatest element.
    #[inline]
    pub fn top(&self) -> Option<&T> {
        if self.c.is_empty() {
            None
        } else {
            Some(self.c.get(0))
        }
    }

    /// Insert `value`.
    pub fn push(&mut self, value: T) {
        self.c.push_back(value);
        push_heap(&mut self.c, &self.cmp);
    }

    /// Fallible [`PriorityQueue::push`]. On error the queue is unchanged.
    pub fn try_push(&mut self, value: T) -> Result<(), Error> {
        self.c.try_push_back(value)?;
        push_heap(&mut self.c, &self.cmp);
        Ok(())
    }

    /// Remove and return the greatest element.
    pub fn pop(&mut self) -> Option<T> {
        pop_heap(&mut self.c, &self.cmp);
        self.c.pop_back()
    }

    /// The comparator.
    #[inline]
    pub fn compare(&self) -> &Cmp {
        &self.cmp
    }

    /// The underlying container, in heap order.
    #[inline]
    pub fn as_container(&self) -> &C {
        &self.c
    }

    /// Unwraps the underlying container, in heap order.
    #[inline]
    pub fn into_container(self) -> C {
        self.c
    }

    /// Exchange contents and comparators with `other`.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}

impl<T, Cmp, C> Default for PriorityQueue<T, Cmp, C>
where
    Cmp: Compare<T> + Default,
    C: HeapStorage<Item = T> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, Cmp: Clone, C: HeapStorage<Item = T> + Clone> Clone for PriorityQueue<T, Cmp, C> {
    fn clone(&self) -> Self {
        Self {
            c: self.c.clone(),
            cmp: self.cmp.clone(),
        }
    }
}

impl<T, Cmp, C: HeapStorage<Item = T> + fmt::Debug> fmt::Debug for PriorityQueue<T, Cmp, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityQueue").field("c", &self.c).finish()
    }
}

impl<T, Cmp: Compare<T>, C: HeapStorage<Item = T>> Extend<T> for PriorityQueue<T, Cmp, C> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<T, Cmp, C> FromIterator<T> for PriorityQueue<T, Cmp, C>
where
    Cmp: Compare<T> + Default,
    C: HeapStorage<Item = T> + FromIterator<T>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_container(iter.into_iter().collect(), Cmp::default())
    }
}
