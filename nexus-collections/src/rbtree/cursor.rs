use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr;

use nexus_alloc::Allocator;

use super::RbTree;
use super::node::{self, Link, value_ptr};
use crate::compare::{Compare, KeyOf};
use crate::cursor::{BidirectionalPosition, Category, Position};
use crate::error::infallible;

// =============================================================================
// Cursor
// =============================================================================

/// Bidirectional position in an [`RbTree`].
///
/// Stepping back from the end position reaches the largest value. Stepping
/// forward from the end, or back from the first value, is a logic error.
pub struct Cursor<'a, V> {
    node: Link,
    header: Link,
    _marker: PhantomData<&'a V>,
}

impl<'a, V> Cursor<'a, V> {
    #[inline]
    pub(super) fn new(node: Link, header: Link) -> Self {
        Self {
            node,
            header,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn link(&self) -> Link {
        self.node
    }

    /// `true` at the end position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.node == self.header
    }

    /// The value at this position, `None` at the end.
    #[inline]
    pub fn get(&self) -> Option<&'a V> {
        if self.is_end() {
            None
        } else {
            Some(unsafe { &*value_ptr::<V>(self.node) })
        }
    }
}

impl<V> Clone for Cursor<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Cursor<'_, V> {}

impl<V> PartialEq for Cursor<'_, V> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<V> Eq for Cursor<'_, V> {}

impl<V: fmt::Debug> fmt::Debug for Cursor<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => f.debug_tuple("Cursor").field(v).finish(),
            None => f.write_str("Cursor(end)"),
        }
    }
}

impl<V> Position for Cursor<'_, V> {
    const CATEGORY: Category = Category::Bidirectional;
    type Value = V;

    #[inline]
    fn step(&mut self) {
        if !self.is_end() {
            self.node = unsafe { node::increment(self.node) };
        }
    }

    #[inline]
    fn as_ptr(&self) -> *const V {
        if self.is_end() {
            ptr::null()
        } else {
            value_ptr::<V>(self.node)
        }
    }
}

impl<V> BidirectionalPosition for Cursor<'_, V> {
    #[inline]
    fn step_back(&mut self) {
        // An empty tree has nothing before the end.
        if self.header.is_null() || unsafe { (*self.header).parent }.is_null() {
            return;
        }
        self.node = unsafe { node::decrement(self.node) };
    }
}

// =============================================================================
// Iter / Range
// =============================================================================

/// In-order iterator over `&V`.
pub struct Iter<'a, V> {
    front: Link,
    back: Link,
    remaining: usize,
    _marker: PhantomData<&'a V>,
}

unsafe impl<V: Sync> Send for Iter<'_, V> {}
unsafe impl<V: Sync> Sync for Iter<'_, V> {}

impl<V> Iter<'_, V> {
    #[inline]
    pub(super) fn new(front: Link, back: Link, remaining: usize) -> Self {
        Self {
            front,
            back,
            remaining,
            _marker: PhantomData,
        }
    }
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self::new(self.front, self.back, self.remaining)
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let item = unsafe { &*value_ptr::<V>(self.front) };
        self.front = unsafe { node::increment(self.front) };
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V> DoubleEndedIterator for Iter<'a, V> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a V> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.back = unsafe { node::decrement(self.back) };
        Some(unsafe { &*value_ptr::<V>(self.back) })
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
impl<V> FusedIterator for Iter<'_, V> {}

/// In-order iterator over the values between two positions.
pub struct Range<'a, V> {
    front: Link,
    back: Link,
    _marker: PhantomData<&'a V>,
}

unsafe impl<V: Sync> Send for Range<'_, V> {}
unsafe impl<V: Sync> Sync for Range<'_, V> {}

impl<V> Range<'_, V> {
    #[inline]
    pub(super) fn new(front: Link, back: Link) -> Self {
        Self {
            front,
            back,
            _marker: PhantomData,
        }
    }

    /// Remaining `[front, back)` positions.
    #[inline]
    pub(super) fn links(&self) -> (Link, Link) {
        (self.front, self.back)
    }
}

impl<V> Clone for Range<'_, V> {
    fn clone(&self) -> Self {
        Self {
            front: self.front,
            back: self.back,
            _marker: PhantomData,
        }
    }
}

impl<'a, V> Iterator for Range<'a, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        if self.front == self.back {
            return None;
        }
        let item = unsafe { &*value_ptr::<V>(self.front) };
        self.front = unsafe { node::increment(self.front) };
        Some(item)
    }
}

impl<'a, V> DoubleEndedIterator for Range<'a, V> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a V> {
        if self.front == self.back {
            return None;
        }
        self.back = unsafe { node::decrement(self.back) };
        Some(unsafe { &*value_ptr::<V>(self.back) })
    }
}

impl<V> FusedIterator for Range<'_, V> {}

// =============================================================================
// IntoIter
// =============================================================================

/// Owning in-order iterator.
pub struct IntoIter<V, K, X, C, A: Allocator> {
    tree: RbTree<V, K, X, C, A>,
}

impl<V, K, X, C, A> IntoIter<V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
    pub(super) fn new(tree: RbTree<V, K, X, C, A>) -> Self {
        Self { tree }
    }
}

impl<V, K, X, C, A> Iterator for IntoIter<V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
    type Item = V;

    #[inline]
    fn next(&mut self) -> Option<V> {
        self.tree.pop_first()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.tree.len(), Some(self.tree.len()))
    }
}

impl<V, K, X, C, A> DoubleEndedIterator for IntoIter<V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
    #[inline]
    fn next_back(&mut self) -> Option<V> {
        self.tree.pop_last()
    }
}

impl<V, K, X, C, A> ExactSizeIterator for IntoIter<V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
}

// =============================================================================
// CursorMut
// =============================================================================

/// Position in an [`RbTree`] that can insert and remove around itself.
///
/// Values are only reachable through shared references: mutating a key in
/// place would break the ordering.
pub struct CursorMut<'a, V, K, X, C, A: Allocator> {
    tree: &'a mut RbTree<V, K, X, C, A>,
    node: Link,
}

impl<'a, V, K, X, C, A> CursorMut<'a, V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
    pub(super) fn new(tree: &'a mut RbTree<V, K, X, C, A>, node: Link) -> Self {
        Self { tree, node }
    }

    /// `true` at the end position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.node == self.tree.end_link()
    }

    #[inline]
    pub(crate) fn link(&self) -> Link {
        self.node
    }

    /// The value at this position, `None` at the end.
    #[inline]
    pub fn get(&self) -> Option<&V> {
        if self.is_end() {
            None
        } else {
            Some(unsafe { RbTree::<V, K, X, C, A>::value_at(self.node) })
        }
    }

    /// Read-only view of this position.
    #[inline]
    pub fn as_cursor(&self) -> Cursor<'_, V> {
        self.tree.cursor(self.node)
    }

    /// Step to the next value (no-op at the end).
    pub fn move_next(&mut self) {
        if !self.is_end() {
            self.node = unsafe { node::increment(self.node) };
        }
    }

    /// Step to the previous value (no-op on an empty tree).
    pub fn move_prev(&mut self) {
        let mut c = self.as_cursor();
        c.step_back();
        self.node = c.link();
    }

    /// Remove the value here and move to its successor.
    pub fn remove_current(&mut self) -> Option<V> {
        if self.is_end() {
            return None;
        }
        let next = unsafe { node::increment(self.node) };
        let value = unsafe { self.tree.erase_link(self.node) };
        self.node = next;
        Some(value)
    }

    /// Insert `value` using this position as the hint for where it belongs.
    ///
    /// A correct hint (the value orders just before this position) makes the
    /// insert O(1) amortized. Afterwards the cursor sits on the inserted
    /// value, or on the equivalent value that prevented the insert (then
    /// `false` is returned and `value` is dropped).
    pub fn insert_unique(&mut self, value: V) -> bool {
        let (node, inserted) = infallible(self.tree.insert_unique_hint_link(self.node, value));
        self.node = node;
        inserted
    }
}

impl<V: fmt::Debug, K, X, C, A> fmt::Debug for CursorMut<'_, V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => f.debug_tuple("CursorMut").field(v).finish(),
            None => f.write_str("CursorMut(end)"),
        }
    }
}
