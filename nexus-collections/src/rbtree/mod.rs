//! Red-black tree engine behind the ordered containers.
//!
//! [`RbTree`] stores values of type `V` ordered by a key `K` extracted with a
//! [`KeyOf`] policy and compared with a [`Compare`] policy. It supports both
//! unique keys (sets, maps) and equal keys (multisets, multimaps); the
//! adapters in [`crate::map`] and [`crate::set`] wrap it with the familiar
//! APIs.
//!
//! Every operation is O(log n). Lookups and inserts compare before touching
//! the tree, so a panicking comparison leaves it unchanged.
//!
//! ```
//! use nexus_collections::compare::{Identity, Less};
//! use nexus_collections::rbtree::RbTree;
//!
//! let mut tree: RbTree<i32, i32, Identity, Less> = RbTree::new();
//! for v in [5, 1, 4, 1, 3] {
//!     tree.insert_equal(v);
//! }
//! assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [1, 1, 3, 4, 5]);
//! assert_eq!(tree.count(&1), 2);
//! assert!(!tree.insert_unique(4).1);
//! assert_eq!(tree.verify().map(|_| ()), Ok(()));
//! ```

mod cursor;
mod node;

pub use cursor::{Cursor, CursorMut, IntoIter, Iter, Range};

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem;
use std::ops::{Bound, RangeBounds};
use std::ptr::{self, NonNull};

use nexus_alloc::{Allocator, PoolAllocator};

use crate::Error;
use crate::compare::{Compare, KeyOf};
use crate::error::infallible;
use crate::raw_buf;

pub(crate) use node::Link;
use node::{Color, Node, NodeBase, value_ptr};

// =============================================================================
// RbViolation
// =============================================================================

/// A broken tree invariant reported by [`RbTree::verify`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RbViolation {
    /// The root is red.
    RedRoot,
    /// A red node has a red child.
    RedChildOfRed,
    /// Two root-to-leaf paths cross different numbers of black nodes.
    BlackHeightMismatch,
    /// A child does not point back at its parent.
    BrokenParentLink,
    /// An in-order neighbor orders before its predecessor.
    OutOfOrder,
    /// The header's leftmost link is not the minimum.
    BadLeftmost,
    /// The header's rightmost link is not the maximum.
    BadRightmost,
    /// The node count disagrees with the stored length.
    LengthMismatch,
}

impl fmt::Display for RbViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            RbViolation::RedRoot => "root is red",
            RbViolation::RedChildOfRed => "red node with a red child",
            RbViolation::BlackHeightMismatch => "unequal black heights",
            RbViolation::BrokenParentLink => "child does not link back to its parent",
            RbViolation::OutOfOrder => "nodes out of order",
            RbViolation::BadLeftmost => "leftmost link is not the minimum",
            RbViolation::BadRightmost => "rightmost link is not the maximum",
            RbViolation::LengthMismatch => "node count differs from length",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for RbViolation {}

// =============================================================================
// RbTree
// =============================================================================

/// Ordered red-black tree of `V`, keyed by `X::key(&v)` under `C`.
///
/// The header node is allocated on first insert; an unused tree holds no
/// memory.
pub struct RbTree<V, K, X, C, A: Allocator = PoolAllocator> {
    header: Link,
    len: usize,
    cmp: C,
    alloc: A,
    _marker: PhantomData<(V, fn(&V) -> &K, X)>,
}

unsafe impl<V: Send, K, X, C: Send, A: Allocator + Send> Send for RbTree<V, K, X, C, A> {}
unsafe impl<V: Sync, K, X, C: Sync, A: Allocator + Sync> Sync for RbTree<V, K, X, C, A> {}

impl<V, K, X, C> RbTree<V, K, X, C>
where
    X: KeyOf<V, K>,
    C: Compare<K> + Default,
{
    /// Creates an empty tree with the default comparison.
    #[inline]
    pub fn new() -> Self {
        Self::new_in(C::default(), PoolAllocator)
    }
}

impl<V, K, X, C> RbTree<V, K, X, C>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
{
    /// Creates an empty tree ordered by `cmp`.
    #[inline]
    pub fn with_compare(cmp: C) -> Self {
        Self::new_in(cmp, PoolAllocator)
    }
}

impl<V, K, X, C> Default for RbTree<V, K, X, C>
where
    X: KeyOf<V, K>,
    C: Compare<K> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, K, X, C, A> RbTree<V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
    /// Creates an empty tree with an explicit comparison and allocator.
    #[inline]
    pub fn new_in(cmp: C, alloc: A) -> Self {
        Self {
            header: ptr::null_mut(),
            len: 0,
            cmp,
            alloc,
            _marker: PhantomData,
        }
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Number of values.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if the tree holds no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Largest number of nodes the allocator can serve.
    #[inline]
    pub fn max_size(&self) -> usize {
        self.alloc.max_size::<Node<V>>()
    }

    /// The comparison policy.
    #[inline]
    pub fn compare(&self) -> &C {
        &self.cmp
    }

    #[inline]
    fn root(&self) -> Link {
        if self.header.is_null() {
            ptr::null_mut()
        } else {
            unsafe { (*self.header).parent }
        }
    }

    #[inline]
    fn leftmost(&self) -> Link {
        if self.header.is_null() {
            ptr::null_mut()
        } else {
            unsafe { (*self.header).left }
        }
    }

    #[inline]
    fn rightmost(&self) -> Link {
        if self.header.is_null() {
            ptr::null_mut()
        } else {
            unsafe { (*self.header).right }
        }
    }

    /// Key of a value-holding node.
    ///
    /// # Safety
    ///
    /// `node` must be a live value node; the caller picks a lifetime that
    /// does not outlive it.
    #[inline]
    unsafe fn key_at<'a>(node: Link) -> &'a K
    where
        V: 'a,
    {
        X::key(unsafe { &*value_ptr::<V>(node) })
    }

    /// # Safety
    ///
    /// As [`RbTree::key_at`].
    #[inline]
    pub(crate) unsafe fn value_at<'a>(node: Link) -> &'a V {
        unsafe { &*value_ptr::<V>(node) }
    }

    /// # Safety
    ///
    /// As [`RbTree::key_at`], and no other reference to the value may exist.
    #[inline]
    pub(crate) unsafe fn value_at_mut<'a>(node: Link) -> &'a mut V {
        unsafe { &mut *value_ptr::<V>(node) }
    }

    #[inline]
    pub(crate) fn end_link(&self) -> Link {
        self.header
    }

    #[inline]
    pub(crate) fn cursor(&self, node: Link) -> Cursor<'_, V> {
        Cursor::new(node, self.header)
    }

    /// Smallest value.
    #[inline]
    pub fn first(&self) -> Option<&V> {
        if self.is_empty() {
            None
        } else {
            Some(unsafe { Self::value_at(self.leftmost()) })
        }
    }

    /// Largest value.
    #[inline]
    pub fn last(&self) -> Option<&V> {
        if self.is_empty() {
            None
        } else {
            Some(unsafe { Self::value_at(self.rightmost()) })
        }
    }

    /// Cursor at the smallest value (the end cursor when empty).
    #[inline]
    pub fn cursor_begin(&self) -> Cursor<'_, V> {
        if self.is_empty() {
            self.cursor_end()
        } else {
            self.cursor(self.leftmost())
        }
    }

    /// Cursor one past the largest value.
    #[inline]
    pub fn cursor_end(&self) -> Cursor<'_, V> {
        self.cursor(self.header)
    }

    /// Mutable cursor at the smallest value.
    pub fn cursor_mut_begin(&mut self) -> CursorMut<'_, V, K, X, C, A> {
        let node = if self.is_empty() {
            self.header
        } else {
            self.leftmost()
        };
        CursorMut::new(self, node)
    }

    /// Mutable cursor at the end position.
    pub fn cursor_mut_end(&mut self) -> CursorMut<'_, V, K, X, C, A> {
        let node = self.header;
        CursorMut::new(self, node)
    }

    /// Mutable cursor at the first value not ordered before `key`.
    pub fn lower_bound_mut(&mut self, key: &K) -> CursorMut<'_, V, K, X, C, A> {
        let node = self.lower_bound_link(key);
        CursorMut::new(self, node)
    }

    /// In-order iterator.
    #[inline]
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(self.cursor_begin().link(), self.header, self.len)
    }

    /// Iterator over the values whose keys fall in `range`.
    pub fn range<R: RangeBounds<K>>(&self, range: R) -> Range<'_, V> {
        let front = match range.start_bound() {
            Bound::Included(k) => self.lower_bound_link(k),
            Bound::Excluded(k) => self.upper_bound_link(k),
            Bound::Unbounded => self.cursor_begin().link(),
        };
        let back = match range.end_bound() {
            Bound::Included(k) => self.upper_bound_link(k),
            Bound::Excluded(k) => self.lower_bound_link(k),
            Bound::Unbounded => self.header,
        };
        // An inverted range yields nothing.
        let back = if self.precedes(back, front) { front } else { back };
        Range::new(front, back)
    }

    /// `true` if position `a` lies strictly before position `b`.
    fn precedes(&self, a: Link, b: Link) -> bool {
        if a == b || a == self.header {
            return false;
        }
        if b == self.header {
            return true;
        }
        unsafe { self.cmp.less(Self::key_at(a), Self::key_at(b)) }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub(crate) fn lower_bound_link(&self, key: &K) -> Link {
        let mut y = self.header;
        let mut x = self.root();
        while !x.is_null() {
            if !self.cmp.less(unsafe { Self::key_at(x) }, key) {
                y = x;
                x = unsafe { (*x).left };
            } else {
                x = unsafe { (*x).right };
            }
        }
        y
    }

    pub(crate) fn upper_bound_link(&self, key: &K) -> Link {
        let mut y = self.header;
        let mut x = self.root();
        while !x.is_null() {
            if self.cmp.less(key, unsafe { Self::key_at(x) }) {
                y = x;
                x = unsafe { (*x).left };
            } else {
                x = unsafe { (*x).right };
            }
        }
        y
    }

    pub(crate) fn find_link(&self, key: &K) -> Link {
        let j = self.lower_bound_link(key);
        if j == self.header || self.cmp.less(key, unsafe { Self::key_at(j) }) {
            self.header
        } else {
            j
        }
    }

    /// Cursor at a value equivalent to `key`, or the end cursor.
    #[inline]
    pub fn find(&self, key: &K) -> Cursor<'_, V> {
        self.cursor(self.find_link(key))
    }

    /// A value equivalent to `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        let node = self.find_link(key);
        if node == self.header {
            None
        } else {
            Some(unsafe { Self::value_at(node) })
        }
    }

    /// `true` if some value is equivalent to `key`.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.find_link(key) != self.header
    }

    /// First position whose key is not ordered before `key`.
    #[inline]
    pub fn lower_bound(&self, key: &K) -> Cursor<'_, V> {
        self.cursor(self.lower_bound_link(key))
    }

    /// First position whose key is ordered after `key`.
    #[inline]
    pub fn upper_bound(&self, key: &K) -> Cursor<'_, V> {
        self.cursor(self.upper_bound_link(key))
    }

    /// `(lower_bound, upper_bound)` for `key`.
    #[inline]
    pub fn equal_range(&self, key: &K) -> (Cursor<'_, V>, Cursor<'_, V>) {
        (self.lower_bound(key), self.upper_bound(key))
    }

    /// Number of values equivalent to `key`.
    pub fn count(&self, key: &K) -> usize {
        self.range((Bound::Included(key), Bound::Included(key)))
            .count()
    }

    // =========================================================================
    // Insert
    // =========================================================================

    fn ensure_header(&mut self) -> Result<(), Error> {
        if self.header.is_null() {
            let header = raw_buf::allocate::<NodeBase, A>(&self.alloc, 1)?.as_ptr();
            unsafe { NodeBase::init_header(header) };
            self.header = header;
        }
        Ok(())
    }

    fn create_node(&self, value: V) -> Result<Link, Error> {
        let node = raw_buf::allocate::<Node<V>, A>(&self.alloc, 1)?.as_ptr();
        unsafe {
            node.write(Node {
                base: NodeBase {
                    color: Color::Red,
                    parent: ptr::null_mut(),
                    left: ptr::null_mut(),
                    right: ptr::null_mut(),
                },
                value,
            });
        }
        Ok(node.cast())
    }

    /// Allocate a node for `value` and link it under `parent`.
    fn link_new(&mut self, insert_left: bool, parent: Link, value: V) -> Result<Link, Error> {
        let node = self.create_node(value)?;
        unsafe { node::insert_and_rebalance(insert_left, node, parent, self.header) };
        self.len += 1;
        Ok(node)
    }

    /// Insert `value` unless an equivalent value exists.
    ///
    /// Returns the position of the inserted value, or of the existing one
    /// together with `false` (in which case `value` is dropped).
    pub fn insert_unique(&mut self, value: V) -> (Cursor<'_, V>, bool) {
        let (node, inserted) = infallible(self.insert_unique_link(value));
        (self.cursor(node), inserted)
    }

    /// Fallible [`RbTree::insert_unique`].
    pub fn try_insert_unique(&mut self, value: V) -> Result<(Cursor<'_, V>, bool), Error> {
        let (node, inserted) = self.insert_unique_link(value)?;
        Ok((self.cursor(node), inserted))
    }

    pub(crate) fn insert_unique_link(&mut self, value: V) -> Result<(Link, bool), Error> {
        let (parent, insert_left) = match self.unique_position(X::key(&value)) {
            Ok(slot) => slot,
            Err(existing) => return Ok((existing, false)),
        };
        self.ensure_header()?;
        let parent = if parent.is_null() { self.header } else { parent };
        Ok((self.link_new(insert_left, parent, value)?, true))
    }

    /// Where a unique `key` would be linked: `Ok((parent, left))`, or the
    /// equivalent node. A null parent means "the header" for an empty tree.
    fn unique_position(&self, key: &K) -> Result<(Link, bool), Link> {
        let mut y = self.header;
        let mut x = self.root();
        let mut go_left = true;
        while !x.is_null() {
            y = x;
            go_left = self.cmp.less(key, unsafe { Self::key_at(x) });
            x = unsafe {
                if go_left {
                    (*x).left
                } else {
                    (*x).right
                }
            };
        }
        if y.is_null() || y == self.header {
            return Ok((y, true));
        }

        let mut j = y;
        if go_left {
            if j == self.leftmost() {
                return Ok((y, true));
            }
            j = unsafe { node::decrement(j) };
        }
        if self.cmp.less(unsafe { Self::key_at(j) }, key) {
            Ok((y, go_left))
        } else {
            Err(j)
        }
    }

    /// Insert `value` after any equivalent values.
    pub fn insert_equal(&mut self, value: V) -> Cursor<'_, V> {
        let node = infallible(self.insert_equal_link(value));
        self.cursor(node)
    }

    /// Fallible [`RbTree::insert_equal`].
    pub fn try_insert_equal(&mut self, value: V) -> Result<Cursor<'_, V>, Error> {
        let node = self.insert_equal_link(value)?;
        Ok(self.cursor(node))
    }

    pub(crate) fn insert_equal_link(&mut self, value: V) -> Result<Link, Error> {
        let mut y = self.header;
        let mut x = self.root();
        let mut go_left = true;
        while !x.is_null() {
            y = x;
            go_left = self.cmp.less(X::key(&value), unsafe { Self::key_at(x) });
            x = unsafe {
                if go_left {
                    (*x).left
                } else {
                    (*x).right
                }
            };
        }
        self.ensure_header()?;
        let parent = if y.is_null() { self.header } else { y };
        self.link_new(parent == self.header || go_left, parent, value)
    }

    /// Unique insert using `hint` as the expected successor position.
    ///
    /// When `value` belongs immediately before `hint` this costs O(1)
    /// comparisons; otherwise it falls back to a full search.
    pub(crate) fn insert_unique_hint_link(
        &mut self,
        hint: Link,
        value: V,
    ) -> Result<(Link, bool), Error> {
        if self.is_empty() {
            return self.insert_unique_link(value);
        }
        let key = X::key(&value);

        if hint == self.leftmost() {
            if self.cmp.less(key, unsafe { Self::key_at(hint) }) {
                return Ok((self.link_new(true, hint, value)?, true));
            }
        } else if hint == self.header {
            let last = self.rightmost();
            if self.cmp.less(unsafe { Self::key_at(last) }, key) {
                return Ok((self.link_new(false, last, value)?, true));
            }
        } else {
            let before = unsafe { node::decrement(hint) };
            let (lo, hi) = unsafe { (Self::key_at(before), Self::key_at(hint)) };
            if self.cmp.less(lo, key) && self.cmp.less(key, hi) {
                return if unsafe { (*before).right.is_null() } {
                    Ok((self.link_new(false, before, value)?, true))
                } else {
                    Ok((self.link_new(true, hint, value)?, true))
                };
            }
        }
        self.insert_unique_link(value)
    }

    // =========================================================================
    // Erase
    // =========================================================================

    /// Unlink and free `node`, returning its value.
    ///
    /// # Safety
    ///
    /// `node` must be a value-holding node of this tree.
    pub(crate) unsafe fn erase_link(&mut self, node: Link) -> V {
        unsafe {
            let z = node::rebalance_for_erase(node, self.header);
            self.len -= 1;
            let value = ptr::read(value_ptr::<V>(z));
            self.alloc
                .deallocate(NonNull::new_unchecked(z.cast::<Node<V>>()), 1);
            value
        }
    }

    /// Remove and return a value equivalent to `key` (the first in order).
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let node = self.find_link(key);
        if node == self.header {
            None
        } else {
            Some(unsafe { self.erase_link(node) })
        }
    }

    /// Remove every value equivalent to `key`; returns how many were removed.
    pub fn erase_key(&mut self, key: &K) -> usize {
        let first = self.lower_bound_link(key);
        let last = self.upper_bound_link(key);
        self.erase_links(first, last)
    }

    /// Remove every value whose key falls in `range`; returns how many.
    pub fn erase_range<R: RangeBounds<K>>(&mut self, range: R) -> usize {
        let (first, last) = {
            let r = self.range(range);
            r.links()
        };
        self.erase_links(first, last)
    }

    fn erase_links(&mut self, mut first: Link, last: Link) -> usize {
        if first == self.cursor_begin().link() && last == self.header {
            let n = self.len;
            self.clear();
            return n;
        }
        let mut removed = 0;
        while first != last {
            let next = unsafe { node::increment(first) };
            drop(unsafe { self.erase_link(first) });
            first = next;
            removed += 1;
        }
        removed
    }

    /// Remove and return the smallest value.
    pub fn pop_first(&mut self) -> Option<V> {
        if self.is_empty() {
            None
        } else {
            Some(unsafe { self.erase_link(self.leftmost()) })
        }
    }

    /// Remove and return the largest value.
    pub fn pop_last(&mut self) -> Option<V> {
        if self.is_empty() {
            None
        } else {
            Some(unsafe { self.erase_link(self.rightmost()) })
        }
    }

    /// Drop every value. The header is kept.
    pub fn clear(&mut self) {
        let root = self.root();
        if root.is_null() {
            return;
        }
        unsafe {
            NodeBase::init_header(self.header);
        }
        self.len = 0;
        unsafe { drop_subtree::<V, A>(&self.alloc, root) };
    }

    /// Exchange contents with `other` in O(1).
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Check every red-black invariant plus the header links and ordering.
    ///
    /// Returns the black height of the tree. O(n).
    pub fn verify(&self) -> Result<usize, RbViolation> {
        let root = self.root();
        if root.is_null() {
            if self.len != 0 {
                return Err(RbViolation::LengthMismatch);
            }
            if !self.header.is_null()
                && (self.leftmost() != self.header || self.rightmost() != self.header)
            {
                return Err(RbViolation::BadLeftmost);
            }
            return Ok(0);
        }
        unsafe {
            if (*root).color != Color::Black {
                return Err(RbViolation::RedRoot);
            }
            if (*root).parent != self.header {
                return Err(RbViolation::BrokenParentLink);
            }
            if self.leftmost() != node::minimum(root) {
                return Err(RbViolation::BadLeftmost);
            }
            if self.rightmost() != node::maximum(root) {
                return Err(RbViolation::BadRightmost);
            }
        }

        let (height, count) = self.verify_subtree(root)?;
        if count != self.len {
            return Err(RbViolation::LengthMismatch);
        }

        let mut prev = self.leftmost();
        let mut cur = unsafe { node::increment(prev) };
        while cur != self.header {
            let (cur_key, prev_key) = unsafe { (Self::key_at(cur), Self::key_at(prev)) };
            if self.cmp.less(cur_key, prev_key) {
                return Err(RbViolation::OutOfOrder);
            }
            prev = cur;
            cur = unsafe { node::increment(cur) };
        }
        Ok(height)
    }

    /// `(black height, node count)` of the subtree at `x`.
    fn verify_subtree(&self, x: Link) -> Result<(usize, usize), RbViolation> {
        if x.is_null() {
            return Ok((1, 0));
        }
        unsafe {
            let (left, right) = ((*x).left, (*x).right);
            for child in [left, right] {
                if !child.is_null() && (*child).parent != x {
                    return Err(RbViolation::BrokenParentLink);
                }
            }
            if (*x).color == Color::Red && (node::is_red(left) || node::is_red(right)) {
                return Err(RbViolation::RedChildOfRed);
            }
            let (lh, lc) = self.verify_subtree(left)?;
            let (rh, rc) = self.verify_subtree(right)?;
            if lh != rh {
                return Err(RbViolation::BlackHeightMismatch);
            }
            let own = usize::from((*x).color == Color::Black);
            Ok((lh + own, lc + rc + 1))
        }
    }
}

impl<V, K, X, C, A: Allocator> Drop for RbTree<V, K, X, C, A> {
    fn drop(&mut self) {
        if self.header.is_null() {
            return;
        }
        unsafe {
            let root = (*self.header).parent;
            drop_subtree::<V, A>(&self.alloc, root);
            self.alloc
                .deallocate(NonNull::new_unchecked(self.header), 1);
        }
    }
}

/// Free `x` and everything below it without rebalancing. Recurses on right
/// children only.
unsafe fn drop_subtree<V, A: Allocator>(alloc: &A, mut x: Link) {
    while !x.is_null() {
        unsafe {
            drop_subtree::<V, A>(alloc, (*x).right);
            let left = (*x).left;
            let node = x.cast::<Node<V>>();
            ptr::drop_in_place(&raw mut (*node).value);
            alloc.deallocate(NonNull::new_unchecked(node), 1);
            x = left;
        }
    }
}

// =============================================================================
// Clone
// =============================================================================

impl<V, K, X, C, A> Clone for RbTree<V, K, X, C, A>
where
    V: Clone,
    X: KeyOf<V, K>,
    C: Compare<K> + Clone,
    A: Allocator,
{
    /// Structural copy: same shape and colors, no comparisons.
    ///
    /// If a value's `clone` panics, the nodes copied so far are dropped and
    /// the panic continues.
    fn clone(&self) -> Self {
        let mut out = Self::new_in(self.cmp.clone(), self.alloc.clone());
        let src_root = self.root();
        if src_root.is_null() {
            return out;
        }
        infallible(out.ensure_header());
        unsafe {
            let root = out.clone_node(src_root);
            (*root).parent = out.header;
            // Linked before copying further so unwinding reaches every node.
            (*out.header).parent = root;
            out.copy_children(src_root, root);
            (*out.header).left = node::minimum(root);
            (*out.header).right = node::maximum(root);
        }
        out.len = self.len;
        out
    }
}

impl<V, K, X, C, A> RbTree<V, K, X, C, A>
where
    V: Clone,
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
    /// Copy of `src` with the same color and no children.
    unsafe fn clone_node(&self, src: Link) -> Link {
        let value = unsafe { Self::value_at(src) }.clone();
        let node = infallible(self.create_node(value));
        unsafe { (*node).color = (*src).color };
        node
    }

    /// Copy the subtrees below `src` under `dst`. Recurses on right
    /// children and iterates down the left spine.
    unsafe fn copy_children(&self, mut src: Link, mut dst: Link) {
        unsafe {
            loop {
                let right = (*src).right;
                if !right.is_null() {
                    let r = self.clone_node(right);
                    (*r).parent = dst;
                    (*dst).right = r;
                    self.copy_children(right, r);
                }
                let left = (*src).left;
                if left.is_null() {
                    break;
                }
                let l = self.clone_node(left);
                (*l).parent = dst;
                (*dst).left = l;
                src = left;
                dst = l;
            }
        }
    }
}

// =============================================================================
// Trait impls
// =============================================================================

impl<V: fmt::Debug, K, X, C, A> fmt::Debug for RbTree<V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<V: PartialEq, K, X, C, A> PartialEq for RbTree<V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<V: Eq, K, X, C, A> Eq for RbTree<V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
}

impl<V: PartialOrd, K, X, C, A> PartialOrd for RbTree<V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<V: Ord, K, X, C, A> Ord for RbTree<V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<V: Hash, K, X, C, A> Hash for RbTree<V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for v in self.iter() {
            v.hash(state);
        }
    }
}

impl<'a, V, K, X, C, A> IntoIterator for &'a RbTree<V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
    type Item = &'a V;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Iter<'a, V> {
        self.iter()
    }
}

impl<V, K, X, C, A> IntoIterator for RbTree<V, K, X, C, A>
where
    X: KeyOf<V, K>,
    C: Compare<K>,
    A: Allocator,
{
    type Item = V;
    type IntoIter = IntoIter<V, K, X, C, A>;

    fn into_iter(self) -> IntoIter<V, K, X, C, A> {
        IntoIter::new(self)
    }
}

#[cfg(test)]
mod tests;
