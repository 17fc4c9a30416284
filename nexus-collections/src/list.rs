//! Doubly linked list with a sentinel header.
//!
//! Nodes are allocated one at a time from the list's allocator. The header is
//! a link-only node that closes the ring: an empty list's header points at
//! itself, and the end position of every cursor is the header. The header
//! is allocated on first insert, so `List::new` does not allocate.
//!
//! Splicing, merging, sorting and reversal relink nodes without moving or
//! cloning values.
//!
//! ```
//! use nexus_collections::List;
//!
//! let mut a: List<u32> = [5, 1, 4].into_iter().collect();
//! let mut b: List<u32> = [3, 2].into_iter().collect();
//! a.sort();
//! b.sort();
//! a.merge(&mut b);
//! assert!(b.is_empty());
//! assert!(a.iter().copied().eq([1, 2, 3, 4, 5]));
//!
//! a.reverse();
//! assert_eq!(a.front(), Some(&5));
//! ```
//!
//! # Moving elements between lists
//!
//! [`CursorMut`] inserts before its position and can take elements out of
//! another list's cursor in O(1) per element:
//!
//! ```
//! use nexus_collections::List;
//!
//! let mut resting: List<&str> = ["a", "b", "c"].into_iter().collect();
//! let mut filled: List<&str> = List::new();
//!
//! let mut src = resting.cursor_mut_begin();
//! src.move_next();
//! let mut dst = filled.cursor_mut_end();
//! assert!(dst.splice_one(&mut src));
//! assert_eq!(src.get(), Some(&"c"));
//! drop((src, dst));
//!
//! assert!(resting.iter().eq(["a", "c"].iter()));
//! assert!(filled.iter().eq(["b"].iter()));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};

use nexus_alloc::{Allocator, PoolAllocator};

use crate::Error;
use crate::cursor::{BidirectionalPosition, Category, Position};
use crate::error::{infallible, out_of_range};
use crate::raw_buf;

// =============================================================================
// Links
// =============================================================================

#[repr(C)]
struct Links {
    prev: Link,
    next: Link,
}

type Link = *mut Links;

#[repr(C)]
struct ListNode<T> {
    links: Links,
    value: T,
}

/// Address of the value inside the node whose links live at `link`.
#[inline]
fn value_ptr<T>(link: Link) -> *mut T {
    link.cast::<u8>()
        .wrapping_add(mem::offset_of!(ListNode<T>, value))
        .cast::<T>()
}

/// Link `node` in front of `pos`.
#[inline]
unsafe fn link_before(pos: Link, node: Link) {
    unsafe {
        let prev = (*pos).prev;
        (*node).prev = prev;
        (*node).next = pos;
        (*prev).next = node;
        (*pos).prev = node;
    }
}

#[inline]
unsafe fn unlink(node: Link) {
    unsafe {
        let (prev, next) = ((*node).prev, (*node).next);
        (*prev).next = next;
        (*next).prev = prev;
    }
}

/// Move `[first, last)` in front of `pos`, which must not lie inside the
/// range. The range may belong to another ring.
unsafe fn transfer(pos: Link, first: Link, last: Link) {
    if pos == last || first == last {
        return;
    }
    unsafe {
        (*(*last).prev).next = pos;
        (*(*first).prev).next = last;
        (*(*pos).prev).next = first;
        let tmp = (*pos).prev;
        (*pos).prev = (*last).prev;
        (*last).prev = (*first).prev;
        (*first).prev = tmp;
    }
}

/// Stable merge sort of the `n` nodes in `[first, last)`. Returns the new
/// first node; the nodes around the region are not touched.
///
/// Every step is a relink between valid nodes, so a panicking `less`
/// leaves the ring intact with every node still inside the region.
unsafe fn sort_region<T, F>(first: Link, last: Link, n: usize, less: &mut F) -> Link
where
    F: FnMut(&T, &T) -> bool,
{
    if n < 2 {
        return first;
    }
    let half = n / 2;
    let mut mid = first;
    for _ in 0..half {
        mid = unsafe { (*mid).next };
    }
    unsafe {
        let first = sort_region::<T, F>(first, mid, half, less);
        let mid = sort_region::<T, F>(mid, last, n - half, less);
        merge_region::<T, F>(first, mid, last, less)
    }
}

/// Merge the sorted runs `[a, b)` and `[b, last)` in place.
unsafe fn merge_region<T, F>(mut a: Link, mut b: Link, last: Link, less: &mut F) -> Link
where
    F: FnMut(&T, &T) -> bool,
{
    let mut first = a;
    // The unmerged part of the left run is always [a, b).
    while a != b && b != last {
        unsafe {
            if less(&*value_ptr::<T>(b), &*value_ptr::<T>(a)) {
                let next = (*b).next;
                unlink(b);
                link_before(a, b);
                if first == a {
                    first = b;
                }
                b = next;
            } else {
                a = (*a).next;
            }
        }
    }
    first
}

// =============================================================================
// List
// =============================================================================

/// Doubly linked list.
///
/// `A` supplies one node per element plus the header.
pub struct List<T, A: Allocator = PoolAllocator> {
    header: Link,
    len: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, A: Allocator + Send> Send for List<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for List<T, A> {}

impl<T> List<T> {
    /// Creates an empty list. Does not allocate.
    #[inline]
    pub fn new() -> Self {
        Self::new_in(PoolAllocator)
    }

    /// Creates a list of `n` clones of `value`.
    pub fn from_elem(n: usize, value: &T) -> Self
    where
        T: Clone,
    {
        Self::from_elem_in(n, value, PoolAllocator)
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator> List<T, A> {
    /// Creates an empty list using `alloc`.
    #[inline]
    pub fn new_in(alloc: A) -> Self {
        Self {
            header: ptr::null_mut(),
            len: 0,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Creates a list of `n` clones of `value` using `alloc`.
    pub fn from_elem_in(n: usize, value: &T, alloc: A) -> Self
    where
        T: Clone,
    {
        let mut list = Self::new_in(alloc);
        list.resize_value(n, value);
        list
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

    /// Largest element count the allocator can serve.
    #[inline]
    pub fn max_size(&self) -> usize {
        self.alloc.max_size::<ListNode<T>>()
    }

    /// First element.
    #[inline]
    pub fn front(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { &*value_ptr::<T>((*self.header).next) })
    }

    /// First element, mutably.
    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { &mut *value_ptr::<T>((*self.header).next) })
    }

    /// Last element.
    #[inline]
    pub fn back(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { &*value_ptr::<T>((*self.header).prev) })
    }

    /// Last element, mutably.
    #[inline]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { &mut *value_ptr::<T>((*self.header).prev) })
    }

    #[inline]
    fn first_link(&self) -> Link {
        if self.header.is_null() {
            ptr::null_mut()
        } else {
            unsafe { (*self.header).next }
        }
    }

    // =========================================================================
    // Cursors and iteration
    // =========================================================================

    /// Position of the first element (the end position when empty).
    #[inline]
    pub fn cursor_begin(&self) -> Cursor<'_, T> {
        Cursor::new(self.first_link(), self.header)
    }

    /// The end position.
    #[inline]
    pub fn cursor_end(&self) -> Cursor<'_, T> {
        Cursor::new(self.header, self.header)
    }

    /// Editing cursor at the first element.
    #[inline]
    pub fn cursor_mut_begin(&mut self) -> CursorMut<'_, T, A> {
        let node = self.first_link();
        CursorMut { list: self, node }
    }

    /// Editing cursor at the end position.
    #[inline]
    pub fn cursor_mut_end(&mut self) -> CursorMut<'_, T, A> {
        let node = self.header;
        CursorMut { list: self, node }
    }

    /// Front-to-back iterator.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            front: self.first_link(),
            back: self.header,
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    /// Front-to-back iterator over mutable references.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            front: self.first_link(),
            back: self.header,
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    // =========================================================================
    // Node storage
    // =========================================================================

    fn ensure_header(&mut self) -> Result<Link, Error> {
        if self.header.is_null() {
            let header = raw_buf::allocate::<Links, A>(&self.alloc, 1)?.as_ptr();
            unsafe {
                header.write(Links {
                    prev: header,
                    next: header,
                })
            };
            self.header = header;
        }
        Ok(self.header)
    }

    fn create_node(&self, value: T) -> Result<Link, Error> {
        let node = raw_buf::allocate::<ListNode<T>, A>(&self.alloc, 1)?.as_ptr();
        unsafe {
            node.write(ListNode {
                links: Links {
                    prev: ptr::null_mut(),
                    next: ptr::null_mut(),
                },
                value,
            })
        };
        Ok(node.cast())
    }

    /// Link a new node for `value` in front of `pos` (null means the end of
    /// a list that has no header yet).
    fn insert_link(&mut self, pos: Link, value: T) -> Result<Link, Error> {
        let header = self.ensure_header()?;
        let pos = if pos.is_null() { header } else { pos };
        let node = self.create_node(value)?;
        unsafe { link_before(pos, node) };
        self.len += 1;
        Ok(node)
    }

    /// # Safety
    ///
    /// `node` must be an element node of this list.
    unsafe fn erase_link(&mut self, node: Link) -> T {
        unsafe {
            unlink(node);
            self.len -= 1;
            let node = node.cast::<ListNode<T>>();
            let value = ptr::read(&raw const (*node).value);
            self.alloc.deallocate(NonNull::new_unchecked(node), 1);
            value
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

    /// Fallible [`List::push_back`]. On error `value` is dropped and the
    /// list is unchanged.
    #[inline]
    pub fn try_push_back(&mut self, value: T) -> Result<(), Error> {
        self.insert_link(self.header, value).map(drop)
    }

    /// Prepend `value`.
    #[inline]
    pub fn push_front(&mut self, value: T) {
        infallible(self.try_push_front(value));
    }

    /// Fallible [`List::push_front`].
    #[inline]
    pub fn try_push_front(&mut self, value: T) -> Result<(), Error> {
        self.insert_link(self.first_link(), value).map(drop)
    }

    /// Remove and return the last element.
    #[inline]
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { self.erase_link((*self.header).prev) })
    }

    /// Remove and return the first element.
    #[inline]
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { self.erase_link((*self.header).next) })
    }

    // =========================================================================
    // Size
    // =========================================================================

    /// Drop every element. The header is kept.
    pub fn clear(&mut self) {
        while self.pop_back().is_some() {}
    }

    /// Drop elements past `len`.
    pub fn truncate(&mut self, len: usize) {
        while self.len > len {
            self.pop_back();
        }
    }

    /// Grow with values from `f` or shrink to `new_len`.
    ///
    /// New nodes are built in a side list and spliced on at the end, so a
    /// panicking `f` leaves the list unchanged.
    pub fn resize_with<F: FnMut() -> T>(&mut self, new_len: usize, mut f: F) {
        if new_len <= self.len {
            self.truncate(new_len);
            return;
        }
        let mut tail = Self::new_in(self.alloc.clone());
        for _ in self.len..new_len {
            tail.push_back(f());
        }
        self.append(&mut tail);
    }

    /// [`List::resize_with`] filling with `T::default()`.
    pub fn resize(&mut self, new_len: usize)
    where
        T: Default,
    {
        self.resize_with(new_len, T::default);
    }

    /// [`List::resize_with`] filling with clones of `value`.
    pub fn resize_value(&mut self, new_len: usize, value: &T)
    where
        T: Clone,
    {
        self.resize_with(new_len, || value.clone());
    }

    // =========================================================================
    // Relinking
    // =========================================================================

    /// Move every element of `other` to the back of this list. O(1).
    pub fn append(&mut self, other: &mut Self) {
        if other.is_empty() {
            return;
        }
        if self.header.is_null() {
            mem::swap(self, other);
            return;
        }
        unsafe { transfer(self.header, (*other.header).next, other.header) };
        self.len += mem::take(&mut other.len);
    }

    /// Split off the elements from index `at` onward into a new list.
    ///
    /// # Panics
    ///
    /// If `at > len`.
    pub fn split_off(&mut self, at: usize) -> Self {
        if at > self.len {
            out_of_range(at, self.len);
        }
        let mut tail = Self::new_in(self.alloc.clone());
        if at == self.len {
            return tail;
        }
        let header = infallible(tail.ensure_header());
        // Walk from whichever end is closer.
        let node = unsafe {
            if at <= self.len / 2 {
                let mut node = (*self.header).next;
                for _ in 0..at {
                    node = (*node).next;
                }
                node
            } else {
                let mut node = self.header;
                for _ in at..self.len {
                    node = (*node).prev;
                }
                node
            }
        };
        unsafe { transfer(header, node, self.header) };
        tail.len = self.len - at;
        self.len = at;
        tail
    }

    /// Merge the sorted `other` into this sorted list; `other` ends empty.
    ///
    /// Stable: among equivalent elements, this list's come first. If `less`
    /// panics, every element is in one of the two lists and both are valid.
    pub fn merge_by<F>(&mut self, other: &mut Self, mut less: F)
    where
        F: FnMut(&T, &T) -> bool,
    {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            self.append(other);
            return;
        }
        unsafe {
            let (end1, end2) = (self.header, other.header);
            let mut a = (*end1).next;
            let mut b = (*end2).next;
            while a != end1 && b != end2 {
                if less(&*value_ptr::<T>(b), &*value_ptr::<T>(a)) {
                    let next = (*b).next;
                    unlink(b);
                    link_before(a, b);
                    other.len -= 1;
                    self.len += 1;
                    b = next;
                } else {
                    a = (*a).next;
                }
            }
            if b != end2 {
                transfer(end1, b, end2);
                self.len += mem::take(&mut other.len);
            }
        }
    }

    /// [`List::merge_by`] in ascending [`Ord`] order.
    pub fn merge(&mut self, other: &mut Self)
    where
        T: Ord,
    {
        self.merge_by(other, |a, b| a < b);
    }

    /// Stable sort by `less`. O(n log n) comparisons, no allocation.
    ///
    /// If `less` panics the list keeps every element in some order.
    pub fn sort_by<F>(&mut self, mut less: F)
    where
        F: FnMut(&T, &T) -> bool,
    {
        if self.len < 2 {
            return;
        }
        unsafe { sort_region::<T, F>(self.first_link(), self.header, self.len, &mut less) };
    }

    /// Stable ascending sort.
    pub fn sort(&mut self)
    where
        T: Ord,
    {
        self.sort_by(|a, b| a < b);
    }

    /// Reverse the order of the elements in place.
    pub fn reverse(&mut self) {
        if self.header.is_null() {
            return;
        }
        let mut node = self.header;
        loop {
            unsafe {
                let next = (*node).next;
                ptr::swap(&raw mut (*node).prev, &raw mut (*node).next);
                node = next;
            }
            if node == self.header {
                break;
            }
        }
    }

    /// Remove each element for which `same(kept, element)` holds, where
    /// `kept` is the nearest preceding element that was not removed.
    /// Returns how many were removed.
    pub fn unique_by<F>(&mut self, mut same: F) -> usize
    where
        F: FnMut(&T, &T) -> bool,
    {
        if self.len < 2 {
            return 0;
        }
        let end = self.header;
        let mut removed = 0;
        unsafe {
            let mut kept = (*end).next;
            let mut node = (*kept).next;
            while node != end {
                let next = (*node).next;
                if same(&*value_ptr::<T>(kept), &*value_ptr::<T>(node)) {
                    drop(self.erase_link(node));
                    removed += 1;
                } else {
                    kept = node;
                }
                node = next;
            }
        }
        removed
    }

    /// Collapse runs of equal elements to their first.
    pub fn unique(&mut self) -> usize
    where
        T: PartialEq,
    {
        self.unique_by(|a, b| a == b)
    }

    /// Remove every element matching `pred`; returns how many.
    pub fn remove_if<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = 0;
        let mut c = self.cursor_mut_begin();
        while let Some(value) = c.get() {
            if pred(value) {
                drop(c.remove_current());
                removed += 1;
            } else {
                c.move_next();
            }
        }
        removed
    }

    /// Remove every element equal to `value`; returns how many.
    pub fn remove(&mut self, value: &T) -> usize
    where
        T: PartialEq,
    {
        self.remove_if(|v| v == value)
    }

    /// Exchange contents with `other` in O(1).
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Check that `prev` and `next` are mutual inverses and that both walk
    /// directions visit exactly `len` elements.
    ///
    /// Used by tests; O(n).
    pub fn verify(&self) -> Result<(), &'static str> {
        if self.header.is_null() {
            return if self.len == 0 {
                Ok(())
            } else {
                Err("elements without a header")
            };
        }
        unsafe {
            let mut count = 0;
            let mut node = self.header;
            loop {
                let next = (*node).next;
                if (*next).prev != node {
                    return Err("next and prev links disagree");
                }
                node = next;
                if node == self.header {
                    break;
                }
                count += 1;
                if count > self.len {
                    return Err("forward walk longer than len");
                }
            }
            if count != self.len {
                return Err("forward walk shorter than len");
            }
            count = 0;
            node = self.header;
            loop {
                let prev = (*node).prev;
                if (*prev).next != node {
                    return Err("prev and next links disagree");
                }
                node = prev;
                if node == self.header {
                    break;
                }
                count += 1;
                if count > self.len {
                    return Err("backward walk longer than len");
                }
            }
            if count != self.len {
                return Err("backward walk shorter than len");
            }
        }
        Ok(())
    }
}

impl<T, A: Allocator> Drop for List<T, A> {
    fn drop(&mut self) {
        self.clear();
        if !self.header.is_null() {
            unsafe {
                self.alloc
                    .deallocate(NonNull::new_unchecked(self.header), 1)
            };
        }
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Read-only bidirectional position in a [`List`].
pub struct Cursor<'a, T> {
    node: Link,
    header: Link,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Cursor<'a, T> {
    #[inline]
    fn new(node: Link, header: Link) -> Self {
        Self {
            node,
            header,
            _marker: PhantomData,
        }
    }

    /// `true` at the end position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.node == self.header
    }

    /// The element here, `None` at the end.
    #[inline]
    pub fn get(&self) -> Option<&'a T> {
        if self.is_end() {
            None
        } else {
            Some(unsafe { &*value_ptr::<T>(self.node) })
        }
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
        self.node == other.node
    }
}

impl<T> Eq for Cursor<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => f.debug_tuple("Cursor").field(v).finish(),
            None => f.write_str("Cursor(end)"),
        }
    }
}

impl<T> Position for Cursor<'_, T> {
    const CATEGORY: Category = Category::Bidirectional;
    type Value = T;

    #[inline]
    fn step(&mut self) {
        if !self.is_end() {
            self.node = unsafe { (*self.node).next };
        }
    }

    #[inline]
    fn as_ptr(&self) -> *const T {
        if self.is_end() {
            ptr::null()
        } else {
            value_ptr::<T>(self.node)
        }
    }
}

impl<T> BidirectionalPosition for Cursor<'_, T> {
    #[inline]
    fn step_back(&mut self) {
        if self.header.is_null() {
            return;
        }
        self.node = unsafe { (*self.node).prev };
    }
}

// =============================================================================
// CursorMut
// =============================================================================

/// Position in a [`List`] that can edit around itself.
///
/// Insertions and splices land in front of the position; removal moves the
/// cursor to the following element.
pub struct CursorMut<'a, T, A: Allocator = PoolAllocator> {
    list: &'a mut List<T, A>,
    node: Link,
}

impl<T, A: Allocator> CursorMut<'_, T, A> {
    /// `true` at the end position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.node == self.list.header
    }

    /// The element here, `None` at the end.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.is_end() {
            None
        } else {
            Some(unsafe { &*value_ptr::<T>(self.node) })
        }
    }

    /// The element here, mutably.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        if self.is_end() {
            None
        } else {
            Some(unsafe { &mut *value_ptr::<T>(self.node) })
        }
    }

    /// Read-only view of this position.
    #[inline]
    pub fn as_cursor(&self) -> Cursor<'_, T> {
        Cursor::new(self.node, self.list.header)
    }

    /// Step to the next element (no-op at the end).
    #[inline]
    pub fn move_next(&mut self) {
        if !self.is_end() {
            self.node = unsafe { (*self.node).next };
        }
    }

    /// Step to the previous element. From the first element this reaches
    /// the end position; from the end, the last element.
    #[inline]
    pub fn move_prev(&mut self) {
        if !self.list.header.is_null() {
            self.node = unsafe { (*self.node).prev };
        }
    }

    /// Resolve a header-less end position once the list has a header.
    #[inline]
    fn settle(&mut self) -> Result<Link, Error> {
        let header = self.list.ensure_header()?;
        if self.node.is_null() {
            self.node = header;
        }
        Ok(self.node)
    }

    /// Insert `value` in front of this position. The cursor does not move.
    #[inline]
    pub fn insert_before(&mut self, value: T) {
        infallible(self.try_insert_before(value));
    }

    /// Fallible [`CursorMut::insert_before`].
    pub fn try_insert_before(&mut self, value: T) -> Result<(), Error> {
        let pos = self.settle()?;
        self.list.insert_link(pos, value).map(drop)
    }

    /// Remove the element here and move to the next one.
    pub fn remove_current(&mut self) -> Option<T> {
        if self.is_end() {
            return None;
        }
        let node = self.node;
        self.node = unsafe { (*node).next };
        Some(unsafe { self.list.erase_link(node) })
    }

    /// Move every element of `other` in front of this position. O(1).
    pub fn splice(&mut self, other: &mut List<T, A>) {
        if other.is_empty() {
            return;
        }
        let pos = infallible(self.settle());
        unsafe { transfer(pos, (*other.header).next, other.header) };
        self.list.len += mem::take(&mut other.len);
    }

    /// Move the element at `src` in front of this position; `src` moves on
    /// to the next element. Returns `false` if `src` is at its end.
    pub fn splice_one(&mut self, src: &mut CursorMut<'_, T, A>) -> bool {
        if src.is_end() {
            return false;
        }
        let pos = infallible(self.settle());
        let node = src.node;
        unsafe {
            src.node = (*node).next;
            unlink(node);
            link_before(pos, node);
        }
        src.list.len -= 1;
        self.list.len += 1;
        true
    }

    /// Move up to `count` elements starting at `src` in front of this
    /// position; `src` moves to the first element not taken. Returns how
    /// many moved.
    pub fn splice_range(&mut self, src: &mut CursorMut<'_, T, A>, count: usize) -> usize {
        let first = src.node;
        let mut last = first;
        let mut moved = 0;
        while moved < count && last != src.list.header {
            last = unsafe { (*last).next };
            moved += 1;
        }
        if moved == 0 {
            return 0;
        }
        let pos = infallible(self.settle());
        unsafe { transfer(pos, first, last) };
        src.node = last;
        src.list.len -= moved;
        self.list.len += moved;
        moved
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for CursorMut<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => f.debug_tuple("CursorMut").field(v).finish(),
            None => f.write_str("CursorMut(end)"),
        }
    }
}

// =============================================================================
// Iterators
// =============================================================================

/// Front-to-back iterator over `&T`.
pub struct Iter<'a, T> {
    front: Link,
    back: Link,
    remaining: usize,
    _marker: PhantomData<&'a T>,
}

unsafe impl<T: Sync> Send for Iter<'_, T> {}
unsafe impl<T: Sync> Sync for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            front: self.front,
            back: self.back,
            remaining: self.remaining,
            _marker: PhantomData,
        }
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
        let item = unsafe { &*value_ptr::<T>(self.front) };
        self.front = unsafe { (*self.front).next };
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.back = unsafe { (*self.back).prev };
        Some(unsafe { &*value_ptr::<T>(self.back) })
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

/// Front-to-back iterator over `&mut T`.
pub struct IterMut<'a, T> {
    front: Link,
    back: Link,
    remaining: usize,
    _marker: PhantomData<&'a mut T>,
}

unsafe impl<T: Send> Send for IterMut<'_, T> {}
unsafe impl<T: Sync> Sync for IterMut<'_, T> {}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let item = unsafe { &mut *value_ptr::<T>(self.front) };
        self.front = unsafe { (*self.front).next };
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
        self.back = unsafe { (*self.back).prev };
        Some(unsafe { &mut *value_ptr::<T>(self.back) })
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}
impl<T> FusedIterator for IterMut<'_, T> {}

/// Owning iterator.
pub struct IntoIter<T, A: Allocator = PoolAllocator> {
    list: List<T, A>,
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.list.pop_front()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len, Some(self.list.len))
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        self.list.pop_back()
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}
impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

// =============================================================================
// Trait impls
// =============================================================================

impl<T: Clone, A: Allocator> Clone for List<T, A> {
    /// Element-wise copy. A panicking `clone` drops the partial copy.
    fn clone(&self) -> Self {
        let mut out = Self::new_in(self.alloc.clone());
        out.extend(self.iter().cloned());
        out
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for List<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, A: Allocator> PartialEq for List<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq, A: Allocator> Eq for List<T, A> {}

impl<T: PartialOrd, A: Allocator> PartialOrd for List<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord, A: Allocator> Ord for List<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Hash, A: Allocator> Hash for List<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len);
        for v in self.iter() {
            v.hash(state);
        }
    }
}

impl<T, A: Allocator> Extend<T> for List<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<'a, T: Clone + 'a, A: Allocator> Extend<&'a T> for List<T, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().cloned());
    }
}

impl<T, A: Allocator> FromIterator<T> for List<T, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new_in(A::default());
        list.extend(iter);
        list
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a List<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut List<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}

impl<T, A: Allocator> IntoIterator for List<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        IntoIter { list: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::distance;
    use crate::testing::{Bomb, counters};
    use nexus_alloc::System;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use std::collections::VecDeque;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    fn items<T: Clone, A: Allocator>(list: &List<T, A>) -> Vec<T> {
        list.iter().cloned().collect()
    }

    #[test]
    fn new_list_has_no_header() {
        let list: List<u64> = List::new();
        assert!(list.is_empty());
        assert!(list.header.is_null());
        assert_eq!(list.front(), None);
        assert!(list.cursor_begin().is_end());
        list.verify().unwrap();
    }

    #[test]
    fn push_and_pop_both_ends() {
        let mut list: List<u64> = List::new();
        list.push_back(2);
        list.push_front(1);
        list.push_back(3);
        assert_eq!(items(&list), [1, 2, 3]);
        assert_eq!(list.front(), Some(&1));
        assert_eq!(list.back(), Some(&3));
        list.verify().unwrap();

        assert_eq!(list.pop_front(), Some(1));
        assert_eq!(list.pop_back(), Some(3));
        assert_eq!(list.pop_back(), Some(2));
        assert_eq!(list.pop_back(), None);
        list.verify().unwrap();
    }

    #[test]
    fn front_and_back_mut() {
        let mut list: List<u64> = [1, 2].into_iter().collect();
        *list.front_mut().unwrap() += 10;
        *list.back_mut().unwrap() += 20;
        assert_eq!(items(&list), [11, 22]);
    }

    #[test]
    fn cursor_insert_and_remove() {
        let mut list: List<i32> = [1, 3].into_iter().collect();
        let mut c = list.cursor_mut_begin();
        c.move_next();
        c.insert_before(2);
        assert_eq!(c.get(), Some(&3));
        c.move_next();
        assert!(c.is_end());
        c.insert_before(4);
        c.move_prev();
        assert_eq!(c.remove_current(), Some(4));
        assert!(c.is_end());
        drop(c);
        assert_eq!(items(&list), [1, 2, 3]);
        list.verify().unwrap();
    }

    #[test]
    fn cursor_on_headerless_list() {
        let mut list: List<i32> = List::new();
        let mut c = list.cursor_mut_end();
        c.move_prev();
        c.move_next();
        assert_eq!(c.remove_current(), None);
        c.insert_before(1);
        c.insert_before(2);
        assert!(c.is_end());
        drop(c);
        assert_eq!(items(&list), [1, 2]);
    }

    #[test]
    fn read_cursor_walks_both_ways() {
        let list: List<i32> = (0..5).collect();
        let mut c = list.cursor_end();
        c.step_back();
        assert_eq!(c.get(), Some(&4));
        assert_eq!(distance(&list.cursor_begin(), &list.cursor_end()), 5);
        c.step();
        assert!(c.is_end());
        assert!(c.as_ptr().is_null());
    }

    #[test]
    fn append_and_split_off() {
        let mut a: List<i32> = (0..3).collect();
        let mut b: List<i32> = (3..6).collect();
        a.append(&mut b);
        assert!(b.is_empty());
        assert_eq!(items(&a), [0, 1, 2, 3, 4, 5]);

        let tail = a.split_off(4);
        assert_eq!(items(&a), [0, 1, 2, 3]);
        assert_eq!(items(&tail), [4, 5]);
        let front = a.split_off(1);
        assert_eq!(items(&a), [0]);
        assert_eq!(items(&front), [1, 2, 3]);
        assert!(a.split_off(1).is_empty());
        a.verify().unwrap();
        tail.verify().unwrap();
        front.verify().unwrap();

        let mut empty: List<i32> = List::new();
        empty.append(&mut a);
        assert_eq!(items(&empty), [0]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn split_off_past_end_panics() {
        let mut list: List<i32> = (0..3).collect();
        list.split_off(4);
    }

    #[test]
    fn splice_whole_list() {
        let mut a: List<i32> = [1, 5].into_iter().collect();
        let mut b: List<i32> = [2, 3, 4].into_iter().collect();
        let mut c = a.cursor_mut_begin();
        c.move_next();
        c.splice(&mut b);
        assert_eq!(c.get(), Some(&5));
        drop(c);
        assert_eq!(items(&a), [1, 2, 3, 4, 5]);
        assert!(b.is_empty());
        a.verify().unwrap();
        b.verify().unwrap();
    }

    #[test]
    fn splice_one_and_range() {
        let mut src: List<i32> = (0..6).collect();
        let mut dst: List<i32> = List::new();
        {
            let mut from = src.cursor_mut_begin();
            let mut to = dst.cursor_mut_end();
            assert!(to.splice_one(&mut from));
            assert_eq!(to.splice_range(&mut from, 2), 2);
            from.move_next();
            assert_eq!(to.splice_range(&mut from, 10), 2);
            assert!(from.is_end());
            assert!(!to.splice_one(&mut from));
            assert_eq!(to.splice_range(&mut from, 1), 0);
        }
        assert_eq!(items(&src), [3]);
        assert_eq!(items(&dst), [0, 1, 2, 4, 5]);
        src.verify().unwrap();
        dst.verify().unwrap();
    }

    #[test]
    fn merge_is_stable() {
        let mut a: List<(i32, char)> = [(1, 'a'), (3, 'a'), (5, 'a')].into_iter().collect();
        let mut b: List<(i32, char)> = [(1, 'b'), (2, 'b'), (5, 'b'), (9, 'b')]
            .into_iter()
            .collect();
        a.merge_by(&mut b, |x, y| x.0 < y.0);
        assert!(b.is_empty());
        assert_eq!(
            items(&a),
            [(1, 'a'), (1, 'b'), (2, 'b'), (3, 'a'), (5, 'a'), (5, 'b'), (9, 'b')]
        );
        a.verify().unwrap();
        b.verify().unwrap();
    }

    #[test]
    fn merge_into_empty() {
        let mut a: List<i32> = List::new();
        let mut b: List<i32> = (0..3).collect();
        a.merge(&mut b);
        assert_eq!(items(&a), [0, 1, 2]);
        assert!(b.is_empty());
    }

    #[test]
    fn sort_is_stable() {
        let mut rng = SmallRng::seed_from_u64(11);
        let pairs: Vec<(u8, usize)> = (0..500).map(|i| (rng.random_range(0..20), i)).collect();
        let mut list: List<(u8, usize)> = pairs.iter().copied().collect();
        list.sort_by(|a, b| a.0 < b.0);
        let mut expected = pairs;
        expected.sort_by_key(|p| p.0);
        assert_eq!(items(&list), expected);
        list.verify().unwrap();
    }

    #[test]
    fn sort_small_lists() {
        let mut list: List<i32> = List::new();
        list.sort();
        list.push_back(1);
        list.sort();
        list.push_front(2);
        list.sort();
        assert_eq!(items(&list), [1, 2]);
    }

    #[test]
    fn panicking_sort_keeps_every_element() {
        let mut list: List<i32> = (0..100).rev().collect();
        let mut calls = 0;
        let result = catch_unwind(AssertUnwindSafe(|| {
            list.sort_by(|a, b| {
                calls += 1;
                if calls == 150 {
                    panic!("compare failed");
                }
                a < b
            })
        }));
        assert!(result.is_err());
        list.verify().unwrap();
        let mut seen = items(&list);
        seen.sort();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn reverse_relinks_header() {
        let mut list: List<i32> = (0..5).collect();
        list.reverse();
        assert_eq!(items(&list), [4, 3, 2, 1, 0]);
        assert_eq!(list.iter().rev().copied().collect::<Vec<_>>(), [0, 1, 2, 3, 4]);
        list.verify().unwrap();

        let mut empty: List<i32> = List::new();
        empty.reverse();
        empty.push_back(1);
        empty.pop_back();
        empty.reverse();
        empty.verify().unwrap();
    }

    #[test]
    fn unique_and_remove() {
        let mut list: List<i32> = [1, 1, 2, 2, 2, 1, 3, 3].into_iter().collect();
        assert_eq!(list.unique(), 4);
        assert_eq!(items(&list), [1, 2, 1, 3]);
        assert_eq!(list.remove(&1), 2);
        assert_eq!(items(&list), [2, 3]);

        let mut runs: List<i32> = [1, 2, 3, 10, 11, 20].into_iter().collect();
        // Compares against the kept element, not the previous one.
        assert_eq!(runs.unique_by(|kept, x| x - kept < 3), 3);
        assert_eq!(items(&runs), [1, 10, 20]);
        assert_eq!(runs.remove_if(|&x| x > 5), 2);
        runs.verify().unwrap();
    }

    #[test]
    fn resize_variants() {
        let mut list: List<i32> = List::new();
        list.resize(3);
        assert_eq!(items(&list), [0, 0, 0]);
        list.resize_value(5, &7);
        assert_eq!(items(&list), [0, 0, 0, 7, 7]);
        list.resize(2);
        assert_eq!(items(&list), [0, 0]);
        let mut n = 0;
        list.resize_with(4, || {
            n += 1;
            n
        });
        assert_eq!(items(&list), [0, 0, 1, 2]);
        assert_eq!(List::from_elem(2, &9), {
            let l: List<i32> = [9, 9].into_iter().collect();
            l
        });
    }

    #[test]
    fn resize_panic_leaves_list_unchanged() {
        let (budget, live) = counters(usize::MAX);
        let seed = Bomb::new(5, &budget, &live);
        let mut list: List<Bomb> = List::new();
        list.push_back(seed.clone());
        budget.set(3);
        let result = catch_unwind(AssertUnwindSafe(|| list.resize_value(10, &seed)));
        assert!(result.is_err());
        assert_eq!(list.len(), 1);
        list.verify().unwrap();
        drop(list);
        drop(seed);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn clone_panic_drops_partial_copy() {
        let (budget, live) = counters(usize::MAX);
        let list: List<Bomb> = (0..10).map(|v| Bomb::new(v, &budget, &live)).collect();
        budget.set(4);
        assert!(catch_unwind(AssertUnwindSafe(|| list.clone())).is_err());
        assert_eq!(live.get(), 10);

        budget.set(usize::MAX);
        let copy = list.clone();
        assert!(copy.iter().map(|b| b.value).eq(0..10));
        drop((copy, list));
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn comparisons_and_debug() {
        let a: List<i32> = [1, 2, 3].into_iter().collect();
        let b: List<i32> = [1, 2, 4].into_iter().collect();
        assert!(a < b);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(format!("{:?}", a), "[1, 2, 3]");
    }

    #[test]
    fn owned_iteration_both_ends() {
        let list: List<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let mut it = list.into_iter();
        assert_eq!(it.next_back().as_deref(), Some("c"));
        assert_eq!(it.len(), 2);
        assert_eq!(it.next().as_deref(), Some("a"));
    }

    #[test]
    fn iter_mut_updates_in_place() {
        let mut list: List<i32> = (0..4).collect();
        for v in &mut list {
            *v *= 10;
        }
        assert_eq!(items(&list), [0, 10, 20, 30]);
    }

    #[test]
    fn matches_vecdeque_under_random_ops() {
        let mut rng = SmallRng::seed_from_u64(0x11);
        let mut list: List<u32, System> = List::new_in(System);
        let mut model: VecDeque<u32> = VecDeque::new();
        for step in 0..10_000u32 {
            match rng.random_range(0..6) {
                0 => {
                    list.push_back(step);
                    model.push_back(step);
                }
                1 => {
                    list.push_front(step);
                    model.push_front(step);
                }
                2 => assert_eq!(list.pop_back(), model.pop_back()),
                3 => assert_eq!(list.pop_front(), model.pop_front()),
                4 if !model.is_empty() => {
                    let at = rng.random_range(0..=model.len());
                    let mut c = list.cursor_mut_begin();
                    for _ in 0..at {
                        c.move_next();
                    }
                    c.insert_before(step);
                    model.insert(at, step);
                }
                _ => {
                    if step % 1_000 == 0 {
                        list.reverse();
                        model.make_contiguous().reverse();
                    }
                }
            }
        }
        list.verify().unwrap();
        assert!(list.iter().eq(model.iter()));
    }
}
