//! Chained hash table behind the unordered containers.
//!
//! [`HashTable`] keeps a dense bucket vector of chain heads. Bucket counts
//! come from a fixed table of primes; inserts grow the table whenever the
//! element count would exceed the bucket count, so the load factor stays at
//! or below one.
//!
//! Each node caches the hash of its key. Rehashing relinks nodes into a
//! fresh bucket vector without calling the hasher, and the old vector is
//! only released once every node has moved, so growth cannot be
//! interrupted half way.
//!
//! Equivalent elements (inserted with [`HashTable::insert_equal`]) are kept
//! next to each other in their chain.
//!
//! ```
//! use nexus_collections::compare::Identity;
//! use nexus_collections::hashtable::HashTable;
//! use std::hash::RandomState;
//!
//! let mut table: HashTable<u32, u32, Identity, RandomState> = HashTable::new();
//! for v in [4, 8, 4, 15] {
//!     table.insert_equal(v);
//! }
//! assert_eq!(table.count(&4), 2);
//! assert_eq!(table.bucket_count(), 53);
//! assert!(table.load_factor() <= table.max_load_factor());
//! ```

use std::fmt;
use std::hash::{BuildHasher, Hash, RandomState};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use nexus_alloc::{Allocator, PoolAllocator};

use crate::Error;
use crate::compare::KeyOf;
use crate::cursor::{Category, Position};
use crate::error::infallible;
use crate::raw_buf;
use crate::vector::Vector;

/// Bucket counts, each roughly double the last. All fit in 32 bits.
const PRIMES: [usize; 28] = [
    53,
    97,
    193,
    389,
    769,
    1_543,
    3_079,
    6_151,
    12_289,
    24_593,
    49_157,
    98_317,
    196_613,
    393_241,
    786_433,
    1_572_869,
    3_145_739,
    6_291_469,
    12_582_917,
    25_165_843,
    50_331_653,
    100_663_319,
    201_326_611,
    402_653_189,
    805_306_457,
    1_610_612_741,
    3_221_225_473,
    4_294_967_291,
];

/// Smallest table prime `>= n`, or the largest prime when `n` exceeds
/// them all.
fn next_prime(n: usize) -> usize {
    let at = PRIMES.partition_point(|&p| p < n);
    PRIMES[at.min(PRIMES.len() - 1)]
}

#[inline]
fn bucket_of(hash: u64, buckets: usize) -> usize {
    (hash % buckets as u64) as usize
}

// =============================================================================
// Nodes
// =============================================================================

struct HashNode<V> {
    next: NodePtr<V>,
    hash: u64,
    value: V,
}

type NodePtr<V> = *mut HashNode<V>;

// =============================================================================
// HashTable
// =============================================================================

/// Separate-chaining hash table storing `V`, keyed by `X::key(&V)`.
pub struct HashTable<V, K, X, S = RandomState, A: Allocator = PoolAllocator> {
    buckets: Vector<NodePtr<V>, A>,
    len: usize,
    hasher: S,
    _marker: PhantomData<(V, fn() -> (K, X))>,
}

unsafe impl<V: Send, K, X, S: Send, A: Allocator + Send> Send for HashTable<V, K, X, S, A> {}
unsafe impl<V: Sync, K, X, S: Sync, A: Allocator + Sync> Sync for HashTable<V, K, X, S, A> {}

impl<V, K, X, S: Default> HashTable<V, K, X, S> {
    /// Creates an empty table. Buckets are allocated on first insert.
    #[inline]
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<V, K, X, S> HashTable<V, K, X, S> {
    /// Creates an empty table hashing with `hasher`.
    #[inline]
    pub fn with_hasher(hasher: S) -> Self {
        Self::new_in(hasher, PoolAllocator)
    }
}

impl<V, K, X, S: Default> Default for HashTable<V, K, X, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, K, X, S, A: Allocator> HashTable<V, K, X, S, A> {
    /// Creates an empty table with an explicit hasher and allocator.
    #[inline]
    pub fn new_in(hasher: S, alloc: A) -> Self {
        Self {
            buckets: Vector::new_in(alloc),
            len: 0,
            hasher,
            _marker: PhantomData,
        }
    }

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
        self.buckets.allocator().max_size::<HashNode<V>>()
    }

    /// Number of buckets; zero before the first insert.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of elements chained in bucket `b`.
    pub fn bucket_len(&self, b: usize) -> usize {
        let mut node = self.buckets.get(b).copied().unwrap_or(ptr::null_mut());
        let mut n = 0;
        while !node.is_null() {
            n += 1;
            node = unsafe { (*node).next };
        }
        n
    }

    /// Elements per bucket.
    #[inline]
    pub fn load_factor(&self) -> f32 {
        match self.buckets.len() {
            0 => 0.0,
            n => self.len as f32 / n as f32,
        }
    }

    /// The load factor growth keeps the table under.
    #[inline]
    pub fn max_load_factor(&self) -> f32 {
        1.0
    }

    /// The hash builder.
    #[inline]
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Position of the first element in bucket order.
    #[inline]
    pub fn cursor_begin(&self) -> Cursor<'_, V> {
        let mut c = Cursor::new(ptr::null_mut(), 0, &self.buckets);
        c.seek_from(0);
        c
    }

    /// The end position.
    #[inline]
    pub fn cursor_end(&self) -> Cursor<'_, V> {
        Cursor::new(ptr::null_mut(), self.buckets.len(), &self.buckets)
    }

    /// Editing cursor at the first element.
    #[inline]
    pub fn cursor_mut_begin(&mut self) -> CursorMut<'_, V, K, X, S, A> {
        let begin = self.cursor_begin();
        let (node, bucket) = (begin.node, begin.bucket);
        CursorMut {
            table: self,
            node,
            bucket,
        }
    }

    /// Elements in bucket order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            cursor: self.cursor_begin(),
            remaining: self.len,
        }
    }

    /// Drop every element. The bucket count is kept.
    pub fn clear(&mut self) {
        for b in 0..self.buckets.len() {
            let mut node = self.buckets[b];
            self.buckets[b] = ptr::null_mut();
            while !node.is_null() {
                let next = unsafe { (*node).next };
                self.len -= 1;
                unsafe { self.free_node(node) };
                node = next;
            }
        }
    }

    /// Exchange contents with `other` in O(1).
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    fn create_node(&self, hash: u64, value: V) -> Result<NodePtr<V>, Error> {
        let node = raw_buf::allocate::<HashNode<V>, A>(self.buckets.allocator(), 1)?.as_ptr();
        unsafe {
            node.write(HashNode {
                next: ptr::null_mut(),
                hash,
                value,
            })
        };
        Ok(node)
    }

    /// Drop the value and release the node.
    ///
    /// # Safety
    ///
    /// `node` must be unlinked and owned by this table.
    unsafe fn free_node(&self, node: NodePtr<V>) {
        unsafe {
            ptr::drop_in_place(&raw mut (*node).value);
            self.buckets
                .allocator()
                .deallocate(NonNull::new_unchecked(node), 1);
        }
    }

    /// Move the value out and release the node.
    ///
    /// # Safety
    ///
    /// `node` must be unlinked and owned by this table.
    unsafe fn take_node(&self, node: NodePtr<V>) -> V {
        unsafe {
            let value = ptr::read(&raw const (*node).value);
            self.buckets
                .allocator()
                .deallocate(NonNull::new_unchecked(node), 1);
            value
        }
    }

    /// Unlink `node` from bucket `b`, finding its predecessor by walking the
    /// chain.
    ///
    /// # Safety
    ///
    /// `node` must be chained in bucket `b`.
    unsafe fn unlink(&mut self, b: usize, node: NodePtr<V>) {
        unsafe {
            let head = self.buckets[b];
            if head == node {
                self.buckets[b] = (*node).next;
            } else {
                let mut prev = head;
                while (*prev).next != node {
                    prev = (*prev).next;
                }
                (*prev).next = (*node).next;
            }
        }
        self.len -= 1;
    }

    /// Ensure room for `needed` elements at load factor one.
    ///
    /// Nodes move to a freshly built bucket vector by their cached hash. The
    /// new vector is fully allocated before any node moves.
    fn rehash_for(&mut self, needed: usize) -> Result<(), Error> {
        let old = self.buckets.len();
        if needed <= old {
            return Ok(());
        }
        let n = next_prime(needed);
        if n <= old {
            return Ok(());
        }
        let mut fresh = Vector::try_with_capacity_in(n, self.buckets.allocator().clone())?;
        fresh.resize_value(n, &ptr::null_mut());
        for b in 0..old {
            let mut node = self.buckets[b];
            while !node.is_null() {
                unsafe {
                    let next = (*node).next;
                    let nb = bucket_of((*node).hash, n);
                    (*node).next = fresh[nb];
                    fresh[nb] = node;
                    node = next;
                }
            }
            self.buckets[b] = ptr::null_mut();
        }
        log::trace!("hash table rehash: {old} -> {n} buckets");
        self.buckets.swap(&mut fresh);
        Ok(())
    }
}

impl<V, K, X, S, A> HashTable<V, K, X, S, A>
where
    X: KeyOf<V, K>,
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    #[inline]
    fn hash_of(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    /// First node in bucket `b` equivalent to `key`.
    fn find_in_bucket(&self, b: usize, hash: u64, key: &K) -> NodePtr<V> {
        let mut node = self.buckets[b];
        while !node.is_null() {
            unsafe {
                if (*node).hash == hash && X::key(&(*node).value) == key {
                    return node;
                }
                node = (*node).next;
            }
        }
        ptr::null_mut()
    }

    /// Bucket and first matching node for `key`; the node is null on a miss.
    fn locate(&self, key: &K) -> (usize, NodePtr<V>) {
        if self.buckets.is_empty() {
            return (0, ptr::null_mut());
        }
        let hash = self.hash_of(key);
        let b = bucket_of(hash, self.buckets.len());
        (b, self.find_in_bucket(b, hash, key))
    }

    /// Length of the run of nodes equivalent to `key` starting at `node`.
    fn run_len(node: NodePtr<V>, key: &K) -> usize {
        let mut node = node;
        let mut n = 0;
        while !node.is_null() && X::key(unsafe { &(*node).value }) == key {
            n += 1;
            node = unsafe { (*node).next };
        }
        n
    }

    /// Bucket an element with `key` would live in; `None` before the first
    /// insert.
    pub fn bucket(&self, key: &K) -> Option<usize> {
        if self.buckets.is_empty() {
            None
        } else {
            Some(bucket_of(self.hash_of(key), self.buckets.len()))
        }
    }

    /// Position of an element equivalent to `key`, or the end.
    pub fn find(&self, key: &K) -> Cursor<'_, V> {
        match self.locate(key) {
            (b, node) if !node.is_null() => Cursor::new(node, b, &self.buckets),
            _ => self.cursor_end(),
        }
    }

    /// The element equivalent to `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        let (_, node) = self.locate(key);
        if node.is_null() {
            None
        } else {
            Some(unsafe { &(*node).value })
        }
    }

    /// The element equivalent to `key`, mutably. Callers must not change
    /// the key part.
    #[inline]
    pub(crate) fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let (_, node) = self.locate(key);
        if node.is_null() {
            None
        } else {
            Some(unsafe { &mut (*node).value })
        }
    }

    /// The element equivalent to `key`, inserting `make(key)` first on a
    /// miss. `make` runs before the table changes.
    pub(crate) fn find_or_insert_with<F: FnOnce(K) -> V>(&mut self, key: K, make: F) -> &mut V {
        let (_, found) = self.locate(&key);
        let node = if found.is_null() {
            infallible(self.insert_unique_node(make(key))).1
        } else {
            found
        };
        unsafe { &mut (*node).value }
    }

    /// `true` if an element equivalent to `key` is present.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        !self.locate(key).1.is_null()
    }

    /// Number of elements equivalent to `key`.
    pub fn count(&self, key: &K) -> usize {
        Self::run_len(self.locate(key).1, key)
    }

    /// Every element equivalent to `key`.
    pub fn equal_range(&self, key: &K) -> EqualRange<'_, V> {
        let (_, node) = self.locate(key);
        EqualRange::new(node, Self::run_len(node, key))
    }

    /// Insert `value` unless an equivalent element exists.
    ///
    /// Returns the position of the inserted or the existing element, and
    /// whether the insert happened (otherwise `value` is dropped).
    pub fn insert_unique(&mut self, value: V) -> (Cursor<'_, V>, bool) {
        infallible(self.try_insert_unique(value))
    }

    /// Fallible [`HashTable::insert_unique`]. On error the table is
    /// unchanged.
    pub fn try_insert_unique(&mut self, value: V) -> Result<(Cursor<'_, V>, bool), Error> {
        let (b, node, inserted) = self.insert_unique_node(value)?;
        Ok((Cursor::new(node, b, &self.buckets), inserted))
    }

    fn insert_unique_node(&mut self, value: V) -> Result<(usize, NodePtr<V>, bool), Error> {
        let hash = self.hash_of(X::key(&value));
        if !self.buckets.is_empty() {
            let b = bucket_of(hash, self.buckets.len());
            let existing = self.find_in_bucket(b, hash, X::key(&value));
            if !existing.is_null() {
                return Ok((b, existing, false));
            }
        }
        self.rehash_for(self.len + 1)?;
        let node = self.create_node(hash, value)?;
        let b = bucket_of(hash, self.buckets.len());
        unsafe { (*node).next = self.buckets[b] };
        self.buckets[b] = node;
        self.len += 1;
        Ok((b, node, true))
    }

    /// Insert `value` after any equivalent elements already present.
    pub fn insert_equal(&mut self, value: V) -> Cursor<'_, V> {
        infallible(self.try_insert_equal(value))
    }

    /// Fallible [`HashTable::insert_equal`].
    pub fn try_insert_equal(&mut self, value: V) -> Result<Cursor<'_, V>, Error> {
        let hash = self.hash_of(X::key(&value));
        self.rehash_for(self.len + 1)?;
        let b = bucket_of(hash, self.buckets.len());
        let first = self.find_in_bucket(b, hash, X::key(&value));
        let node = self.create_node(hash, value)?;
        unsafe {
            if first.is_null() {
                (*node).next = self.buckets[b];
                self.buckets[b] = node;
            } else {
                let mut last = first;
                let key = X::key(&(*node).value);
                while !(*last).next.is_null() && X::key(&(*(*last).next).value) == key {
                    last = (*last).next;
                }
                (*node).next = (*last).next;
                (*last).next = node;
            }
        }
        self.len += 1;
        Ok(Cursor::new(node, b, &self.buckets))
    }

    /// Remove and return the first element equivalent to `key`.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let (b, node) = self.locate(key);
        if node.is_null() {
            return None;
        }
        unsafe {
            self.unlink(b, node);
            Some(self.take_node(node))
        }
    }

    /// Remove every element equivalent to `key`; returns how many.
    ///
    /// The run is measured before anything is unlinked, so a panicking
    /// `Eq` leaves the table unchanged.
    pub fn erase_key(&mut self, key: &K) -> usize {
        let (b, first) = self.locate(key);
        let n = Self::run_len(first, key);
        let mut node = first;
        for _ in 0..n {
            unsafe {
                let next = (*node).next;
                self.unlink(b, node);
                self.free_node(node);
                node = next;
            }
        }
        n
    }

    /// Grow the bucket vector so `n` elements fit at load factor one.
    pub fn reserve(&mut self, n: usize) {
        infallible(self.try_reserve(n));
    }

    /// Fallible [`HashTable::reserve`].
    pub fn try_reserve(&mut self, n: usize) -> Result<(), Error> {
        self.rehash_for(n)
    }

    /// Editing cursor at an element equivalent to `key`, or at the end.
    pub fn find_mut(&mut self, key: &K) -> CursorMut<'_, V, K, X, S, A> {
        let (b, node) = self.locate(key);
        let bucket = if node.is_null() { self.buckets.len() } else { b };
        CursorMut {
            table: self,
            node,
            bucket,
        }
    }

    /// Keep only the elements for which `f` returns `true`.
    pub fn retain<F: FnMut(&V) -> bool>(&mut self, mut f: F) {
        self.retain_mut(|v| f(v));
    }

    /// [`HashTable::retain`] with mutable access. Callers must not change
    /// the key part.
    pub(crate) fn retain_mut<F: FnMut(&mut V) -> bool>(&mut self, mut f: F) {
        for b in 0..self.buckets.len() {
            let mut link: *mut NodePtr<V> = unsafe { self.buckets.as_mut_ptr().add(b) };
            unsafe {
                while !(*link).is_null() {
                    let node = *link;
                    if f(&mut (*node).value) {
                        link = &raw mut (*node).next;
                    } else {
                        *link = (*node).next;
                        self.len -= 1;
                        self.free_node(node);
                    }
                }
            }
        }
    }

    /// `true` if both tables hold the same elements, comparing the runs
    /// of equivalent elements as multisets.
    pub(crate) fn same_elements(&self, other: &Self) -> bool
    where
        V: PartialEq,
    {
        if self.len != other.len {
            return false;
        }
        let mut c = self.cursor_begin();
        while let Some(v) = c.get() {
            let key = X::key(v);
            let n = Self::run_len(c.node, key);
            let mine = EqualRange::new(c.node, n);
            let theirs = other.equal_range(key);
            if theirs.len() != n {
                return false;
            }
            for e in mine.clone() {
                let a = mine.clone().filter(|x| *x == e).count();
                let b = theirs.clone().filter(|x| *x == e).count();
                if a != b {
                    return false;
                }
            }
            for _ in 0..n {
                c.step();
            }
        }
        true
    }
}

impl<V, K, X, S, A: Allocator> Drop for HashTable<V, K, X, S, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<V, K, X, S, A> Clone for HashTable<V, K, X, S, A>
where
    V: Clone,
    S: Clone,
    A: Allocator,
{
    /// Copy with the same bucket count and chain order. Hashes are reused,
    /// so the hasher is not called. A panicking `clone` drops the partial
    /// copy.
    fn clone(&self) -> Self {
        let mut out = Self::new_in(self.hasher.clone(), self.buckets.allocator().clone());
        let n = self.buckets.len();
        out.buckets.reserve(n);
        out.buckets.resize_value(n, &ptr::null_mut());
        for b in 0..n {
            let mut src = self.buckets[b];
            let mut tail: *mut NodePtr<V> = unsafe { out.buckets.as_mut_ptr().add(b) };
            while !src.is_null() {
                unsafe {
                    let node = infallible(out.create_node((*src).hash, (*src).value.clone()));
                    *tail = node;
                    tail = &raw mut (*node).next;
                    out.len += 1;
                    src = (*src).next;
                }
            }
        }
        out
    }
}

impl<V: fmt::Debug, K, X, S, A: Allocator> fmt::Debug for HashTable<V, K, X, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, V, K, X, S, A: Allocator> IntoIterator for &'a HashTable<V, K, X, S, A> {
    type Item = &'a V;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Iter<'a, V> {
        self.iter()
    }
}

impl<V, K, X, S, A: Allocator> IntoIterator for HashTable<V, K, X, S, A> {
    type Item = V;
    type IntoIter = IntoIter<V, K, X, S, A>;

    fn into_iter(self) -> IntoIter<V, K, X, S, A> {
        IntoIter {
            table: self,
            bucket: 0,
        }
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Forward position in a [`HashTable`].
///
/// Stepping walks the current chain, then scans ahead for the next
/// non-empty bucket.
pub struct Cursor<'a, V> {
    node: NodePtr<V>,
    bucket: usize,
    buckets: *const NodePtr<V>,
    bucket_count: usize,
    _marker: PhantomData<&'a V>,
}

impl<'a, V> Cursor<'a, V> {
    #[inline]
    fn new(node: NodePtr<V>, bucket: usize, buckets: &'a [NodePtr<V>]) -> Self {
        Self {
            node,
            bucket,
            buckets: buckets.as_ptr(),
            bucket_count: buckets.len(),
            _marker: PhantomData,
        }
    }

    /// Move to the head of the first non-empty bucket at or after `b`.
    fn seek_from(&mut self, mut b: usize) {
        while b < self.bucket_count {
            let head = unsafe { *self.buckets.add(b) };
            if !head.is_null() {
                self.node = head;
                self.bucket = b;
                return;
            }
            b += 1;
        }
        self.node = ptr::null_mut();
        self.bucket = self.bucket_count;
    }

    /// `true` at the end position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.node.is_null()
    }

    /// The element here, `None` at the end.
    #[inline]
    pub fn get(&self) -> Option<&'a V> {
        if self.node.is_null() {
            None
        } else {
            Some(unsafe { &(*self.node).value })
        }
    }

    /// Bucket of the element here (the bucket count at the end).
    #[inline]
    pub fn bucket(&self) -> usize {
        self.bucket
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
    const CATEGORY: Category = Category::Forward;
    type Value = V;

    fn step(&mut self) {
        if self.node.is_null() {
            return;
        }
        let next = unsafe { (*self.node).next };
        if next.is_null() {
            self.seek_from(self.bucket + 1);
        } else {
            self.node = next;
        }
    }

    #[inline]
    fn as_ptr(&self) -> *const V {
        if self.node.is_null() {
            ptr::null()
        } else {
            unsafe { &raw const (*self.node).value }
        }
    }
}

/// Editing position in a [`HashTable`].
pub struct CursorMut<'a, V, K, X, S, A: Allocator> {
    table: &'a mut HashTable<V, K, X, S, A>,
    node: NodePtr<V>,
    bucket: usize,
}

impl<V, K, X, S, A: Allocator> CursorMut<'_, V, K, X, S, A> {
    /// `true` at the end position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.node.is_null()
    }

    /// The element here.
    #[inline]
    pub fn get(&self) -> Option<&V> {
        if self.node.is_null() {
            None
        } else {
            Some(unsafe { &(*self.node).value })
        }
    }

    /// Step to the next element in bucket order.
    pub fn move_next(&mut self) {
        let mut c = Cursor::new(self.node, self.bucket, &self.table.buckets);
        c.step();
        self.node = c.node;
        self.bucket = c.bucket;
    }

    /// Remove the element here and move to the next one.
    pub fn remove_current(&mut self) -> Option<V> {
        if self.node.is_null() {
            return None;
        }
        let (node, bucket) = (self.node, self.bucket);
        self.move_next();
        unsafe {
            self.table.unlink(bucket, node);
            Some(self.table.take_node(node))
        }
    }
}

// =============================================================================
// Iterators
// =============================================================================

/// Iterator over a table in bucket order.
pub struct Iter<'a, V> {
    cursor: Cursor<'a, V>,
    remaining: usize,
}

unsafe impl<V: Sync> Send for Iter<'_, V> {}
unsafe impl<V: Sync> Sync for Iter<'_, V> {}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor,
            remaining: self.remaining,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        let item = self.cursor.get()?;
        self.cursor.step();
        self.remaining -= 1;
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
impl<V> FusedIterator for Iter<'_, V> {}

/// A run of equivalent elements inside one chain.
pub struct EqualRange<'a, V> {
    node: NodePtr<V>,
    remaining: usize,
    _marker: PhantomData<&'a V>,
}

unsafe impl<V: Sync> Send for EqualRange<'_, V> {}
unsafe impl<V: Sync> Sync for EqualRange<'_, V> {}

impl<V> EqualRange<'_, V> {
    #[inline]
    fn new(node: NodePtr<V>, remaining: usize) -> Self {
        Self {
            node,
            remaining,
            _marker: PhantomData,
        }
    }
}

impl<V> Clone for EqualRange<'_, V> {
    fn clone(&self) -> Self {
        Self::new(self.node, self.remaining)
    }
}

impl<'a, V> Iterator for EqualRange<'a, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let item = unsafe { &(*self.node).value };
        self.node = unsafe { (*self.node).next };
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for EqualRange<'_, V> {}
impl<V> FusedIterator for EqualRange<'_, V> {}

/// Owning iterator in bucket order.
pub struct IntoIter<V, K, X, S, A: Allocator> {
    table: HashTable<V, K, X, S, A>,
    bucket: usize,
}

impl<V, K, X, S, A: Allocator> Iterator for IntoIter<V, K, X, S, A> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        let table = &mut self.table;
        while self.bucket < table.buckets.len() {
            let head = table.buckets[self.bucket];
            if !head.is_null() {
                unsafe {
                    table.buckets[self.bucket] = (*head).next;
                    table.len -= 1;
                    return Some(table.take_node(head));
                }
            }
            self.bucket += 1;
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len, Some(self.table.len))
    }
}

impl<V, K, X, S, A: Allocator> ExactSizeIterator for IntoIter<V, K, X, S, A> {}
impl<V, K, X, S, A: Allocator> FusedIterator for IntoIter<V, K, X, S, A> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{First, Identity};
    use crate::testing::{Bomb, counters};
    use nexus_alloc::System;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;
    use std::hash::{BuildHasherDefault, DefaultHasher, Hasher};
    use std::panic::{AssertUnwindSafe, catch_unwind};

    type Fixed = BuildHasherDefault<DefaultHasher>;
    type IntTable = HashTable<u64, u64, Identity, Fixed>;

    /// Hashes every key to the same value.
    #[derive(Default, Clone)]
    struct Collide;

    impl Hasher for Collide {
        fn finish(&self) -> u64 {
            7
        }
        fn write(&mut self, _: &[u8]) {}
    }

    type Colliding = BuildHasherDefault<Collide>;

    fn sorted(table: &IntTable) -> Vec<u64> {
        let mut v: Vec<u64> = table.iter().copied().collect();
        v.sort();
        v
    }

    #[test]
    fn prime_table() {
        assert_eq!(next_prime(0), 53);
        assert_eq!(next_prime(53), 53);
        assert_eq!(next_prime(54), 97);
        assert_eq!(next_prime(1_000), 1_543);
        assert_eq!(next_prime(usize::MAX), 4_294_967_291);
    }

    #[test]
    fn empty_table_has_no_buckets() {
        let table = IntTable::new();
        assert_eq!(table.bucket_count(), 0);
        assert_eq!(table.load_factor(), 0.0);
        assert!(table.find(&1).is_end());
        assert_eq!(table.count(&1), 0);
        assert_eq!(table.bucket(&1), None);
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn grows_through_the_primes() {
        let mut table = IntTable::new();
        for v in 0..53 {
            assert!(table.insert_unique(v).1);
        }
        assert_eq!(table.bucket_count(), 53);
        table.insert_unique(53);
        assert_eq!(table.bucket_count(), 97);
        for v in 54..1_000 {
            table.insert_unique(v);
        }
        assert_eq!(table.bucket_count(), 1_543);
        assert!(table.load_factor() <= 1.0);
        assert_eq!(sorted(&table), (0..1_000).collect::<Vec<_>>());
    }

    #[test]
    fn unique_insert_reports_existing() {
        let mut table: HashTable<(u32, &str), u32, First, Fixed> = HashTable::new();
        assert!(table.insert_unique((1, "a")).1);
        let (pos, inserted) = table.insert_unique((1, "b"));
        assert!(!inserted);
        assert_eq!(pos.get(), Some(&(1, "a")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn equal_elements_stay_adjacent() {
        let mut table: HashTable<u64, u64, Identity, Colliding> = HashTable::new();
        for v in [1, 2, 1, 3, 2, 1] {
            table.insert_equal(v);
        }
        assert_eq!(table.bucket_len(table.bucket(&1).unwrap()), 6);
        let order: Vec<u64> = table.iter().copied().collect();
        let mut runs = order.clone();
        runs.dedup();
        assert_eq!(runs.len(), 3, "runs in {order:?}");
        assert_eq!(table.count(&1), 3);
        assert_eq!(table.equal_range(&2).len(), 2);
    }

    #[test]
    fn reserve_and_rehash_keep_runs() {
        let mut table: HashTable<u64, u64, Identity, Fixed> = HashTable::new();
        for v in 0..40 {
            table.insert_equal(v % 10);
        }
        table.reserve(5_000);
        assert_eq!(table.bucket_count(), 6_151);
        for k in 0..10 {
            assert_eq!(table.count(&k), 4);
            assert!(table.equal_range(&k).all(|&v| v == k));
        }
    }

    #[test]
    fn remove_and_erase_key() {
        let mut table = IntTable::new();
        for v in [5, 5, 5, 6, 7] {
            table.insert_equal(v);
        }
        assert_eq!(table.remove(&6), Some(6));
        assert_eq!(table.remove(&6), None);
        assert_eq!(table.erase_key(&5), 3);
        assert_eq!(table.erase_key(&5), 0);
        assert_eq!(sorted(&table), [7]);
    }

    #[test]
    fn cursor_walks_every_bucket() {
        let mut table = IntTable::new();
        for v in 0..200 {
            table.insert_unique(v);
        }
        let mut c = table.cursor_begin();
        let mut n = 0;
        while !c.is_end() {
            n += 1;
            c.step();
        }
        assert_eq!(n, 200);
        assert_eq!(c, table.cursor_end());
        assert_eq!(crate::cursor::distance(&table.cursor_begin(), &table.cursor_end()), 200);
    }

    #[test]
    fn cursor_mut_removes() {
        let mut table = IntTable::new();
        for v in 0..20 {
            table.insert_unique(v);
        }
        let mut c = table.find_mut(&7);
        assert_eq!(c.remove_current(), Some(7));
        let mut c = table.find_mut(&7);
        assert!(c.is_end());
        assert_eq!(c.remove_current(), None);

        let mut c = table.cursor_mut_begin();
        while let Some(&v) = c.get() {
            if v % 2 == 0 {
                c.remove_current();
            } else {
                c.move_next();
            }
        }
        assert_eq!(sorted(&table), [1, 3, 5, 9, 11, 13, 15, 17, 19]);
    }

    #[test]
    fn retain_and_clear() {
        let mut table = IntTable::new();
        for v in 0..100 {
            table.insert_unique(v);
        }
        table.retain(|v| *v % 10 == 0);
        assert_eq!(sorted(&table), [0, 10, 20, 30, 40, 50, 60, 70, 80, 90]);
        let buckets = table.bucket_count();
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.bucket_count(), buckets);
    }

    #[test]
    fn same_elements_is_order_free() {
        let mut a: HashTable<u64, u64, Identity, Colliding> = HashTable::new();
        let mut b: HashTable<u64, u64, Identity, Colliding> = HashTable::new();
        for v in [1, 2, 2, 3] {
            a.insert_equal(v);
        }
        for v in [3, 2, 1, 2] {
            b.insert_equal(v);
        }
        assert!(a.same_elements(&b));
        b.erase_key(&2);
        b.insert_equal(1);
        b.insert_equal(1);
        assert!(!a.same_elements(&b));
    }

    #[test]
    fn clone_keeps_layout_and_rolls_back() {
        let (budget, live) = counters(usize::MAX);
        let mut table: HashTable<(u32, Bomb), u32, First, Fixed> = HashTable::new();
        for k in 0..30 {
            table.insert_unique((k, Bomb::new(k as i32, &budget, &live)));
        }
        budget.set(10);
        assert!(catch_unwind(AssertUnwindSafe(|| table.clone())).is_err());
        assert_eq!(live.get(), 30);

        budget.set(usize::MAX);
        let copy = table.clone();
        assert_eq!(copy.bucket_count(), table.bucket_count());
        assert!(copy.iter().map(|e| e.0).eq(table.iter().map(|e| e.0)));
        drop((copy, table));
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn owned_iteration_drains() {
        let mut table = IntTable::new();
        for v in 0..10 {
            table.insert_unique(v);
        }
        let mut it = table.into_iter();
        assert_eq!(it.len(), 10);
        it.next();
        let mut rest: Vec<u64> = it.collect();
        rest.sort();
        assert_eq!(rest.len(), 9);
    }

    #[test]
    fn matches_hashmap_under_random_ops() {
        let mut rng = SmallRng::seed_from_u64(0xA5);
        let mut table: HashTable<(u32, u32), u32, First, Fixed, System> =
            HashTable::new_in(Fixed::default(), System);
        let mut model: HashMap<u32, u32> = HashMap::new();
        for step in 0..20_000u32 {
            let key = rng.random_range(0..1_024);
            match rng.random_range(0..3) {
                0 => {
                    let inserted = table.insert_unique((key, step)).1;
                    assert_eq!(inserted, !model.contains_key(&key));
                    model.entry(key).or_insert(step);
                }
                1 => assert_eq!(table.remove(&key).map(|e| e.1), model.remove(&key)),
                _ => assert_eq!(table.get(&key).map(|e| e.1), model.get(&key).copied()),
            }
            assert!(table.len() <= table.bucket_count());
        }
        assert_eq!(table.len(), model.len());
        for (k, v) in &model {
            assert_eq!(table.get(k), Some(&(*k, *v)));
        }
    }
}
