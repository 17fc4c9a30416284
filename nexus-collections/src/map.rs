//! Ordered maps over the red-black tree.
//!
//! [`Map`] holds at most one value per key; [`MultiMap`] keeps every
//! insertion, with equivalent keys in arrival order.
//!
//! ```
//! use nexus_collections::Map;
//!
//! let mut prices: Map<&str, u32> = Map::new();
//! prices.insert("pear", 3);
//! prices.insert("apple", 2);
//! *prices.entry_or_default("fig") += 7;
//!
//! assert_eq!(prices.keys().copied().collect::<Vec<_>>(), ["apple", "fig", "pear"]);
//! assert_eq!(prices.at(&"fig"), Ok(&7));
//! assert!(prices.at(&"kiwi").is_err());
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::ops::{Index, RangeBounds};

use nexus_alloc::{Allocator, PoolAllocator};

use crate::Error;
use crate::compare::{Compare, First, Less};
use crate::error::infallible;
use crate::rbtree::{self, Cursor, RbTree};

type Tree<K, V, C, A> = RbTree<(K, V), K, First, C, A>;

#[inline]
fn split<K, V>(pair: &(K, V)) -> (&K, &V) {
    (&pair.0, &pair.1)
}

// =============================================================================
// Map
// =============================================================================

/// Ordered map with unique keys.
pub struct Map<K, V, C = Less, A: Allocator = PoolAllocator> {
    tree: Tree<K, V, C, A>,
}

impl<K, V, C: Compare<K> + Default> Map<K, V, C> {
    /// Creates an empty map.
    #[inline]
    pub fn new() -> Self {
        Self {
            tree: RbTree::new(),
        }
    }
}

impl<K, V, C: Compare<K>> Map<K, V, C> {
    /// Creates an empty map ordered by `cmp`.
    #[inline]
    pub fn with_compare(cmp: C) -> Self {
        Self {
            tree: RbTree::with_compare(cmp),
        }
    }
}

impl<K, V, C: Compare<K> + Default> Default for Map<K, V, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C: Compare<K>, A: Allocator> Map<K, V, C, A> {
    /// Creates an empty map with an explicit comparison and allocator.
    #[inline]
    pub fn new_in(cmp: C, alloc: A) -> Self {
        Self {
            tree: RbTree::new_in(cmp, alloc),
        }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// `true` if there are no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Insert `key → value` unless `key` is present.
    ///
    /// Returns the position of the entry for `key` and whether it was
    /// inserted. An existing entry is left untouched.
    pub fn insert(&mut self, key: K, value: V) -> (Cursor<'_, (K, V)>, bool) {
        self.tree.insert_unique((key, value))
    }

    /// Fallible [`Map::insert`].
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(Cursor<'_, (K, V)>, bool), Error> {
        self.tree.try_insert_unique((key, value))
    }

    /// Insert `key → value`, replacing and returning any previous value.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> Option<V> {
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.tree.insert_unique((key, value));
                None
            }
        }
    }

    /// Value for `key`, inserting `V::default()` first if absent.
    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entry_or_insert_with(key, V::default)
    }

    /// Value for `key`, inserting `make()` first if absent.
    ///
    /// `make` runs before the tree is touched, so a panic leaves the map
    /// unchanged.
    pub fn entry_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, make: F) -> &mut V {
        let lb = self.tree.lower_bound_link(&key);
        let found = lb != self.tree.end_link() && {
            let existing = unsafe { &Tree::<K, V, C, A>::value_at(lb).0 };
            !self.tree.compare().less(&key, existing)
        };
        let node = if found {
            lb
        } else {
            infallible(self.tree.insert_unique_hint_link(lb, (key, make()))).0
        };
        unsafe { &mut Tree::<K, V, C, A>::value_at_mut(node).1 }
    }

    /// Value for `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree.get(key).map(|(_, v)| v)
    }

    /// Key and value for `key`.
    #[inline]
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.tree.get(key).map(split)
    }

    /// Mutable value for `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let node = self.tree.find_link(key);
        if node == self.tree.end_link() {
            None
        } else {
            Some(unsafe { &mut Tree::<K, V, C, A>::value_at_mut(node).1 })
        }
    }

    /// Checked lookup.
    pub fn at(&self, key: &K) -> Result<&V, Error> {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// Checked mutable lookup.
    pub fn at_mut(&mut self, key: &K) -> Result<&mut V, Error> {
        self.get_mut(key).ok_or(Error::KeyNotFound)
    }

    /// `true` if `key` is present.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.contains(key)
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.tree.remove(key).map(|(_, v)| v)
    }

    /// Remove `key`, returning the stored key and value.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.tree.remove(key)
    }

    /// Remove every entry whose key falls in `range`; returns how many.
    pub fn remove_range<R: RangeBounds<K>>(&mut self, range: R) -> usize {
        self.tree.erase_range(range)
    }

    /// Keep only the entries for which `f` returns `true`.
    pub fn retain<F: FnMut(&K, &mut V) -> bool>(&mut self, mut f: F) {
        let mut c = self.tree.cursor_mut_begin();
        while !c.is_end() {
            let pair = unsafe { Tree::<K, V, C, A>::value_at_mut(c.link()) };
            if f(&pair.0, &mut pair.1) {
                c.move_next();
            } else {
                drop(c.remove_current());
            }
        }
    }

    /// Smallest entry.
    #[inline]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.tree.first().map(split)
    }

    /// Largest entry.
    #[inline]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.tree.last().map(split)
    }

    /// Remove and return the smallest entry.
    #[inline]
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.tree.pop_first()
    }

    /// Remove and return the largest entry.
    #[inline]
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.tree.pop_last()
    }

    /// Position of the first key not ordered before `key`.
    #[inline]
    pub fn lower_bound(&self, key: &K) -> Cursor<'_, (K, V)> {
        self.tree.lower_bound(key)
    }

    /// Position of the first key ordered after `key`.
    #[inline]
    pub fn upper_bound(&self, key: &K) -> Cursor<'_, (K, V)> {
        self.tree.upper_bound(key)
    }

    /// Entries whose keys fall in `range`.
    #[inline]
    pub fn range<R: RangeBounds<K>>(&self, range: R) -> Range<'_, K, V> {
        Range {
            inner: self.tree.range(range),
        }
    }

    /// Entries in key order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.tree.iter(),
        }
    }

    /// Keys in order.
    #[inline]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.tree.iter(),
        }
    }

    /// Values in key order.
    #[inline]
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.tree.iter(),
        }
    }

    /// Drop every entry.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Exchange contents with `other` in O(1).
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        self.tree.swap(&mut other.tree);
    }

    /// The underlying tree, for invariant checks.
    #[inline]
    pub fn as_tree(&self) -> &RbTree<(K, V), K, First, C, A> {
        &self.tree
    }
}

impl<K, V, C: Compare<K>, A: Allocator> Index<&K> for Map<K, V, C, A> {
    type Output = V;

    #[track_caller]
    fn index(&self, key: &K) -> &V {
        match self.get(key) {
            Some(v) => v,
            None => panic!("{}", Error::KeyNotFound),
        }
    }
}

impl<K: Clone, V: Clone, C: Compare<K> + Clone, A: Allocator> Clone for Map<K, V, C, A> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: Compare<K>, A: Allocator> fmt::Debug for Map<K, V, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq, C: Compare<K>, A: Allocator> PartialEq for Map<K, V, C, A> {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree
    }
}

impl<K: Eq, V: Eq, C: Compare<K>, A: Allocator> Eq for Map<K, V, C, A> {}

impl<K: PartialOrd, V: PartialOrd, C: Compare<K>, A: Allocator> PartialOrd for Map<K, V, C, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.tree.partial_cmp(&other.tree)
    }
}

impl<K: Ord, V: Ord, C: Compare<K>, A: Allocator> Ord for Map<K, V, C, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tree.cmp(&other.tree)
    }
}

impl<K: Hash, V: Hash, C: Compare<K>, A: Allocator> Hash for Map<K, V, C, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tree.hash(state);
    }
}

impl<K, V, C: Compare<K>, A: Allocator> Extend<(K, V)> for Map<K, V, C, A> {
    /// Keys already present keep their current value. Input sorted by key
    /// is inserted with O(1) comparisons per entry.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let mut c = self.tree.cursor_mut_end();
        for pair in iter {
            c.insert_unique(pair);
            c.move_next();
        }
    }
}

impl<K, V, C: Compare<K> + Default, A: Allocator> FromIterator<(K, V)> for Map<K, V, C, A> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new_in(C::default(), A::default());
        map.extend(iter);
        map
    }
}

impl<'a, K, V, C: Compare<K>, A: Allocator> IntoIterator for &'a Map<K, V, C, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V, C: Compare<K>, A: Allocator> IntoIterator for Map<K, V, C, A> {
    type Item = (K, V);
    type IntoIter = rbtree::IntoIter<(K, V), K, First, C, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.tree.into_iter()
    }
}

// =============================================================================
// MultiMap
// =============================================================================

/// Ordered map that keeps every value inserted under a key.
pub struct MultiMap<K, V, C = Less, A: Allocator = PoolAllocator> {
    tree: Tree<K, V, C, A>,
}

impl<K, V, C: Compare<K> + Default> MultiMap<K, V, C> {
    /// Creates an empty multimap.
    #[inline]
    pub fn new() -> Self {
        Self {
            tree: RbTree::new(),
        }
    }
}

impl<K, V, C: Compare<K>> MultiMap<K, V, C> {
    /// Creates an empty multimap ordered by `cmp`.
    #[inline]
    pub fn with_compare(cmp: C) -> Self {
        Self {
            tree: RbTree::with_compare(cmp),
        }
    }
}

impl<K, V, C: Compare<K> + Default> Default for MultiMap<K, V, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C: Compare<K>, A: Allocator> MultiMap<K, V, C, A> {
    /// Creates an empty multimap with an explicit comparison and allocator.
    #[inline]
    pub fn new_in(cmp: C, alloc: A) -> Self {
        Self {
            tree: RbTree::new_in(cmp, alloc),
        }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// `true` if there are no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Insert `key → value` after any entries with an equivalent key.
    pub fn insert(&mut self, key: K, value: V) -> Cursor<'_, (K, V)> {
        self.tree.insert_equal((key, value))
    }

    /// Fallible [`MultiMap::insert`].
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Cursor<'_, (K, V)>, Error> {
        self.tree.try_insert_equal((key, value))
    }

    /// First value stored under `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree.get(key).map(|(_, v)| v)
    }

    /// `true` if `key` is present.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.contains(key)
    }

    /// Number of entries under `key`.
    #[inline]
    pub fn count(&self, key: &K) -> usize {
        self.tree.count(key)
    }

    /// Every entry under `key`, in arrival order.
    pub fn equal_range(&self, key: &K) -> Range<'_, K, V> {
        Range {
            inner: self
                .tree
                .range((std::ops::Bound::Included(key), std::ops::Bound::Included(key))),
        }
    }

    /// Entries whose keys fall in `range`.
    #[inline]
    pub fn range<R: RangeBounds<K>>(&self, range: R) -> Range<'_, K, V> {
        Range {
            inner: self.tree.range(range),
        }
    }

    /// Remove every entry under `key`; returns how many.
    #[inline]
    pub fn remove_all(&mut self, key: &K) -> usize {
        self.tree.erase_key(key)
    }

    /// Remove the first entry under `key`.
    #[inline]
    pub fn remove_one(&mut self, key: &K) -> Option<(K, V)> {
        self.tree.remove(key)
    }

    /// Smallest entry.
    #[inline]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.tree.first().map(split)
    }

    /// Largest entry.
    #[inline]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.tree.last().map(split)
    }

    /// Position of the first key not ordered before `key`.
    #[inline]
    pub fn lower_bound(&self, key: &K) -> Cursor<'_, (K, V)> {
        self.tree.lower_bound(key)
    }

    /// Position of the first key ordered after `key`.
    #[inline]
    pub fn upper_bound(&self, key: &K) -> Cursor<'_, (K, V)> {
        self.tree.upper_bound(key)
    }

    /// Entries in key order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.tree.iter(),
        }
    }

    /// Keys in order, repeated per entry.
    #[inline]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.tree.iter(),
        }
    }

    /// Values in key order.
    #[inline]
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.tree.iter(),
        }
    }

    /// Drop every entry.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Exchange contents with `other` in O(1).
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        self.tree.swap(&mut other.tree);
    }

    /// The underlying tree, for invariant checks.
    #[inline]
    pub fn as_tree(&self) -> &RbTree<(K, V), K, First, C, A> {
        &self.tree
    }
}

impl<K: Clone, V: Clone, C: Compare<K> + Clone, A: Allocator> Clone for MultiMap<K, V, C, A> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: Compare<K>, A: Allocator> fmt::Debug
    for MultiMap<K, V, C, A>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq, C: Compare<K>, A: Allocator> PartialEq for MultiMap<K, V, C, A> {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree
    }
}

impl<K: Eq, V: Eq, C: Compare<K>, A: Allocator> Eq for MultiMap<K, V, C, A> {}

impl<K: PartialOrd, V: PartialOrd, C: Compare<K>, A: Allocator> PartialOrd
    for MultiMap<K, V, C, A>
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.tree.partial_cmp(&other.tree)
    }
}

impl<K: Ord, V: Ord, C: Compare<K>, A: Allocator> Ord for MultiMap<K, V, C, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tree.cmp(&other.tree)
    }
}

impl<K: Hash, V: Hash, C: Compare<K>, A: Allocator> Hash for MultiMap<K, V, C, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tree.hash(state);
    }
}

impl<K, V, C: Compare<K>, A: Allocator> Extend<(K, V)> for MultiMap<K, V, C, A> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.tree.insert_equal((k, v));
        }
    }
}

impl<K, V, C: Compare<K> + Default, A: Allocator> FromIterator<(K, V)> for MultiMap<K, V, C, A> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new_in(C::default(), A::default());
        map.extend(iter);
        map
    }
}

impl<'a, K, V, C: Compare<K>, A: Allocator> IntoIterator for &'a MultiMap<K, V, C, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V, C: Compare<K>, A: Allocator> IntoIterator for MultiMap<K, V, C, A> {
    type Item = (K, V);
    type IntoIter = rbtree::IntoIter<(K, V), K, First, C, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.tree.into_iter()
    }
}

// =============================================================================
// Iterators
// =============================================================================

/// Entries of a map in key order.
pub struct Iter<'a, K, V> {
    inner: rbtree::Iter<'a, (K, V)>,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(split)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(split)
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Keys of a map in order.
pub struct Keys<'a, K, V> {
    inner: rbtree::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// Values of a map in key order.
pub struct Values<'a, K, V> {
    inner: rbtree::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// Entries of a map within a key range.
pub struct Range<'a, K, V> {
    inner: rbtree::Range<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(split)
    }
}

impl<K, V> DoubleEndedIterator for Range<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(split)
    }
}

impl<K, V> FusedIterator for Range<'_, K, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::Greater;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn insert_keeps_first_value() {
        let mut m: Map<i32, &str> = Map::new();
        assert!(m.insert(1, "one").1);
        let (pos, inserted) = m.insert(1, "uno");
        assert!(!inserted);
        assert_eq!(pos.get(), Some(&(1, "one")));
        assert_eq!(m.insert_or_assign(1, "ein"), Some("one"));
        assert_eq!(m[&1], "ein");
    }

    #[test]
    fn entry_or_default_inserts_once() {
        let mut counts: Map<char, usize> = Map::new();
        for c in "mississippi".chars() {
            *counts.entry_or_default(c) += 1;
        }
        let pairs: Vec<(char, usize)> = counts.iter().map(|(&k, &v)| (k, v)).collect();
        assert_eq!(pairs, [('i', 4), ('m', 1), ('p', 2), ('s', 4)]);
        counts.as_tree().verify().unwrap();
    }

    #[test]
    fn entry_default_panic_leaves_map_unchanged() {
        let mut m: Map<i32, i32> = (0..5).map(|i| (i, i)).collect();
        let result = catch_unwind(AssertUnwindSafe(|| {
            m.entry_or_insert_with(10, || panic!("no value"));
        }));
        assert!(result.is_err());
        assert_eq!(m.len(), 5);
        assert!(!m.contains_key(&10));
    }

    #[test]
    fn at_reports_missing_key() {
        let mut m: Map<&str, i32> = Map::new();
        m.insert("a", 1);
        assert_eq!(m.at(&"a"), Ok(&1));
        assert_eq!(m.at(&"b"), Err(Error::KeyNotFound));
        *m.at_mut(&"a").unwrap() = 5;
        assert_eq!(m.get(&"a"), Some(&5));
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn index_panics_on_missing_key() {
        let m: Map<i32, i32> = Map::new();
        let _ = m[&3];
    }

    #[test]
    fn remove_and_retain() {
        let mut m: Map<i32, i32> = (0..10).map(|i| (i, i * i)).collect();
        assert_eq!(m.remove(&3), Some(9));
        assert_eq!(m.remove(&3), None);
        m.retain(|k, v| {
            *v += 1;
            k % 2 == 0
        });
        assert_eq!(m.values().copied().collect::<Vec<_>>(), [1, 5, 17, 37, 65]);
        assert_eq!(m.remove_range(4..), 3);
        assert_eq!(m.keys().copied().collect::<Vec<_>>(), [0, 2]);
        m.as_tree().verify().unwrap();
    }

    #[test]
    fn extend_keeps_existing_entries() {
        let mut m: Map<i32, char> = Map::new();
        m.insert(2, 'x');
        m.extend([(1, 'a'), (2, 'b'), (3, 'c')]);
        let pairs: Vec<(i32, char)> = m.iter().map(|(&k, &v)| (k, v)).collect();
        assert_eq!(pairs, [(1, 'a'), (2, 'x'), (3, 'c')]);
    }

    #[test]
    fn first_last_and_range() {
        let m: Map<i32, i32> = (0..10).map(|i| (i, -i)).collect();
        assert_eq!(m.first(), Some((&0, &0)));
        assert_eq!(m.last(), Some((&9, &-9)));
        let mid: Vec<i32> = m.range(3..6).map(|(k, _)| *k).collect();
        assert_eq!(mid, [3, 4, 5]);
        assert_eq!(m.lower_bound(&4).get(), Some(&(4, -4)));
    }

    #[test]
    fn custom_order_and_equality() {
        let mut a: Map<i32, (), Greater> = Map::new();
        let mut b: Map<i32, (), Greater> = Map::new();
        for i in 0..5 {
            a.insert(i, ());
            b.insert(4 - i, ());
        }
        assert_eq!(a, b);
        assert_eq!(a.keys().copied().collect::<Vec<_>>(), [4, 3, 2, 1, 0]);
        assert_eq!(format!("{:?}", a.clone()), "{4: (), 3: (), 2: (), 1: (), 0: ()}");
    }

    #[test]
    fn multimap_groups_equal_keys() {
        let mut m: MultiMap<&str, i32> = MultiMap::new();
        m.insert("b", 1);
        m.insert("a", 2);
        m.insert("b", 3);
        m.insert("b", 4);
        assert_eq!(m.count(&"b"), 3);
        let bs: Vec<i32> = m.equal_range(&"b").map(|(_, v)| *v).collect();
        assert_eq!(bs, [1, 3, 4]);
        assert_eq!(m.get(&"b"), Some(&1));
        assert_eq!(m.remove_one(&"b"), Some(("b", 1)));
        assert_eq!(m.remove_all(&"b"), 2);
        assert_eq!(m.len(), 1);
        m.as_tree().verify().unwrap();
    }
}
