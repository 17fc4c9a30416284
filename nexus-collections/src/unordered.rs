//! Unordered maps and sets over the chained hash table.
//!
//! The APIs mirror the ordered containers in [`crate::map`] and
//! [`crate::set`], minus everything that depends on key order. Iteration
//! follows bucket order, and equality ignores order: two containers are
//! equal when they hold the same elements (with the same multiplicities,
//! for the multi variants).
//!
//! ```
//! use nexus_collections::{UnorderedMap, UnorderedMultiSet};
//!
//! let mut stock: UnorderedMap<&str, u32> = UnorderedMap::new();
//! stock.insert("bolt", 40);
//! *stock.entry_or_default("nut") += 12;
//! assert_eq!(stock.get(&"nut"), Some(&12));
//!
//! let words: UnorderedMultiSet<&str> = "a b a c a".split(' ').collect();
//! assert_eq!(words.count(&"a"), 3);
//! ```

use std::fmt;
use std::hash::{BuildHasher, Hash, RandomState};
use std::iter::FusedIterator;
use std::ops::Index;

use nexus_alloc::{Allocator, PoolAllocator};

use crate::Error;
use crate::compare::{First, Identity};
use crate::hashtable::{self, Cursor, HashTable};

type PairTable<K, V, S, A> = HashTable<(K, V), K, First, S, A>;
type ValueTable<T, S, A> = HashTable<T, T, Identity, S, A>;

#[inline]
fn split<K, V>(pair: &(K, V)) -> (&K, &V) {
    (&pair.0, &pair.1)
}

/// Constructors and hash-table observers shared by all four containers.
macro_rules! shared_table_api {
    ($name:ident < $($p:ident),+ >, $table:ident < $($tp:ident),+ >) => {
        impl<$($p,)+ S: Default> $name<$($p,)+ S> {
            /// Creates an empty container. Does not allocate.
            #[inline]
            pub fn new() -> Self {
                Self {
                    table: HashTable::new(),
                }
            }
        }

        impl<$($p,)+ S> $name<$($p,)+ S> {
            /// Creates an empty container hashing with `hasher`.
            #[inline]
            pub fn with_hasher(hasher: S) -> Self {
                Self {
                    table: HashTable::with_hasher(hasher),
                }
            }
        }

        impl<$($p,)+ S: Default> Default for $name<$($p,)+ S> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<$($p,)+ S, A: Allocator> $name<$($p,)+ S, A> {
            /// Creates an empty container with an explicit hasher and
            /// allocator.
            #[inline]
            pub fn new_in(hasher: S, alloc: A) -> Self {
                Self {
                    table: HashTable::new_in(hasher, alloc),
                }
            }

            /// Number of elements.
            #[inline]
            pub fn len(&self) -> usize {
                self.table.len()
            }

            /// `true` if there are no elements.
            #[inline]
            pub fn is_empty(&self) -> bool {
                self.table.is_empty()
            }

            /// Number of buckets.
            #[inline]
            pub fn bucket_count(&self) -> usize {
                self.table.bucket_count()
            }

            /// Elements per bucket.
            #[inline]
            pub fn load_factor(&self) -> f32 {
                self.table.load_factor()
            }

            /// Drop every element. The bucket count is kept.
            #[inline]
            pub fn clear(&mut self) {
                self.table.clear();
            }

            /// Exchange contents with `other` in O(1).
            #[inline]
            pub fn swap(&mut self, other: &mut Self) {
                self.table.swap(&mut other.table);
            }

            /// The underlying table.
            #[inline]
            pub fn as_table(&self) -> &$table<$($tp,)+ S, A> {
                &self.table
            }
        }
    };
}

// =============================================================================
// UnorderedMap
// =============================================================================

/// Hash map with at most one value per key.
pub struct UnorderedMap<K, V, S = RandomState, A: Allocator = PoolAllocator> {
    table: PairTable<K, V, S, A>,
}

shared_table_api!(UnorderedMap<K, V>, PairTable<K, V>);

impl<K: Hash + Eq, V, S: BuildHasher, A: Allocator> UnorderedMap<K, V, S, A> {
    /// Insert `key → value` unless `key` is present. Returns the position
    /// of the entry for `key` and whether it was inserted.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) -> (Cursor<'_, (K, V)>, bool) {
        self.table.insert_unique((key, value))
    }

    /// Fallible [`UnorderedMap::insert`].
    #[inline]
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(Cursor<'_, (K, V)>, bool), Error> {
        self.table.try_insert_unique((key, value))
    }

    /// Insert `key → value`, replacing and returning any previous value.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> Option<V> {
        match self.table.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(&mut slot.1, value)),
            None => {
                self.table.insert_unique((key, value));
                None
            }
        }
    }

    /// Value for `key`, inserting `V::default()` first if absent.
    #[inline]
    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entry_or_insert_with(key, V::default)
    }

    /// Value for `key`, inserting `make()` first if absent.
    #[inline]
    pub fn entry_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, make: F) -> &mut V {
        &mut self.table.find_or_insert_with(key, |k| (k, make())).1
    }

    /// Value for `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.table.get(key).map(|(_, v)| v)
    }

    /// Key and value for `key`.
    #[inline]
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.table.get(key).map(split)
    }

    /// Mutable value for `key`.
    #[inline]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.table.get_mut(key).map(|(_, v)| v)
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
        self.table.contains(key)
    }

    /// Position of the entry for `key`, or the end.
    #[inline]
    pub fn find(&self, key: &K) -> Cursor<'_, (K, V)> {
        self.table.find(key)
    }

    /// Remove `key`, returning its value.
    #[inline]
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.table.remove(key).map(|(_, v)| v)
    }

    /// Remove `key`, returning the stored key and value.
    #[inline]
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.table.remove(key)
    }

    /// Keep only the entries for which `f` returns `true`.
    pub fn retain<F: FnMut(&K, &mut V) -> bool>(&mut self, mut f: F) {
        self.table.retain_mut(|(k, v)| f(k, v));
    }

    /// Grow the bucket count so `n` elements fit without a rehash.
    #[inline]
    pub fn reserve(&mut self, n: usize) {
        self.table.reserve(n);
    }

    /// Fallible reserve.
    #[inline]
    pub fn try_reserve(&mut self, n: usize) -> Result<(), Error> {
        self.table.try_reserve(n)
    }
}

impl<K, V, S, A: Allocator> UnorderedMap<K, V, S, A> {
    /// Entries in bucket order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Keys in bucket order.
    #[inline]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.table.iter(),
        }
    }

    /// Values in bucket order of their keys.
    #[inline]
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.table.iter(),
        }
    }
}

impl<K: Hash + Eq, V, S: BuildHasher, A: Allocator> Index<&K> for UnorderedMap<K, V, S, A> {
    type Output = V;

    /// # Panics
    ///
    /// If `key` is absent.
    fn index(&self, key: &K) -> &V {
        match self.get(key) {
            Some(v) => v,
            None => panic!("{}", Error::KeyNotFound),
        }
    }
}

impl<K: Hash + Eq, V, S: BuildHasher, A: Allocator> Extend<(K, V)> for UnorderedMap<K, V, S, A> {
    /// Keys already present keep their value.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.table.insert_unique((k, v));
        }
    }
}

// =============================================================================
// UnorderedMultiMap
// =============================================================================

/// Hash map keeping every value inserted for a key.
pub struct UnorderedMultiMap<K, V, S = RandomState, A: Allocator = PoolAllocator> {
    table: PairTable<K, V, S, A>,
}

shared_table_api!(UnorderedMultiMap<K, V>, PairTable<K, V>);

impl<K: Hash + Eq, V, S: BuildHasher, A: Allocator> UnorderedMultiMap<K, V, S, A> {
    /// Insert `key → value` next to any entries for the same key.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) -> Cursor<'_, (K, V)> {
        self.table.insert_equal((key, value))
    }

    /// Fallible [`UnorderedMultiMap::insert`].
    #[inline]
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Cursor<'_, (K, V)>, Error> {
        self.table.try_insert_equal((key, value))
    }

    /// One of the values for `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.table.get(key).map(|(_, v)| v)
    }

    /// `true` if `key` is present.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.table.contains(key)
    }

    /// Number of entries for `key`.
    #[inline]
    pub fn count(&self, key: &K) -> usize {
        self.table.count(key)
    }

    /// Every entry for `key`.
    #[inline]
    pub fn equal_range(&self, key: &K) -> EqualRange<'_, K, V> {
        EqualRange {
            inner: self.table.equal_range(key),
        }
    }

    /// Remove one entry for `key`.
    #[inline]
    pub fn remove_one(&mut self, key: &K) -> Option<(K, V)> {
        self.table.remove(key)
    }

    /// Remove every entry for `key`; returns how many.
    #[inline]
    pub fn remove_all(&mut self, key: &K) -> usize {
        self.table.erase_key(key)
    }

    /// Keep only the entries for which `f` returns `true`.
    pub fn retain<F: FnMut(&K, &mut V) -> bool>(&mut self, mut f: F) {
        self.table.retain_mut(|(k, v)| f(k, v));
    }

    /// Grow the bucket count so `n` elements fit without a rehash.
    #[inline]
    pub fn reserve(&mut self, n: usize) {
        self.table.reserve(n);
    }

    /// Fallible reserve.
    #[inline]
    pub fn try_reserve(&mut self, n: usize) -> Result<(), Error> {
        self.table.try_reserve(n)
    }
}

impl<K, V, S, A: Allocator> UnorderedMultiMap<K, V, S, A> {
    /// Entries in bucket order; entries for one key are adjacent.
    #[inline]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Keys in bucket order, repeated per entry.
    #[inline]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.table.iter(),
        }
    }

    /// Values in bucket order of their keys.
    #[inline]
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.table.iter(),
        }
    }
}

impl<K: Hash + Eq, V, S: BuildHasher, A: Allocator> Extend<(K, V)>
    for UnorderedMultiMap<K, V, S, A>
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.table.insert_equal((k, v));
        }
    }
}

macro_rules! map_traits {
    ($name:ident) => {
        impl<K: Clone, V: Clone, S: Clone, A: Allocator> Clone for $name<K, V, S, A> {
            fn clone(&self) -> Self {
                Self {
                    table: self.table.clone(),
                }
            }
        }

        impl<K: fmt::Debug, V: fmt::Debug, S, A: Allocator> fmt::Debug for $name<K, V, S, A> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_map().entries(self.iter()).finish()
            }
        }

        impl<K, V, S, A> PartialEq for $name<K, V, S, A>
        where
            K: Hash + Eq,
            V: PartialEq,
            S: BuildHasher,
            A: Allocator,
        {
            fn eq(&self, other: &Self) -> bool {
                self.table.same_elements(&other.table)
            }
        }

        impl<K: Hash + Eq, V: Eq, S: BuildHasher, A: Allocator> Eq for $name<K, V, S, A> {}

        impl<K, V, S, A> FromIterator<(K, V)> for $name<K, V, S, A>
        where
            K: Hash + Eq,
            S: BuildHasher + Default,
            A: Allocator,
        {
            fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
                let mut map = Self::new_in(S::default(), A::default());
                map.extend(iter);
                map
            }
        }

        impl<'a, K, V, S, A: Allocator> IntoIterator for &'a $name<K, V, S, A> {
            type Item = (&'a K, &'a V);
            type IntoIter = Iter<'a, K, V>;

            fn into_iter(self) -> Iter<'a, K, V> {
                self.iter()
            }
        }

        impl<K, V, S, A: Allocator> IntoIterator for $name<K, V, S, A> {
            type Item = (K, V);
            type IntoIter = hashtable::IntoIter<(K, V), K, First, S, A>;

            fn into_iter(self) -> Self::IntoIter {
                self.table.into_iter()
            }
        }
    };
}

map_traits!(UnorderedMap);
map_traits!(UnorderedMultiMap);

// =============================================================================
// UnorderedSet
// =============================================================================

/// Hash set of unique elements.
pub struct UnorderedSet<T, S = RandomState, A: Allocator = PoolAllocator> {
    table: ValueTable<T, S, A>,
}

shared_table_api!(UnorderedSet<T>, ValueTable<T>);

impl<T: Hash + Eq, S: BuildHasher, A: Allocator> UnorderedSet<T, S, A> {
    /// Insert `value` unless an equal element exists. Returns whether it
    /// was inserted.
    #[inline]
    pub fn insert(&mut self, value: T) -> bool {
        self.table.insert_unique(value).1
    }

    /// Fallible [`UnorderedSet::insert`].
    #[inline]
    pub fn try_insert(&mut self, value: T) -> Result<bool, Error> {
        Ok(self.table.try_insert_unique(value)?.1)
    }

    /// `true` if an equal element is present.
    #[inline]
    pub fn contains(&self, value: &T) -> bool {
        self.table.contains(value)
    }

    /// The stored element equal to `value`.
    #[inline]
    pub fn get(&self, value: &T) -> Option<&T> {
        self.table.get(value)
    }

    /// Remove the element equal to `value`. Returns whether one was there.
    #[inline]
    pub fn remove(&mut self, value: &T) -> bool {
        self.table.remove(value).is_some()
    }

    /// Remove and return the element equal to `value`.
    #[inline]
    pub fn take(&mut self, value: &T) -> Option<T> {
        self.table.remove(value)
    }

    /// Keep only the elements for which `f` returns `true`.
    #[inline]
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, f: F) {
        self.table.retain(f);
    }

    /// Grow the bucket count so `n` elements fit without a rehash.
    #[inline]
    pub fn reserve(&mut self, n: usize) {
        self.table.reserve(n);
    }

    /// Fallible reserve.
    #[inline]
    pub fn try_reserve(&mut self, n: usize) -> Result<(), Error> {
        self.table.try_reserve(n)
    }
}

impl<T: Hash + Eq, S: BuildHasher, A: Allocator> Extend<T> for UnorderedSet<T, S, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.table.insert_unique(value);
        }
    }
}

// =============================================================================
// UnorderedMultiSet
// =============================================================================

/// Hash set counting repeated elements.
pub struct UnorderedMultiSet<T, S = RandomState, A: Allocator = PoolAllocator> {
    table: ValueTable<T, S, A>,
}

shared_table_api!(UnorderedMultiSet<T>, ValueTable<T>);

impl<T: Hash + Eq, S: BuildHasher, A: Allocator> UnorderedMultiSet<T, S, A> {
    /// Insert `value` next to any equal elements.
    #[inline]
    pub fn insert(&mut self, value: T) -> Cursor<'_, T> {
        self.table.insert_equal(value)
    }

    /// Fallible [`UnorderedMultiSet::insert`].
    #[inline]
    pub fn try_insert(&mut self, value: T) -> Result<Cursor<'_, T>, Error> {
        self.table.try_insert_equal(value)
    }

    /// `true` if an equal element is present.
    #[inline]
    pub fn contains(&self, value: &T) -> bool {
        self.table.contains(value)
    }

    /// Number of elements equal to `value`.
    #[inline]
    pub fn count(&self, value: &T) -> usize {
        self.table.count(value)
    }

    /// Every element equal to `value`.
    #[inline]
    pub fn equal_range(&self, value: &T) -> hashtable::EqualRange<'_, T> {
        self.table.equal_range(value)
    }

    /// Remove one element equal to `value`.
    #[inline]
    pub fn remove_one(&mut self, value: &T) -> Option<T> {
        self.table.remove(value)
    }

    /// Remove every element equal to `value`; returns how many.
    #[inline]
    pub fn remove_all(&mut self, value: &T) -> usize {
        self.table.erase_key(value)
    }

    /// Grow the bucket count so `n` elements fit without a rehash.
    #[inline]
    pub fn reserve(&mut self, n: usize) {
        self.table.reserve(n);
    }

    /// Fallible reserve.
    #[inline]
    pub fn try_reserve(&mut self, n: usize) -> Result<(), Error> {
        self.table.try_reserve(n)
    }
}

impl<T: Hash + Eq, S: BuildHasher, A: Allocator> Extend<T> for UnorderedMultiSet<T, S, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.table.insert_equal(value);
        }
    }
}

macro_rules! set_traits {
    ($name:ident) => {
        impl<T, S, A: Allocator> $name<T, S, A> {
            /// Elements in bucket order.
            #[inline]
            pub fn iter(&self) -> hashtable::Iter<'_, T> {
                self.table.iter()
            }
        }

        impl<T: Clone, S: Clone, A: Allocator> Clone for $name<T, S, A> {
            fn clone(&self) -> Self {
                Self {
                    table: self.table.clone(),
                }
            }
        }

        impl<T: fmt::Debug, S, A: Allocator> fmt::Debug for $name<T, S, A> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_set().entries(self.iter()).finish()
            }
        }

        impl<T: Hash + Eq, S: BuildHasher, A: Allocator> PartialEq for $name<T, S, A> {
            fn eq(&self, other: &Self) -> bool {
                self.table.same_elements(&other.table)
            }
        }

        impl<T: Hash + Eq, S: BuildHasher, A: Allocator> Eq for $name<T, S, A> {}

        impl<T, S, A> FromIterator<T> for $name<T, S, A>
        where
            T: Hash + Eq,
            S: BuildHasher + Default,
            A: Allocator,
        {
            fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
                let mut set = Self::new_in(S::default(), A::default());
                set.extend(iter);
                set
            }
        }

        impl<'a, T, S, A: Allocator> IntoIterator for &'a $name<T, S, A> {
            type Item = &'a T;
            type IntoIter = hashtable::Iter<'a, T>;

            fn into_iter(self) -> Self::IntoIter {
                self.iter()
            }
        }

        impl<T, S, A: Allocator> IntoIterator for $name<T, S, A> {
            type Item = T;
            type IntoIter = hashtable::IntoIter<T, T, Identity, S, A>;

            fn into_iter(self) -> Self::IntoIter {
                self.table.into_iter()
            }
        }
    };
}

set_traits!(UnorderedSet);
set_traits!(UnorderedMultiSet);

// =============================================================================
// Iterators
// =============================================================================

/// Entries of an unordered map.
pub struct Iter<'a, K, V> {
    inner: hashtable::Iter<'a, (K, V)>,
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

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Keys of an unordered map.
pub struct Keys<'a, K, V> {
    inner: hashtable::Iter<'a, (K, V)>,
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

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// Values of an unordered map.
pub struct Values<'a, K, V> {
    inner: hashtable::Iter<'a, (K, V)>,
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

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// Entries of an unordered multimap sharing one key.
pub struct EqualRange<'a, K, V> {
    inner: hashtable::EqualRange<'a, (K, V)>,
}

impl<'a, K, V> Iterator for EqualRange<'a, K, V> {
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

impl<K, V> ExactSizeIterator for EqualRange<'_, K, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::{BuildHasherDefault, DefaultHasher};

    type Fixed = BuildHasherDefault<DefaultHasher>;

    #[test]
    fn map_insert_and_lookup() {
        let mut m: UnorderedMap<u32, &str> = UnorderedMap::new();
        assert!(m.insert(1, "one").1);
        assert!(!m.insert(1, "uno").1);
        assert_eq!(m.get(&1), Some(&"one"));
        assert_eq!(m.insert_or_assign(1, "uno"), Some("one"));
        assert_eq!(m.insert_or_assign(2, "two"), None);
        assert_eq!(m[&2], "two");
        assert_eq!(m.at(&3), Err(Error::KeyNotFound));
        assert_eq!(m.remove(&1), Some("uno"));
        assert_eq!(m.len(), 1);
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn map_index_missing_panics() {
        let m: UnorderedMap<u32, u32> = UnorderedMap::new();
        let _ = m[&1];
    }

    #[test]
    fn map_entry_api() {
        let mut counts: UnorderedMap<char, usize, Fixed> = UnorderedMap::new();
        for c in "mississippi".chars() {
            *counts.entry_or_default(c) += 1;
        }
        assert_eq!(counts.get(&'s'), Some(&4));
        assert_eq!(counts.get(&'m'), Some(&1));
        assert_eq!(*counts.entry_or_insert_with('z', || 26), 26);
        assert_eq!(*counts.entry_or_insert_with('z', || unreachable!()), 26);
        *counts.at_mut(&'p').unwrap() = 0;
        counts.retain(|_, n| *n > 0);
        assert_eq!(counts.len(), 4);
    }

    #[test]
    fn map_equality_ignores_order() {
        let a: UnorderedMap<u32, u32> = (0..100).map(|i| (i, i * 2)).collect();
        let b: UnorderedMap<u32, u32> = (0..100).rev().map(|i| (i, i * 2)).collect();
        assert_eq!(a, b);
        let mut c = b.clone();
        *c.get_mut(&5).unwrap() = 0;
        assert_ne!(a, c);
        assert_eq!(a.keys().count(), 100);
        assert_eq!(a.values().copied().sum::<u32>(), 9_900);
    }

    #[test]
    fn multimap_groups() {
        let mut m: UnorderedMultiMap<&str, u32> = UnorderedMultiMap::new();
        m.insert("a", 1);
        m.insert("b", 2);
        m.insert("a", 3);
        assert_eq!(m.count(&"a"), 2);
        let mut vals: Vec<u32> = m.equal_range(&"a").map(|(_, v)| *v).collect();
        vals.sort();
        assert_eq!(vals, [1, 3]);
        assert!(m.remove_one(&"a").is_some());
        assert_eq!(m.remove_all(&"a"), 1);
        assert_eq!(m.len(), 1);

        let x: UnorderedMultiMap<u8, u8> = [(1, 1), (1, 2), (2, 0)].into_iter().collect();
        let y: UnorderedMultiMap<u8, u8> = [(2, 0), (1, 2), (1, 1)].into_iter().collect();
        let z: UnorderedMultiMap<u8, u8> = [(2, 0), (1, 1), (1, 1)].into_iter().collect();
        assert_eq!(x, y);
        assert_ne!(x, z);
    }

    #[test]
    fn set_basics() {
        let mut s: UnorderedSet<String> = UnorderedSet::new();
        assert!(s.insert("x".to_string()));
        assert!(!s.insert("x".to_string()));
        assert!(s.contains(&"x".to_string()));
        assert_eq!(s.take(&"x".to_string()).as_deref(), Some("x"));
        assert!(s.is_empty());

        let a: UnorderedSet<i32> = [1, 2, 3].into_iter().collect();
        let b: UnorderedSet<i32> = [3, 1, 2, 2].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(format!("{:?}", UnorderedSet::<i32>::from_iter([7])), "{7}");
    }

    #[test]
    fn multiset_counts_and_reserve() {
        let mut bag: UnorderedMultiSet<u64, Fixed> = UnorderedMultiSet::new();
        bag.reserve(1_000);
        let buckets = bag.bucket_count();
        assert_eq!(buckets, 1_543);
        for v in 0..1_000 {
            bag.insert(v % 7);
        }
        assert_eq!(bag.bucket_count(), buckets);
        assert_eq!(bag.count(&3), 143);
        assert_eq!(bag.remove_all(&3), 143);
        assert!(!bag.contains(&3));
        assert_eq!(bag.into_iter().count(), 1_000 - 143);
    }
}
