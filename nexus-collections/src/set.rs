//! Ordered sets over the red-black tree.
//!
//! ```
//! use nexus_collections::{MultiSet, Set};
//!
//! let mut s: Set<u32> = [5, 1, 3].into_iter().collect();
//! assert!(!s.insert(3));
//! assert_eq!(s.iter().copied().collect::<Vec<_>>(), [1, 3, 5]);
//!
//! let mut bag: MultiSet<char> = "hello".chars().collect();
//! assert_eq!(bag.count(&'l'), 2);
//! assert_eq!(bag.remove_all(&'l'), 2);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Bound, RangeBounds};

use nexus_alloc::{Allocator, PoolAllocator};

use crate::Error;
use crate::compare::{Compare, Identity, Less};
use crate::rbtree::{self, Cursor, RbTree};

type Tree<T, C, A> = RbTree<T, T, Identity, C, A>;

/// Iterator over a set in order.
pub type Iter<'a, T> = rbtree::Iter<'a, T>;

/// Iterator over a key range of a set.
pub type Range<'a, T> = rbtree::Range<'a, T>;

/// Owning iterator over a set in order.
pub type IntoIter<T, C, A> = rbtree::IntoIter<T, T, Identity, C, A>;

macro_rules! shared_set_api {
    ($name:ident) => {
        impl<T, C: Compare<T> + Default> $name<T, C> {
            /// Creates an empty set.
            #[inline]
            pub fn new() -> Self {
                Self {
                    tree: RbTree::new(),
                }
            }
        }

        impl<T, C: Compare<T>> $name<T, C> {
            /// Creates an empty set ordered by `cmp`.
            #[inline]
            pub fn with_compare(cmp: C) -> Self {
                Self {
                    tree: RbTree::with_compare(cmp),
                }
            }
        }

        impl<T, C: Compare<T> + Default> Default for $name<T, C> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<T, C: Compare<T>, A: Allocator> $name<T, C, A> {
            /// Creates an empty set with an explicit comparison and allocator.
            #[inline]
            pub fn new_in(cmp: C, alloc: A) -> Self {
                Self {
                    tree: RbTree::new_in(cmp, alloc),
                }
            }

            /// Number of elements.
            #[inline]
            pub fn len(&self) -> usize {
                self.tree.len()
            }

            /// `true` if there are no elements.
            #[inline]
            pub fn is_empty(&self) -> bool {
                self.tree.is_empty()
            }

            /// `true` if an element equivalent to `value` is present.
            #[inline]
            pub fn contains(&self, value: &T) -> bool {
                self.tree.contains(value)
            }

            /// The stored element equivalent to `value`.
            #[inline]
            pub fn get(&self, value: &T) -> Option<&T> {
                self.tree.get(value)
            }

            /// Smallest element.
            #[inline]
            pub fn first(&self) -> Option<&T> {
                self.tree.first()
            }

            /// Largest element.
            #[inline]
            pub fn last(&self) -> Option<&T> {
                self.tree.last()
            }

            /// Remove and return the smallest element.
            #[inline]
            pub fn pop_first(&mut self) -> Option<T> {
                self.tree.pop_first()
            }

            /// Remove and return the largest element.
            #[inline]
            pub fn pop_last(&mut self) -> Option<T> {
                self.tree.pop_last()
            }

            /// Position of the first element not ordered before `value`.
            #[inline]
            pub fn lower_bound(&self, value: &T) -> Cursor<'_, T> {
                self.tree.lower_bound(value)
            }

            /// Position of the first element ordered after `value`.
            #[inline]
            pub fn upper_bound(&self, value: &T) -> Cursor<'_, T> {
                self.tree.upper_bound(value)
            }

            /// Elements within `range`.
            #[inline]
            pub fn range<R: RangeBounds<T>>(&self, range: R) -> Range<'_, T> {
                self.tree.range(range)
            }

            /// Remove every element within `range`; returns how many.
            #[inline]
            pub fn remove_range<R: RangeBounds<T>>(&mut self, range: R) -> usize {
                self.tree.erase_range(range)
            }

            /// Elements in order.
            #[inline]
            pub fn iter(&self) -> Iter<'_, T> {
                self.tree.iter()
            }

            /// Drop every element.
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
            pub fn as_tree(&self) -> &RbTree<T, T, Identity, C, A> {
                &self.tree
            }
        }

        impl<T: Clone, C: Compare<T> + Clone, A: Allocator> Clone for $name<T, C, A> {
            fn clone(&self) -> Self {
                Self {
                    tree: self.tree.clone(),
                }
            }
        }

        impl<T: fmt::Debug, C: Compare<T>, A: Allocator> fmt::Debug for $name<T, C, A> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_set().entries(self.iter()).finish()
            }
        }

        impl<T: PartialEq, C: Compare<T>, A: Allocator> PartialEq for $name<T, C, A> {
            fn eq(&self, other: &Self) -> bool {
                self.tree == other.tree
            }
        }

        impl<T: Eq, C: Compare<T>, A: Allocator> Eq for $name<T, C, A> {}

        impl<T: PartialOrd, C: Compare<T>, A: Allocator> PartialOrd for $name<T, C, A> {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                self.tree.partial_cmp(&other.tree)
            }
        }

        impl<T: Ord, C: Compare<T>, A: Allocator> Ord for $name<T, C, A> {
            fn cmp(&self, other: &Self) -> Ordering {
                self.tree.cmp(&other.tree)
            }
        }

        impl<T: Hash, C: Compare<T>, A: Allocator> Hash for $name<T, C, A> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.tree.hash(state);
            }
        }

        impl<T, C: Compare<T> + Default, A: Allocator> FromIterator<T> for $name<T, C, A> {
            fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
                let mut set = Self::new_in(C::default(), A::default());
                set.extend(iter);
                set
            }
        }

        impl<'a, T, C: Compare<T>, A: Allocator> IntoIterator for &'a $name<T, C, A> {
            type Item = &'a T;
            type IntoIter = Iter<'a, T>;

            fn into_iter(self) -> Iter<'a, T> {
                self.iter()
            }
        }

        impl<T, C: Compare<T>, A: Allocator> IntoIterator for $name<T, C, A> {
            type Item = T;
            type IntoIter = IntoIter<T, C, A>;

            fn into_iter(self) -> IntoIter<T, C, A> {
                self.tree.into_iter()
            }
        }
    };
}

// =============================================================================
// Set
// =============================================================================

/// Ordered set of unique elements.
pub struct Set<T, C = Less, A: Allocator = PoolAllocator> {
    tree: Tree<T, C, A>,
}

shared_set_api!(Set);

impl<T, C: Compare<T>, A: Allocator> Set<T, C, A> {
    /// Insert `value` unless an equivalent element exists. Returns whether
    /// it was inserted.
    #[inline]
    pub fn insert(&mut self, value: T) -> bool {
        self.tree.insert_unique(value).1
    }

    /// Fallible [`Set::insert`].
    #[inline]
    pub fn try_insert(&mut self, value: T) -> Result<bool, Error> {
        Ok(self.tree.try_insert_unique(value)?.1)
    }

    /// Remove the element equivalent to `value`. Returns whether one was
    /// present.
    #[inline]
    pub fn remove(&mut self, value: &T) -> bool {
        self.tree.remove(value).is_some()
    }

    /// Remove and return the element equivalent to `value`.
    #[inline]
    pub fn take(&mut self, value: &T) -> Option<T> {
        self.tree.remove(value)
    }

    /// Keep only the elements for which `f` returns `true`.
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut f: F) {
        let mut c = self.tree.cursor_mut_begin();
        while let Some(v) = c.get() {
            if f(v) {
                c.move_next();
            } else {
                drop(c.remove_current());
            }
        }
    }
}

impl<T, C: Compare<T>, A: Allocator> Extend<T> for Set<T, C, A> {
    /// Elements already present are kept. Sorted input costs O(1)
    /// comparisons per element.
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let mut c = self.tree.cursor_mut_end();
        for value in iter {
            c.insert_unique(value);
            c.move_next();
        }
    }
}

// =============================================================================
// MultiSet
// =============================================================================

/// Ordered set that keeps equivalent elements, in arrival order.
pub struct MultiSet<T, C = Less, A: Allocator = PoolAllocator> {
    tree: Tree<T, C, A>,
}

shared_set_api!(MultiSet);

impl<T, C: Compare<T>, A: Allocator> MultiSet<T, C, A> {
    /// Insert `value` after any equivalent elements.
    #[inline]
    pub fn insert(&mut self, value: T) -> Cursor<'_, T> {
        self.tree.insert_equal(value)
    }

    /// Fallible [`MultiSet::insert`].
    #[inline]
    pub fn try_insert(&mut self, value: T) -> Result<Cursor<'_, T>, Error> {
        self.tree.try_insert_equal(value)
    }

    /// Number of elements equivalent to `value`.
    #[inline]
    pub fn count(&self, value: &T) -> usize {
        self.tree.count(value)
    }

    /// Every element equivalent to `value`, in arrival order.
    #[inline]
    pub fn equal_range(&self, value: &T) -> Range<'_, T> {
        self.tree
            .range((Bound::Included(value), Bound::Included(value)))
    }

    /// Remove the first element equivalent to `value`.
    #[inline]
    pub fn remove_one(&mut self, value: &T) -> Option<T> {
        self.tree.remove(value)
    }

    /// Remove every element equivalent to `value`; returns how many.
    #[inline]
    pub fn remove_all(&mut self, value: &T) -> usize {
        self.tree.erase_key(value)
    }
}

impl<T, C: Compare<T>, A: Allocator> Extend<T> for MultiSet<T, C, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.tree.insert_equal(value);
        }
    }
}
