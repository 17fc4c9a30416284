//! LIFO and FIFO adapters over the sequence containers.
//!
//! [`Stack`] needs only back access ([`SequenceBack`]); [`Queue`] also needs
//! to pop from the front ([`SequenceFront`]). [`Vector`], [`Deque`] and
//! [`List`] implement both traits where they can; the default container for
//! each adapter is a [`Deque`].
//!
//! ```
//! use nexus_collections::{Queue, Stack, Vector};
//!
//! let mut undo: Stack<u32, Vector<u32>> = Stack::new();
//! undo.push(1);
//! undo.push(2);
//! assert_eq!(undo.pop(), Some(2));
//!
//! let mut jobs: Queue<&str> = Queue::new();
//! jobs.push("parse");
//! jobs.push("link");
//! assert_eq!(jobs.pop(), Some("parse"));
//! assert_eq!(jobs.back(), Some(&"link"));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use nexus_alloc::Allocator;

use crate::{Deque, Error, List, Vector};

// =============================================================================
// Container traits
// =============================================================================

/// A sequence that grows and shrinks at the back.
pub trait SequenceBack {
    /// Element type.
    type Item;

    /// Number of elements.
    fn len(&self) -> usize;

    /// `true` if there are no elements.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last element.
    fn back(&self) -> Option<&Self::Item>;

    /// Last element, mutably.
    fn back_mut(&mut self) -> Option<&mut Self::Item>;

    /// Append `value`, aborting on allocation failure.
    fn push_back(&mut self, value: Self::Item);

    /// Append `value`, reporting allocation failure.
    fn try_push_back(&mut self, value: Self::Item) -> Result<(), Error>;

    /// Remove the last element.
    fn pop_back(&mut self) -> Option<Self::Item>;
}

/// A [`SequenceBack`] that can also be read and popped at the front.
pub trait SequenceFront: SequenceBack {
    /// First element.
    fn front(&self) -> Option<&Self::Item>;

    /// First element, mutably.
    fn front_mut(&mut self) -> Option<&mut Self::Item>;

    /// Remove the first element.
    fn pop_front(&mut self) -> Option<Self::Item>;
}

macro_rules! impl_sequence_back {
    ($ty:ident) => {
        impl<T, A: Allocator> SequenceBack for $ty<T, A> {
            type Item = T;

            #[inline]
            fn len(&self) -> usize {
                $ty::len(self)
            }

            #[inline]
            fn back(&self) -> Option<&T> {
                $ty::back(self)
            }

            #[inline]
            fn back_mut(&mut self) -> Option<&mut T> {
                $ty::back_mut(self)
            }

            #[inline]
            fn push_back(&mut self, value: T) {
                $ty::push_back(self, value);
            }

            #[inline]
            fn try_push_back(&mut self, value: T) -> Result<(), Error> {
                $ty::try_push_back(self, value)
            }

            #[inline]
            fn pop_back(&mut self) -> Option<T> {
                $ty::pop_back(self)
            }
        }
    };
}

macro_rules! impl_sequence_front {
    ($ty:ident) => {
        impl<T, A: Allocator> SequenceFront for $ty<T, A> {
            #[inline]
            fn front(&self) -> Option<&T> {
                $ty::front(self)
            }

            #[inline]
            fn front_mut(&mut self) -> Option<&mut T> {
                $ty::front_mut(self)
            }

            #[inline]
            fn pop_front(&mut self) -> Option<T> {
                $ty::pop_front(self)
            }
        }
    };
}

impl_sequence_back!(Vector);
impl_sequence_back!(Deque);
impl_sequence_back!(List);
impl_sequence_front!(Deque);
impl_sequence_front!(List);

// =============================================================================
// Stack
// =============================================================================

/// Last-in first-out adapter.
pub struct Stack<T, C: SequenceBack<Item = T> = Deque<T>> {
    c: C,
}

impl<T, C: SequenceBack<Item = T> + Default> Stack<T, C> {
    /// Creates an empty stack.
    #[inline]
    pub fn new() -> Self {
        Self { c: C::default() }
    }
}

impl<T, C: SequenceBack<Item = T>> Stack<T, C> {
    /// Wraps an existing container; its back becomes the top.
    #[inline]
    pub fn from_container(c: C) -> Self {
        Self { c }
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

    /// Most recently pushed element.
    #[inline]
    pub fn top(&self) -> Option<&T> {
        self.c.back()
    }

    /// Most recently pushed element, mutably.
    #[inline]
    pub fn top_mut(&mut self) -> Option<&mut T> {
        self.c.back_mut()
    }

    /// Push `value` on top.
    #[inline]
    pub fn push(&mut self, value: T) {
        self.c.push_back(value);
    }

    /// Fallible [`Stack::push`].
    #[inline]
    pub fn try_push(&mut self, value: T) -> Result<(), Error> {
        self.c.try_push_back(value)
    }

    /// Remove the top element.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.c.pop_back()
    }

    /// Exchange contents with `other`.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.c, &mut other.c);
    }

    /// The underlying container, bottom first.
    #[inline]
    pub fn as_container(&self) -> &C {
        &self.c
    }

    /// Unwraps the underlying container.
    #[inline]
    pub fn into_container(self) -> C {
        self.c
    }
}

// =============================================================================
// Queue
// =============================================================================

/// First-in first-out adapter.
pub struct Queue<T, C: SequenceFront<Item = T> = Deque<T>> {
    c: C,
}

impl<T, C: SequenceFront<Item = T> + Default> Queue<T, C> {
    /// Creates an empty queue.
    #[inline]
    pub fn new() -> Self {
        Self { c: C::default() }
    }
}

impl<T, C: SequenceFront<Item = T>> Queue<T, C> {
    /// Wraps an existing container; its front is the next element out.
    #[inline]
    pub fn from_container(c: C) -> Self {
        Self { c }
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

    /// Oldest element.
    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.c.front()
    }

    /// Oldest element, mutably.
    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.c.front_mut()
    }

    /// Newest element.
    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.c.back()
    }

    /// Newest element, mutably.
    #[inline]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.c.back_mut()
    }

    /// Enqueue `value`.
    #[inline]
    pub fn push(&mut self, value: T) {
        self.c.push_back(value);
    }

    /// Fallible [`Queue::push`].
    #[inline]
    pub fn try_push(&mut self, value: T) -> Result<(), Error> {
        self.c.try_push_back(value)
    }

    /// Dequeue the oldest element.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.c.pop_front()
    }

    /// Exchange contents with `other`.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.c, &mut other.c);
    }

    /// The underlying container, front first.
    #[inline]
    pub fn as_container(&self) -> &C {
        &self.c
    }

    /// Unwraps the underlying container.
    #[inline]
    pub fn into_container(self) -> C {
        self.c
    }
}

// =============================================================================
// Shared traits
// =============================================================================

macro_rules! adapter_traits {
    ($name:ident, $bound:ident) => {
        impl<T, C: $bound<Item = T> + Default> Default for $name<T, C> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<T, C: $bound<Item = T> + Clone> Clone for $name<T, C> {
            fn clone(&self) -> Self {
                Self { c: self.c.clone() }
            }
        }

        impl<T, C: $bound<Item = T> + fmt::Debug> fmt::Debug for $name<T, C> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name)).field("c", &self.c).finish()
            }
        }

        impl<T, C: $bound<Item = T> + PartialEq> PartialEq for $name<T, C> {
            fn eq(&self, other: &Self) -> bool {
                self.c == other.c
            }
        }

        impl<T, C: $bound<Item = T> + Eq> Eq for $name<T, C> {}

        impl<T, C: $bound<Item = T> + PartialOrd> PartialOrd for $name<T, C> {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                self.c.partial_cmp(&other.c)
            }
        }

        impl<T, C: $bound<Item = T> + Ord> Ord for $name<T, C> {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.c.cmp(&other.c)
            }
        }

        impl<T, C: $bound<Item = T> + Hash> Hash for $name<T, C> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.c.hash(state);
            }
        }

        impl<T, C: $bound<Item = T>> Extend<T> for $name<T, C> {
            fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
                for value in iter {
                    self.push(value);
                }
            }
        }

        impl<T, C: $bound<Item = T> + Default> FromIterator<T> for $name<T, C> {
            fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
                let mut adapter = Self::new();
                adapter.extend(iter);
                adapter
            }
        }
    };
}

adapter_traits!(Stack, SequenceBack);
adapter_traits!(Queue, SequenceFront);
