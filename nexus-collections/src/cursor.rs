//! Position protocol shared by container cursors and raw pointers.
//!
//! A [`Position`] names a slot in a sequence. Its [`Category`] says which
//! movements are cheap: forward positions only step ahead, bidirectional
//! positions also step back, random-access positions jump in O(1).
//!
//! Generic algorithms call [`distance`] and [`advance`], which resolve to the
//! best implementation for the position type: random-access implementors
//! override the linear defaults with pointer arithmetic.
//!
//! ```
//! use nexus_collections::cursor::{Category, Position, advance, distance};
//!
//! let data = [10, 20, 30, 40];
//! let first = data.as_ptr();
//! let last = unsafe { first.add(data.len()) };
//! assert_eq!(distance(&first, &last), 4);
//!
//! let mut p = first;
//! advance(&mut p, 2);
//! assert_eq!(unsafe { *p }, 30);
//! assert!(<*const i32 as Position>::CATEGORY.refines(Category::Bidirectional));
//! ```

/// Movement capability of a position type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Single pass, read only.
    Input,
    /// Single pass, write only.
    Output,
    /// Multi pass, forward steps.
    Forward,
    /// Forward and backward steps.
    Bidirectional,
    /// Constant-time jumps and distances.
    RandomAccess,
}

impl Category {
    /// `true` if a position of category `self` can be used wherever `other`
    /// is required.
    ///
    /// Input, forward, bidirectional and random-access form a chain. Output
    /// stands alone and only refines itself.
    pub const fn refines(self, other: Category) -> bool {
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) => a >= b,
            (None, None) => true,
            _ => false,
        }
    }

    const fn rank(self) -> Option<u8> {
        match self {
            Category::Input => Some(0),
            Category::Forward => Some(1),
            Category::Bidirectional => Some(2),
            Category::RandomAccess => Some(3),
            Category::Output => None,
        }
    }
}

/// A slot in a sequence.
///
/// Two positions compare equal when they name the same slot. The distance
/// type is `isize`.
pub trait Position: Clone + PartialEq {
    /// Movement capability.
    const CATEGORY: Category;

    /// Element type.
    type Value;

    /// Move to the next slot.
    fn step(&mut self);

    /// Address of the element at this slot.
    ///
    /// For past-the-end positions the pointer must not be dereferenced.
    fn as_ptr(&self) -> *const Self::Value;

    /// Number of steps from `self` to `last`.
    ///
    /// The default walks forward; `last` must be reachable from `self`.
    fn distance_to(&self, last: &Self) -> isize {
        let mut p = self.clone();
        let mut n = 0;
        while p != *last {
            p.step();
            n += 1;
        }
        n
    }

    /// Move `n` slots.
    ///
    /// The default steps forward one slot at a time.
    ///
    /// # Panics
    ///
    /// The default panics on negative `n`. Bidirectional implementors accept it.
    fn advance_by(&mut self, n: isize) {
        assert!(n >= 0, "cannot move a forward position backwards");
        for _ in 0..n {
            self.step();
        }
    }
}

/// A position that can also step backwards.
pub trait BidirectionalPosition: Position {
    /// Move to the previous slot.
    fn step_back(&mut self);
}

/// A position supporting constant-time jumps.
pub trait RandomAccessPosition: BidirectionalPosition {
    /// Move by `n` slots in either direction in O(1).
    fn jump(&mut self, n: isize);

    /// Signed distance from `origin` to `self` in O(1).
    fn distance_from(&self, origin: &Self) -> isize;
}

/// Number of steps from `first` to `last`.
#[inline]
pub fn distance<P: Position>(first: &P, last: &P) -> isize {
    first.distance_to(last)
}

/// Move `p` by `n` slots.
#[inline]
pub fn advance<P: Position>(p: &mut P, n: isize) {
    p.advance_by(n);
}

/// Move `p` backwards through the bidirectional step, independent of the
/// sign handling of [`Position::advance_by`].
#[inline]
pub fn retreat<P: BidirectionalPosition>(p: &mut P, n: usize) {
    for _ in 0..n {
        p.step_back();
    }
}

// =============================================================================
// Raw pointers
// =============================================================================

macro_rules! pointer_position {
    ($ptr:ty) => {
        impl<T> Position for $ptr {
            const CATEGORY: Category = Category::RandomAccess;
            type Value = T;

            #[inline]
            fn step(&mut self) {
                *self = self.wrapping_add(1);
            }

            #[inline]
            fn as_ptr(&self) -> *const T {
                *self as *const T
            }

            #[inline]
            fn distance_to(&self, last: &Self) -> isize {
                last.distance_from(self)
            }

            #[inline]
            fn advance_by(&mut self, n: isize) {
                self.jump(n);
            }
        }

        impl<T> BidirectionalPosition for $ptr {
            #[inline]
            fn step_back(&mut self) {
                *self = self.wrapping_sub(1);
            }
        }

        impl<T> RandomAccessPosition for $ptr {
            #[inline]
            fn jump(&mut self, n: isize) {
                *self = self.wrapping_offset(n);
            }

            #[inline]
            fn distance_from(&self, origin: &Self) -> isize {
                let size = std::mem::size_of::<T>().max(1) as isize;
                (*self as isize - *origin as isize) / size
            }
        }
    };
}

pointer_position!(*const T);
pointer_position!(*mut T);

#[cfg(test)]
mod tests {
    use super::*;

    /// Forward-only position over a slice, to exercise the linear defaults.
    #[derive(Clone, PartialEq)]
    struct Walker<'a> {
        data: &'a [u32],
        idx: usize,
    }

    impl Position for Walker<'_> {
        const CATEGORY: Category = Category::Forward;
        type Value = u32;

        fn step(&mut self) {
            self.idx += 1;
        }

        fn as_ptr(&self) -> *const u32 {
            self.data.as_ptr().wrapping_add(self.idx)
        }
    }

    #[test]
    fn category_lattice() {
        use Category::*;
        assert!(RandomAccess.refines(Input));
        assert!(RandomAccess.refines(Bidirectional));
        assert!(Bidirectional.refines(Forward));
        assert!(Forward.refines(Input));
        assert!(Input.refines(Input));
        assert!(!Forward.refines(Bidirectional));
        assert!(!Input.refines(Forward));
        assert!(Output.refines(Output));
        assert!(!Output.refines(Input));
        assert!(!RandomAccess.refines(Output));
    }

    #[test]
    fn pointer_distance_and_advance() {
        let data = [1u64, 2, 3, 4, 5];
        let first = data.as_ptr();
        let last = first.wrapping_add(5);
        assert_eq!(distance(&first, &last), 5);
        assert_eq!(distance(&last, &first), -5);

        let mut p = first;
        advance(&mut p, 3);
        assert_eq!(unsafe { *p }, 4);
        advance(&mut p, -2);
        assert_eq!(unsafe { *p }, 2);
        retreat(&mut p, 1);
        assert_eq!(p, first);
    }

    #[test]
    fn mut_pointer_is_random_access() {
        let mut data = [0u8; 8];
        let first = data.as_mut_ptr();
        let mut p = first;
        p.jump(6);
        assert_eq!(p.distance_from(&first), 6);
        assert_eq!(<*mut u8 as Position>::CATEGORY, Category::RandomAccess);
    }

    #[test]
    fn zero_sized_pointer_distance() {
        let data = [(); 4];
        let first = data.as_ptr();
        assert_eq!(distance(&first, &first), 0);
    }

    #[test]
    fn linear_defaults() {
        let data = [5, 6, 7, 8];
        let first = Walker {
            data: &data,
            idx: 0,
        };
        let last = Walker {
            data: &data,
            idx: 4,
        };
        assert_eq!(distance(&first, &last), 4);

        let mut p = first.clone();
        advance(&mut p, 2);
        assert_eq!(unsafe { *p.as_ptr() }, 7);
    }

    #[test]
    #[should_panic(expected = "backwards")]
    fn forward_position_rejects_negative_advance() {
        let data = [1];
        let mut p = Walker {
            data: &data,
            idx: 0,
        };
        advance(&mut p, -1);
    }
}
