//! Ordering and key-extraction policies for the ordered containers.
//!
//! A [`Compare`] is a strict weak ordering expressed as "less than". Two
//! values are *equivalent* when neither is less than the other; ordered
//! containers never consult `PartialEq`.
//!
//! A [`KeyOf`] projects a stored value onto the key the tree orders by: sets
//! store the key itself ([`Identity`]), maps store `(key, mapped)` pairs
//! ([`First`]).

/// Strict weak ordering over `T`.
pub trait Compare<T: ?Sized> {
    /// `true` if `a` orders strictly before `b`.
    fn less(&self, a: &T, b: &T) -> bool;

    /// `true` if neither value orders before the other.
    #[inline]
    fn equivalent(&self, a: &T, b: &T) -> bool {
        !self.less(a, b) && !self.less(b, a)
    }
}

/// Ascending order through [`Ord`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Less;

impl<T: Ord + ?Sized> Compare<T> for Less {
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        a < b
    }
}

/// Descending order through [`Ord`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Greater;

impl<T: Ord + ?Sized> Compare<T> for Greater {
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        b < a
    }
}

/// Ordering given by a `less` closure.
///
/// ```
/// use nexus_collections::compare::{Compare, CompareBy};
///
/// let by_len = CompareBy(|a: &&str, b: &&str| a.len() < b.len());
/// assert!(by_len.less(&"ab", &"abc"));
/// assert!(by_len.equivalent(&"ab", &"xy"));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct CompareBy<F>(pub F);

impl<T: ?Sized, F> Compare<T> for CompareBy<F>
where
    F: Fn(&T, &T) -> bool,
{
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        (self.0)(a, b)
    }
}

/// Projection from a stored value to its ordering key.
pub trait KeyOf<V, K> {
    /// The key of `value`.
    fn key(value: &V) -> &K;
}

/// The value is its own key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Identity;

impl<V> KeyOf<V, V> for Identity {
    #[inline]
    fn key(value: &V) -> &V {
        value
    }
}

/// The key is the first field of a pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct First;

impl<K, T> KeyOf<(K, T), K> for First {
    #[inline]
    fn key(value: &(K, T)) -> &K {
        &value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn less_and_greater() {
        assert!(Less.less(&1, &2));
        assert!(!Less.less(&2, &2));
        assert!(Greater.less(&3, &2));
        assert!(Less.equivalent(&4, &4));
        assert!(Less.less("abc", "abd"));
    }

    #[test]
    fn closure_ordering() {
        let by_abs = CompareBy(|a: &i32, b: &i32| a.abs() < b.abs());
        assert!(by_abs.less(&1, &-2));
        assert!(by_abs.equivalent(&-3, &3));
    }

    #[test]
    fn key_projections() {
        assert_eq!(*Identity::key(&7), 7);
        assert_eq!(*First::key(&("k", 1)), "k");
    }
}
