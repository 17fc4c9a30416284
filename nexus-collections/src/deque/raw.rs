//! Segmented position arithmetic.
//!
//! A position is a `(node, idx)` pair: `node` points at a slot of the map (an
//! array of buffer pointers) and `idx` is the offset inside that buffer.
//! Positions are always normalized so that `idx < buffer_len::<T>()`.

use std::mem;

/// Bytes per deque buffer.
pub const DEQUE_BUF_BYTES: usize = 512;

/// Minimum number of map slots.
pub(crate) const INITIAL_MAP_SIZE: usize = 8;

/// Elements per buffer for `T`: `max(1, 512 / size_of::<T>())`.
///
/// Zero-sized types use 512 slots per (dangling) buffer.
#[inline]
pub const fn buffer_len<T>() -> usize {
    let size = mem::size_of::<T>();
    if size == 0 {
        DEQUE_BUF_BYTES
    } else if size < DEQUE_BUF_BYTES {
        DEQUE_BUF_BYTES / size
    } else {
        1
    }
}

pub(crate) struct RawPos<T> {
    pub(crate) node: *mut *mut T,
    pub(crate) idx: usize,
}

impl<T> Clone for RawPos<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RawPos<T> {}

impl<T> PartialEq for RawPos<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.idx == other.idx
    }
}

impl<T> Eq for RawPos<T> {}

impl<T> std::fmt::Debug for RawPos<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawPos")
            .field("node", &self.node)
            .field("idx", &self.idx)
            .finish()
    }
}

impl<T> RawPos<T> {
    const N: usize = buffer_len::<T>();

    #[inline]
    pub(crate) const fn null() -> Self {
        Self {
            node: std::ptr::null_mut(),
            idx: 0,
        }
    }

    #[inline]
    pub(crate) fn new(node: *mut *mut T, idx: usize) -> Self {
        debug_assert!(idx < Self::N);
        Self { node, idx }
    }

    /// Address of the slot.
    ///
    /// # Safety
    ///
    /// `node` must point at a map slot holding a live buffer.
    #[inline]
    pub(crate) unsafe fn ptr(self) -> *mut T {
        unsafe { (*self.node).add(self.idx) }
    }

    #[inline]
    pub(crate) fn inc(&mut self) {
        self.idx += 1;
        if self.idx == Self::N {
            self.node = self.node.wrapping_add(1);
            self.idx = 0;
        }
    }

    #[inline]
    pub(crate) fn dec(&mut self) {
        if self.idx == 0 {
            self.node = self.node.wrapping_sub(1);
            self.idx = Self::N - 1;
        } else {
            self.idx -= 1;
        }
    }

    /// Position `n` slots away, crossing buffers as needed.
    #[inline]
    pub(crate) fn offset(self, n: isize) -> Self {
        let n_buf = Self::N as isize;
        let off = self.idx as isize + n;
        if (0..n_buf).contains(&off) {
            return Self {
                node: self.node,
                idx: off as usize,
            };
        }
        let node_off = if off > 0 {
            off / n_buf
        } else {
            -((-off - 1) / n_buf) - 1
        };
        Self {
            node: self.node.wrapping_offset(node_off),
            idx: (off - node_off * n_buf) as usize,
        }
    }

    /// Signed number of slots from `origin` to `self`.
    #[inline]
    pub(crate) fn distance_from(self, origin: Self) -> isize {
        let nodes = (self.node as isize - origin.node as isize)
            / mem::size_of::<*mut T>() as isize;
        Self::N as isize * nodes + self.idx as isize - origin.idx as isize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_lengths() {
        assert_eq!(buffer_len::<u8>(), 512);
        assert_eq!(buffer_len::<u64>(), 64);
        assert_eq!(buffer_len::<[u8; 100]>(), 5);
        assert_eq!(buffer_len::<[u8; 512]>(), 1);
        assert_eq!(buffer_len::<[u8; 4096]>(), 1);
        assert_eq!(buffer_len::<()>(), 512);
    }

    fn fake_map() -> Vec<*mut u64> {
        vec![std::ptr::null_mut(); 16]
    }

    #[test]
    fn inc_dec_cross_buffers() {
        let mut map = fake_map();
        let base = map.as_mut_ptr();
        let mut p = RawPos::<u64>::new(base.wrapping_add(2), 63);
        p.inc();
        assert_eq!(p, RawPos::new(base.wrapping_add(3), 0));
        p.dec();
        assert_eq!(p, RawPos::new(base.wrapping_add(2), 63));
    }

    #[test]
    fn offset_matches_repeated_steps() {
        let mut map = fake_map();
        let base = map.as_mut_ptr();
        let origin = RawPos::<u64>::new(base.wrapping_add(8), 10);

        for n in [-300isize, -75, -64, -11, -10, -1, 0, 1, 53, 54, 64, 200] {
            let jumped = origin.offset(n);
            let mut walked = origin;
            if n >= 0 {
                (0..n).for_each(|_| walked.inc());
            } else {
                (0..-n).for_each(|_| walked.dec());
            }
            assert!(jumped == walked, "offset {n} disagrees with stepping");
            assert_eq!(jumped.distance_from(origin), n);
        }
    }
}
