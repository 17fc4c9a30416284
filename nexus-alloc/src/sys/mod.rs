//! System-heap access for arena chunks and large blocks (internal).

use std::alloc::{Layout, alloc, dealloc};
use std::ptr::NonNull;

use crate::AllocError;
use crate::meta::MAX_ALIGN;

/// An arena chunk obtained from the system heap.
///
/// The chunk over-allocates by `MAX_ALIGN` bytes and rounds the returned
/// address up, so both the raw pointer (what gets freed) and the aligned
/// pointer (what gets carved) are recorded. Memory is freed when dropped.
pub(crate) struct Chunk {
    raw: NonNull<u8>,
    layout: Layout,
    aligned: NonNull<u8>,
    size: usize,
}

impl Chunk {
    /// Allocate a chunk with at least `size` usable bytes aligned to `MAX_ALIGN`.
    pub(crate) fn alloc(size: usize) -> Result<Self, AllocError> {
        assert!(size > 0, "chunk size must be non-zero");

        let total = size
            .checked_add(MAX_ALIGN)
            .ok_or(AllocError { bytes: size })?;
        let layout = Layout::from_size_align(total, 1).map_err(|_| AllocError { bytes: total })?;

        let raw = unsafe { alloc(layout) };
        let raw = NonNull::new(raw).ok_or(AllocError { bytes: total })?;

        let offset = raw.as_ptr().align_offset(MAX_ALIGN);
        debug_assert!(offset < MAX_ALIGN);
        // SAFETY: offset < MAX_ALIGN, so the aligned pointer stays inside the block
        let aligned = unsafe { NonNull::new_unchecked(raw.as_ptr().add(offset)) };

        Ok(Chunk {
            raw,
            layout,
            aligned,
            size,
        })
    }

    /// Returns the aligned start of the usable region.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.aligned.as_ptr()
    }

    /// Usable bytes starting at [`Chunk::as_ptr`].
    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.size
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        unsafe { dealloc(self.raw.as_ptr(), self.layout) }
    }
}

/// Allocate a block that bypasses the pool.
pub(crate) fn alloc_large(bytes: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
    let layout = large_layout(bytes, align)?;
    let ptr = unsafe { alloc(layout) };
    NonNull::new(ptr).ok_or(AllocError { bytes })
}

/// # Safety
/// `ptr`, `bytes` and `align` must match a previous [`alloc_large`] call.
pub(crate) unsafe fn free_large(ptr: NonNull<u8>, bytes: usize, align: usize) {
    // SAFETY: the same layout was validated when the block was allocated
    let layout = unsafe { Layout::from_size_align_unchecked(bytes, align.max(MAX_ALIGN)) };
    unsafe { dealloc(ptr.as_ptr(), layout) }
}

#[inline]
fn large_layout(bytes: usize, align: usize) -> Result<Layout, AllocError> {
    Layout::from_size_align(bytes, align.max(MAX_ALIGN)).map_err(|_| AllocError { bytes })
}
