//! Segregated free-list pool backed by arena chunks.

use std::ptr::{self, NonNull};

use crate::AllocError;
use crate::meta::{
    self, BLOCK_UNIT, FreeBlock, MAX_CLASSES, Route, class_index, class_size,
};
use crate::sys::{self, Chunk};

/// Default upper bound (inclusive) on pooled request sizes.
pub const DEFAULT_MAX_BYTES: usize = 256;

/// Default arena chunk size.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

// =============================================================================
// Errors
// =============================================================================

/// Error during pool construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// `max_bytes` is zero.
    ZeroMaxBytes,
    /// `max_bytes` is not a multiple of the block unit.
    UnalignedMaxBytes { max_bytes: usize },
    /// `max_bytes` needs more size classes than a pool supports.
    TooManyClasses { classes: usize },
    /// `block_size` is smaller than `max_bytes` or not a multiple of the block unit.
    BlockTooSmall { block_size: usize, max_bytes: usize },
}

impl std::fmt::Display for PoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolError::ZeroMaxBytes => write!(f, "max_bytes cannot be zero"),
            PoolError::UnalignedMaxBytes { max_bytes } => {
                write!(f, "max_bytes ({max_bytes}) is not a multiple of {BLOCK_UNIT}")
            }
            PoolError::TooManyClasses { classes } => {
                write!(f, "{classes} size classes exceed the limit of {MAX_CLASSES}")
            }
            PoolError::BlockTooSmall {
                block_size,
                max_bytes,
            } => write!(
                f,
                "block size ({block_size}) must be a multiple of {BLOCK_UNIT} and at least max_bytes ({max_bytes})"
            ),
        }
    }
}

impl std::error::Error for PoolError {}

// =============================================================================
// Builder
// =============================================================================

/// Builder for a [`Pool`].
///
/// ```
/// use nexus_alloc::PoolBuilder;
///
/// let pool = PoolBuilder::default()
///     .max_bytes(128)
///     .block_size(8192)
///     .build()
///     .unwrap();
/// assert_eq!(pool.class_count(), 8);
/// ```
#[derive(Clone, Debug)]
pub struct PoolBuilder {
    max_bytes: usize,
    block_size: usize,
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl PoolBuilder {
    /// Largest request (in bytes) served from the free lists. Default: 256.
    ///
    /// Must be a multiple of [`BLOCK_UNIT`]; one size class is created per unit.
    pub fn max_bytes(mut self, bytes: usize) -> Self {
        self.max_bytes = bytes;
        self
    }

    /// Size of each arena chunk in bytes. Default: 4096.
    pub fn block_size(mut self, bytes: usize) -> Self {
        self.block_size = bytes;
        self
    }

    /// Build an empty pool. No memory is acquired until the first allocation.
    pub fn build(self) -> Result<Pool, PoolError> {
        if self.max_bytes == 0 {
            return Err(PoolError::ZeroMaxBytes);
        }
        if self.max_bytes % BLOCK_UNIT != 0 {
            return Err(PoolError::UnalignedMaxBytes {
                max_bytes: self.max_bytes,
            });
        }

        let classes = self.max_bytes / BLOCK_UNIT;
        if classes > MAX_CLASSES {
            return Err(PoolError::TooManyClasses { classes });
        }

        if self.block_size < self.max_bytes || self.block_size % BLOCK_UNIT != 0 {
            return Err(PoolError::BlockTooSmall {
                block_size: self.block_size,
                max_bytes: self.max_bytes,
            });
        }

        Ok(Pool {
            free: vec![ptr::null_mut(); classes].into_boxed_slice(),
            chunks: Vec::new(),
            cursor: ptr::null_mut(),
            remaining: 0,
            max_bytes: self.max_bytes,
            block_size: self.block_size,
            stats: PoolStats::default(),
        })
    }
}

// =============================================================================
// Pool
// =============================================================================

/// Counters describing where a pool's requests were served from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Arena chunks acquired from the system.
    pub chunks: usize,
    /// Small requests served by popping a free list.
    pub reused: usize,
    /// Small requests served by bumping the current chunk.
    pub bumped: usize,
    /// Requests routed to the system heap.
    pub large: usize,
}

/// Memory pool with segregated size classes.
///
/// Requests up to `max_bytes` are rounded to a multiple of [`BLOCK_UNIT`] and
/// served from the matching free list, falling back to bump allocation from
/// the current arena chunk, and finally to a fresh chunk. Larger or
/// over-aligned requests go straight to the system heap, and so do their
/// deallocations: the route is a pure function of `(bytes, align)`.
///
/// Chunk memory is only returned to the system when the pool is dropped.
///
/// ```
/// use nexus_alloc::Pool;
///
/// let mut pool = Pool::new();
/// let block = pool.allocate(24, 8).unwrap();
/// unsafe { pool.deallocate(block, 24, 8) };
///
/// // Same size class: the block comes straight back off the free list.
/// let again = pool.allocate(32, 8).unwrap();
/// assert_eq!(block, again);
/// # unsafe { pool.deallocate(again, 32, 8) };
/// ```
pub struct Pool {
    // One free-list head per size class
    free: Box<[*mut FreeBlock]>,

    // Arena chunks, released on drop
    chunks: Vec<Chunk>,

    // Bump region inside the newest chunk
    cursor: *mut u8,
    remaining: usize,

    // Config
    max_bytes: usize,
    block_size: usize,

    stats: PoolStats,
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    /// Create a pool with the default geometry (16 classes, 4 KiB chunks).
    pub fn new() -> Self {
        Self {
            free: vec![ptr::null_mut(); DEFAULT_MAX_BYTES / BLOCK_UNIT].into_boxed_slice(),
            chunks: Vec::new(),
            cursor: ptr::null_mut(),
            remaining: 0,
            max_bytes: DEFAULT_MAX_BYTES,
            block_size: DEFAULT_BLOCK_SIZE,
            stats: PoolStats::default(),
        }
    }

    /// Allocate `bytes` bytes aligned to `align`.
    ///
    /// Zero-byte requests return a dangling, well-aligned pointer without
    /// touching any state.
    ///
    /// # Allocation Strategy
    ///
    /// 1. Pop the size class free list
    /// 2. Bump from the current chunk
    /// 3. Spill the chunk residue onto its free list, grow a new chunk, bump
    ///
    /// Requests above `max_bytes` (or above [`MAX_ALIGN`](crate::MAX_ALIGN)) use the system heap.
    pub fn allocate(&mut self, bytes: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(align.is_power_of_two());

        match meta::classify(bytes, align, self.max_bytes) {
            Route::Zero => Ok(dangling(align)),
            Route::Small(class) => self.allocate_small(class),
            Route::Large => {
                log::trace!("pool: {bytes} bytes (align {align}) routed to system heap");
                self.stats.large += 1;
                sys::alloc_large(bytes, align)
            }
        }
    }

    /// Return a block to the pool.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`Pool::allocate`] on this pool with the same
    /// `bytes` and `align`, and must not be used afterwards.
    pub unsafe fn deallocate(&mut self, ptr: NonNull<u8>, bytes: usize, align: usize) {
        match meta::classify(bytes, align, self.max_bytes) {
            Route::Zero => {}
            Route::Small(class) => unsafe { meta::push_free(&mut self.free[class], ptr.as_ptr()) },
            Route::Large => unsafe { sys::free_large(ptr, bytes, align) },
        }
    }

    /// Number of size classes.
    #[inline]
    pub fn class_count(&self) -> usize {
        self.free.len()
    }

    /// Largest pooled request size.
    #[inline]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Arena chunk size.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of arena chunks acquired so far.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Unused bytes left in the current chunk.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Allocation counters.
    #[inline]
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Size class that serves a request of `bytes`, if it is pooled.
    #[inline]
    pub fn size_class(&self, bytes: usize) -> Option<usize> {
        match meta::classify(bytes, 1, self.max_bytes) {
            Route::Small(class) => Some(class),
            Route::Zero | Route::Large => None,
        }
    }

    /// Number of blocks on the free list of `class`. O(n) walk.
    ///
    /// # Panics
    ///
    /// Panics if `class >= class_count()`.
    pub fn free_count(&self, class: usize) -> usize {
        let mut count = 0;
        let mut cell = self.free[class];
        while !cell.is_null() {
            count += 1;
            cell = unsafe { (*cell).next };
        }
        count
    }

    fn allocate_small(&mut self, class: usize) -> Result<NonNull<u8>, AllocError> {
        let block = unsafe { meta::pop_free(&mut self.free[class]) };
        if let Some(block) = NonNull::new(block) {
            self.stats.reused += 1;
            return Ok(block);
        }

        let size = class_size(class);
        debug_assert!(size <= self.block_size, "block size validated at build time");

        if self.remaining < size {
            self.spill_residue();
            self.grow()?;
        }

        Ok(self.bump(size))
    }

    /// Carve `size` bytes off the current chunk.
    fn bump(&mut self, size: usize) -> NonNull<u8> {
        debug_assert!(self.remaining >= size);
        let block = self.cursor;
        // SAFETY: remaining >= size, so the cursor stays inside the chunk
        self.cursor = unsafe { self.cursor.add(size) };
        self.remaining -= size;
        self.stats.bumped += 1;
        // SAFETY: cursor points into a live chunk
        unsafe { NonNull::new_unchecked(block) }
    }

    /// Hand the unusable tail of the current chunk to the free list it fits.
    fn spill_residue(&mut self) {
        if self.remaining == 0 {
            return;
        }
        debug_assert_eq!(self.remaining % BLOCK_UNIT, 0);
        let class = class_index(self.remaining);
        unsafe { meta::push_free(&mut self.free[class], self.cursor) };
        self.cursor = ptr::null_mut();
        self.remaining = 0;
    }

    /// Acquire a fresh arena chunk and make it the bump region.
    fn grow(&mut self) -> Result<(), AllocError> {
        let chunk = Chunk::alloc(self.block_size)?;
        self.cursor = chunk.as_ptr();
        self.remaining = chunk.size();
        self.chunks.push(chunk);
        self.stats.chunks += 1;

        log::debug!(
            "pool: acquired arena chunk #{} ({} bytes)",
            self.chunks.len(),
            self.block_size
        );
        Ok(())
    }
}

unsafe impl Send for Pool {}

#[inline]
fn dangling(align: usize) -> NonNull<u8> {
    // SAFETY: a power-of-two alignment is never zero
    unsafe { NonNull::new_unchecked(ptr::without_provenance_mut(align)) }
}
