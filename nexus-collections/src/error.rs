//! Error type shared by every container.

use nexus_alloc::AllocError;

/// Broad classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Memory could not be obtained.
    OutOfMemory,
    /// An index or key was outside the container.
    OutOfRange,
    /// A requested element count exceeds what the allocator can address.
    LengthError,
}

/// Container operation failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The allocator could not satisfy a request of `bytes` bytes.
    OutOfMemory {
        /// Size of the failed request.
        bytes: usize,
    },
    /// `index` is not below `len`.
    OutOfRange {
        /// Requested position.
        index: usize,
        /// Container length at the time of the call.
        len: usize,
    },
    /// Keyed lookup found nothing.
    KeyNotFound,
    /// `requested` elements exceed the allocator limit `max`.
    LengthError {
        /// Requested element count.
        requested: usize,
        /// Largest count the allocator can serve.
        max: usize,
    },
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            Error::OutOfRange { .. } | Error::KeyNotFound => ErrorKind::OutOfRange,
            Error::LengthError { .. } => ErrorKind::LengthError,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::OutOfMemory { bytes } => write!(f, "out of memory ({bytes} bytes)"),
            Error::OutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Error::KeyNotFound => write!(f, "key not found"),
            Error::LengthError { requested, max } => {
                write!(f, "requested length {requested} exceeds maximum {max}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<AllocError> for Error {
    fn from(err: AllocError) -> Self {
        Error::OutOfMemory { bytes: err.bytes }
    }
}

/// Unwrap the result of a fallible growth operation the way `std` does:
/// allocation failure aborts through the alloc error handler, anything else
/// is a capacity overflow panic.
#[inline]
pub(crate) fn infallible<T>(result: Result<T, Error>) -> T {
    match result {
        Ok(value) => value,
        Err(Error::OutOfMemory { bytes }) => nexus_alloc::handle_alloc_error(AllocError { bytes }),
        Err(err) => panic!("capacity overflow: {err}"),
    }
}

/// Panic for an out-of-range index.
#[cold]
#[track_caller]
pub(crate) fn out_of_range(index: usize, len: usize) -> ! {
    panic!("{}", Error::OutOfRange { index, len })
}
