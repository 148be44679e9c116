//! Error types for `carve-mem`.
//!
//! Allocation failure is the only condition a well-behaved caller has to
//! handle. The remaining variants report violated preconditions (zero sizes,
//! bad alignments, a broken arena configuration) as errors instead of letting
//! them corrupt the region bookkeeping.

use std::fmt;

/// Errors returned by arena construction and allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No free region can hold the request with its alignment padding.
    OutOfMemory {
        /// Requested size in bytes.
        requested: usize,
        /// Requested alignment (0 means unconstrained).
        alignment: usize,
        /// Length of the largest free region at the time of the request.
        largest_free: usize,
    },

    /// A zero-byte allocation was requested.
    ZeroSize,

    /// Alignment is neither zero nor a power of two.
    InvalidAlignment {
        /// The requested alignment.
        alignment: usize,
    },

    /// Arena capacity must be positive.
    InvalidCapacity {
        /// The requested capacity.
        capacity: usize,
    },

    /// The system allocator could not provide the backing buffer.
    BufferUnavailable {
        /// The requested capacity.
        capacity: usize,
    },

    /// A `Layout` computation overflowed `isize`.
    LayoutOverflow,

    /// The free and live regions no longer tile the backing buffer.
    CorruptedRegions {
        /// First address at which the tiling breaks.
        address: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfMemory {
                requested,
                alignment,
                largest_free,
            } => write!(
                f,
                "Out of memory: requested {requested} bytes aligned to \
                 {alignment}, largest free region {largest_free} bytes"
            ),
            Error::ZeroSize => write!(f, "Zero-sized allocation requested"),
            Error::InvalidAlignment { alignment } => {
                write!(f, "Invalid alignment: {alignment} is not a power of two")
            }
            Error::InvalidCapacity { capacity } => {
                write!(f, "Invalid arena capacity: {capacity} bytes")
            }
            Error::BufferUnavailable { capacity } => {
                write!(f, "Failed to acquire a backing buffer of {capacity} bytes")
            }
            Error::LayoutOverflow => write!(f, "Layout size overflow"),
            Error::CorruptedRegions { address } => {
                write!(f, "Region bookkeeping corrupted at {address:#x}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for `carve-mem` operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!(
                "{}",
                Error::OutOfMemory {
                    requested: 2048,
                    alignment: 8,
                    largest_free: 1024,
                }
            ),
            "Out of memory: requested 2048 bytes aligned to 8, largest free \
             region 1024 bytes"
        );
        assert_eq!(
            format!("{}", Error::InvalidAlignment { alignment: 3 }),
            "Invalid alignment: 3 is not a power of two"
        );
        assert_eq!(
            format!("{}", Error::CorruptedRegions { address: 0x40 }),
            "Region bookkeeping corrupted at 0x40"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(Error::ZeroSize, Error::ZeroSize);
        assert_ne!(
            Error::BufferUnavailable { capacity: 16 },
            Error::InvalidCapacity { capacity: 16 }
        );
    }
}
