//! Arena configuration.

use std::alloc::Layout;

use crate::error::{Error, Result};

/// Parameters for building a [`FixedArena`](crate::FixedArena).
///
/// Both values are fixed once the arena exists; the arena never grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Size of the backing buffer in bytes. Must be positive.
    pub capacity: usize,

    /// Alignment of the backing buffer itself.
    ///
    /// Requests at or below this alignment never need padding when they land
    /// at the start of a free region that begins on the buffer base. Must be
    /// a power of two. Default: 16.
    pub buffer_alignment: usize,
}

impl ArenaConfig {
    /// Default alignment of the backing buffer (16 bytes).
    ///
    /// Covers every primitive type and 128-bit SIMD lanes.
    pub const DEFAULT_BUFFER_ALIGNMENT: usize = 16;

    /// Creates a config for a buffer of `capacity` bytes.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer_alignment: Self::DEFAULT_BUFFER_ALIGNMENT,
        }
    }

    /// Overrides the alignment of the backing buffer.
    #[must_use]
    pub const fn with_buffer_alignment(mut self, alignment: usize) -> Self {
        self.buffer_alignment = alignment;
        self
    }

    /// Checks the values and returns the layout of the backing buffer.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCapacity`] if `capacity` is zero.
    /// - [`Error::InvalidAlignment`] if `buffer_alignment` is not a power of
    ///   two.
    /// - [`Error::LayoutOverflow`] if the rounded capacity overflows `isize`.
    pub fn validate(&self) -> Result<Layout> {
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity {
                capacity: self.capacity,
            });
        }
        if !self.buffer_alignment.is_power_of_two() {
            return Err(Error::InvalidAlignment {
                alignment: self.buffer_alignment,
            });
        }
        Layout::from_size_align(self.capacity, self.buffer_alignment)
            .map_err(|_| Error::LayoutOverflow)
    }
}

impl Default for ArenaConfig {
    /// A 1 MiB buffer.
    fn default() -> Self {
        Self::new(1 << 20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_alignment() {
        let config = ArenaConfig::new(4096);
        assert_eq!(config.buffer_alignment, 16);
        assert_eq!(config.validate().unwrap().size(), 4096);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            ArenaConfig::new(0).validate(),
            Err(Error::InvalidCapacity { capacity: 0 })
        );
    }

    #[test]
    fn test_bad_buffer_alignment_rejected() {
        let config = ArenaConfig::new(64).with_buffer_alignment(24);
        assert_eq!(
            config.validate(),
            Err(Error::InvalidAlignment { alignment: 24 })
        );
        assert!(ArenaConfig::new(64).with_buffer_alignment(0).validate().is_err());
    }

    #[test]
    fn test_oversized_capacity_rejected() {
        let config = ArenaConfig::new(usize::MAX - 4);
        assert_eq!(config.validate(), Err(Error::LayoutOverflow));
    }
}
