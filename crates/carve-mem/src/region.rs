//! Address-ordered free-region bookkeeping.
//!
//! [`FreeRegions`] works purely on `usize` addresses and never touches
//! memory, so its invariants can be checked without a live buffer. The map
//! keeps one entry per maximal run of free bytes:
//!
//! ```text
//!   base                                                     base+capacity
//!   ├──────┬──────────┬────────────┬──────────┬─────────────────────┤
//!   │ free │   live   │    free    │   live   │        free         │
//!   └──────┴──────────┴────────────┴──────────┴─────────────────────┘
//!     ▲                  ▲                       ▲
//!     └── entries in FreeRegions, keyed by start address
//! ```
//!
//! Two free entries are never adjacent. [`FreeRegions::release`] merges a
//! returned span with both neighbours before inserting it.

use std::collections::BTreeMap;

/// Rounds `address` up to the next multiple of `alignment`.
///
/// An alignment of 0 or 1 leaves the address unchanged. `alignment` must
/// otherwise be a power of two. Returns `None` on overflow.
#[inline(always)]
#[must_use]
pub fn align_up(address: usize, alignment: usize) -> Option<usize> {
    if alignment <= 1 {
        return Some(address);
    }
    let mask = alignment - 1;
    address.checked_add(mask).map(|bumped| bumped & !mask)
}

/// A contiguous byte range `[start, start + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Region {
    /// First address of the range.
    pub start: usize,
    /// Length in bytes.
    pub len: usize,
}

impl Region {
    /// Creates a region.
    #[must_use]
    pub const fn new(start: usize, len: usize) -> Self {
        Region { start, len }
    }

    /// One past the last address of the range.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    /// Whether `address` falls inside the range.
    #[must_use]
    pub const fn contains(&self, address: usize) -> bool {
        address >= self.start && address < self.end()
    }
}

/// Where a request lands inside a free region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// The free region the request was carved from.
    pub region: Region,
    /// Aligned address handed to the caller.
    pub address: usize,
}

impl Placement {
    /// Bytes skipped between the region start and the aligned address.
    #[must_use]
    pub const fn padding(&self) -> usize {
        self.address - self.region.start
    }
}

/// Free regions of an arena keyed by start address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeRegions {
    map: BTreeMap<usize, usize>,
    bytes: usize,
}

impl FreeRegions {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding one region covering `[start, start + len)`.
    #[must_use]
    pub fn spanning(start: usize, len: usize) -> Self {
        let mut regions = Self::new();
        if len > 0 {
            regions.map.insert(start, len);
            regions.bytes = len;
        }
        regions
    }

    /// Finds the lowest-addressed region that fits `size` bytes at
    /// `alignment`, including the padding needed to reach the alignment.
    ///
    /// Regions are tried strictly in address order; the first fit wins even
    /// when a later region would fit more tightly.
    #[must_use]
    pub fn find_first_fit(
        &self,
        size: usize,
        alignment: usize,
    ) -> Option<Placement> {
        self.map.iter().find_map(|(&start, &len)| {
            let address = align_up(start, alignment)?;
            let needed = (address - start).checked_add(size)?;
            (needed <= len).then_some(Placement {
                region: Region::new(start, len),
                address,
            })
        })
    }

    /// Removes `size` bytes at `placement` from the free set.
    ///
    /// The alignment padding in front of the block and the remainder behind
    /// it go back in as separate regions. Neither can touch another free
    /// region since the region they came from did not.
    pub fn claim(&mut self, placement: Placement, size: usize) {
        let Region { start, len } = placement.region;
        let removed = self.map.remove(&start);
        debug_assert_eq!(removed, Some(len), "claimed region is not free");

        let padding = placement.padding();
        let remainder = len - padding - size;

        if padding > 0 {
            self.map.insert(start, padding);
        }
        if remainder > 0 {
            self.map.insert(placement.address + size, remainder);
        }
        self.bytes -= size;
    }

    /// Finds and claims the first fit in one step.
    pub fn take_first_fit(
        &mut self,
        size: usize,
        alignment: usize,
    ) -> Option<Placement> {
        let placement = self.find_first_fit(size, alignment)?;
        self.claim(placement, size);
        Some(placement)
    }

    /// Returns `[start, start + len)` to the free set, coalescing with the
    /// free neighbours on both sides.
    ///
    /// Returns the merged region the span ended up in. The span must not
    /// overlap any free region.
    pub fn release(&mut self, start: usize, len: usize) -> Region {
        let mut merged = Region::new(start, len);
        self.bytes += len;

        if let Some((&prev_start, &prev_len)) =
            self.map.range(..start).next_back()
            && prev_start + prev_len == start
        {
            self.map.remove(&prev_start);
            merged = Region::new(prev_start, prev_len + merged.len);
        }

        while let Some(next_len) = self.map.remove(&merged.end()) {
            merged.len += next_len;
        }

        self.map.insert(merged.start, merged.len);
        merged
    }

    /// Number of free regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no bytes are free.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Total free bytes across all regions.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.bytes
    }

    /// Length of the largest region, or 0 when nothing is free.
    #[must_use]
    pub fn largest(&self) -> usize {
        self.map.values().copied().max().unwrap_or(0)
    }

    /// Regions in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = Region> + '_ {
        self.map.iter().map(|(&start, &len)| Region::new(start, len))
    }

    /// The free region containing `address`, if any.
    #[must_use]
    pub fn region_containing(&self, address: usize) -> Option<Region> {
        let (&start, &len) = self.map.range(..=address).next_back()?;
        let region = Region::new(start, len);
        region.contains(address).then_some(region)
    }
}
