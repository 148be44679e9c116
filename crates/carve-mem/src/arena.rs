//! Fixed-capacity arena with first-fit placement and coalescing.
//!
//! [`FixedArena`] acquires one buffer from the system allocator at
//! construction and sub-allocates every request from it. The arena never
//! grows: a request that no free region can hold fails with
//! [`Error::OutOfMemory`].
//!
//! # Bookkeeping
//!
//! Two maps are the single source of truth for the buffer:
//!
//! - **free regions** (`BTreeMap`, address ordered): scanned lowest address
//!   first on every allocation, split on placement, merged with both
//!   neighbours on release.
//! - **live regions** (`hashbrown` + `FxHash`): address of every outstanding
//!   block and the size requested for it. Releases look the size up here, so
//!   the size a caller passes to [`FixedArena::deallocate`] is advisory.
//!
//! Every byte of the buffer belongs to exactly one free or live region;
//! [`FixedArena::check_invariants`] verifies this without dereferencing
//! anything.
//!
//! ```text
//!   allocate(24, 16) from a 128-byte free region starting at 0x..08:
//!
//!   before │                       free (128)                        │
//!   after  │ pad (8) │ live (24) │             free (96)             │
//!            free      returned
//! ```
//!
//! # Thread Safety
//!
//! None. The bookkeeping sits behind a `RefCell` so the arena can be shared
//! by `&` reference between several containers on one thread; the arena is
//! `!Sync`.
//!
//! # Lifetime
//!
//! Dropping the arena releases the buffer unconditionally, even while
//! blocks are still lent out. Outstanding blocks are reported at
//! [`Level::Warn`](carve_log::Level::Warn) through `carve-log`; with the
//! `leak-backtrace` feature each report carries the allocating backtrace.
//!
//! # Example
//!
//! ```
//! use carve_mem::FixedArena;
//!
//! let arena = FixedArena::new(1024)?;
//!
//! let block = arena.allocate(64, 32)?;
//! assert_eq!(block.as_ptr() as usize % 32, 0);
//!
//! // SAFETY: block came from this arena and is released once.
//! unsafe { arena.deallocate(block.as_ptr(), 64) };
//! assert_eq!(arena.stats().free_regions, 1);
//! # Ok::<(), carve_mem::Error>(())
//! ```

// Fragmentation is a reporting ratio; precision loss is irrelevant there.
#![allow(clippy::cast_precision_loss)]

use std::alloc::{self, Layout};
use std::cell::RefCell;
use std::fmt;
use std::ptr::NonNull;

use carve_log::{Level, debug, trace, warn};
use fxhash::FxBuildHasher;
use hashbrown::HashMap;

use crate::config::ArenaConfig;
use crate::error::{Error, Result};
use crate::region::{FreeRegions, Region};
use crate::resource::MemoryResource;

/// An outstanding block.
struct LiveBlock {
    /// Size the caller asked for.
    size: usize,
    #[cfg(feature = "leak-backtrace")]
    backtrace: backtrace::Backtrace,
}

impl LiveBlock {
    #[inline(always)]
    fn new(size: usize) -> Self {
        LiveBlock {
            size,
            #[cfg(feature = "leak-backtrace")]
            backtrace: backtrace::Backtrace::new_unresolved(),
        }
    }
}

type LiveRegions = HashMap<usize, LiveBlock, FxBuildHasher>;

struct Bookkeeping {
    free: FreeRegions,
    live: LiveRegions,
    live_bytes: usize,
}

/// Whether a [`RegionSpan`] is free or lent out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// Available for allocation.
    Free,
    /// Returned by `allocate` and not yet released.
    Live,
}

/// One entry of the arena's address map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionSpan {
    /// Address range of the span.
    pub region: Region,
    /// Free or live.
    pub kind: RegionKind,
}

/// A snapshot of arena usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    /// Size of the backing buffer in bytes.
    pub capacity: usize,
    /// Bytes held by live blocks.
    pub live_bytes: usize,
    /// Bytes in free regions, alignment padding included.
    pub free_bytes: usize,
    /// Number of live blocks.
    pub live_blocks: usize,
    /// Number of free regions.
    pub free_regions: usize,
    /// Length of the largest free region.
    pub largest_free: usize,
}

impl ArenaStats {
    /// Share of free bytes that lie outside the largest free region.
    ///
    /// 0.0 means all free space is contiguous; values close to 1.0 mean a
    /// large request is likely to fail even though plenty is free.
    #[must_use]
    pub fn fragmentation(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }
        1.0 - (self.largest_free as f64 / self.free_bytes as f64)
    }
}

/// A fixed-size buffer serving variable-sized, variably-aligned blocks.
pub struct FixedArena {
    /// Start of the backing buffer.
    base: NonNull<u8>,
    /// Layout the buffer was acquired with; needed to release it.
    layout: Layout,
    state: RefCell<Bookkeeping>,
}

impl FixedArena {
    /// Creates an arena over a freshly acquired buffer of `capacity` bytes.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCapacity`] for a zero capacity and
    /// [`Error::BufferUnavailable`] if the system allocator refuses.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(ArenaConfig::new(capacity))
    }

    /// Creates an arena from a full [`ArenaConfig`].
    ///
    /// # Errors
    ///
    /// Any error from [`ArenaConfig::validate`], or
    /// [`Error::BufferUnavailable`] if the system allocator refuses.
    pub fn with_config(config: ArenaConfig) -> Result<Self> {
        let layout = config.validate()?;

        // SAFETY: validate() guarantees a non-zero size.
        let ptr = unsafe { alloc::alloc(layout) };
        let base = NonNull::new(ptr).ok_or(Error::BufferUnavailable {
            capacity: config.capacity,
        })?;

        debug!(
            "acquired {} byte buffer at {:#x} (align {})",
            layout.size(),
            base.addr().get(),
            layout.align()
        );

        Ok(FixedArena {
            base,
            layout,
            state: RefCell::new(Bookkeeping {
                free: FreeRegions::spanning(base.addr().get(), layout.size()),
                live: LiveRegions::default(),
                live_bytes: 0,
            }),
        })
    }

    /// Allocates `size` bytes aligned to `alignment`.
    ///
    /// An `alignment` of 0 places no constraint on the address. The block
    /// comes from the lowest-addressed free region that can hold it with its
    /// alignment padding.
    ///
    /// # Errors
    ///
    /// - [`Error::ZeroSize`] if `size` is zero.
    /// - [`Error::InvalidAlignment`] if `alignment` is neither zero nor a
    ///   power of two.
    /// - [`Error::OutOfMemory`] if no free region fits. The arena is left
    ///   exactly as it was.
    pub fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>> {
        if size == 0 {
            return Err(Error::ZeroSize);
        }
        if alignment != 0 && !alignment.is_power_of_two() {
            return Err(Error::InvalidAlignment { alignment });
        }

        let mut state = self.state.borrow_mut();
        let Some(placement) = state.free.take_first_fit(size, alignment) else {
            let largest_free = state.free.largest();
            debug!(
                "cannot place {size} bytes aligned to {alignment}: largest \
                 free region is {largest_free} bytes"
            );
            return Err(Error::OutOfMemory {
                requested: size,
                alignment,
                largest_free,
            });
        };

        state.live.insert(placement.address, LiveBlock::new(size));
        state.live_bytes += size;
        trace!(
            "allocate {size} bytes (align {alignment}) at {:#x}",
            placement.address
        );

        Ok(self.pointer_at(placement.address))
    }

    /// Releases a block back to the arena.
    ///
    /// A null `ptr` is a no-op. The size recorded when the block was
    /// allocated is used for the bookkeeping; `size` only matters for a
    /// pointer the arena has no record of, which is logged as a warning.
    ///
    /// The released span is merged with the free regions directly before and
    /// after it, so two adjacent free regions never coexist.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a block returned by [`allocate`](Self::allocate)
    /// on this arena that has not been released yet. Releasing a block twice,
    /// or a pointer from elsewhere, corrupts the free set and leads to
    /// overlapping blocks being handed out later.
    pub unsafe fn deallocate(&self, ptr: *mut u8, size: usize) {
        let Some(ptr) = NonNull::new(ptr) else {
            return;
        };
        let address = ptr.addr().get();

        let mut state = self.state.borrow_mut();
        let len = match state.live.remove(&address) {
            Some(block) => {
                state.live_bytes -= block.size;
                block.size
            }
            None => {
                warn!(
                    "releasing untracked block at {address:#x}; trusting the \
                     caller's size of {size} bytes"
                );
                size
            }
        };
        if len == 0 {
            return;
        }

        let merged = state.free.release(address, len);
        trace!(
            "deallocate {len} bytes at {address:#x}; free region now \
             {:#x}+{}",
            merged.start,
            merged.len
        );
    }

    /// Size of the backing buffer in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    /// Start of the backing buffer.
    #[must_use]
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Whether `ptr` points inside the backing buffer.
    #[must_use]
    pub fn contains(&self, ptr: *const u8) -> bool {
        Region::new(self.base_address(), self.capacity()).contains(ptr.addr())
    }

    /// Current usage figures.
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        let state = self.state.borrow();
        ArenaStats {
            capacity: self.capacity(),
            live_bytes: state.live_bytes,
            free_bytes: state.free.total_bytes(),
            live_blocks: state.live.len(),
            free_regions: state.free.len(),
            largest_free: state.free.largest(),
        }
    }

    /// Free regions in ascending address order.
    #[must_use]
    pub fn free_regions(&self) -> Vec<Region> {
        self.state.borrow().free.iter().collect()
    }

    /// Live blocks in ascending address order, with their requested sizes.
    #[must_use]
    pub fn live_regions(&self) -> Vec<Region> {
        let state = self.state.borrow();
        let mut live: Vec<Region> = state
            .live
            .iter()
            .map(|(&start, block)| Region::new(start, block.size))
            .collect();
        live.sort_unstable();
        live
    }

    /// Every free and live span in ascending address order.
    #[must_use]
    pub fn regions(&self) -> Vec<RegionSpan> {
        let free = self.free_regions().into_iter().map(|region| RegionSpan {
            region,
            kind: RegionKind::Free,
        });
        let live = self.live_regions().into_iter().map(|region| RegionSpan {
            region,
            kind: RegionKind::Live,
        });
        let mut spans: Vec<RegionSpan> = free.chain(live).collect();
        spans.sort_unstable_by_key(|span| span.region.start);
        spans
    }

    /// Verifies that the free and live spans tile the buffer exactly and
    /// that no two free regions touch.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptedRegions`] with the first address where the tiling
    /// breaks: a gap, an overlap, an empty span, a missed merge, or a
    /// mismatch at the end of the buffer.
    pub fn check_invariants(&self) -> Result<()> {
        let mut cursor = self.base_address();
        let mut previous = None;

        for span in self.regions() {
            let Region { start, len } = span.region;
            if start != cursor || len == 0 {
                return Err(Error::CorruptedRegions { address: start });
            }
            if previous == Some(RegionKind::Free) && span.kind == RegionKind::Free
            {
                return Err(Error::CorruptedRegions { address: start });
            }
            cursor = start
                .checked_add(len)
                .ok_or(Error::CorruptedRegions { address: start })?;
            previous = Some(span.kind);
        }

        let end = self.base_address() + self.capacity();
        if cursor != end {
            return Err(Error::CorruptedRegions { address: cursor });
        }

        let stats = self.stats();
        if stats.free_bytes + stats.live_bytes != stats.capacity {
            return Err(Error::CorruptedRegions { address: end });
        }
        Ok(())
    }

    fn base_address(&self) -> usize {
        self.base.addr().get()
    }

    /// Turns a bookkeeping address back into a pointer into the buffer.
    #[inline(always)]
    fn pointer_at(&self, address: usize) -> NonNull<u8> {
        let offset = address - self.base_address();
        debug_assert!(offset < self.capacity());
        // SAFETY: every address in the region maps lies inside
        // [base, base + capacity), so the offset stays within the buffer and
        // keeps the buffer's provenance.
        unsafe { self.base.add(offset) }
    }

    /// Logs every block still outstanding while the arena goes away.
    #[cold]
    fn report_leaks(state: &mut Bookkeeping) {
        warn!(
            "arena dropped with {} live blocks ({} bytes); releasing the \
             backing buffer anyway",
            state.live.len(),
            state.live_bytes
        );
        if !carve_log::enabled(Level::Debug) {
            return;
        }

        let mut leaked: Vec<_> = state.live.iter_mut().collect();
        leaked.sort_unstable_by_key(|(address, _)| **address);
        for (address, block) in leaked {
            debug!("leaked {} bytes at {address:#x}", block.size);
            #[cfg(feature = "leak-backtrace")]
            {
                block.backtrace.resolve();
                debug!("allocated at:\n{:?}", block.backtrace);
            }
        }
    }
}

impl MemoryResource for FixedArena {
    #[inline(always)]
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>> {
        self.allocate(layout.size(), layout.align())
    }

    #[inline(always)]
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded from the caller.
        unsafe { self.deallocate(ptr.as_ptr(), layout.size()) }
    }
}

impl fmt::Debug for FixedArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("FixedArena")
            .field("base", &self.base)
            .field("capacity", &stats.capacity)
            .field("live_blocks", &stats.live_blocks)
            .field("free_regions", &stats.free_regions)
            .finish()
    }
}

impl Drop for FixedArena {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.live.is_empty() {
            Self::report_leaks(state);
        }

        // SAFETY: base was allocated in with_config with exactly this layout
        // and is released only here.
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) }
    }
}
