//! Fixed-capacity memory arena for `carve`.
//!
//! This crate serves variable-sized, variably-aligned blocks out of one
//! contiguous buffer acquired up front, and defines the allocator capability
//! that containers plug into:
//!
//! - [`FixedArena`]: first-fit placement by address, splitting on
//!   allocation, bidirectional coalescing on release
//! - [`MemoryResource`]: layout-based allocate/deallocate trait, implemented
//!   by the arena, by [`SystemResource`] (the global heap), and by
//!   references and smart pointers to either
//! - [`FreeRegions`](region::FreeRegions): the address-ordered free-set
//!   bookkeeping, usable on its own over plain addresses
//!
//! # Features
//!
//! - `leak-backtrace`: record where every live block was allocated and print
//!   it when the arena is dropped with blocks outstanding

pub mod arena;
pub mod config;
pub mod error;
pub mod region;
pub mod resource;

pub use arena::{ArenaStats, FixedArena, RegionKind, RegionSpan};
pub use config::ArenaConfig;
pub use error::{Error, Result};
pub use region::Region;
pub use resource::{MemoryResource, SystemResource};
