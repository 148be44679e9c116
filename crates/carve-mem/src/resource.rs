//! The pluggable allocator capability.
//!
//! Containers that want their storage to come from somewhere other than the
//! global heap take a [`MemoryResource`] at construction and route every
//! block through it. The container never learns which resource it got:
//!
//! ```text
//!   LinkedList<T, R: MemoryResource>
//!        │ alloc(Layout::new::<Node<T>>())
//!        ▼
//!   ┌──────────────┬────────────────┬──────────────────┐
//!   │  FixedArena  │ SystemResource │  &R / Box / Rc   │
//!   └──────────────┴────────────────┴──────────────────┘
//! ```
//!
//! # Examples
//!
//! ```
//! use std::alloc::Layout;
//! use carve_mem::{FixedArena, MemoryResource};
//!
//! fn scratch<R: MemoryResource>(resource: &R) -> carve_mem::Result<()> {
//!     let layout = Layout::new::<[u64; 4]>();
//!     let block = resource.alloc(layout)?;
//!     // SAFETY: block came from this resource with this layout.
//!     unsafe { resource.dealloc(block, layout) };
//!     Ok(())
//! }
//!
//! let arena = FixedArena::new(256)?;
//! scratch(&arena)?;
//! scratch(&carve_mem::SystemResource)?;
//! # Ok::<(), carve_mem::Error>(())
//! ```

use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::rc::Rc;

use crate::error::{Error, Result};

/// Layout-based block allocation.
///
/// Implementors hand out blocks of at least `layout.size()` bytes aligned to
/// `layout.align()`, and take them back through [`dealloc`](Self::dealloc).
/// Zero-sized layouts are rejected with [`Error::ZeroSize`].
pub trait MemoryResource {
    /// Allocates a block for `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] when the resource cannot satisfy the
    /// request and [`Error::ZeroSize`] for zero-sized layouts.
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>>;

    /// Returns a block to the resource.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`alloc`](Self::alloc) on this
    /// resource (or one it [`is_equal`](Self::is_equal) to) with the same
    /// `layout`, and must not be used or released again afterwards.
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout);

    /// Whether blocks from `self` may be released through `other` and vice
    /// versa. Defaults to comparing [`identity`](Self::identity).
    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        std::ptr::eq(self.identity(), other.identity())
    }

    /// Address of the underlying resource object.
    ///
    /// References and smart pointers report the resource they point at, so
    /// `&arena`, `Rc<FixedArena>` and the arena itself all compare equal.
    fn identity(&self) -> *const () {
        (self as *const Self).cast()
    }

    /// Whether blocks come straight from the global heap.
    fn is_global_heap(&self) -> bool {
        false
    }

    /// Allocates uninitialized storage for one `T`.
    ///
    /// # Errors
    ///
    /// Same as [`alloc`](Self::alloc).
    fn alloc_one<T>(&self) -> Result<NonNull<T>>
    where
        Self: Sized,
    {
        self.alloc(Layout::new::<T>()).map(NonNull::cast)
    }

    /// Releases storage obtained from [`alloc_one`](Self::alloc_one).
    ///
    /// The value is not dropped; destroy it in place first.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `alloc_one::<T>` on this resource and must not be
    /// used afterwards.
    unsafe fn dealloc_one<T>(&self, ptr: NonNull<T>)
    where
        Self: Sized,
    {
        // SAFETY: forwarded from the caller.
        unsafe { self.dealloc(ptr.cast(), Layout::new::<T>()) }
    }
}

/// The global heap as a [`MemoryResource`].
///
/// This is the default resource for containers built without one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemResource;

impl MemoryResource for SystemResource {
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>> {
        if layout.size() == 0 {
            return Err(Error::ZeroSize);
        }
        // SAFETY: layout has a non-zero size (checked above).
        let ptr = unsafe { alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(Error::OutOfMemory {
            requested: layout.size(),
            alignment: layout.align(),
            largest_free: 0,
        })
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: the caller guarantees ptr came from alloc with this layout.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }

    /// Every `SystemResource` shares the one global heap.
    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        other.is_global_heap()
    }

    fn is_global_heap(&self) -> bool {
        true
    }
}

impl<R: MemoryResource + ?Sized> MemoryResource for &R {
    #[inline(always)]
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>> {
        (**self).alloc(layout)
    }

    #[inline(always)]
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded from the caller.
        unsafe { (**self).dealloc(ptr, layout) }
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        (**self).is_equal(other)
    }

    fn identity(&self) -> *const () {
        (**self).identity()
    }

    fn is_global_heap(&self) -> bool {
        (**self).is_global_heap()
    }
}

impl<R: MemoryResource + ?Sized> MemoryResource for Box<R> {
    #[inline(always)]
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>> {
        (**self).alloc(layout)
    }

    #[inline(always)]
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded from the caller.
        unsafe { (**self).dealloc(ptr, layout) }
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        (**self).is_equal(other)
    }

    fn identity(&self) -> *const () {
        (**self).identity()
    }

    fn is_global_heap(&self) -> bool {
        (**self).is_global_heap()
    }
}

impl<R: MemoryResource + ?Sized> MemoryResource for Rc<R> {
    #[inline(always)]
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>> {
        (**self).alloc(layout)
    }

    #[inline(always)]
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded from the caller.
        unsafe { (**self).dealloc(ptr, layout) }
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        (**self).is_equal(other)
    }

    fn identity(&self) -> *const () {
        (**self).identity()
    }

    fn is_global_heap(&self) -> bool {
        (**self).is_global_heap()
    }
}
