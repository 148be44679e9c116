//! Allocator-aware singly-linked list for `carve`.
//!
//! [`LinkedList`] stores each element in its own node block, drawn from any
//! [`MemoryResource`](carve_mem::MemoryResource). By default nodes come from
//! the global heap; hand the list a `&FixedArena` and every node lives in the
//! arena's buffer instead, with the borrow tying the list's lifetime to the
//! arena's.
//!
//! ```
//! use carve_list::LinkedList;
//! use carve_mem::FixedArena;
//!
//! let arena = FixedArena::new(1024)?;
//! {
//!     let mut list = LinkedList::new_in(&arena);
//!     list.push_front('A')?;
//!     list.push_back('B')?;
//!     list.push_front('C')?;
//!     assert_eq!(list.iter().collect::<String>(), "CAB");
//! }
//! // Dropping the list returned every node.
//! assert_eq!(arena.stats().live_blocks, 0);
//! # Ok::<(), carve_mem::Error>(())
//! ```

pub mod error;
pub mod list;

pub use error::ListError;
pub use list::{IntoIter, Iter, IterMut, LinkedList};
