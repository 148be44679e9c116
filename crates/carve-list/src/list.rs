//! Singly-linked list over a pluggable [`MemoryResource`].
//!
//! Every node is one block from the list's resource, holding the element and
//! the pointer to its successor. The list owns the chain; a node is owned by
//! its predecessor, the head by the list itself:
//!
//! ```text
//!   LinkedList { head, tail, len: 3, resource }
//!                 │     └────────────────────────────┐
//!                 ▼                                  ▼
//!          ┌───────────┐     ┌───────────┐     ┌───────────┐
//!          │ value: C  │     │ value: A  │     │ value: B  │
//!          │ next ─────┼────▶│ next ─────┼────▶│ next: ∅   │
//!          └───────────┘     └───────────┘     └───────────┘
//! ```
//!
//! Insertion reserves the block first and only then builds the value in it.
//! When building fails (an `Err` or a panic) the block goes straight back to
//! the resource and the list is untouched.
//!
//! Iterators borrow the list, so the borrow checker rules out mutation during
//! a traversal.

use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use carve_log::trace;
use carve_mem::{MemoryResource, Result, SystemResource};

use crate::error::ListError;

struct Node<T> {
    value: T,
    next: Option<NonNull<Node<T>>>,
}

/// A reserved node block that goes back to the resource unless disarmed.
///
/// Covers both an `Err` from the value constructor and a panic unwinding
/// through it.
struct ReservedBlock<'r, T, R: MemoryResource> {
    ptr: NonNull<Node<T>>,
    resource: &'r R,
}

impl<T, R: MemoryResource> ReservedBlock<'_, T, R> {
    fn disarm(self) -> NonNull<Node<T>> {
        let ptr = self.ptr;
        mem::forget(self);
        ptr
    }
}

impl<T, R: MemoryResource> Drop for ReservedBlock<'_, T, R> {
    fn drop(&mut self) {
        // SAFETY: the block came from alloc_one on this resource and holds
        // no value yet.
        unsafe { self.resource.dealloc_one(self.ptr) }
    }
}

/// A singly-linked list whose nodes are allocated from `R`.
///
/// The default resource is the global heap. Pass `&FixedArena` (or any other
/// [`MemoryResource`]) to [`LinkedList::new_in`] to keep every node inside an
/// arena; the borrow then keeps the arena alive for as long as the list.
///
/// # Examples
///
/// ```
/// use carve_list::LinkedList;
/// use carve_mem::FixedArena;
///
/// let arena = FixedArena::new(4096)?;
/// let mut list = LinkedList::new_in(&arena);
///
/// list.push_front("A")?;
/// list.push_back("B")?;
/// list.push_front("C")?;
///
/// assert!(list.iter().eq(&["C", "A", "B"]));
/// assert_eq!(arena.stats().live_blocks, 3);
///
/// list.clear();
/// assert_eq!(arena.stats().live_blocks, 0);
/// # Ok::<(), carve_mem::Error>(())
/// ```
pub struct LinkedList<T, R: MemoryResource = SystemResource> {
    head: Option<NonNull<Node<T>>>,
    tail: Option<NonNull<Node<T>>>,
    len: usize,
    resource: R,
    marker: PhantomData<Box<Node<T>>>,
}

impl<T> LinkedList<T> {
    /// Creates an empty list backed by the global heap.
    #[must_use]
    pub const fn new() -> Self {
        Self::new_in(SystemResource)
    }
}

impl<T> Default for LinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R: MemoryResource> LinkedList<T, R> {
    /// Creates an empty list drawing its nodes from `resource`.
    #[must_use]
    pub const fn new_in(resource: R) -> Self {
        LinkedList {
            head: None,
            tail: None,
            len: 0,
            resource,
            marker: PhantomData,
        }
    }

    /// The resource nodes are allocated from.
    #[must_use]
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Inserts `value` at the front.
    ///
    /// # Errors
    ///
    /// Returns the resource's error if no node block is available; `value`
    /// is dropped and the list is unchanged.
    pub fn push_front(&mut self, value: T) -> Result<()> {
        let node = self.new_node(value)?;
        self.link_front(node);
        Ok(())
    }

    /// Inserts `value` at the back.
    ///
    /// # Errors
    ///
    /// Same as [`push_front`](Self::push_front).
    pub fn push_back(&mut self, value: T) -> Result<()> {
        let node = self.new_node(value)?;
        self.link_back(node);
        Ok(())
    }

    /// Reserves a node block, then builds the front element in it with
    /// `make`.
    ///
    /// # Errors
    ///
    /// [`ListError::Alloc`] if no block is available (`make` is not called),
    /// [`ListError::Construct`] if `make` fails. Either way the list is
    /// unchanged and no block is leaked. A panic in `make` also releases the
    /// block before it propagates.
    pub fn try_push_front_with<E, F>(
        &mut self,
        make: F,
    ) -> std::result::Result<(), ListError<E>>
    where
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let node = self.build_node(make)?;
        self.link_front(node);
        Ok(())
    }

    /// Reserves a node block, then builds the back element in it with
    /// `make`.
    ///
    /// # Errors
    ///
    /// Same as [`try_push_front_with`](Self::try_push_front_with).
    pub fn try_push_back_with<E, F>(
        &mut self,
        make: F,
    ) -> std::result::Result<(), ListError<E>>
    where
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let node = self.build_node(make)?;
        self.link_back(node);
        Ok(())
    }

    /// Removes the front element and returns it, releasing its node block.
    ///
    /// Returns `None` and does nothing on an empty list.
    pub fn pop_front(&mut self) -> Option<T> {
        let node = self.head?;

        // SAFETY: head is a live node owned by this list. Reading it moves
        // the value out; the block is released below without dropping it.
        let Node { value, next } = unsafe { node.read() };
        self.head = next;
        if next.is_none() {
            self.tail = None;
        }
        self.len -= 1;

        // SAFETY: node came from alloc_one on this resource and is no
        // longer reachable from the list.
        unsafe { self.resource.dealloc_one(node) };
        Some(value)
    }

    /// Drops every element and releases every node block.
    pub fn clear(&mut self) {
        let count = self.len;
        while self.pop_front().is_some() {}
        if count > 0 {
            trace!("cleared {count} nodes");
        }
    }

    /// Appends every item of `iter` at the back.
    ///
    /// # Errors
    ///
    /// Stops at the first allocation failure; elements pushed before it
    /// stay in the list.
    pub fn extend_back<I>(&mut self, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        for value in iter {
            self.push_back(value)?;
        }
        Ok(())
    }

    /// The first element.
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        // SAFETY: head is a live node; the shared borrow of self keeps it so.
        self.head.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    /// The first element, mutably.
    #[must_use]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        // SAFETY: head is a live node; the unique borrow of self keeps it so.
        self.head.map(|node| unsafe { &mut (*node.as_ptr()).value })
    }

    /// The last element.
    #[must_use]
    pub fn back(&self) -> Option<&T> {
        // SAFETY: tail is a live node; the shared borrow of self keeps it so.
        self.tail.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    /// The last element, mutably.
    #[must_use]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        // SAFETY: tail is a live node; the unique borrow of self keeps it so.
        self.tail.map(|node| unsafe { &mut (*node.as_ptr()).value })
    }

    /// Front-to-back iterator over shared references.
    ///
    /// Each call starts a fresh traversal from the head.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head,
            remaining: self.len,
            marker: PhantomData,
        }
    }

    /// Front-to-back iterator over mutable references.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            next: self.head,
            remaining: self.len,
            marker: PhantomData,
        }
    }

    /// Moves every node into a new list sharing this list's resource and
    /// leaves `self` empty. No node is touched.
    #[must_use]
    pub fn take(&mut self) -> Self
    where
        R: Clone,
    {
        LinkedList {
            head: self.head.take(),
            tail: self.tail.take(),
            len: mem::take(&mut self.len),
            resource: self.resource.clone(),
            marker: PhantomData,
        }
    }

    /// Move-assignment: drops the current contents, then takes over the
    /// chain and the resource of `other`, leaving `other` empty.
    pub fn move_from(&mut self, other: &mut Self)
    where
        R: Clone,
    {
        self.clear();
        self.head = other.head.take();
        self.tail = other.tail.take();
        self.len = mem::take(&mut other.len);
        self.resource = other.resource.clone();
    }

    fn new_node(&self, value: T) -> Result<NonNull<Node<T>>> {
        let ptr = self.resource.alloc_one::<Node<T>>()?;
        // SAFETY: ptr is a fresh block sized and aligned for Node<T>.
        unsafe { ptr.write(Node { value, next: None }) };
        Ok(ptr)
    }

    fn build_node<E, F>(
        &self,
        make: F,
    ) -> std::result::Result<NonNull<Node<T>>, ListError<E>>
    where
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let reserved = ReservedBlock {
            ptr: self.resource.alloc_one::<Node<T>>()?,
            resource: &self.resource,
        };
        let value = make().map_err(ListError::Construct)?;

        let ptr = reserved.disarm();
        // SAFETY: ptr is a fresh block sized and aligned for Node<T>.
        unsafe { ptr.write(Node { value, next: None }) };
        Ok(ptr)
    }

    fn link_front(&mut self, node: NonNull<Node<T>>) {
        // SAFETY: node is a fresh, initialized node owned by nobody else.
        unsafe { (*node.as_ptr()).next = self.head };
        if self.tail.is_none() {
            self.tail = Some(node);
        }
        self.head = Some(node);
        self.len += 1;
    }

    fn link_back(&mut self, node: NonNull<Node<T>>) {
        match self.tail {
            // SAFETY: tail is a live node owned by this list.
            Some(tail) => unsafe { (*tail.as_ptr()).next = Some(node) },
            None => self.head = Some(node),
        }
        self.tail = Some(node);
        self.len += 1;
    }
}

impl<T, R: MemoryResource> Drop for LinkedList<T, R> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: fmt::Debug, R: MemoryResource> fmt::Debug for LinkedList<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, R, S> PartialEq<LinkedList<T, S>> for LinkedList<T, R>
where
    T: PartialEq,
    R: MemoryResource,
    S: MemoryResource,
{
    fn eq(&self, other: &LinkedList<T, S>) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq, R: MemoryResource> Eq for LinkedList<T, R> {}

/// Shared iterator returned by [`LinkedList::iter`].
pub struct Iter<'a, T> {
    next: Option<NonNull<Node<T>>>,
    remaining: usize,
    marker: PhantomData<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node = self.next?;
        // SAFETY: the list is borrowed for 'a, so every node stays alive and
        // unaliased by any mutable reference.
        let node = unsafe { &*node.as_ptr() };
        self.next = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            next: self.next,
            remaining: self.remaining,
            marker: PhantomData,
        }
    }
}

/// Mutable iterator returned by [`LinkedList::iter_mut`].
pub struct IterMut<'a, T> {
    next: Option<NonNull<Node<T>>>,
    remaining: usize,
    marker: PhantomData<&'a mut Node<T>>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        let node = self.next?;
        // SAFETY: the list is uniquely borrowed for 'a and each node is
        // yielded exactly once.
        let node = unsafe { &mut *node.as_ptr() };
        self.next = node.next;
        self.remaining -= 1;
        Some(&mut node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<T> FusedIterator for IterMut<'_, T> {}

/// Owning iterator; pops from the front and releases each node as it goes.
pub struct IntoIter<T, R: MemoryResource> {
    list: LinkedList<T, R>,
}

impl<T, R: MemoryResource> Iterator for IntoIter<T, R> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.list.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len, Some(self.list.len))
    }
}

impl<T, R: MemoryResource> ExactSizeIterator for IntoIter<T, R> {}

impl<T, R: MemoryResource> FusedIterator for IntoIter<T, R> {}

impl<T, R: MemoryResource> IntoIterator for LinkedList<T, R> {
    type Item = T;
    type IntoIter = IntoIter<T, R>;

    fn into_iter(self) -> IntoIter<T, R> {
        IntoIter { list: self }
    }
}

impl<'a, T, R: MemoryResource> IntoIterator for &'a LinkedList<T, R> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, R: MemoryResource> IntoIterator for &'a mut LinkedList<T, R> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<R: MemoryResource>(list: &LinkedList<i32, R>) -> Vec<i32> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_new_list_is_empty() {
        let list: LinkedList<i32> = LinkedList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
        assert_eq!(list.iter().next(), None);
    }

    #[test]
    fn test_push_order() {
        let mut list = LinkedList::new();
        list.push_front(1).unwrap();
        list.push_back(2).unwrap();
        list.push_front(0).unwrap();

        assert_eq!(collect(&list), vec![0, 1, 2]);
        assert_eq!(list.front(), Some(&0));
        assert_eq!(list.back(), Some(&2));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_pop_front_until_empty() {
        let mut list = LinkedList::new();
        list.extend_back([1, 2, 3]).unwrap();

        assert_eq!(list.pop_front(), Some(1));
        assert_eq!(list.pop_front(), Some(2));
        assert_eq!(list.back(), Some(&3));
        assert_eq!(list.pop_front(), Some(3));
        assert_eq!(list.pop_front(), None);
        assert_eq!(list.back(), None);
        assert!(list.is_empty());

        // The tail is reset, so push_back relinks the head.
        list.push_back(9).unwrap();
        assert_eq!(list.front(), Some(&9));
    }

    #[test]
    fn test_iter_is_exact_and_restartable() {
        let mut list = LinkedList::new();
        list.extend_back(0..5).unwrap();

        let iter = list.iter();
        assert_eq!(iter.len(), 5);
        assert_eq!(iter.clone().count(), 5);
        assert_eq!(list.iter().sum::<i32>(), 10);
        assert_eq!(list.iter().sum::<i32>(), 10);
    }

    #[test]
    fn test_iter_mut_and_accessors() {
        let mut list = LinkedList::new();
        list.extend_back([1, 2, 3]).unwrap();

        for value in &mut list {
            *value *= 10;
        }
        *list.front_mut().unwrap() += 1;
        *list.back_mut().unwrap() += 2;
        assert_eq!(collect(&list), vec![11, 20, 32]);
    }

    #[test]
    fn test_take_empties_source() {
        let mut source = LinkedList::new();
        source.extend_back([1, 2, 3]).unwrap();

        let dest = source.take();
        assert!(source.is_empty());
        assert_eq!(source.front(), None);
        assert_eq!(collect(&dest), vec![1, 2, 3]);
    }

    #[test]
    fn test_move_from_replaces_contents() {
        let mut dest = LinkedList::new();
        dest.extend_back([7, 8]).unwrap();
        let mut source = LinkedList::new();
        source.extend_back([1, 2, 3]).unwrap();

        dest.move_from(&mut source);
        assert_eq!(collect(&dest), vec![1, 2, 3]);
        assert!(source.is_empty());

        // The emptied source is still usable.
        source.push_back(4).unwrap();
        assert_eq!(collect(&source), vec![4]);
    }

    #[test]
    fn test_into_iter_drains() {
        let mut list = LinkedList::new();
        list.extend_back(["a".to_string(), "b".to_string()]).unwrap();

        let mut iter = list.into_iter();
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.next().as_deref(), Some("a"));
        // Remaining node is released when the iterator drops.
    }

    #[test]
    fn test_failed_constructor_leaves_list_unchanged() {
        let mut list = LinkedList::new();
        list.push_back(1).unwrap();

        let result = list.try_push_front_with(|| Err::<i32, _>("nope"));
        assert_eq!(result, Err(ListError::Construct("nope")));
        assert_eq!(collect(&list), vec![1]);

        list.try_push_back_with(|| Ok::<_, &str>(2)).unwrap();
        assert_eq!(collect(&list), vec![1, 2]);
    }

    #[test]
    fn test_debug_and_eq() {
        let mut a = LinkedList::new();
        a.extend_back([1, 2]).unwrap();
        let mut b = LinkedList::new();
        b.extend_back([1, 2]).unwrap();

        assert_eq!(format!("{a:?}"), "[1, 2]");
        assert_eq!(a, b);
        b.pop_front();
        assert_ne!(a, b);
    }
}
