//! Indexable priority queues.
//!
//! A plain binary heap can only pop its minimum. The simplifier also needs to
//! re-prioritise or evict an arbitrary element (the cost entry of a specific
//! triangle) in `O(log n)`. The queues in this module support that by telling
//! the caller where every element lives: each time an element is placed into
//! a heap slot, the queue invokes an [`IndexSetter`] with the element and its
//! new slot. The caller keeps a side table (for example `triangle -> slot`)
//! and later passes the slot to [`MutableQueue::remove`] or
//! [`MutableQueue::update`]. The queues never search by value.
//!
//! Two layouts share the [`MutableQueue`] contract:
//!
//! - [`MutablePriorityQueue`]: a classic implicit binary heap.
//! - [`MutableSkipHeapPriorityQueue`]: the same heap organised as a tree of
//!   fixed-size blocks ("miniheaps", see [`SkipHeapAddressing`]) so that one
//!   sift touches fewer cache lines.
//!
//! Elements must be `Copy`: they are plain values moved around the heap by
//! bitwise copies and never own resources.
//!
//! # Example
//!
//! ```
//! use meshslim::queue::{MutablePriorityQueue, MutableQueue};
//!
//! #[derive(Clone, Copy)]
//! struct Entry {
//!     cost: f32,
//!     id: usize,
//! }
//!
//! let mut slots = vec![usize::MAX; 3];
//! let mut queue = MutablePriorityQueue::new(
//!     |e: &Entry, slot: usize| slots[e.id] = slot,
//!     |a: &Entry, b: &Entry| a.cost < b.cost,
//! );
//! queue.push(Entry { cost: 3.0, id: 0 });
//! queue.push(Entry { cost: 1.0, id: 1 });
//! queue.push(Entry { cost: 2.0, id: 2 });
//! assert_eq!(queue.pop().id, 1);
//! assert_eq!(queue.top().id, 2);
//! ```

mod mutable;
mod skip_heap;

pub use mutable::MutablePriorityQueue;
pub use skip_heap::{MutableSkipHeapPriorityQueue, SkipHeapAddressing};

/// Receives the current heap slot of an element every time it moves.
///
/// Implemented for any `FnMut(&T, usize)` closure.
pub trait IndexSetter<T> {
    /// Record that `item` now lives at heap slot `index`.
    ///
    /// Queues created with "reset index when removed" report `usize::MAX`
    /// for elements that left the queue.
    fn set_index(&mut self, item: &T, index: usize);
}

impl<T, F> IndexSetter<T> for F
where
    F: FnMut(&T, usize),
{
    #[inline]
    fn set_index(&mut self, item: &T, index: usize) {
        self(item, index)
    }
}

/// Slot value reported to the [`IndexSetter`] for removed elements when the
/// queue resets indices on removal.
pub const REMOVED_INDEX: usize = usize::MAX;

/// Common contract of the indexable min-queues.
///
/// Ordering is defined by a caller supplied `less` predicate. Equal keys are
/// popped in an unspecified order.
pub trait MutableQueue<T: Copy> {
    /// The index setter owned by the queue.
    type Setter: IndexSetter<T>;

    /// Insert an element.
    fn push(&mut self, item: T);

    /// The minimum element.
    ///
    /// # Panics
    /// Panics if the queue is empty.
    fn top(&self) -> &T;

    /// Remove and return the minimum element.
    ///
    /// # Panics
    /// Panics if the queue is empty.
    fn pop(&mut self) -> T;

    /// Remove the element currently stored at heap slot `index`.
    ///
    /// `index` must be the value most recently reported for that element by
    /// the index setter.
    fn remove(&mut self, index: usize) -> T;

    /// Restore heap order after the element at `index` was changed in place
    /// through [`get_mut`](Self::get_mut).
    fn update(&mut self, index: usize);

    /// The element at heap slot `index`.
    fn get(&self, index: usize) -> &T;

    /// Mutable access to the element at heap slot `index`; call
    /// [`update`](Self::update) afterwards if its key changed.
    fn get_mut(&mut self, index: usize) -> &mut T;

    /// Number of queued elements.
    fn len(&self) -> usize;

    /// Returns true if no element is queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserve room for at least `additional` more elements.
    fn reserve(&mut self, additional: usize);

    /// Remove every element.
    fn clear(&mut self);

    /// The index setter, e.g. to read a side table it maintains.
    fn index_setter(&self) -> &Self::Setter;
}
