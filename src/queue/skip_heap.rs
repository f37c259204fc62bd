//! Cache-friendly heap made of fixed-size miniheap blocks.
//!
//! The backing array is cut into blocks of `BLOCK_SIZE` slots. Inside a
//! block, slot 0 is an unused padding slot and slots `1..BLOCK_SIZE` hold a
//! complete binary miniheap rooted at slot 1 whose leaves are the upper half
//! of the block. Each leaf has two child blocks, so the blocks themselves
//! form a `BLOCK_SIZE`-ary tree: the children of block `b` are blocks
//! `b * BLOCK_SIZE + 1 ..= b * BLOCK_SIZE + BLOCK_SIZE`.
//!
//! Descending a few levels inside one block stays inside one cache line,
//! which is where the layout gains over a flat binary heap.

use super::{IndexSetter, MutableQueue, REMOVED_INDEX};

/// Address arithmetic of the skip-heap layout.
///
/// `BLOCK_SIZE` must be a power of two of at least 2.
///
/// ```
/// use meshslim::queue::SkipHeapAddressing;
///
/// type A = SkipHeapAddressing<4>;
/// assert!(A::is_block_root(1));
/// assert_eq!(A::child_of(1), 2);
/// // Leaves jump to the root of a child block.
/// assert_eq!(A::child_of(2), 5);
/// assert_eq!(A::next_sibling(5), 9);
/// assert_eq!(A::parent_of(9), 2);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipHeapAddressing<const BLOCK_SIZE: usize>;

impl<const BLOCK_SIZE: usize> SkipHeapAddressing<BLOCK_SIZE> {
    const VALID: () = assert!(
        BLOCK_SIZE >= 2 && BLOCK_SIZE.is_power_of_two(),
        "block size must be a power of two >= 2"
    );

    /// `log2(BLOCK_SIZE)`.
    pub const BITS: usize = BLOCK_SIZE.trailing_zeros() as usize;
    /// Mask selecting the slot offset inside a block.
    pub const MASK: usize = BLOCK_SIZE - 1;
    /// Offset of the first leaf inside a block (also the number of leaves).
    pub const LEAFS: usize = BLOCK_SIZE / 2;
    /// Address of the heap root.
    pub const ROOT: usize = 1;

    #[inline]
    fn block(node: usize) -> usize {
        node >> Self::BITS
    }

    #[inline]
    fn local(node: usize) -> usize {
        node & Self::MASK
    }

    /// The unused first slot of every block.
    #[inline]
    pub fn is_padding(node: usize) -> bool {
        Self::local(node) == 0
    }

    /// Root of a miniheap.
    #[inline]
    pub fn is_block_root(node: usize) -> bool {
        Self::local(node) == 1
    }

    /// Leaf of a miniheap; its children live in other blocks.
    #[inline]
    pub fn is_block_leaf(node: usize) -> bool {
        Self::local(node) >= Self::LEAFS
    }

    /// First child of `node`. The second child is
    /// [`next_sibling`](Self::next_sibling) of the result.
    #[inline]
    pub fn child_of(node: usize) -> usize {
        debug_assert!(!Self::is_padding(node));
        let local = Self::local(node);
        if local < Self::LEAFS {
            node + local
        } else {
            let child_block = Self::block(node) * BLOCK_SIZE + 1 + 2 * (local - Self::LEAFS);
            (child_block << Self::BITS) + 1
        }
    }

    /// The second child of a node, given its first child.
    #[inline]
    pub fn next_sibling(child: usize) -> usize {
        if Self::is_block_root(child) {
            child + BLOCK_SIZE
        } else {
            child + 1
        }
    }

    /// Parent of a non-root node.
    #[inline]
    pub fn parent_of(node: usize) -> usize {
        debug_assert!(node > Self::ROOT && !Self::is_padding(node));
        let local = Self::local(node);
        if local > 1 {
            (Self::block(node) << Self::BITS) + local / 2
        } else {
            let k = Self::block(node) - 1;
            ((k >> Self::BITS) << Self::BITS) + Self::LEAFS + (k & Self::MASK) / 2
        }
    }
}

/// Indexable min-heap using the [`SkipHeapAddressing`] layout.
///
/// Behaves exactly like [`MutablePriorityQueue`](super::MutablePriorityQueue)
/// except that the slots reported to the index setter are skip-heap
/// addresses (the root is slot 1, padding slots are never reported).
pub struct MutableSkipHeapPriorityQueue<
    T,
    S,
    L,
    const BLOCK_SIZE: usize,
    const RESET_INDEX_WHEN_REMOVED: bool = false,
> {
    heap: Vec<T>,
    index_setter: S,
    less: L,
}

impl<T, S, L, const BLOCK_SIZE: usize> MutableSkipHeapPriorityQueue<T, S, L, BLOCK_SIZE, false>
where
    T: Copy,
    S: IndexSetter<T>,
    L: Fn(&T, &T) -> bool,
{
    /// Create an empty queue ordered by `less`.
    pub fn new(index_setter: S, less: L) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = SkipHeapAddressing::<BLOCK_SIZE>::VALID;
        Self {
            heap: Vec::new(),
            index_setter,
            less,
        }
    }
}

impl<T, S, L, const BLOCK_SIZE: usize> MutableSkipHeapPriorityQueue<T, S, L, BLOCK_SIZE, true>
where
    T: Copy,
    S: IndexSetter<T>,
    L: Fn(&T, &T) -> bool,
{
    /// Create an empty queue that reports [`REMOVED_INDEX`] for elements
    /// leaving it.
    pub fn with_index_reset(index_setter: S, less: L) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = SkipHeapAddressing::<BLOCK_SIZE>::VALID;
        Self {
            heap: Vec::new(),
            index_setter,
            less,
        }
    }
}

impl<T, S, L, const BLOCK_SIZE: usize, const RESET: bool>
    MutableSkipHeapPriorityQueue<T, S, L, BLOCK_SIZE, RESET>
where
    T: Copy,
    S: IndexSetter<T>,
    L: Fn(&T, &T) -> bool,
{
    #[inline]
    fn set(&mut self, index: usize, item: T) {
        self.heap[index] = item;
        self.index_setter.set_index(&item, index);
    }

    fn sift_up(&mut self, mut index: usize) {
        let item = self.heap[index];
        while index != SkipHeapAddressing::<BLOCK_SIZE>::ROOT {
            let parent = SkipHeapAddressing::<BLOCK_SIZE>::parent_of(index);
            let parent_item = self.heap[parent];
            if !(self.less)(&item, &parent_item) {
                break;
            }
            self.set(index, parent_item);
            index = parent;
        }
        self.set(index, item);
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        let item = self.heap[index];
        loop {
            let mut child = SkipHeapAddressing::<BLOCK_SIZE>::child_of(index);
            if child >= len {
                break;
            }
            let sibling = SkipHeapAddressing::<BLOCK_SIZE>::next_sibling(child);
            if sibling < len && (self.less)(&self.heap[sibling], &self.heap[child]) {
                child = sibling;
            }
            let child_item = self.heap[child];
            if !(self.less)(&child_item, &item) {
                break;
            }
            self.set(index, child_item);
            index = child;
        }
        self.set(index, item);
    }
}

impl<T, S, L, const BLOCK_SIZE: usize, const RESET: bool> MutableQueue<T>
    for MutableSkipHeapPriorityQueue<T, S, L, BLOCK_SIZE, RESET>
where
    T: Copy,
    S: IndexSetter<T>,
    L: Fn(&T, &T) -> bool,
{
    type Setter = S;

    fn push(&mut self, item: T) {
        if self.heap.len() & SkipHeapAddressing::<BLOCK_SIZE>::MASK == 0 {
            // Padding slot; its content is never read.
            self.heap.push(item);
        }
        self.heap.push(item);
        self.sift_up(self.heap.len() - 1);
    }

    #[inline]
    fn top(&self) -> &T {
        assert!(!self.is_empty(), "top() on an empty queue");
        &self.heap[SkipHeapAddressing::<BLOCK_SIZE>::ROOT]
    }

    fn pop(&mut self) -> T {
        assert!(!self.is_empty(), "pop() on an empty queue");
        self.remove(SkipHeapAddressing::<BLOCK_SIZE>::ROOT)
    }

    fn remove(&mut self, index: usize) -> T {
        debug_assert!(!SkipHeapAddressing::<BLOCK_SIZE>::is_padding(index));
        let item = self.heap[index];
        let last = self.heap.len() - 1;
        let moved = self.heap[last];
        self.heap.truncate(last);
        if self.heap.len() & SkipHeapAddressing::<BLOCK_SIZE>::MASK == 1 {
            // Only the padding of the last block is left.
            self.heap.truncate(self.heap.len() - 1);
        }
        if index < last {
            self.heap[index] = moved;
            self.update(index);
        }
        if RESET {
            self.index_setter.set_index(&item, REMOVED_INDEX);
        }
        item
    }

    fn update(&mut self, index: usize) {
        debug_assert!(index < self.heap.len() && !SkipHeapAddressing::<BLOCK_SIZE>::is_padding(index));
        if index != SkipHeapAddressing::<BLOCK_SIZE>::ROOT
            && (self.less)(
                &self.heap[index],
                &self.heap[SkipHeapAddressing::<BLOCK_SIZE>::parent_of(index)],
            )
        {
            self.sift_up(index);
        } else {
            self.sift_down(index);
        }
    }

    #[inline]
    fn get(&self, index: usize) -> &T {
        debug_assert!(!SkipHeapAddressing::<BLOCK_SIZE>::is_padding(index));
        &self.heap[index]
    }

    #[inline]
    fn get_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(!SkipHeapAddressing::<BLOCK_SIZE>::is_padding(index));
        &mut self.heap[index]
    }

    #[inline]
    fn len(&self) -> usize {
        let slots = self.heap.len();
        slots - slots.div_ceil(BLOCK_SIZE)
    }

    fn reserve(&mut self, additional: usize) {
        let padding = additional / (BLOCK_SIZE - 1) + 1;
        self.heap.reserve(additional + padding);
    }

    fn clear(&mut self) {
        if RESET {
            for (index, item) in self.heap.iter().enumerate() {
                if !SkipHeapAddressing::<BLOCK_SIZE>::is_padding(index) {
                    self.index_setter.set_index(item, REMOVED_INDEX);
                }
            }
        }
        self.heap.clear();
    }

    #[inline]
    fn index_setter(&self) -> &S {
        &self.index_setter
    }
}
