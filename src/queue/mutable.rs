//! Implicit binary min-heap with slot tracking.

use super::{IndexSetter, MutableQueue, REMOVED_INDEX};

/// Binary min-heap whose elements can be removed or re-keyed by slot.
///
/// Slots are 0-based; the children of slot `i` are `2i + 1` and `2i + 2`.
/// Every time an element is written to a slot the [`IndexSetter`] is told.
///
/// With `RESET_INDEX_WHEN_REMOVED` set, elements leaving the queue are
/// reported once more with [`REMOVED_INDEX`].
pub struct MutablePriorityQueue<T, S, L, const RESET_INDEX_WHEN_REMOVED: bool = false> {
    heap: Vec<T>,
    index_setter: S,
    less: L,
}

impl<T, S, L> MutablePriorityQueue<T, S, L, false>
where
    T: Copy,
    S: IndexSetter<T>,
    L: Fn(&T, &T) -> bool,
{
    /// Create an empty queue ordered by `less`.
    pub fn new(index_setter: S, less: L) -> Self {
        Self {
            heap: Vec::new(),
            index_setter,
            less,
        }
    }
}

impl<T, S, L> MutablePriorityQueue<T, S, L, true>
where
    T: Copy,
    S: IndexSetter<T>,
    L: Fn(&T, &T) -> bool,
{
    /// Create an empty queue that reports [`REMOVED_INDEX`] for elements
    /// leaving it.
    pub fn with_index_reset(index_setter: S, less: L) -> Self {
        Self {
            heap: Vec::new(),
            index_setter,
            less,
        }
    }
}

impl<T, S, L, const RESET: bool> MutablePriorityQueue<T, S, L, RESET>
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
        while index > 0 {
            let parent = (index - 1) / 2;
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
            let mut child = 2 * index + 1;
            if child >= len {
                break;
            }
            if child + 1 < len && (self.less)(&self.heap[child + 1], &self.heap[child]) {
                child += 1;
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

impl<T, S, L, const RESET: bool> MutableQueue<T> for MutablePriorityQueue<T, S, L, RESET>
where
    T: Copy,
    S: IndexSetter<T>,
    L: Fn(&T, &T) -> bool,
{
    type Setter = S;

    fn push(&mut self, item: T) {
        self.heap.push(item);
        self.sift_up(self.heap.len() - 1);
    }

    #[inline]
    fn top(&self) -> &T {
        &self.heap[0]
    }

    fn pop(&mut self) -> T {
        self.remove(0)
    }

    fn remove(&mut self, index: usize) -> T {
        let item = self.heap.swap_remove(index);
        if index < self.heap.len() {
            self.update(index);
        }
        if RESET {
            self.index_setter.set_index(&item, REMOVED_INDEX);
        }
        item
    }

    fn update(&mut self, index: usize) {
        debug_assert!(index < self.heap.len());
        if index > 0 && (self.less)(&self.heap[index], &self.heap[(index - 1) / 2]) {
            self.sift_up(index);
        } else {
            self.sift_down(index);
        }
    }

    #[inline]
    fn get(&self, index: usize) -> &T {
        &self.heap[index]
    }

    #[inline]
    fn get_mut(&mut self, index: usize) -> &mut T {
        &mut self.heap[index]
    }

    #[inline]
    fn len(&self) -> usize {
        self.heap.len()
    }

    fn reserve(&mut self, additional: usize) {
        self.heap.reserve(additional);
    }

    fn clear(&mut self) {
        if RESET {
            for item in &self.heap {
                self.index_setter.set_index(item, REMOVED_INDEX);
            }
        }
        self.heap.clear();
    }

    #[inline]
    fn index_setter(&self) -> &S {
        &self.index_setter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Entry {
        cost: f32,
        id: usize,
    }

    struct Slots(Vec<usize>);

    impl IndexSetter<Entry> for Slots {
        fn set_index(&mut self, item: &Entry, index: usize) {
            self.0[item.id] = index;
        }
    }

    fn by_cost(a: &Entry, b: &Entry) -> bool {
        a.cost < b.cost
    }

    fn filled(costs: &[f32]) -> MutablePriorityQueue<Entry, Slots, fn(&Entry, &Entry) -> bool> {
        let less: fn(&Entry, &Entry) -> bool = by_cost;
        let mut queue = MutablePriorityQueue::new(Slots(vec![usize::MAX; costs.len()]), less);
        for (id, &cost) in costs.iter().enumerate() {
            queue.push(Entry { cost, id });
        }
        queue
    }

    #[test]
    fn test_slots_follow_elements() {
        let queue = filled(&[4.0, 2.0, 8.0, 1.0, 5.0]);
        for (id, &slot) in queue.index_setter().0.iter().enumerate() {
            assert_eq!(queue.get(slot).id, id);
        }
        assert_eq!(queue.top().id, 3);
    }

    #[test]
    fn test_remove_by_slot() {
        let mut queue = filled(&[4.0, 2.0, 8.0, 1.0, 5.0]);
        let slot = queue.index_setter().0[1];
        let removed = queue.remove(slot);
        assert_eq!(removed.id, 1);
        assert_eq!(queue.len(), 4);

        let mut order = Vec::new();
        while !queue.is_empty() {
            order.push(queue.pop().id);
        }
        assert_eq!(order, vec![3, 0, 4, 2]);
    }

    #[test]
    fn test_update_moves_both_ways() {
        let mut queue = filled(&[4.0, 2.0, 8.0, 1.0, 5.0]);

        let slot = queue.index_setter().0[2];
        queue.get_mut(slot).cost = 0.5;
        queue.update(slot);
        assert_eq!(queue.top().id, 2);

        let slot = queue.index_setter().0[2];
        queue.get_mut(slot).cost = 10.0;
        queue.update(slot);
        assert_eq!(queue.top().id, 3);
        assert_eq!(queue.pop().id, 3);
        assert_eq!(queue.pop().id, 1);
    }

    #[test]
    fn test_reset_index_when_removed() {
        let mut queue = MutablePriorityQueue::with_index_reset(Slots(vec![0; 3]), by_cost);
        for (id, cost) in [3.0, 1.0, 2.0].into_iter().enumerate() {
            queue.push(Entry { cost, id });
        }
        assert_eq!(queue.pop().id, 1);
        assert_eq!(queue.index_setter().0[1], REMOVED_INDEX);

        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.index_setter().0.iter().all(|&s| s == REMOVED_INDEX));
    }

    #[test]
    #[should_panic]
    fn test_top_of_empty_panics() {
        let queue = filled(&[]);
        queue.top();
    }
}
