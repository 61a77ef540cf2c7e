//! Bounded FIFO registry.
//!
//! Sessions track the query handles they created in a [`BoundedQueue`]. Once
//! the queue is full, registering a new handle pushes out the oldest one,
//! which the caller closes through the eviction callback.

mod stats;

pub use stats::RegistryStats;

use std::collections::VecDeque;

use prettysql_common::MIN_MAX_LIVE_QUERIES;

/// A fixed-capacity first-in first-out queue.
///
/// # Example
///
/// ```
/// use prettysql_client::registry::BoundedQueue;
///
/// let mut queue = BoundedQueue::new(2);
/// queue.offer("a", |_| {});
/// queue.offer("b", |_| {});
///
/// // A third item evicts "a" (oldest)
/// let mut evicted = Vec::new();
/// queue.offer("c", |old| evicted.push(old));
/// assert_eq!(evicted, vec!["a"]);
/// assert_eq!(queue.len(), 2);
/// ```
#[derive(Debug)]
pub struct BoundedQueue<T> {
    /// Maximum number of items.
    capacity: usize,
    /// Items, oldest first.
    items: VecDeque<T>,
    /// Statistics.
    stats: RegistryStats,
}

impl<T> BoundedQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    ///
    /// Storage grows with the number of items, not with `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(MIN_MAX_LIVE_QUERIES),
            items: VecDeque::new(),
            stats: RegistryStats::new(),
        }
    }

    /// Appends `item`, returning the oldest item if the queue was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.stats.record_eviction();
            self.items.pop_front()
        } else {
            None
        };

        self.items.push_back(item);
        self.stats.record_registration();
        evicted
    }

    /// Appends `item`, handing the evicted item, if any, to `on_evict`.
    pub fn offer(&mut self, item: T, on_evict: impl FnOnce(T)) {
        if let Some(evicted) = self.push(item) {
            on_evict(evicted);
        }
    }

    /// Removes every item, oldest first, handing each to `on_release`.
    pub fn release(&mut self, mut on_release: impl FnMut(T)) {
        let count = self.items.len() as u64;
        for item in self.items.drain(..) {
            on_release(item);
        }
        if count > 0 {
            self.stats.record_releases(count);
        }
    }

    /// Iterates items, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the statistics.
    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_to_capacity() {
        let mut queue = BoundedQueue::new(3);
        for i in 0..3 {
            assert_eq!(queue.push(i), None);
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut queue = BoundedQueue::new(16);
        let mut evicted = Vec::new();
        for i in 1..=17 {
            queue.offer(i, |old| evicted.push(old));
        }
        assert_eq!(evicted, vec![1]);
        assert_eq!(queue.len(), 16);
        assert_eq!(queue.iter().next(), Some(&2));
        assert_eq!(queue.stats().registrations(), 17);
        assert_eq!(queue.stats().evictions(), 1);
    }

    #[test]
    fn test_minimum_capacity() {
        let mut queue = BoundedQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        queue.push("a");
        assert_eq!(queue.push("b"), Some("a"));
    }

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        let mut queue = BoundedQueue::new(usize::MAX);
        assert_eq!(queue.capacity(), usize::MAX);
        assert_eq!(queue.push(1), None);
        assert_eq!(queue.push(2), None);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.stats().evictions(), 0);
    }

    #[test]
    fn test_release() {
        let mut queue = BoundedQueue::new(4);
        queue.push(1);
        queue.push(2);

        let mut released = Vec::new();
        queue.release(|item| released.push(item));
        assert_eq!(released, vec![1, 2]);
        assert!(queue.is_empty());
        assert_eq!(queue.stats().releases(), 2);

        queue.release(|_| panic!("queue is empty"));
        assert_eq!(queue.stats().releases(), 2);
    }
}
