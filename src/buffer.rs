use crate::error::{PipelineError, Result};
use crossbeam::queue::ArrayQueue;

/// Determines what a full ring store does with the next push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Evict the oldest unflushed value to make room for the new one
    #[default]
    OverwriteOldest,
    /// Keep the stored values and drop the incoming one
    RejectNew,
}

/// A fixed-capacity FIFO ring of values backed by crossbeam's lock-free ArrayQueue.
///
/// Pushes never block: when the store is full the [`OverflowPolicy`] decides
/// which value is lost, and that value is handed back to the caller.
#[derive(Debug)]
pub struct RingStore<T> {
    queue: ArrayQueue<T>,
    policy: OverflowPolicy,
}

impl<T> RingStore<T> {
    /// Create a new ring store with the specified capacity and overflow policy.
    ///
    /// Fails with [`PipelineError::InvalidCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Result<Self> {
        if capacity == 0 {
            return Err(PipelineError::InvalidCapacity);
        }

        Ok(Self {
            queue: ArrayQueue::new(capacity),
            policy,
        })
    }

    /// Push a value, returning the value lost to overflow, if any.
    ///
    /// Under `OverwriteOldest` that is the evicted head of the ring; under
    /// `RejectNew` it is `item` itself.
    pub fn push(&self, item: T) -> Option<T> {
        match self.policy {
            OverflowPolicy::OverwriteOldest => self.queue.force_push(item),
            OverflowPolicy::RejectNew => self.queue.push(item).err(),
        }
    }

    /// Pop the oldest value
    pub fn pop(&self) -> Option<T> {
        self.queue.pop()
    }

    /// Pop every stored value in FIFO order
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || self.queue.pop())
    }

    /// Get current number of stored values
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if the store holds no unflushed values
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Check if the next push overflows
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    /// Get the store capacity
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Get the overflow policy
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        let result = RingStore::<i64>::new(0, OverflowPolicy::OverwriteOldest);
        assert!(matches!(result, Err(PipelineError::InvalidCapacity)));
    }

    #[test]
    fn test_push_pop_fifo() {
        let store = RingStore::new(5, OverflowPolicy::OverwriteOldest).unwrap();
        for i in 1..=5 {
            assert_eq!(store.push(i), None);
        }
        assert!(store.is_full());

        let popped: Vec<i64> = (0..5).filter_map(|_| store.pop()).collect();
        assert_eq!(popped, vec![1, 2, 3, 4, 5]);
        assert!(store.is_empty());
        assert_eq!(store.pop(), None);
    }

    #[test]
    fn test_is_empty_tracks_unpopped() {
        let store = RingStore::new(2, OverflowPolicy::OverwriteOldest).unwrap();
        assert!(store.is_empty());
        store.push(7);
        assert!(!store.is_empty());
        store.push(8);
        store.pop();
        assert!(!store.is_empty());
        store.pop();
        assert!(store.is_empty());
    }

    #[test]
    fn test_overwrite_oldest_policy() {
        let store = RingStore::new(3, OverflowPolicy::OverwriteOldest).unwrap();
        store.push(1);
        store.push(2);
        store.push(3);
        assert_eq!(store.push(4), Some(1));
        assert_eq!(store.push(5), Some(2));
        assert_eq!(store.len(), 3);

        let remaining: Vec<i64> = store.drain().collect();
        assert_eq!(remaining, vec![3, 4, 5]);
    }

    #[test]
    fn test_reject_new_policy() {
        let store = RingStore::new(3, OverflowPolicy::RejectNew).unwrap();
        store.push(1);
        store.push(2);
        store.push(3);
        assert_eq!(store.push(4), Some(4));

        let remaining: Vec<i64> = store.drain().collect();
        assert_eq!(remaining, vec![1, 2, 3]);
    }

    #[test]
    fn test_wraparound_after_partial_drain() {
        let store = RingStore::new(3, OverflowPolicy::OverwriteOldest).unwrap();
        store.push(1);
        store.push(2);
        assert_eq!(store.pop(), Some(1));
        store.push(3);
        store.push(4);
        assert_eq!(store.push(5), Some(2));
        assert_eq!(store.drain().collect::<Vec<i64>>(), vec![3, 4, 5]);
    }

    #[test]
    fn test_capacity_and_default_policy() {
        let store: RingStore<i64> = RingStore::new(24, OverflowPolicy::default()).unwrap();
        assert_eq!(store.capacity(), 24);
        assert_eq!(store.policy(), OverflowPolicy::OverwriteOldest);
    }
}
