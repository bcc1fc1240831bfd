//! Fixed-capacity buffer with oldest-first eviction
//!
//! Single-writer-at-a-time semantics behind an interior lock so length and
//! ordering stay consistent under concurrent producers.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Bounded FIFO buffer.
///
/// Capacity is fixed at construction and never changes. When a push would
/// exceed capacity the single oldest element is evicted first, so length is
/// always `<= capacity`.
#[derive(Debug)]
pub struct BoundedBuffer<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T: Clone> BoundedBuffer<T> {
    /// Create a buffer holding at most `capacity` elements (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append `value`, evicting the oldest element when full.
    pub fn push(&self, value: T) {
        let mut inner = self.inner.lock();
        if inner.len() == self.capacity {
            inner.pop_front();
        }
        inner.push_back(value);
    }

    /// Copy of the current contents in insertion order.
    ///
    /// Taken under the lock, so callers never observe a mutation in progress.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.lock().iter().cloned().collect()
    }

    /// Current number of elements.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Maximum number of elements.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
