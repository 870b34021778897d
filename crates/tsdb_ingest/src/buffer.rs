//! Fixed-capacity ring buffer with FIFO semantics.
//!
//! Storage is `capacity + 1` slots. One slot is always vacant so that `head == tail` means
//! empty and `tail + 1 == head` (mod slot count) means full, without a separate flag. The
//! occupied range is the circular half-open interval `(head, tail]`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;

use tracing::trace;

use crate::error::BufferError;

/// What `append` does when the buffer is already full.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum OverflowPolicy {
    /// Drop the oldest element to make room.
    #[default]
    EvictOldest,
    /// Refuse the new element and leave the buffer unchanged.
    RejectOnFull,
}

/// Bounded history of the most recently appended values.
///
/// Not synchronized; wrap it in a lock if several threads share one buffer.
#[derive(Clone)]
pub struct HistoryBuffer<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    policy: OverflowPolicy,
}

impl<T> HistoryBuffer<T> {
    /// Empty buffer that evicts the oldest value on overflow.
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        Self::with_policy(capacity, OverflowPolicy::EvictOldest)
    }

    pub fn with_policy(capacity: usize, policy: OverflowPolicy) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::ZeroCapacity);
        }
        let slots = std::iter::repeat_with(|| None)
            .take(capacity + 1)
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(Self {
            slots,
            head: 0,
            tail: 0,
            policy,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        (self.tail + self.slots.len() - self.head) % self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Logical index 0 is the oldest element.
    pub fn get(&self, index: usize) -> Result<&T, BufferError> {
        let len = self.len();
        if index >= len {
            return Err(BufferError::IndexOutOfBounds { index, len });
        }
        self.slots[self.physical(index)]
            .as_ref()
            .ok_or(BufferError::IndexOutOfBounds { index, len })
    }

    /// Appends `value`, returning `false` only when the policy is
    /// [`OverflowPolicy::RejectOnFull`] and the buffer is full.
    pub fn append(&mut self, value: T) -> bool {
        if self.is_full() {
            match self.policy {
                OverflowPolicy::RejectOnFull => return false,
                OverflowPolicy::EvictOldest => {
                    self.head = self.wrap(self.head + 1);
                    self.slots[self.head] = None;
                    trace!(capacity = self.capacity(), "evicted oldest history entry");
                }
            }
        }
        self.tail = self.wrap(self.tail + 1);
        self.slots[self.tail] = Some(value);
        true
    }

    /// Like [`append`](Self::append), but a rejected value is an error.
    pub fn force_append(&mut self, value: T) -> Result<(), BufferError> {
        if self.append(value) {
            Ok(())
        } else {
            Err(BufferError::CapacityExceeded {
                capacity: self.capacity(),
            })
        }
    }

    pub fn pop_oldest(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.head = self.wrap(self.head + 1);
        self.slots[self.head].take()
    }

    pub fn peek_oldest(&self) -> Option<&T> {
        self.get(0).ok()
    }

    pub fn peek_newest(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.tail].as_ref()
    }

    /// Drops every element; capacity and policy are kept.
    pub fn clear(&mut self) {
        while self.pop_oldest().is_some() {}
        self.head = 0;
        self.tail = 0;
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            buffer: self,
            front: 0,
            back: self.len(),
        }
    }

    /// Owned copy of the contents, oldest first.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    fn physical(&self, index: usize) -> usize {
        self.wrap(self.head + index + 1)
    }

    fn wrap(&self, index: usize) -> usize {
        index % self.slots.len()
    }
}

impl<T: Clone> HistoryBuffer<T> {
    /// Buffer that starts full of `capacity` copies of `default`.
    pub fn filled(capacity: usize, policy: OverflowPolicy, default: T) -> Result<Self, BufferError> {
        Self::with_default(capacity, policy, default, true)
    }

    /// With `prefill == false` the buffer starts empty and `default` is unused.
    pub fn with_default(
        capacity: usize,
        policy: OverflowPolicy,
        default: T,
        prefill: bool,
    ) -> Result<Self, BufferError> {
        let mut buffer = Self::with_policy(capacity, policy)?;
        if prefill {
            for slot in buffer.slots.iter_mut().skip(1) {
                *slot = Some(default.clone());
            }
            buffer.tail = capacity;
        }
        Ok(buffer)
    }
}

impl<T: PartialEq> PartialEq for HistoryBuffer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.capacity() == other.capacity()
            && self.len() == other.len()
            && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for HistoryBuffer<T> {}

impl<T: Hash> Hash for HistoryBuffer<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.capacity().hash(state);
        self.len().hash(state);
        for item in self {
            item.hash(state);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for HistoryBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Extend<T> for HistoryBuffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            if !self.append(value) {
                break;
            }
        }
    }
}

impl<'a, T> IntoIterator for &'a HistoryBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over a [`HistoryBuffer`], oldest first.
pub struct Iter<'a, T> {
    buffer: &'a HistoryBuffer<T>,
    front: usize,
    back: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let buffer = self.buffer;
        let item = buffer.slots[buffer.physical(self.front)].as_ref();
        self.front += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        let buffer = self.buffer;
        buffer.slots[buffer.physical(self.back)].as_ref()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}
