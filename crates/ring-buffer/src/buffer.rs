//! Lock-Free Ring Buffer Implementation

use crate::QueueError;
use crossbeam::utils::{Backoff, CachePadded};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Park interval once the spin/yield phase of a blocking call is exhausted
const PARK_INTERVAL: Duration = Duration::from_micros(100);

/// Fixed-capacity ring storage shared by one producer and one consumer.
///
/// Cursors increase monotonically and wrap on overflow; the slot index is the
/// cursor modulo capacity. `head - tail` is the number of stored items.
struct RingBuffer<T> {
    /// Pre-allocated storage, never resized
    storage: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// Capacity of the buffer
    capacity: usize,
    /// Head position (write cursor), mutated only by the producer
    head: CachePadded<AtomicUsize>,
    /// Tail position (read cursor), mutated only by the consumer
    tail: CachePadded<AtomicUsize>,
}

// SAFETY: a slot is written only by the producer while it is outside the
// consumer's readable range, and read only by the consumer while it is inside
// it. The Release store of a cursor publishes the slot access that preceded it.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        let storage: Vec<_> = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        Ok(Self {
            storage: storage.into_boxed_slice(),
            capacity,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    /// Producer side only.
    fn try_push(&self, item: T) -> Result<(), T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) == self.capacity {
            return Err(item);
        }

        // SAFETY: the slot at `head` is outside the readable range, and only
        // the single producer writes slots.
        unsafe {
            (*self.storage[head % self.capacity].get()).write(item);
        }

        self.head.store(head.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Consumer side only.
    fn try_pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if head == tail {
            return None;
        }

        // SAFETY: the slot at `tail` was initialised by the producer before
        // the Acquire-observed head store, and only the consumer reads it.
        let item = unsafe { (*self.storage[tail % self.capacity].get()).assume_init_read() };

        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(item)
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        let head = *self.head.get_mut();
        let mut tail = *self.tail.get_mut();
        while tail != head {
            // SAFETY: every slot in [tail, head) holds an initialised item.
            unsafe {
                self.storage[tail % self.capacity].get_mut().assume_init_drop();
            }
            tail = tail.wrapping_add(1);
        }
    }
}

/// Wait step shared by the blocking calls: spin, then yield, then park briefly.
fn wait(backoff: &Backoff) {
    if backoff.is_completed() {
        std::thread::park_timeout(PARK_INTERVAL);
    } else {
        backoff.snooze();
    }
}

/// Create a bounded SPSC queue with the given fixed capacity
pub fn channel<T>(capacity: usize) -> Result<(Producer<T>, Consumer<T>), QueueError> {
    let buffer = Arc::new(RingBuffer::new(capacity)?);
    Ok((
        Producer {
            buffer: Arc::clone(&buffer),
        },
        Consumer { buffer },
    ))
}

/// Writing end of a ring buffer
pub struct Producer<T> {
    buffer: Arc<RingBuffer<T>>,
}

impl<T> Producer<T> {
    /// Push without blocking.
    ///
    /// When the queue is full the item is handed back and neither the
    /// contents nor the cursors change.
    #[inline]
    pub fn try_push(&mut self, item: T) -> Result<(), T> {
        self.buffer.try_push(item)
    }

    /// Push, waiting for the consumer to free a slot if the queue is full
    pub fn push_blocking(&mut self, item: T) {
        let backoff = Backoff::new();
        let mut item = item;
        loop {
            match self.buffer.try_push(item) {
                Ok(()) => return,
                Err(rejected) => {
                    item = rejected;
                    wait(&backoff);
                }
            }
        }
    }

    /// Number of items currently queued
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.len() == self.buffer.capacity
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.buffer.capacity
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.len() as f64 / self.buffer.capacity as f64
    }
}

/// Reading end of a ring buffer
pub struct Consumer<T> {
    buffer: Arc<RingBuffer<T>>,
}

impl<T> Consumer<T> {
    /// Pop the oldest item without blocking
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        self.buffer.try_pop()
    }

    /// Pop the oldest item, waiting for the producer if the queue is empty
    pub fn pop_blocking(&mut self) -> T {
        let backoff = Backoff::new();
        loop {
            if let Some(item) = self.buffer.try_pop() {
                return item;
            }
            wait(&backoff);
        }
    }

    /// Number of items currently queued
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.buffer.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(channel::<u8>(0).err(), Some(QueueError::ZeroCapacity));
    }

    #[test]
    fn test_push_and_pop() {
        let (mut tx, mut rx) = channel(4).unwrap();

        for i in 0..3 {
            tx.try_push(i).unwrap();
        }

        assert_eq!(rx.len(), 3);
        assert_eq!(rx.try_pop(), Some(0));
        assert_eq!(rx.try_pop(), Some(1));
        assert_eq!(rx.try_pop(), Some(2));
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_full_push_is_rejected_without_side_effects() {
        let (mut tx, mut rx) = channel(3).unwrap();
        for i in 0..3 {
            tx.try_push(i).unwrap();
        }
        assert!(tx.is_full());

        assert_eq!(tx.try_push(99), Err(99));
        assert_eq!(tx.try_push(100), Err(100));
        assert_eq!(tx.len(), 3);

        let drained: Vec<_> = std::iter::from_fn(|| rx.try_pop()).collect();
        assert_eq!(drained, vec![0, 1, 2]);
    }

    #[test]
    fn test_wraps_around_capacity() {
        let (mut tx, mut rx) = channel(3).unwrap();

        for round in 0..10 {
            tx.try_push(round * 2).unwrap();
            tx.try_push(round * 2 + 1).unwrap();
            assert_eq!(rx.try_pop(), Some(round * 2));
            assert_eq!(rx.try_pop(), Some(round * 2 + 1));
        }
        assert!(rx.is_empty());
    }

    #[test]
    fn test_fill_ratio() {
        let (mut tx, _rx) = channel(4).unwrap();
        assert_eq!(tx.fill_ratio(), 0.0);

        tx.try_push(1.0f32).unwrap();
        tx.try_push(2.0f32).unwrap();

        assert!((tx.fill_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_remaining_items_dropped_with_queue() {
        let marker = Arc::new(());
        {
            let (mut tx, rx) = channel(4).unwrap();
            tx.try_push(Arc::clone(&marker)).unwrap();
            tx.try_push(Arc::clone(&marker)).unwrap();
            assert_eq!(Arc::strong_count(&marker), 3);
            drop(rx);
        }
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn test_blocking_handoff_across_threads() {
        let (mut tx, mut rx) = channel(8).unwrap();
        let count = 10_000u32;

        let producer = thread::spawn(move || {
            for i in 0..count {
                tx.push_blocking(i);
            }
        });

        for expected in 0..count {
            assert_eq!(rx.pop_blocking(), expected);
        }
        producer.join().unwrap();
        assert!(rx.try_pop().is_none());
    }

    proptest! {
        #[test]
        fn prop_fifo_round_trip(items in proptest::collection::vec(any::<f32>(), 0..64)) {
            let (mut tx, mut rx) = channel(64).unwrap();
            for item in &items {
                prop_assert!(tx.try_push(*item).is_ok());
            }
            let popped: Vec<f32> = (0..items.len()).map(|_| rx.pop_blocking()).collect();
            prop_assert_eq!(
                popped.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
                items.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
            );
        }

        #[test]
        fn prop_rejected_push_keeps_contents(capacity in 1usize..16, extra in 1usize..8) {
            let (mut tx, mut rx) = channel(capacity).unwrap();
            for i in 0..capacity {
                tx.try_push(i).unwrap();
            }
            for i in 0..extra {
                prop_assert_eq!(tx.try_push(1000 + i), Err(1000 + i));
                prop_assert_eq!(tx.len(), capacity);
            }
            let drained: Vec<_> = std::iter::from_fn(|| rx.try_pop()).collect();
            prop_assert_eq!(drained, (0..capacity).collect::<Vec<_>>());
        }
    }
}
