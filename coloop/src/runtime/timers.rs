use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::task::Waker;
use std::time::Instant;

/// Ordered set of `(expiry, waker)` entries consulted by the loop when no
/// frame is ready.
///
/// Entries with the same expiry may come out in any order. A [`Loop`] uses
/// [`TimerHeap`] unless another implementation is given to
/// [`Builder::wait_set`].
///
/// [`Loop`]: crate::Loop
/// [`Builder::wait_set`]: crate::Builder::wait_set
pub trait WaitSet: fmt::Debug {
    fn insert(&mut self, expiry: Instant, waker: Waker);

    /// Expiry of the earliest entry.
    fn peek(&self) -> Option<Instant>;

    /// Removes and returns the earliest entry.
    fn pop(&mut self) -> Option<TimerEntry>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct TimerEntry {
    pub expiry: Instant,
    pub waker: Waker,
}

/// Binary min-heap keyed on expiry. Entries with equal expiry come out in
/// insertion order.
#[derive(Debug, Default)]
pub struct TimerHeap {
    heap: BinaryHeap<Reverse<HeapEntry>>,
    seq: u64,
}

#[derive(Debug)]
struct HeapEntry {
    expiry: Instant,
    seq: u64,
    waker: Waker,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.expiry, self.seq).cmp(&(other.expiry, other.seq))
    }
}

impl TimerHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            seq: 0,
        }
    }
}

impl WaitSet for TimerHeap {
    fn insert(&mut self, expiry: Instant, waker: Waker) {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        self.heap.push(Reverse(HeapEntry { expiry, seq, waker }));
    }

    fn peek(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(entry)| entry.expiry)
    }

    fn pop(&mut self) -> Option<TimerEntry> {
        self.heap.pop().map(|Reverse(entry)| TimerEntry {
            expiry: entry.expiry,
            waker: entry.waker,
        })
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock_waker;
    use std::time::Duration;

    #[test]
    fn test_pops_earliest_first() {
        let now = Instant::now();
        let mut timers = TimerHeap::new();
        assert!(timers.is_empty());
        assert_eq!(timers.peek(), None);

        let (waker, data) = mock_waker();
        for ms in [30, 10, 20] {
            timers.insert(now + Duration::from_millis(ms), waker.clone());
        }

        assert_eq!(timers.len(), 3);
        assert_eq!(timers.peek(), Some(now + Duration::from_millis(10)));

        let order = std::iter::from_fn(|| timers.pop())
            .map(|entry| {
                entry.waker.wake();
                entry.expiry - now
            })
            .collect::<Vec<_>>();

        assert_eq!(
            order,
            [10, 20, 30].map(Duration::from_millis).to_vec()
        );
        assert_eq!(data.get_count(), 3);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_equal_expiry_is_insertion_ordered() {
        let when = Instant::now();
        let mut timers = TimerHeap::with_capacity(2);

        let (first, first_data) = mock_waker();
        let (second, _) = mock_waker();
        timers.insert(when, first);
        timers.insert(when, second);

        timers.pop().unwrap().waker.wake();
        assert_eq!(first_data.get_count(), 1);
    }
}
