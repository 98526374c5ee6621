use crate::runtime::AddMode;
use crate::task::Id;
use crate::utils::ScopeGuard;
use futures::task::ArcWake;
use parking_lot::{Condvar, Mutex};
use std::cell::Cell;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::task::Waker;
use std::time::Instant;

/// Frames that are ready to be resumed, in resume order.
///
/// Wakers only ever push ids here, so the queue is the one piece of the loop
/// shared with other threads. A frame is queued at most once at a time.
#[derive(Debug)]
pub(crate) struct ReadyQueue {
    inner: Mutex<Ready>,
    unparked: Condvar,
    order: AddMode,
}

#[derive(Debug)]
struct Ready {
    queue: VecDeque<Id>,
    queued: HashSet<Id>,
}

impl ReadyQueue {
    pub(crate) fn new(order: AddMode, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Ready {
                queue: VecDeque::with_capacity(capacity),
                queued: HashSet::with_capacity(capacity),
            }),
            unparked: Condvar::new(),
            order,
        }
    }

    pub(crate) fn order(&self) -> AddMode {
        self.order
    }

    /// Queue `id`, returning false if it was already queued.
    pub(crate) fn push(&self, id: Id, mode: AddMode) -> bool {
        let mut ready = self.inner.lock();
        if !ready.queued.insert(id) {
            return false;
        }

        match mode {
            AddMode::Lifo => ready.queue.push_front(id),
            AddMode::Fifo => ready.queue.push_back(id),
        }
        drop(ready);

        self.unparked.notify_one();
        true
    }

    pub(crate) fn pop(&self) -> Option<Id> {
        let mut ready = self.inner.lock();
        let id = ready.queue.pop_front()?;
        ready.queued.remove(&id);
        Some(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Block the calling thread until a frame is queued or `deadline` passes.
    /// Without a deadline only a wake can end the wait.
    pub(crate) fn park(&self, deadline: Option<Instant>) {
        let mut ready = self.inner.lock();
        if !ready.queue.is_empty() {
            return;
        }

        match deadline {
            Some(deadline) => {
                self.unparked.wait_until(&mut ready, deadline);
            }
            None => self.unparked.wait(&mut ready),
        }
    }
}

thread_local! {
    /// Overrides the queue order of frame wakes made on this thread.
    static WAKE_MODE: Cell<Option<AddMode>> = const { Cell::new(None) };
}

/// Wake `waker`, putting a frame at the front of its ready queue whatever the
/// loop's order is. Other wakers are simply woken.
pub(crate) fn wake_first(waker: Waker) {
    let prev = WAKE_MODE.replace(Some(AddMode::Lifo));
    let _restore = ScopeGuard::new(move || WAKE_MODE.set(prev));
    waker.wake();
}

/// Waker payload of a frame: waking queues the frame's id.
pub(crate) struct FrameWaker {
    id: Id,
    ready: Arc<ReadyQueue>,
}

impl FrameWaker {
    pub(crate) fn new_waker(id: Id, ready: Arc<ReadyQueue>) -> Waker {
        futures::task::waker(Arc::new(FrameWaker { id, ready }))
    }
}

impl ArcWake for FrameWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        let ready = &arc_self.ready;
        let mode = WAKE_MODE.get().unwrap_or_else(|| ready.order());
        ready.push(arc_self.id, mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::thread;
    use std::time::Duration;

    #[rstest]
    #[case::lifo(AddMode::Lifo, vec![3, 2, 1])]
    #[case::fifo(AddMode::Fifo, vec![1, 2, 3])]
    fn test_ready_order(#[case] order: AddMode, #[case] expected: Vec<usize>) {
        let ids = (0..3).map(|_| Id::next()).collect::<Vec<_>>();
        let queue = Arc::new(ReadyQueue::new(order, 4));

        for id in &ids {
            FrameWaker::new_waker(*id, queue.clone()).wake();
        }

        let popped = std::iter::from_fn(|| queue.pop())
            .map(|id| ids.iter().position(|i| *i == id).unwrap() + 1)
            .collect::<Vec<_>>();
        assert_eq!(popped, expected);
    }

    #[test]
    fn test_duplicate_wakes_are_coalesced() {
        let queue = Arc::new(ReadyQueue::new(AddMode::Lifo, 4));
        let id = Id::next();
        let waker = FrameWaker::new_waker(id, queue.clone());

        waker.wake_by_ref();
        waker.wake_by_ref();
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.pop(), Some(id));
        assert_eq!(queue.pop(), None);

        // Once popped the frame can be queued again.
        waker.wake();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_wake_first_jumps_fifo_queue() {
        let ids = (0..3).map(|_| Id::next()).collect::<Vec<_>>();
        let queue = Arc::new(ReadyQueue::new(AddMode::Fifo, 4));

        FrameWaker::new_waker(ids[0], queue.clone()).wake();
        FrameWaker::new_waker(ids[1], queue.clone()).wake();
        wake_first(FrameWaker::new_waker(ids[2], queue.clone()));

        // The override ends with the call.
        let late = Id::next();
        FrameWaker::new_waker(late, queue.clone()).wake();

        let popped = std::iter::from_fn(|| queue.pop()).collect::<Vec<_>>();
        assert_eq!(popped, [ids[2], ids[0], ids[1], late]);
    }

    #[test]
    fn test_park_returns_on_deadline() {
        let queue = ReadyQueue::new(AddMode::Lifo, 4);
        let delay = Duration::from_millis(10);

        let start = Instant::now();
        queue.park(Some(start + delay));
        assert!(start.elapsed() >= delay);
    }

    #[test]
    fn test_park_returns_on_cross_thread_wake() {
        let queue = Arc::new(ReadyQueue::new(AddMode::Lifo, 4));
        let id = Id::next();
        let waker = FrameWaker::new_waker(id, queue.clone());

        let waking = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            waker.wake();
        });

        while queue.len() == 0 {
            queue.park(None);
        }

        waking.join().unwrap();
        assert_eq!(queue.pop(), Some(id));
    }
}
