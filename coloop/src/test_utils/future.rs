use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Counts its polls into `polls`, waking itself `wakes` times before it
/// completes.
pub(crate) struct PollCounter {
    polls: Rc<Cell<usize>>,
    wakes: usize,
}

impl PollCounter {
    pub(crate) fn new(polls: Rc<Cell<usize>>, wakes: usize) -> Self {
        Self { polls, wakes }
    }
}

impl Future for PollCounter {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.polls.set(self.polls.get() + 1);

        if self.wakes == 0 {
            return Poll::Ready(());
        }

        self.wakes -= 1;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock_waker;

    #[test]
    fn test_poll_counter_wakes_then_completes() {
        let polls = Rc::new(Cell::new(0));
        let mut fut = PollCounter::new(polls.clone(), 1);
        let (waker, data) = mock_waker();
        let mut cx = Context::from_waker(&waker);

        assert!(Pin::new(&mut fut).poll(&mut cx).is_pending());
        assert_eq!(data.get_count(), 1);
        assert!(Pin::new(&mut fut).poll(&mut cx).is_ready());
        assert_eq!(polls.get(), 2);
    }
}
