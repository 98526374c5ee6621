use crate::context;
use crate::runtime::{Handle, Scheduler};
use crate::task::id::FrameIdGuard;
use crate::task::{Failure, Id, ResultCell, TaskError};

use pin_project::pin_project;
use std::cell::{Cell, OnceCell, RefCell};
use std::future::Future;
use std::panic;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

/// Lifecycle of a task frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameState {
    /// Created, no body code has run yet.
    NotStarted,

    /// Currently being resumed.
    Running,

    /// Parked at a suspend point, waiting for its waker.
    Suspended,

    /// Body returned or panicked. The outcome sits in the frame's cell.
    Finished,
}

type Body = Pin<Box<dyn Future<Output = ()>>>;

/// The type-erased part of a task frame.
///
/// The body is the user future wrapped so that it writes its outcome into a
/// typed [`ResultCell`] owned by the [`Task`](crate::task::Task) handle. Once
/// the frame finishes the body is dropped, which releases every local the
/// future was holding.
pub struct RawFrame {
    id: Id,
    state: Cell<FrameState>,
    body: RefCell<Option<Body>>,

    /// Waker of whoever awaits this frame, woken once on completion.
    continuation: RefCell<Option<Waker>>,

    /// Set once the frame is known to a loop.
    binding: OnceCell<FrameBinding>,
}

pub(crate) struct FrameBinding {
    waker: Waker,
    scheduler: Weak<Scheduler>,
}

impl FrameBinding {
    pub(crate) fn new(waker: Waker, scheduler: Weak<Scheduler>) -> Self {
        Self { waker, scheduler }
    }

    pub(crate) fn waker(&self) -> &Waker {
        &self.waker
    }
}

impl RawFrame {
    pub(crate) fn new(id: Id, body: Body) -> Rc<Self> {
        Rc::new(Self {
            id,
            state: Cell::new(FrameState::NotStarted),
            body: RefCell::new(Some(body)),
            continuation: RefCell::new(None),
            binding: OnceCell::new(),
        })
    }

    /// Frame wrapping `future`, whose output lands in `slot`.
    pub(crate) fn with_outcome<F>(
        id: Id,
        future: F,
        slot: Rc<RefCell<ResultCell<F::Output>>>,
    ) -> Rc<Self>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        Self::new(id, Box::pin(Completion { future, slot }))
    }

    pub(crate) fn id(&self) -> Id {
        self.id
    }

    pub(crate) fn state(&self) -> FrameState {
        self.state.get()
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.state.get() == FrameState::Finished
    }

    /// Binds the frame to `handle` unless it is already bound.
    pub(crate) fn bind(self: &Rc<Self>, handle: &Handle) -> &FrameBinding {
        self.binding.get_or_init(|| handle.register(self))
    }

    /// True if the frame is bound to a loop other than `handle`.
    pub(crate) fn is_bound_elsewhere(&self, handle: &Handle) -> bool {
        self.binding
            .get()
            .is_some_and(|binding| !handle.owns(&binding.scheduler))
    }

    /// Binds the frame to the loop running on this thread.
    ///
    /// # Panics
    ///
    /// Panics if no loop is running.
    #[track_caller]
    fn binding(self: &Rc<Self>) -> &FrameBinding {
        if let Some(binding) = self.binding.get() {
            return binding;
        }

        let handle = context::expect_scheduler();
        self.bind(&handle)
    }

    /// Record `waker` as the frame's continuation, replacing any previous one.
    pub(crate) fn set_continuation(&self, waker: &Waker) {
        let mut continuation = self.continuation.borrow_mut();
        match continuation.as_mut() {
            Some(current) if current.will_wake(waker) => {}
            _ => *continuation = Some(waker.clone()),
        }
    }

    /// Resume the frame until its next suspend point or completion.
    ///
    /// On completion the continuation, if any, is woken. A finished or
    /// currently running frame refuses to be resumed.
    pub(crate) fn resume(self: &Rc<Self>) -> Result<FrameState, TaskError> {
        match self.state.get() {
            FrameState::NotStarted | FrameState::Suspended => {}
            state => {
                return Err(TaskError::NotResumable { id: self.id, state });
            }
        }

        let waker = self.binding().waker().clone();
        let mut cx = Context::from_waker(&waker);

        self.state.set(FrameState::Running);
        let poll = {
            let _guard = FrameIdGuard::enter(self.id);
            let mut body = self.body.borrow_mut();
            match body.as_mut() {
                Some(body) => body.as_mut().poll(&mut cx),
                None => Poll::Ready(()),
            }
        };

        if poll.is_pending() {
            self.state.set(FrameState::Suspended);
            return Ok(FrameState::Suspended);
        }

        drop(self.body.borrow_mut().take());
        self.state.set(FrameState::Finished);

        if let Some(scheduler) = self.binding.get().and_then(|b| b.scheduler.upgrade()) {
            scheduler.unregister(self.id);
        }

        let continuation = self.continuation.borrow_mut().take();
        if let Some(continuation) = continuation {
            continuation.wake();
        }

        Ok(FrameState::Finished)
    }
}

impl Drop for RawFrame {
    fn drop(&mut self) {
        if let Some(scheduler) = self.binding.get().and_then(|b| b.scheduler.upgrade()) {
            scheduler.unregister(self.id);
        }
    }
}

/// Polls the user future, capturing a panic instead of unwinding through the
/// loop, and stores the outcome.
#[pin_project]
struct Completion<F: Future> {
    #[pin]
    future: F,
    slot: Rc<RefCell<ResultCell<F::Output>>>,
}

impl<F: Future> Future for Completion<F> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let future = this.future;

        let stored = match panic::catch_unwind(panic::AssertUnwindSafe(|| future.poll(cx))) {
            Ok(Poll::Pending) => return Poll::Pending,
            Ok(Poll::Ready(value)) => this.slot.borrow_mut().put_value(value).is_ok(),
            Err(payload) => this
                .slot
                .borrow_mut()
                .put_failure(Failure::new(payload))
                .is_ok(),
        };
        debug_assert!(stored, "task outcome written twice");

        Poll::Ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_resume_refuses_finished_frame() {
        let lp = init_loop(None);
        let _ctx = context::enter(lp.handle()).unwrap();

        let slot = Rc::new(RefCell::new(ResultCell::new()));
        let frame = RawFrame::with_outcome(Id::next(), async { 7 }, slot.clone());
        assert_eq!(frame.state(), FrameState::NotStarted);

        assert_eq!(frame.resume().unwrap(), FrameState::Finished);
        assert_eq!(slot.borrow_mut().take().unwrap(), 7);

        assert!(matches!(
            frame.resume(),
            Err(TaskError::NotResumable {
                state: FrameState::Finished,
                ..
            })
        ));
    }

    #[test]
    fn test_completion_wakes_continuation_once() {
        let lp = init_loop(None);
        let _ctx = context::enter(lp.handle()).unwrap();

        let (waker, data) = mock_waker();
        let slot = Rc::new(RefCell::new(ResultCell::new()));
        let frame = RawFrame::with_outcome(Id::next(), crate::yield_now(), slot);

        frame.set_continuation(&waker);
        frame.set_continuation(&waker);

        assert_eq!(frame.resume().unwrap(), FrameState::Suspended);
        assert_eq!(data.get_count(), 0);

        assert_eq!(frame.resume().unwrap(), FrameState::Finished);
        assert_eq!(data.get_count(), 1);
    }

    #[test]
    fn test_finished_frame_releases_body() {
        let lp = init_loop(None);
        let _ctx = context::enter(lp.handle()).unwrap();

        let local = Rc::new(());
        let held = local.clone();
        let slot = Rc::new(RefCell::new(ResultCell::new()));
        let frame = RawFrame::with_outcome(
            Id::next(),
            async move {
                crate::yield_now().await;
                drop(held);
            },
            slot,
        );

        frame.resume().unwrap();
        assert_eq!(Rc::strong_count(&local), 2);

        frame.resume().unwrap();
        assert_eq!(Rc::strong_count(&local), 1);
    }
}
