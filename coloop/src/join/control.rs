use crate::task::{CellError, Failure, Id, RawFrame, ResultCell};
use pin_project::pin_project;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::future::{Future, IntoFuture};
use std::mem;
use std::panic;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use tracing::{debug, trace};

// Helpers live on the stack until a join has more operands than the largest
// tuple form.
pub(crate) const SPILL_TO_HEAP_THRESHOLD: usize = 8;

pub type Helpers = SmallVec<[Rc<RawFrame>; SPILL_TO_HEAP_THRESHOLD]>;

/// Output slot of one operand.
pub type Slot<T> = Rc<RefCell<ResultCell<T>>>;

/// Shared between a join and its helpers. Only touched from inside a resume
/// on the loop's thread.
pub type Control = Rc<RefCell<ControlBlock>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Policy {
    /// Complete once every operand finished, or at the first failure.
    All,

    /// Complete with the first operand to finish.
    Any,
}

#[derive(Debug)]
pub struct ControlBlock {
    policy: Policy,
    pending: usize,
    winner: Option<usize>,
    failure: Option<Failure>,
    signalled: bool,
    continuation: Option<Waker>,
}

impl ControlBlock {
    pub(crate) fn new(policy: Policy, operands: usize) -> Control {
        Rc::new(RefCell::new(Self {
            policy,
            pending: operands,
            winner: None,
            failure: None,
            signalled: false,
            continuation: None,
        }))
    }

    pub(crate) fn is_signalled(&self) -> bool {
        self.signalled
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending
    }

    pub(crate) fn set_continuation(&mut self, waker: &Waker) {
        match &self.continuation {
            Some(current) if current.will_wake(waker) => {}
            _ => self.continuation = Some(waker.clone()),
        }
    }

    /// Operand `index` finished, with `failure` if it panicked. Only the
    /// first failure is kept.
    pub(crate) fn report(&mut self, index: usize, failure: Option<Failure>) {
        self.pending = self.pending.saturating_sub(1);
        if self.signalled {
            return;
        }

        match (failure, self.policy) {
            (Some(failure), _) => {
                self.failure = Some(failure);
                self.winner = Some(index);
                self.signal();
            }
            (None, Policy::Any) => {
                self.winner = Some(index);
                self.signal();
            }
            (None, Policy::All) if self.pending == 0 => self.signal(),
            (None, Policy::All) => {}
        }
    }

    fn signal(&mut self) {
        trace!(policy = ?self.policy, winner = ?self.winner, "join signalled");
        self.signalled = true;

        if let Some(continuation) = self.continuation.take() {
            continuation.wake();
        }
    }

    fn take_outcome(&mut self) -> (Option<usize>, Option<Failure>) {
        (self.winner, self.failure.take())
    }
}

/// Awaits one operand inside its own frame and reports to the control block.
#[pin_project]
struct Helper<F: Future> {
    #[pin]
    operand: F,
    index: usize,
    slot: Slot<F::Output>,
    control: Control,
}

impl<F: Future> Future for Helper<F> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.project();
        let operand = this.operand;

        let failure = match panic::catch_unwind(panic::AssertUnwindSafe(|| operand.poll(cx))) {
            Ok(Poll::Pending) => return Poll::Pending,
            Ok(Poll::Ready(value)) => {
                let stored = this.slot.borrow_mut().put_value(value).is_ok();
                debug_assert!(stored, "operand output written twice");
                None
            }
            Err(payload) => Some(Failure::new(payload)),
        };

        this.control.borrow_mut().report(*this.index, failure);
        Poll::Ready(())
    }
}

/// Wraps `operand` into a helper frame reporting as operand `index`.
pub(crate) fn helper<F>(
    index: usize,
    operand: F,
    control: &Control,
) -> (Rc<RawFrame>, Slot<F::Output>)
where
    F: IntoFuture,
    F::IntoFuture: 'static,
    F::Output: 'static,
{
    let slot = Rc::new(RefCell::new(ResultCell::new()));
    let frame = RawFrame::new(
        Id::next(),
        Box::pin(Helper {
            operand: operand.into_future(),
            index,
            slot: slot.clone(),
            control: control.clone(),
        }),
    );

    (frame, slot)
}

/// Reads an operand output once the join completed.
///
/// # Panics
///
/// Resumes the operand's panic if it failed. Also panics if the slot is empty
/// or was already read: a completed join reads each finished operand once, so
/// either case is a bug in the join itself.
pub(crate) fn take_slot<T>(slot: &Slot<T>) -> T {
    match slot.borrow_mut().take() {
        Ok(value) => value,
        Err(CellError::Failed(failure)) => failure.rethrow(),
        Err(err) => panic!("completed join reads each operand once: {err}"),
    }
}

/// The operand set of a join: a tuple of up to eight awaitables, or a
/// [`Many`](crate::join::Many) built from an iterator.
pub trait Operands: sealed::Sealed + Sized {
    /// Output of [`when_all`](crate::when_all).
    type Output;

    /// Output of [`when_any`](crate::when_any).
    type OneOf;

    #[doc(hidden)]
    type Slots;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[doc(hidden)]
    fn into_helpers(self, control: &Control) -> (Helpers, Self::Slots);

    #[doc(hidden)]
    fn take_all(slots: &Self::Slots) -> Self::Output;

    #[doc(hidden)]
    fn take_one(slots: &Self::Slots, index: usize) -> Self::OneOf;
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

enum Stage<O: Operands> {
    Init(O),
    Running {
        helpers: Helpers,
        slots: O::Slots,
        control: Control,
    },

    /// Helpers stay alive until the join itself is dropped.
    Done {
        #[allow(dead_code)]
        helpers: Helpers,
    },
}

/// State machine shared by `WhenAll` and `WhenAny`.
pub(crate) struct Join<O: Operands> {
    policy: Policy,
    stage: Stage<O>,
}

// Operands are moved into helper frames before anything is polled, so they
// are never pinned in place.
impl<O: Operands> Unpin for Join<O> {}

impl<O: Operands> Join<O> {
    pub(crate) fn new(policy: Policy, operands: O) -> Self {
        Self {
            policy,
            stage: Stage::Init(operands),
        }
    }

    /// Starts the helpers on first poll, then completes once the control
    /// block is signalled. Resumes the first captured failure.
    pub(crate) fn poll_join(&mut self, cx: &mut Context<'_>) -> Poll<(Option<usize>, O::Slots)> {
        if matches!(self.stage, Stage::Init(_)) {
            self.start();
        }

        let Stage::Running { control, .. } = &self.stage else {
            panic!("join polled after completion");
        };

        {
            let mut control = control.borrow_mut();
            if !control.is_signalled() {
                control.set_continuation(cx.waker());
                return Poll::Pending;
            }
        }

        let finished = Stage::Done {
            helpers: Helpers::new(),
        };
        let Stage::Running {
            helpers,
            slots,
            control,
        } = mem::replace(&mut self.stage, finished)
        else {
            unreachable!("join stage checked above");
        };

        let (winner, failure) = control.borrow_mut().take_outcome();
        trace!(
            policy = ?self.policy,
            still_running = control.borrow().pending(),
            "join completed"
        );
        self.stage = Stage::Done { helpers };

        if let Some(failure) = failure {
            failure.rethrow();
        }

        Poll::Ready((winner, slots))
    }

    fn start(&mut self) {
        let placeholder = Stage::Done {
            helpers: Helpers::new(),
        };
        let Stage::Init(operands) = mem::replace(&mut self.stage, placeholder) else {
            return;
        };

        let control = ControlBlock::new(self.policy, operands.len());
        let (helpers, slots) = operands.into_helpers(&control);
        debug!(policy = ?self.policy, helpers = helpers.len(), "starting join helpers");

        // Helpers start in operand order and run up to their first suspend
        // point before the join installs its continuation.
        for frame in &helpers {
            if let Err(err) = frame.resume() {
                err.rethrow();
            }
        }

        self.stage = Stage::Running {
            helpers,
            slots,
            control,
        };
    }
}
