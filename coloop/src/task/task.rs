use crate::task::frame::RawFrame;
use crate::task::{CellError, FrameState, Id, ResultCell, TaskError};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// An owned, lazily started unit of work producing a `T`.
///
/// Creating a task runs none of its body. The body starts on the first
/// resume, which happens either when the task is awaited from another frame
/// or when a [`Loop`](crate::Loop) picks it from its ready queue.
///
/// Awaiting a task yields its output, or resumes the panic it captured:
///
/// ```
/// use std::time::Duration;
///
/// # #[coloop::main]
/// # async fn main() {
/// let answer = coloop::task(async {
///     coloop::sleep_for(Duration::from_millis(1)).await;
///     42
/// });
///
/// assert_eq!(answer.await, 42);
/// # }
/// ```
///
/// Outside the loop, the outcome of a root task is read with
/// [`Task::take_result`]:
///
/// ```
/// let lp = coloop::Loop::new();
/// let root = coloop::task(async { "done" });
///
/// lp.run_until_complete(&root).unwrap();
/// assert_eq!(root.take_result().unwrap(), "done");
/// ```
///
/// Dropping a task releases its frame in any state. A task that was never
/// resumed is released without running any of its body.
#[must_use = "tasks do nothing unless awaited or scheduled"]
pub struct Task<T> {
    frame: Rc<RawFrame>,
    outcome: Rc<RefCell<ResultCell<T>>>,
}

/// Creates a new [`Task`] from `future`. Equivalent to [`Task::new`].
pub fn task<F>(future: F) -> Task<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    Task::new(future)
}

impl<T: 'static> Task<T> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + 'static,
    {
        let outcome = Rc::new(RefCell::new(ResultCell::new()));
        let frame = RawFrame::with_outcome(Id::next(), future, outcome.clone());

        Self { frame, outcome }
    }
}

impl<T> Task<T> {
    /// Returns a [task ID] that uniquely identifies this task.
    ///
    /// [task ID]: crate::task::Id
    pub fn id(&self) -> Id {
        self.frame.id()
    }

    pub fn state(&self) -> FrameState {
        self.frame.state()
    }

    pub fn is_finished(&self) -> bool {
        self.frame.is_finished()
    }

    /// Takes the outcome of a finished task.
    ///
    /// Returns [`TaskError::Panicked`] if the body panicked,
    /// [`TaskError::NotFinished`] before completion and
    /// [`TaskError::AlreadyTaken`] on a second call.
    pub fn take_result(&self) -> Result<T, TaskError> {
        let id = self.id();
        if !self.is_finished() {
            return Err(TaskError::NotFinished { id });
        }

        self.outcome.borrow_mut().take().map_err(|err| match err {
            CellError::Failed(failure) => TaskError::Panicked { id, failure },
            CellError::Empty => TaskError::NotFinished { id },
            CellError::Consumed => TaskError::AlreadyTaken { id },
        })
    }

    pub(crate) fn frame(&self) -> &Rc<RawFrame> {
        &self.frame
    }
}

impl<T> Future for Task<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if self.frame.state() == FrameState::NotStarted {
            if let Err(err) = self.frame.resume() {
                err.rethrow();
            }
        }

        if !self.frame.is_finished() {
            self.frame.set_continuation(cx.waker());
            return Poll::Pending;
        }

        match self.take_result() {
            Ok(value) => Poll::Ready(value),
            Err(err) => err.rethrow(),
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use anyhow::Result;
    use std::cell::Cell;
    use std::time::Duration;

    static_assertions::assert_not_impl_any!(Task<()>: Send, Sync);
    static_assertions::assert_impl_all!(Task<()>: Unpin);

    #[test]
    fn test_task_is_lazy() -> Result<()> {
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();

        let task = crate::task(async move { flag.set(true) });
        assert_eq!(task.state(), FrameState::NotStarted);
        assert!(!ran.get());

        init_loop(None).run_until_complete(&task)?;
        assert!(ran.get());
        assert!(task.is_finished());
        Ok(())
    }

    #[test]
    fn test_drop_never_resumed_task() {
        let ran = Rc::new(Cell::new(false));
        let captured = Rc::new(());

        let flag = ran.clone();
        let held = captured.clone();
        let task = crate::task(async move {
            let _held = held;
            flag.set(true);
        });

        assert_eq!(Rc::strong_count(&captured), 2);
        drop(task);

        assert!(!ran.get());
        assert_eq!(Rc::strong_count(&captured), 1);
    }

    #[test]
    fn test_take_result_contract() -> Result<()> {
        let lp = init_loop(None);
        let task = crate::task(async {
            crate::sleep_for(Duration::from_millis(1)).await;
            String::from("hello")
        });

        assert!(matches!(
            task.take_result(),
            Err(TaskError::NotFinished { .. })
        ));

        lp.run_until_complete(&task)?;
        assert_eq!(task.take_result()?, "hello");

        assert!(matches!(
            task.take_result(),
            Err(TaskError::AlreadyTaken { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_panic_is_captured() -> Result<()> {
        let lp = init_loop(None);
        let task: Task<()> = crate::task(async { panic!("boom") });

        lp.run_until_complete(&task)?;

        match task.take_result() {
            Err(TaskError::Panicked { id, failure }) => {
                assert_eq!(id, task.id());
                assert_eq!(failure.message(), Some("boom"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_await_propagates_value_and_panic() -> Result<()> {
        let lp = init_loop(None);

        let root = crate::task(async {
            let value = crate::task(async { 2 }).await;

            let failing: Task<()> = crate::task(async {
                crate::yield_now().await;
                panic!("inner failure")
            });

            let caught = crate::task(async move {
                failing.await;
            });

            // Awaiting `caught` resumes the inner panic in this frame too, so
            // catch it one level up.
            (value, crate::task(async move { caught.await }))
        });

        lp.run_until_complete(&root)?;
        let (value, nested) = root.take_result()?;
        assert_eq!(value, 2);

        lp.run_until_complete(&nested)?;
        let err = nested.take_result().unwrap_err();
        assert!(err.is_panic());
        assert!(err.to_string().contains("inner failure"));
        Ok(())
    }

    #[test]
    fn test_await_suspended_child_does_not_resume_it() -> Result<()> {
        let lp = init_loop(None);
        let polls = Rc::new(Cell::new(0));

        let counter = polls.clone();
        let child = crate::task(PollCounter::new(counter, 2));
        let root = crate::task(async move { child.await });

        lp.run_until_complete(&root)?;
        root.take_result()?;

        // One inline start plus one resume per self-wake.
        assert_eq!(polls.get(), 3);
        Ok(())
    }

    #[test]
    fn test_debug_format() {
        let task = crate::task(async {});
        let debug = format!("{task:?}");
        assert!(debug.contains("NotStarted"));
        assert!(debug.contains(&task.id().to_string()));
    }
}
