use crate::context;
use crate::runtime::builder::LoopConfig;
use crate::runtime::scheduler::{Handle, Scheduler, Until};
use crate::runtime::{Builder, LoopError, WaitSet};
use crate::task::Task;
use std::future::Future;
use std::task::Waker;
use std::time::Instant;
use tracing::{debug, info_span};

/// A single-threaded cooperative loop driving [`Task`]s.
///
/// Frames become ready when their waker fires, and the loop resumes them one
/// at a time on the thread calling one of its `run` methods. Time-deferred
/// frames sit in the loop's [`WaitSet`] until they are due.
///
/// A loop can be run any number of times, but only one loop runs on a
/// thread at any given moment.
///
/// ```
/// use coloop::{Loop, task};
/// use std::time::Duration;
///
/// let lp = Loop::new();
/// let root = task(async {
///     coloop::sleep_for(Duration::from_millis(5)).await;
///     "woke up"
/// });
///
/// lp.run_until_complete(&root).unwrap();
/// assert_eq!(root.take_result().unwrap(), "woke up");
/// ```
#[derive(Debug)]
pub struct Loop {
    handle: Handle,
}

impl Loop {
    /// A loop with the default configuration. See [`Builder`] for the knobs.
    pub fn new() -> Loop {
        Builder::new().build()
    }

    pub fn builder() -> Builder {
        Builder::new()
    }

    pub(crate) fn from_config(cfg: LoopConfig, wait_set: Box<dyn WaitSet>) -> Loop {
        Loop {
            handle: Scheduler::new(cfg, wait_set).into_handle(),
        }
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Queue `task` to be resumed by the next run.
    ///
    /// A task binds to the first loop that schedules or resumes it. Handing it
    /// to another loop afterwards fails with [`LoopError::ForeignFrame`].
    pub fn schedule_ready<T>(&self, task: &Task<T>) -> Result<(), LoopError> {
        self.handle
            .schedule_frame(task.frame(), self.handle.cfg.ready_order)
    }

    /// Wake `waker` once `when` is reached. Entries are only examined while
    /// the loop runs and has nothing ready.
    pub fn schedule_at(&self, when: Instant, waker: Waker) {
        self.handle.schedule_at(when, waker);
    }

    /// Drive the loop until `root` finishes.
    ///
    /// The root is queued first, so a fresh task starts on the first
    /// iteration. The run returns as soon as the root completes, even when
    /// other frames are still ready or waiting on a timer; they are picked up
    /// again by the next run. A root that panicked still counts as finished,
    /// and the panic is read with [`Task::take_result`].
    ///
    /// If the root is suspended with nothing ready and no timer pending, the
    /// thread parks until some waker fires. A root bound to another loop is
    /// rejected with [`LoopError::ForeignFrame`] before anything runs.
    pub fn run_until_complete<T>(&self, root: &Task<T>) -> Result<(), LoopError> {
        let span = info_span!("loop", name = %self.handle.cfg.name);
        let _enter = span.enter();

        let _ctx = context::enter(&self.handle)?;
        if root.is_finished() {
            return Ok(());
        }

        debug!(root = %root.id(), "running until root completes");
        self.schedule_ready(root)?;
        self.handle.drive(Until::Finished(root.frame()));
        debug!(root = %root.id(), "root completed");

        Ok(())
    }

    /// Drive every scheduled frame until nothing is ready and no timer is
    /// pending.
    ///
    /// ```
    /// use coloop::{Loop, task};
    ///
    /// let lp = Loop::new();
    /// let tasks = [task(async { 1 }), task(async { 2 })];
    /// for t in &tasks {
    ///     lp.schedule_ready(t).unwrap();
    /// }
    ///
    /// lp.run_all().unwrap();
    /// assert!(tasks.iter().all(|t| t.is_finished()));
    /// ```
    pub fn run_all(&self) -> Result<(), LoopError> {
        let span = info_span!("loop", name = %self.handle.cfg.name);
        let _enter = span.enter();

        let _ctx = context::enter(&self.handle)?;

        debug!("running until idle");
        self.handle.drive(Until::Idle);
        debug!("loop idle");

        Ok(())
    }

    /// Run `future` as the root task and return its output.
    ///
    /// # Panics
    ///
    /// Resumes the panic of the root task, and panics if the loop is already
    /// running on this thread.
    #[track_caller]
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let root = Task::new(future);
        if let Err(e) = self.run_until_complete(&root) {
            panic!("Failed to drive future to completion: {e}");
        }

        match root.take_result() {
            Ok(output) => output,
            Err(err) => err.rethrow(),
        }
    }

    /// Number of frames waiting in the ready queue.
    pub fn ready_len(&self) -> usize {
        self.handle.ready_len()
    }

    /// Number of entries in the wait set.
    pub fn pending_timers(&self) -> usize {
        self.handle.pending_timers()
    }
}

impl Default for Loop {
    fn default() -> Self {
        Self::new()
    }
}
