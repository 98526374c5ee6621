use crate::context;
use crate::suspend::{Suspend, SuspendPoint, Transfer};
use std::task::Waker;
use std::time::{Duration, Instant};

/// Suspend point parking the frame in the loop's wait set until `deadline`.
///
/// The deadline is registered on the first suspension only. A frame polled
/// again before the deadline stays parked on that same entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepUntil {
    deadline: Instant,
    registered: bool,
}

impl SleepUntil {
    pub fn new(deadline: Instant) -> Self {
        Self {
            deadline,
            registered: false,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

impl SuspendPoint for SleepUntil {
    type Output = ();

    /// Always suspends, even for a deadline in the past: the frame goes
    /// through the wait set and the loop resumes it on its next idle pass.
    fn is_ready(&self) -> bool {
        false
    }

    #[track_caller]
    fn on_suspend(&mut self, frame: &Waker) -> Transfer {
        if !self.registered {
            context::expect_scheduler().schedule_at(self.deadline, frame.clone());
            self.registered = true;
        }
        Transfer::Scheduler
    }

    fn on_resume(&mut self) {}

    fn is_resumable(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Suspend point sleeping for `duration`, counted from the first time the
/// frame reaches it rather than from its construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepFor {
    duration: Duration,
    until: Option<SleepUntil>,
}

impl SleepFor {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            until: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Known once the frame first suspended on this point.
    pub fn deadline(&self) -> Option<Instant> {
        self.until.as_ref().map(SleepUntil::deadline)
    }
}

impl SuspendPoint for SleepFor {
    type Output = ();

    fn is_ready(&self) -> bool {
        false
    }

    #[track_caller]
    fn on_suspend(&mut self, frame: &Waker) -> Transfer {
        let duration = self.duration;
        self.until
            .get_or_insert_with(|| SleepUntil::new(Instant::now() + duration))
            .on_suspend(frame)
    }

    fn on_resume(&mut self) {}

    fn is_resumable(&self) -> bool {
        self.until.as_ref().is_some_and(SleepUntil::is_resumable)
    }
}

/// Future returned by [`sleep_until`] and, with [`SleepFor`], [`sleep_for`].
pub type Sleep<P = SleepUntil> = Suspend<P>;

/// Suspends the current frame until `deadline`.
///
/// # Panics
///
/// Awaiting the returned future outside of a running [`Loop`](crate::Loop)
/// panics.
pub fn sleep_until(deadline: Instant) -> Sleep {
    Suspend::new(SleepUntil::new(deadline))
}

/// Suspends the current frame for `duration`.
///
/// The clock starts when the returned future is first awaited, so a sleep
/// built ahead of time still lasts its full duration.
///
/// ```
/// use std::time::{Duration, Instant};
///
/// # #[coloop::main]
/// # async fn main() {
/// let start = Instant::now();
/// coloop::sleep_for(Duration::from_millis(10)).await;
/// assert!(start.elapsed() >= Duration::from_millis(10));
/// # }
/// ```
///
/// # Panics
///
/// Awaiting the returned future outside of a running [`Loop`](crate::Loop)
/// panics.
pub fn sleep_for(duration: Duration) -> Sleep<SleepFor> {
    Suspend::new(SleepFor::new(duration))
}
