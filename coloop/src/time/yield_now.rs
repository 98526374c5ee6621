use crate::context;
use crate::runtime::AddMode;
use crate::suspend::{Suspend, SuspendPoint, Transfer};
use std::task::Waker;

/// Suspend point that re-queues the current frame and lets the loop run
/// whatever else is ready first.
#[derive(Debug, Clone, Copy)]
pub struct YieldPoint {
    mode: AddMode,
}

impl YieldPoint {
    /// By default the frame goes to the back of the ready queue so other
    /// ready frames run before it. [`AddMode::Lifo`] makes the frame run again
    /// next, which only gives the loop a chance to check its timers.
    pub fn new(mode: AddMode) -> Self {
        Self { mode }
    }
}

impl Default for YieldPoint {
    fn default() -> Self {
        Self::new(AddMode::Fifo)
    }
}

impl SuspendPoint for YieldPoint {
    type Output = ();

    fn is_ready(&self) -> bool {
        false
    }

    fn on_suspend(&mut self, frame: &Waker) -> Transfer {
        match (context::current_scheduler(), context::current_frame_id()) {
            (Some(s), Some(id)) => {
                s.schedule_id(id, self.mode);
            }
            _ => frame.wake_by_ref(),
        }

        Transfer::Scheduler
    }

    fn on_resume(&mut self) {}
}

pub type YieldNow = Suspend<YieldPoint>;

/// Yields to the loop once.
///
/// ```
/// # #[coloop::main]
/// # async fn main() {
/// let other = coloop::task(async { "other" });
/// coloop::yield_now().await;
/// assert_eq!(other.await, "other");
/// # }
/// ```
pub fn yield_now() -> YieldNow {
    Suspend::new(YieldPoint::default())
}
