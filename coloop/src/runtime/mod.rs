//! The loop that drives task frames, and its configuration.

use crate::task::Id;

// Public API
mod builder;
pub use builder::Builder;

#[allow(clippy::module_inception)]
mod runtime;
pub use runtime::Loop;

mod timers;
pub use timers::{TimerEntry, TimerHeap, WaitSet};

// Exports
mod scheduler;
pub(crate) use scheduler::{Handle, Scheduler};

mod waker;
pub(crate) use waker::wake_first;


/// Where a woken frame is placed in the ready queue.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AddMode {
    /// Back of the queue: runs after everything already ready.
    Fifo,

    /// Front of the queue: runs next.
    #[default]
    Lifo,
}

#[derive(thiserror::Error, Debug)]
pub enum LoopError {
    #[error("a coloop Loop is already running on this thread")]
    AlreadyRunning,

    /// The task was first scheduled or resumed by a different loop, which
    /// alone can queue it.
    #[error("task {id} is bound to another loop")]
    ForeignFrame { id: Id },
}
