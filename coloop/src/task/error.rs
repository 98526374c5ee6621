use crate::task::{FrameState, Id};
use crate::utils::SyncWrapper;
use std::any::Any;
use std::fmt;
use std::panic;

/// A panic captured while resuming a task frame.
///
/// The payload is kept as-is so it can be resumed on the awaiting side with
/// [`Failure::rethrow`]. It is wrapped so that `Failure`, and with it
/// [`TaskError`], is `Send + Sync` and converts into boxed errors.
pub struct Failure {
    payload: SyncWrapper<Box<dyn Any + Send + 'static>>,
}

impl Failure {
    pub(crate) fn new(payload: Box<dyn Any + Send + 'static>) -> Self {
        Self {
            payload: SyncWrapper::new(payload),
        }
    }

    /// The panic message, when the payload is a string.
    pub fn message(&self) -> Option<&str> {
        if let Some(s) = self.payload.downcast_ref_sync::<String>() {
            return Some(s);
        }

        self.payload.downcast_ref_sync::<&'static str>().copied()
    }

    pub fn into_panic(self) -> Box<dyn Any + Send + 'static> {
        self.payload.into_inner()
    }

    /// Resume unwinding with the captured payload.
    pub fn rethrow(self) -> ! {
        panic::resume_unwind(self.into_panic())
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(msg) => f.debug_tuple("Failure").field(&msg).finish(),
            None => f.debug_tuple("Failure").finish_non_exhaustive(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message().unwrap_or("<non-string panic payload>"))
    }
}

/// Errors produced when reading a task's outcome or resuming its frame.
#[derive(thiserror::Error, Debug)]
pub enum TaskError {
    #[error("task {id} panicked: {failure}")]
    Panicked { id: Id, failure: Failure },

    #[error("task {id} has not finished")]
    NotFinished { id: Id },

    #[error("result of task {id} was already taken")]
    AlreadyTaken { id: Id },

    #[error("task {id} cannot be resumed while {state:?}")]
    NotResumable { id: Id, state: FrameState },
}

impl TaskError {
    pub fn id(&self) -> Id {
        match self {
            TaskError::Panicked { id, .. }
            | TaskError::NotFinished { id }
            | TaskError::AlreadyTaken { id }
            | TaskError::NotResumable { id, .. } => *id,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked { .. })
    }

    /// Consumes the error, returning the panic payload if the task panicked.
    pub fn try_into_panic(self) -> Result<Box<dyn Any + Send + 'static>, TaskError> {
        match self {
            TaskError::Panicked { failure, .. } => Ok(failure.into_panic()),
            other => Err(other),
        }
    }

    /// Re-raise the error on the current thread. A captured panic resumes
    /// with its original payload; contract violations panic with the error
    /// message.
    #[track_caller]
    pub fn rethrow(self) -> ! {
        match self {
            TaskError::Panicked { failure, .. } => failure.rethrow(),
            other => panic!("{other}"),
        }
    }
}
