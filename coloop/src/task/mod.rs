//! Task frames and the handles that own them.

mod cell;
pub use self::cell::{CellError, ResultCell};

mod error;
pub use self::error::{Failure, TaskError};

pub(crate) mod frame;
pub use self::frame::FrameState;
pub(crate) use self::frame::{FrameBinding, RawFrame};

pub mod id;
pub use self::id::{Id, id, try_id};

#[allow(clippy::module_inception)]
mod task;
pub use self::task::{Task, task};
