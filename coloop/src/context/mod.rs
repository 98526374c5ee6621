use crate::runtime::{Handle, LoopError};
use crate::task::Id;
use crate::utils::ScopeGuard;
use std::cell::{Cell, RefCell};
use std::thread_local;

/// Per-thread state: the loop currently being driven and the frame it is
/// resuming.
struct Context {
    scheduler: RefCell<Option<Handle>>,
    current_frame: Cell<Option<Id>>,
}

thread_local! {
    static CONTEXT: Context = const {
        Context {
            scheduler: RefCell::new(None),
            current_frame: Cell::new(None),
        }
    };
}

/// Installs `handle` as the thread's running loop until the returned guard
/// is dropped.
///
/// Only one loop can run on a thread at a time, so entering while another
/// run is in progress fails with [`LoopError::AlreadyRunning`].
pub(crate) fn enter(
    handle: &Handle,
) -> Result<ScopeGuard<'static, impl FnOnce() + use<>>, LoopError> {
    CONTEXT.with(|ctx| {
        let mut current = ctx.scheduler.borrow_mut();
        if current.is_some() {
            return Err(LoopError::AlreadyRunning);
        }

        *current = Some(handle.clone());
        Ok(())
    })?;

    Ok(ScopeGuard::new(|| {
        let previous = CONTEXT.with(|ctx| ctx.scheduler.borrow_mut().take());
        drop(previous);
    }))
}

pub(crate) fn current_scheduler() -> Option<Handle> {
    CONTEXT.with(|ctx| ctx.scheduler.borrow().clone())
}

#[track_caller]
pub(crate) fn expect_scheduler() -> Handle {
    current_scheduler().expect("no coloop Loop is running on this thread")
}

pub(crate) fn current_frame_id() -> Option<Id> {
    CONTEXT.with(|ctx| ctx.current_frame.get())
}

pub(crate) fn set_current_frame_id(id: Option<Id>) -> Option<Id> {
    CONTEXT.with(|ctx| ctx.current_frame.replace(id))
}
