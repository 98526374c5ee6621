use crate::task::Failure;
use std::panic::{self, AssertUnwindSafe};

// Exports
mod context;
pub(crate) use context::init_loop;

pub(crate) mod future;
pub(crate) use future::PollCounter;

pub(crate) mod mocks;
pub(crate) use mocks::mock_waker;

/// Captures a real panic carrying `msg`.
pub(crate) fn failure(msg: &str) -> Failure {
    let msg = msg.to_owned();
    let payload = match panic::catch_unwind(AssertUnwindSafe(move || -> () { panic!("{msg}") })) {
        Ok(()) => unreachable!("closure always panics"),
        Err(payload) => payload,
    };

    Failure::new(payload)
}
