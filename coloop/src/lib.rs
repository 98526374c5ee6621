//! A single-threaded cooperative task runtime.
//!
//! A [`Task`] is a lazily started unit of asynchronous work. A [`Loop`] owns
//! the ready queue and the timer wait set and resumes frames one at a time
//! until a root task finishes. Frames suspend at explicit points:
//! [`sleep_for`], [`yield_now`], awaiting another task, or the [`join`]
//! combinators.
//!
//! ```
//! use std::time::Duration;
//!
//! let lp = coloop::Loop::new();
//! let sum = lp.block_on(async {
//!     let (a, b) = coloop::when_all((
//!         async {
//!             coloop::sleep_for(Duration::from_millis(2)).await;
//!             1
//!         },
//!         coloop::task(async { 2 }),
//!     ))
//!     .await;
//!     a + b
//! });
//! assert_eq!(sum, 3);
//! ```

#[doc(inline)]
pub use coloop_macros::main;

#[doc(inline)]
pub use coloop_macros::test;

mod context;

pub mod join;
pub use join::{when_all, when_all_iter, when_any, when_any_iter};

pub mod runtime;
pub use runtime::{Builder, Loop};

pub mod suspend;

pub mod task;
pub use task::{Task, task};

pub mod time;
pub use time::{sleep_for, sleep_until, yield_now};

mod utils;

#[cfg(test)]
mod test_utils;
