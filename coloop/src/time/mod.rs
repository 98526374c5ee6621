//! Timed suspension and cooperative yielding.

mod sleep;
pub use sleep::{Sleep, SleepFor, SleepUntil, sleep_for, sleep_until};

mod yield_now;
pub use yield_now::{YieldNow, YieldPoint, yield_now};
