//! Concurrent composition of awaitables.
//!
//! [`when_all`] completes with every output, [`when_any`] with the first one.
//! Both run each operand in its own frame on the current loop and accept
//! tuples of up to eight awaitables. The `_iter` variants take a runtime-sized
//! set of awaitables of one type.

mod all;
pub use self::all::{WhenAll, when_all, when_all_iter};

mod any;
pub use self::any::{WhenAny, when_any, when_any_iter};

mod control;
pub use self::control::Operands;

mod tuple;
pub use self::tuple::{Many, OneOf1, OneOf2, OneOf3, OneOf4, OneOf5, OneOf6, OneOf7, OneOf8};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("cannot join an empty set of operands")]
    Empty,
}

/// Joins a list of awaitables with [`when_all`].
///
/// ```
/// # #[coloop::main]
/// # async fn main() {
/// let (a, b, c) = coloop::when_all!(async { 1 }, async { 2 }, async { 3 }).await;
/// assert_eq!(a + b + c, 6);
/// # }
/// ```
#[macro_export]
macro_rules! when_all {
    ($($operand:expr),+ $(,)?) => {
        $crate::join::when_all(($($operand,)+))
    };
}

/// Races a list of awaitables with [`when_any`].
///
/// ```
/// use coloop::join::OneOf2;
///
/// # #[coloop::main]
/// # async fn main() {
/// let first = coloop::when_any!(async { "a" }, async { "b" }).await;
/// assert_eq!(first, OneOf2::V0("a"));
/// # }
/// ```
#[macro_export]
macro_rules! when_any {
    ($($operand:expr),+ $(,)?) => {
        $crate::join::when_any(($($operand,)+))
    };
}
