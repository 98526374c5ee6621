use crate::join::JoinError;
use crate::join::control::{Join, Operands, Policy};
use crate::join::tuple::Many;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by [`when_all`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct WhenAll<O: Operands> {
    join: Join<O>,
}

impl<O: Operands> Future for WhenAll<O> {
    type Output = O::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.join
            .poll_join(cx)
            .map(|(_, slots)| O::take_all(&slots))
    }
}

impl<O: Operands> fmt::Debug for WhenAll<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhenAll").finish_non_exhaustive()
    }
}

/// Runs every operand concurrently and completes with all their outputs, in
/// operand order.
///
/// Each operand runs in its own frame. On the first poll the operands start
/// in order, each up to its first suspend point. If an operand panics, the
/// join completes right away and resumes that panic in the awaiting frame;
/// the remaining operands are left where they are and dropped with the join.
///
/// ```
/// use std::time::Duration;
///
/// # #[coloop::main]
/// # async fn main() {
/// let (a, b) = coloop::when_all((
///     async {
///         coloop::sleep_for(Duration::from_millis(2)).await;
///         1
///     },
///     async { "two" },
/// ))
/// .await;
/// assert_eq!((a, b), (1, "two"));
/// # }
/// ```
pub fn when_all<O: Operands>(operands: O) -> WhenAll<O> {
    WhenAll {
        join: Join::new(Policy::All, operands),
    }
}

/// [`when_all`] over a runtime-sized set of awaitables of one type.
///
/// Outputs are collected in iteration order. An empty iterator is rejected
/// with [`JoinError::Empty`].
pub fn when_all_iter<I>(operands: I) -> Result<WhenAll<Many<I::Item>>, JoinError>
where
    I: IntoIterator,
    I::Item: IntoFuture,
    <I::Item as IntoFuture>::IntoFuture: 'static,
    <I::Item as IntoFuture>::Output: 'static,
{
    let operands = Many::new(operands.into_iter().collect());
    if operands.is_empty() {
        return Err(JoinError::Empty);
    }

    Ok(when_all(operands))
}
