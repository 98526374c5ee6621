use crate::join::JoinError;
use crate::join::control::{Join, Operands, Policy};
use crate::join::tuple::Many;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by [`when_any`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct WhenAny<O: Operands> {
    join: Join<O>,
}

impl<O: Operands> Future for WhenAny<O> {
    type Output = O::OneOf;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.join.poll_join(cx).map(|(winner, slots)| {
            // An any-join is only signalled by the report that records its
            // winner.
            let index = winner.expect("signalled when_any records a winner");
            O::take_one(&slots, index)
        })
    }
}

impl<O: Operands> fmt::Debug for WhenAny<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhenAny").finish_non_exhaustive()
    }
}

/// Runs every operand concurrently and completes with the output of the first
/// one to finish, tagged with its position.
///
/// Operands start in order, so when several can finish without suspending,
/// the earliest one wins. The losers are not cancelled: their frames are
/// dropped with the returned future, wherever they happen to be suspended.
///
/// ```
/// use std::time::Duration;
/// use coloop::join::OneOf2;
///
/// # #[coloop::main]
/// # async fn main() {
/// let first = coloop::when_any((
///     coloop::sleep_for(Duration::from_millis(50)),
///     async { 7 },
/// ))
/// .await;
/// assert_eq!(first, OneOf2::V1(7));
/// # }
/// ```
pub fn when_any<O: Operands>(operands: O) -> WhenAny<O> {
    WhenAny {
        join: Join::new(Policy::Any, operands),
    }
}

/// [`when_any`] over a runtime-sized set of awaitables of one type.
///
/// Completes with the winner's position and output. An empty iterator is
/// rejected with [`JoinError::Empty`].
pub fn when_any_iter<I>(operands: I) -> Result<WhenAny<Many<I::Item>>, JoinError>
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

    Ok(when_any(operands))
}
