//! Explicit suspend points.
//!
//! A [`SuspendPoint`] decides three things when a frame reaches it: whether
//! suspending is needed at all, what happens once the frame is parked, and
//! what the frame gets back when it is resumed. [`Suspend`] turns any suspend
//! point into a future.

use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

/// What runs after a frame suspends.
#[derive(Debug)]
pub enum Transfer {
    /// Return control to the loop, which picks the next ready frame.
    Scheduler,

    /// Hand control to another frame: its waker is woken right away, and a
    /// frame woken this way is placed first in the ready queue.
    Frame(Waker),

    /// Stay parked until something else resumes the frame.
    Stay,
}

/// The contract of a point where a frame may suspend.
///
/// ```
/// use coloop::suspend::{SuspendPoint, Transfer, suspend};
/// use std::task::Waker;
///
/// /// Suspends once, then resumes with the number of suspensions.
/// struct Once(u32);
///
/// impl SuspendPoint for Once {
///     type Output = u32;
///
///     fn is_ready(&self) -> bool {
///         false
///     }
///
///     fn on_suspend(&mut self, frame: &Waker) -> Transfer {
///         self.0 += 1;
///         Transfer::Frame(frame.clone())
///     }
///
///     fn on_resume(&mut self) -> u32 {
///         self.0
///     }
/// }
///
/// let lp = coloop::Loop::new();
/// assert_eq!(lp.block_on(suspend(Once(0))), 1);
/// ```
pub trait SuspendPoint {
    type Output;

    /// If true the frame does not suspend and [`on_resume`] is called
    /// immediately.
    ///
    /// [`on_resume`]: SuspendPoint::on_resume
    fn is_ready(&self) -> bool;

    /// Called once the frame is parked. `frame` wakes the suspended frame.
    fn on_suspend(&mut self, frame: &Waker) -> Transfer;

    /// Produces the value of the suspension.
    fn on_resume(&mut self) -> Self::Output;

    /// Consulted when a suspended frame is polled again. Returning false
    /// treats the poll as spurious and suspends the frame once more.
    fn is_resumable(&self) -> bool {
        true
    }
}

impl<P: SuspendPoint + ?Sized> SuspendPoint for &mut P {
    type Output = P::Output;

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn on_suspend(&mut self, frame: &Waker) -> Transfer {
        (**self).on_suspend(frame)
    }

    fn on_resume(&mut self) -> Self::Output {
        (**self).on_resume()
    }

    fn is_resumable(&self) -> bool {
        (**self).is_resumable()
    }
}

impl<P: SuspendPoint + ?Sized> SuspendPoint for Box<P> {
    type Output = P::Output;

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn on_suspend(&mut self, frame: &Waker) -> Transfer {
        (**self).on_suspend(frame)
    }

    fn on_resume(&mut self) -> Self::Output {
        (**self).on_resume()
    }

    fn is_resumable(&self) -> bool {
        (**self).is_resumable()
    }
}

/// Conversion into the suspend point that is awaited in place of `Self`.
pub trait IntoSuspendPoint {
    type Point: SuspendPoint;

    fn into_suspend_point(self) -> Self::Point;
}

impl<P: SuspendPoint> IntoSuspendPoint for P {
    type Point = P;

    fn into_suspend_point(self) -> P {
        self
    }
}

/// Await the suspend point `point` converts into.
pub fn suspend<P: IntoSuspendPoint>(point: P) -> Suspend<P::Point> {
    Suspend::new(point.into_suspend_point())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Fresh,
    Suspended,
    Done,
}

/// Future driving a [`SuspendPoint`].
#[pin_project]
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Suspend<P> {
    point: P,
    stage: Stage,
}

impl<P: SuspendPoint> Suspend<P> {
    pub fn new(point: P) -> Self {
        Self {
            point,
            stage: Stage::Fresh,
        }
    }

    pub fn point(&self) -> &P {
        &self.point
    }

    pub fn is_terminated(&self) -> bool {
        self.stage == Stage::Done
    }
}

impl<P: SuspendPoint> Future for Suspend<P> {
    type Output = P::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        match *this.stage {
            Stage::Fresh if this.point.is_ready() => {}
            Stage::Suspended if this.point.is_resumable() => {}
            Stage::Fresh | Stage::Suspended => {
                match this.point.on_suspend(cx.waker()) {
                    Transfer::Frame(next) => crate::runtime::wake_first(next),
                    Transfer::Scheduler | Transfer::Stay => {}
                }

                *this.stage = Stage::Suspended;
                return Poll::Pending;
            }
            Stage::Done => panic!("`Suspend` polled after completion"),
        }

        *this.stage = Stage::Done;
        Poll::Ready(this.point.on_resume())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate as coloop;
    use crate::runtime::{AddMode, Builder};
    use crate::test_utils::*;
    use anyhow::Result;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Suspend point recording every call made on it.
    #[derive(Debug, Default)]
    struct Recorder {
        ready: bool,
        resumable: Rc<Cell<bool>>,
        suspends: usize,
        resumes: usize,
        parked: Option<Waker>,
    }

    impl SuspendPoint for Recorder {
        type Output = (usize, usize);

        fn is_ready(&self) -> bool {
            self.ready
        }

        fn on_suspend(&mut self, frame: &Waker) -> Transfer {
            self.suspends += 1;
            self.parked = Some(frame.clone());
            Transfer::Stay
        }

        fn on_resume(&mut self) -> Self::Output {
            self.resumes += 1;
            (self.suspends, self.resumes)
        }

        fn is_resumable(&self) -> bool {
            self.resumable.get()
        }
    }

    fn poll_once<F: Future + Unpin>(fut: &mut F) -> Poll<F::Output> {
        let (waker, _) = mock_waker();
        Pin::new(fut).poll(&mut Context::from_waker(&waker))
    }

    #[test]
    fn test_ready_point_never_suspends() {
        let mut fut = suspend(Recorder {
            ready: true,
            ..Default::default()
        });

        assert_eq!(poll_once(&mut fut), Poll::Ready((0, 1)));
        assert!(fut.is_terminated());
    }

    #[test]
    fn test_suspend_then_resume() {
        let resumable = Rc::new(Cell::new(true));
        let mut fut = suspend(Recorder {
            resumable: resumable.clone(),
            ..Default::default()
        });

        assert_eq!(poll_once(&mut fut), Poll::Pending);
        assert!(fut.point().parked.is_some());
        assert_eq!(poll_once(&mut fut), Poll::Ready((1, 1)));
    }

    #[test]
    fn test_spurious_poll_suspends_again() {
        let resumable = Rc::new(Cell::new(false));
        let mut fut = suspend(Recorder {
            resumable: resumable.clone(),
            ..Default::default()
        });

        assert_eq!(poll_once(&mut fut), Poll::Pending);
        assert_eq!(poll_once(&mut fut), Poll::Pending);
        assert_eq!(fut.point().suspends, 2);

        resumable.set(true);
        assert_eq!(poll_once(&mut fut), Poll::Ready((2, 1)));
    }

    #[test]
    fn test_delegation_through_mut_and_box() {
        let mut recorder = Recorder {
            ready: true,
            ..Default::default()
        };

        assert_eq!(poll_once(&mut suspend(&mut recorder)), Poll::Ready((0, 1)));
        assert_eq!(recorder.resumes, 1);

        let boxed: Box<dyn SuspendPoint<Output = (usize, usize)>> = Box::new(Recorder {
            ready: true,
            ..Default::default()
        });
        assert_eq!(poll_once(&mut suspend(boxed)), Poll::Ready((0, 1)));
    }

    /// Hands control to the frame it wraps when suspended.
    struct HandOff(Option<Waker>);

    impl SuspendPoint for HandOff {
        type Output = ();

        fn is_ready(&self) -> bool {
            false
        }

        fn on_suspend(&mut self, frame: &Waker) -> Transfer {
            match self.0.take() {
                Some(next) => Transfer::Frame(next),
                None => Transfer::Frame(frame.clone()),
            }
        }

        fn on_resume(&mut self) {}
    }

    #[test]
    fn test_transfer_to_frame_wakes_it() {
        let (next, data) = mock_waker();
        let mut fut = suspend(HandOff(Some(next)));

        assert_eq!(poll_once(&mut fut), Poll::Pending);
        assert_eq!(data.get_count(), 1);
    }

    #[coloop::test]
    async fn test_transfer_to_self_resumes_on_loop() -> Result<()> {
        suspend(HandOff(None)).await;

        let resumes = crate::context::expect_scheduler()
            .tracker
            .num_calls(&crate::utils::scheduler::Method::Resume);
        assert_eq!(resumes, 2);
        Ok(())
    }

    /// Parks the frame and leaves its waker in the slot.
    struct Park(Rc<RefCell<Option<Waker>>>);

    impl SuspendPoint for Park {
        type Output = ();

        fn is_ready(&self) -> bool {
            false
        }

        fn on_suspend(&mut self, frame: &Waker) -> Transfer {
            *self.0.borrow_mut() = Some(frame.clone());
            Transfer::Scheduler
        }

        fn on_resume(&mut self) {}
    }

    #[test]
    fn test_transfer_target_runs_before_other_ready_frames() -> Result<()> {
        let lp = init_loop(Some(Builder::new().ready_order(AddMode::Fifo)));
        let log = Rc::new(RefCell::new(Vec::new()));
        let parked = Rc::new(RefCell::new(None));

        let target = {
            let (log, parked) = (log.clone(), parked.clone());
            crate::task(async move {
                suspend(Park(parked)).await;
                log.borrow_mut().push("target");
            })
        };
        lp.schedule_ready(&target)?;
        lp.run_all()?;
        let next = parked.borrow_mut().take().expect("target is parked");

        let handoff = {
            let log = log.clone();
            crate::task(async move {
                log.borrow_mut().push("handoff");
                suspend(HandOff(Some(next))).await;
            })
        };
        let bystander = {
            let log = log.clone();
            crate::task(async move { log.borrow_mut().push("bystander") })
        };

        // FIFO: the bystander is queued behind the hand-off, yet the target
        // it hands to still runs first.
        lp.schedule_ready(&handoff)?;
        lp.schedule_ready(&bystander)?;
        lp.run_all()?;

        assert_eq!(*log.borrow(), ["handoff", "target", "bystander"]);
        assert!(target.is_finished());
        Ok(())
    }
}
