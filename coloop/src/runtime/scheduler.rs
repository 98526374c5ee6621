use crate::runtime::builder::LoopConfig;
use crate::runtime::waker::{FrameWaker, ReadyQueue};
use crate::runtime::{AddMode, LoopError, WaitSet};
use crate::task::{FrameBinding, Id, RawFrame};
#[cfg(test)]
use crate::utils::scheduler::Tracker;
use crate::utils::scheduler::{Call, Method, SkipReason};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::task::Waker;
use std::time::Instant;
use tracing::{debug, trace};

/// State shared by a [`Loop`](crate::Loop) and the frames bound to it.
pub(crate) struct Scheduler {
    pub(crate) cfg: LoopConfig,

    ready: Arc<ReadyQueue>,

    /// Frames bound to this loop. Entries are weak: the owning `Task` (or
    /// combinator) decides how long a frame lives.
    frames: RefCell<HashMap<Id, Weak<RawFrame>>>,

    wait_set: RefCell<Box<dyn WaitSet>>,

    #[cfg(test)]
    pub(crate) tracker: Tracker,
}

/// When [`Handle::drive`] returns.
#[derive(Clone, Copy)]
pub(crate) enum Until<'a> {
    /// As soon as this frame finishes.
    Finished(&'a RawFrame),

    /// Once neither a ready frame nor a pending timer is left.
    Idle,
}

enum NextTimer {
    Fired,
    At(Instant),
    Empty,
}

impl Scheduler {
    pub(crate) fn new(cfg: LoopConfig, wait_set: Box<dyn WaitSet>) -> Self {
        Self {
            ready: Arc::new(ReadyQueue::new(cfg.ready_order, cfg.ready_capacity)),
            frames: RefCell::new(HashMap::with_capacity(cfg.ready_capacity)),
            wait_set: RefCell::new(wait_set),
            cfg,

            #[cfg(test)]
            tracker: Tracker::new(),
        }
    }

    pub(crate) fn into_handle(self) -> Handle {
        Handle(Rc::new(self))
    }

    pub(crate) fn unregister(&self, id: Id) {
        // A frame dropped while the registry is being walked is removed on
        // its next (skipped) wake instead.
        if let Ok(mut frames) = self.frames.try_borrow_mut() {
            frames.remove(&id);
        }
    }

    /// Queue the frame `id`. Waking an already queued frame is a no-op.
    pub(crate) fn schedule_id(&self, id: Id, mode: AddMode) -> bool {
        self.track(Method::ScheduleReady, Call::ScheduleReady { id, mode });
        self.ready.push(id, mode)
    }

    pub(crate) fn schedule_at(&self, expiry: Instant, waker: Waker) {
        self.track(Method::ScheduleAt, Call::ScheduleAt { expiry });
        trace!(?expiry, "timer registered");
        self.wait_set.borrow_mut().insert(expiry, waker);
    }

    pub(crate) fn ready_len(&self) -> usize {
        self.ready.len()
    }

    pub(crate) fn pending_timers(&self) -> usize {
        self.wait_set.borrow().len()
    }

    fn resume_id(&self, id: Id) {
        let frame = self.frames.borrow().get(&id).and_then(Weak::upgrade);

        let Some(frame) = frame else {
            trace!(task = %id, "skipping dropped frame");
            self.track(
                Method::Skip,
                Call::Skip {
                    id,
                    reason: SkipReason::Dropped,
                },
            );
            self.unregister(id);
            return;
        };

        if frame.is_finished() {
            trace!(task = %id, "skipping finished frame");
            self.track(
                Method::Skip,
                Call::Skip {
                    id,
                    reason: SkipReason::Finished,
                },
            );
            return;
        }

        self.track(Method::Resume, Call::Resume { id });
        trace!(task = %id, "resuming frame");

        if let Err(err) = frame.resume() {
            debug!(task = %id, %err, "frame refused to resume");
        }
    }

    /// Pops the earliest timer and wakes its frame if it is due.
    fn fire_due_timer(&self, now: Instant) -> NextTimer {
        let mut wait_set = self.wait_set.borrow_mut();
        let Some(expiry) = wait_set.peek() else {
            return NextTimer::Empty;
        };

        if expiry > now {
            return NextTimer::At(expiry);
        }

        let entry = wait_set.pop();
        drop(wait_set);

        if let Some(entry) = entry {
            self.track(
                Method::Expire,
                Call::Expire {
                    expiry: entry.expiry,
                },
            );
            trace!(expiry = ?entry.expiry, "timer expired");
            entry.waker.wake();
        }

        NextTimer::Fired
    }

    // Small price to pay to get introspection on all scheduler calls during
    // testing. No op in release builds.
    #[allow(unused_variables)]
    #[inline(always)]
    fn track(&self, method: Method, call: Call) {
        #[cfg(test)]
        self.tracker.record(method, call);
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("cfg", &self.cfg)
            .field("ready", &self.ready.len())
            .field("frames", &self.frames.borrow().len())
            .field("timers", &self.pending_timers())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Handle(Rc<Scheduler>);

impl Handle {
    /// Records `frame` in the registry and creates the waker that queues it.
    pub(crate) fn register(&self, frame: &Rc<RawFrame>) -> FrameBinding {
        let id = frame.id();
        self.frames.borrow_mut().insert(id, Rc::downgrade(frame));

        let waker = FrameWaker::new_waker(id, self.ready.clone());
        FrameBinding::new(waker, Rc::downgrade(&self.0))
    }

    /// True if `scheduler` points at this loop.
    pub(crate) fn owns(&self, scheduler: &Weak<Scheduler>) -> bool {
        std::ptr::eq(scheduler.as_ptr(), Rc::as_ptr(&self.0))
    }

    /// Binds `frame` to this loop if needed and queues it.
    ///
    /// A frame already bound to another loop is rejected: its waker feeds
    /// that loop's ready queue, so this one would never see it again.
    pub(crate) fn schedule_frame(
        &self,
        frame: &Rc<RawFrame>,
        mode: AddMode,
    ) -> Result<(), LoopError> {
        if frame.is_bound_elsewhere(self) {
            return Err(LoopError::ForeignFrame { id: frame.id() });
        }

        frame.bind(self);
        self.schedule_id(frame.id(), mode);
        Ok(())
    }

    /// Drive frames until `until` is reached.
    ///
    /// The ready queue is drained first, one resume at a time. With nothing
    /// ready, the earliest timer is fired if due, otherwise the thread parks
    /// until it is due or a waker fires.
    pub(crate) fn drive(&self, until: Until<'_>) {
        let done = || match until {
            Until::Finished(root) => root.is_finished(),
            Until::Idle => false,
        };

        loop {
            while let Some(id) = self.ready.pop() {
                self.resume_id(id);
                if done() {
                    return;
                }
            }

            if done() {
                return;
            }

            match self.fire_due_timer(Instant::now()) {
                NextTimer::Fired => {}
                NextTimer::At(expiry) => {
                    trace!(?expiry, "parking until next timer");
                    self.ready.park(Some(expiry));
                }
                NextTimer::Empty => {
                    if matches!(until, Until::Idle) {
                        return;
                    }

                    debug!("nothing ready and no timers, parking until woken");
                    self.ready.park(None);
                }
            }
        }
    }
}

impl Deref for Handle {
    type Target = Scheduler;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
