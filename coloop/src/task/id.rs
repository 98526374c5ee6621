use crate::context;
use std::sync::atomic::{AtomicU64, Ordering};

use std::{fmt, num::NonZeroU64};

/// An opaque ID that uniquely identifies a task frame for the lifetime of the
/// process.
///
/// # Notes
///
/// - Ids are handed out from a process-wide counter, so two loops never see
///   the same id.
/// - The id of the frame currently being resumed can be obtained from inside
///   the frame with [`task::try_id()`](crate::task::try_id()) and
///   [`task::id()`](crate::task::id()), and from outside with
///   [`Task::id()`](crate::task::Task::id()).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct Id(pub(crate) NonZeroU64);

/// Returns the [`Id`] of the frame currently being resumed.
///
/// # Panics
///
/// This function panics if called from outside a task frame. For a version
/// that doesn't panic, see [`task::try_id()`](crate::task::try_id()).
#[track_caller]
pub fn id() -> Id {
    context::current_frame_id().expect("Can't get a task id when not inside a task")
}

/// Returns the [`Id`] of the frame currently being resumed, or `None` if
/// called outside of a task frame.
pub fn try_id() -> Option<Id> {
    context::current_frame_id()
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Id {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);

        let id = COUNTER.fetch_add(1, Ordering::Relaxed);

        let Some(id) = NonZeroU64::new(id) else {
            Self::exhausted();
        };

        Self(id)
    }

    #[cold]
    fn exhausted() -> ! {
        panic!("failed to generate unique task ID: bitspace exhausted")
    }

    pub fn as_u64(&self) -> u64 {
        self.0.get()
    }
}

/// Records the id of the frame being resumed in the thread context, restoring
/// the previous one (the resumer) on drop.
pub(crate) struct FrameIdGuard {
    parent: Option<Id>,
}

impl FrameIdGuard {
    pub(crate) fn enter(id: Id) -> Self {
        FrameIdGuard {
            parent: context::set_current_frame_id(Some(id)),
        }
    }
}

impl Drop for FrameIdGuard {
    fn drop(&mut self) {
        context::set_current_frame_id(self.parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::HashSet;

    #[test]
    fn test_new_task_id_unique() -> Result<()> {
        let n = 13;
        let all_ids = (0..n)
            .map(|_| crate::task(async { 42 }).id())
            .collect::<HashSet<_>>();

        assert_eq!(all_ids.len(), n);
        Ok(())
    }

    #[test]
    fn test_frame_id_guard_restores_parent() {
        assert_eq!(try_id(), None);

        let outer = Id::next();
        let inner = Id::next();
        {
            let _outer = FrameIdGuard::enter(outer);
            assert_eq!(try_id(), Some(outer));
            {
                let _inner = FrameIdGuard::enter(inner);
                assert_eq!(id(), inner);
            }
            assert_eq!(try_id(), Some(outer));
        }

        assert_eq!(try_id(), None);
    }
}
