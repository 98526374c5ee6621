use std::marker::PhantomData;

/// Runs a closure when dropped, including while unwinding.
///
/// Used to restore thread-local state on every exit path of a loop run.
pub(crate) struct ScopeGuard<'a, F: FnOnce()> {
    // Taken on drop so the closure runs at most once.
    closure: Option<F>,

    _p: PhantomData<&'a ()>,
}

impl<'a, F: FnOnce()> ScopeGuard<'a, F> {
    pub(crate) fn new(closure: F) -> Self {
        ScopeGuard {
            closure: Some(closure),
            _p: PhantomData,
        }
    }
}

impl<'a, F: FnOnce()> Drop for ScopeGuard<'a, F> {
    fn drop(&mut self) {
        if let Some(closure) = self.closure.take() {
            closure();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn test_guard_runs_on_scope_exit() {
        let runs = Cell::new(0);
        {
            let _guard = ScopeGuard::new(|| runs.set(runs.get() + 1));
            assert_eq!(runs.get(), 0);
        }
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_guard_runs_while_unwinding() {
        let runs = Cell::new(0);
        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = ScopeGuard::new(|| runs.set(runs.get() + 1));
            panic!("unwind");
        }));

        assert!(res.is_err());
        assert_eq!(runs.get(), 1);
    }
}
