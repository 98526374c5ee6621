use std::any::Any;

/// Makes a `Send` value `Sync` by never handing out a shared reference to it.
///
/// Only owned access is offered, so sharing `&SyncWrapper<T>` across threads
/// cannot reach the inner value.
pub(crate) struct SyncWrapper<T> {
    value: T,
}

// Safety: the inner value is only reachable through `&mut self` or by value,
// both of which rule out concurrent access.
unsafe impl<T: Send> Send for SyncWrapper<T> {}
unsafe impl<T> Sync for SyncWrapper<T> {}

impl<T> SyncWrapper<T> {
    pub(crate) fn new(value: T) -> Self {
        Self { value }
    }

    pub(crate) fn into_inner(self) -> T {
        self.value
    }
}

impl SyncWrapper<Box<dyn Any + Send>> {
    /// Shared downcast, allowed because the target type is itself `Sync`.
    pub(crate) fn downcast_ref_sync<T: Any + Sync>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}
