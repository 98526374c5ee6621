use futures::task::{ArcWake, waker};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::Waker;

#[derive(Debug, Default)]
pub(crate) struct WakerData {
    pub wake_count: AtomicUsize,
}

impl WakerData {
    pub(crate) fn get_count(&self) -> usize {
        self.wake_count.load(Ordering::Relaxed)
    }
}

impl ArcWake for WakerData {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.wake_count.fetch_add(1, Ordering::Relaxed);
    }
}

// Mocking where the Waker will increment the atomic everytime it is woken up.
pub(crate) fn mock_waker() -> (Waker, Arc<WakerData>) {
    let data = Arc::new(WakerData::default());
    (waker(data.clone()), data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_waker_counts_wakes() {
        let (waker, data) = mock_waker();

        waker.wake_by_ref();
        waker.clone().wake();
        assert_eq!(data.get_count(), 2);

        drop(waker);
        assert_eq!(Arc::strong_count(&data), 1);
    }
}
