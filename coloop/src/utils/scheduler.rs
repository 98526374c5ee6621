//! Introspection on scheduler calls. The call types always exist so the
//! scheduler can describe what it does; only tests pay for recording them.

use crate::runtime::AddMode;
use crate::task::Id;
#[cfg(test)]
use dashmap::DashMap;
#[cfg(test)]
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Method {
    ScheduleReady,
    ScheduleAt,
    Resume,
    Skip,
    Expire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipReason {
    Dropped,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    ScheduleReady { id: Id, mode: AddMode },
    ScheduleAt { expiry: Instant },
    Resume { id: Id },
    Skip { id: Id, reason: SkipReason },
    Expire { expiry: Instant },
}

/// Records every scheduler call made during a test.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct Tracker {
    calls: Arc<DashMap<Method, Vec<Call>>>,
}

#[cfg(test)]
impl Tracker {
    pub(crate) fn new() -> Self {
        let map = DashMap::new();
        for method in [
            Method::ScheduleReady,
            Method::ScheduleAt,
            Method::Resume,
            Method::Skip,
            Method::Expire,
        ] {
            map.insert(method, Vec::new());
        }

        Self {
            calls: Arc::new(map),
        }
    }

    pub(crate) fn record(&self, method: Method, call: Call) {
        self.calls
            .get_mut(&method)
            .expect("method not found")
            .push(call)
    }

    pub(crate) fn get_calls(&self, method: &Method) -> Vec<Call> {
        self.calls
            .get(method)
            .expect("method not found")
            .value()
            .clone()
    }

    pub(crate) fn num_calls(&self, method: &Method) -> usize {
        self.calls.get(method).map_or(0, |calls| calls.len())
    }

    /// Ids of resumed frames, in resume order.
    pub(crate) fn resumed(&self) -> Vec<Id> {
        self.get_calls(&Method::Resume)
            .into_iter()
            .filter_map(|call| match call {
                Call::Resume { id } => Some(id),
                _ => None,
            })
            .collect()
    }
}
