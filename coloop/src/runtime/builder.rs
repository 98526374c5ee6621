use crate::runtime::{AddMode, Loop, TimerHeap, WaitSet};
use std::fmt;

/// Initial capacity of the ready queue and frame registry.
const READY_CAPACITY: usize = 64;

const DEFAULT_NAME: &str = "coloop";

/// Configures and creates a [`Loop`].
///
/// ```
/// use coloop::runtime::{AddMode, Builder};
///
/// let lp = Builder::new()
///     .ready_order(AddMode::Fifo)
///     .name("worker")
///     .build();
///
/// assert_eq!(lp.block_on(async { 1 + 1 }), 2);
/// ```
pub struct Builder {
    /// Where woken frames are placed in the ready queue. Defaults to
    /// [`AddMode::Lifo`], so the most recently woken frame runs first.
    ready_order: AddMode,

    /// Initial capacity of the ready queue and frame registry.
    ready_capacity: usize,

    /// Replaces the default [`TimerHeap`].
    wait_set: Option<Box<dyn WaitSet>>,

    /// Recorded on the `loop` tracing span of every run.
    name: String,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            ready_order: AddMode::Lifo,
            ready_capacity: READY_CAPACITY,
            wait_set: None,
            name: DEFAULT_NAME.to_string(),
        }
    }

    pub fn ready_order(mut self, order: AddMode) -> Self {
        self.ready_order = order;
        self
    }

    #[track_caller]
    pub fn ready_capacity(mut self, val: usize) -> Self {
        assert!(val > 0, "ready_capacity must be greater than 0");
        self.ready_capacity = val;
        self
    }

    /// Use `wait_set` to hold time-deferred frames.
    pub fn wait_set<W: WaitSet + 'static>(mut self, wait_set: W) -> Self {
        self.wait_set = Some(Box::new(wait_set));
        self
    }

    #[track_caller]
    pub fn name(mut self, val: impl Into<String>) -> Self {
        let val = val.into();
        assert!(!val.is_empty(), "loop name must not be empty");
        self.name = val;
        self
    }

    /// Creates the configured [`Loop`]. Building does not run anything; the
    /// loop only drives frames from within one of its `run` methods.
    pub fn build(self) -> Loop {
        let (cfg, wait_set) = self.into_parts();
        Loop::from_config(cfg, wait_set)
    }

    fn into_parts(self) -> (LoopConfig, Box<dyn WaitSet>) {
        let wait_set = self
            .wait_set
            .unwrap_or_else(|| Box::new(TimerHeap::with_capacity(self.ready_capacity)));

        let cfg = LoopConfig {
            ready_order: self.ready_order,
            ready_capacity: self.ready_capacity,
            name: self.name,
        };

        (cfg, wait_set)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("ready_order", &self.ready_order)
            .field("ready_capacity", &self.ready_capacity)
            .field("wait_set", &self.wait_set)
            .field("name", &self.name)
            .finish()
    }
}

/// Builder settings consumed by the scheduler.
#[derive(Debug, Clone)]
pub(crate) struct LoopConfig {
    pub(crate) ready_order: AddMode,
    pub(crate) ready_capacity: usize,
    pub(crate) name: String,
}

impl Default for LoopConfig {
    fn default() -> Self {
        let (cfg, _) = Builder::new().into_parts();
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::catch_unwind;

    #[test]
    fn test_defaults() {
        let cfg = LoopConfig::default();
        assert_eq!(cfg.ready_order, AddMode::Lifo);
        assert_eq!(cfg.ready_capacity, READY_CAPACITY);
        assert_eq!(cfg.name, DEFAULT_NAME);
    }

    #[test]
    fn test_setters() {
        let (cfg, wait_set) = Builder::new()
            .ready_order(AddMode::Fifo)
            .ready_capacity(8)
            .name("custom")
            .wait_set(TimerHeap::new())
            .into_parts();

        assert_eq!(cfg.ready_order, AddMode::Fifo);
        assert_eq!(cfg.ready_capacity, 8);
        assert_eq!(cfg.name, "custom");
        assert!(wait_set.is_empty());
    }

    #[test]
    fn test_invalid_values_panic() {
        assert!(catch_unwind(|| Builder::new().ready_capacity(0)).is_err());
        assert!(catch_unwind(|| Builder::new().name("")).is_err());
    }
}
