use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize)]
pub struct ScenarioStats {
    pub produced: u32,
    pub consumed: u32,
    /// Producer claims that found the pool exhausted.
    pub free_misses: u32,
    /// Consumer polls that found the ready queue empty.
    pub ready_misses: u32,
    pub max_ready_depth: u32,
}

impl ScenarioStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub trait StatsSink: Clone + Send + Sync + 'static {
    fn with_stats<R>(&self, f: impl FnOnce(&mut ScenarioStats) -> R) -> R;

    fn snapshot(&self) -> ScenarioStats {
        self.with_stats(|stats| *stats)
    }
}

#[derive(Clone, Default)]
pub struct ArcStatsSink(pub Arc<Mutex<ScenarioStats>>);

impl ArcStatsSink {
    pub fn new(stats: Arc<Mutex<ScenarioStats>>) -> Self {
        Self(stats)
    }
}

impl StatsSink for ArcStatsSink {
    fn with_stats<R>(&self, f: impl FnOnce(&mut ScenarioStats) -> R) -> R {
        let mut guard = self.0.lock();
        f(&mut *guard)
    }
}

impl StatsSink for Arc<Mutex<ScenarioStats>> {
    fn with_stats<R>(&self, f: impl FnOnce(&mut ScenarioStats) -> R) -> R {
        let mut guard = self.lock();
        f(&mut *guard)
    }
}
