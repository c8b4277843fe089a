//! Caller-side polling for the non-blocking pool operations.
//!
//! The pool never parks a thread. Producers and consumers that want to wait
//! for a block re-invoke the operation under a [`PollPolicy`]; no pool lock is
//! held while they sleep.

use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

/// Retry schedule for [`poll`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Sleep between two empty results.
    #[serde(with = "millis")]
    pub interval: Duration,
    /// Consecutive empty results tolerated before giving up; `None` polls forever.
    pub max_idle_polls: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10),
            max_idle_polls: Some(100),
        }
    }
}

impl PollPolicy {
    /// Policy that keeps polling until the operation yields a value.
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_idle_polls: None,
        }
    }
}

/// Re-invokes `op` until it returns `Some` or the policy's idle budget runs out.
pub fn poll<T>(policy: &PollPolicy, mut op: impl FnMut() -> Option<T>) -> Option<T> {
    let mut idle = 0u32;
    loop {
        if let Some(value) = op() {
            return Some(value);
        }
        idle = idle.saturating_add(1);
        if policy.max_idle_polls.is_some_and(|max| idle >= max) {
            return None;
        }
        if policy.interval.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(policy.interval);
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
