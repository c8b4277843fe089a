use std::path::Path;

use block_pool::{BlockPoolConfig, PollPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ScenarioError, ScenarioResult};

/// Largest workload a single run accepts. The runner keeps every expected and
/// observed value in memory.
pub const MAX_SCENARIO_ITEMS: u32 = 1 << 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Produce `items` values as fast as the pool allows.
    Flood { items: u32 },
    /// Produce `bursts` groups of `burst_size` values, pausing between groups.
    Burst {
        bursts: u32,
        burst_size: u32,
        #[serde(default)]
        pause_ms: u64,
    },
    /// Slow consumer: sleeps `consumer_delay_ms` per item so the producer hits exhaustion.
    Backpressure { items: u32, consumer_delay_ms: u64 },
}

impl ScenarioKind {
    pub fn total_items(&self) -> u32 {
        match *self {
            ScenarioKind::Flood { items } | ScenarioKind::Backpressure { items, .. } => items,
            ScenarioKind::Burst {
                bursts, burst_size, ..
            } => bursts.saturating_mul(burst_size),
        }
    }

    /// Exact item count, without saturation.
    pub fn requested_items(&self) -> u64 {
        match *self {
            ScenarioKind::Flood { items } | ScenarioKind::Backpressure { items, .. } => {
                u64::from(items)
            }
            ScenarioKind::Burst {
                bursts, burst_size, ..
            } => u64::from(bursts) * u64::from(burst_size),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::Flood { .. } => "flood",
            ScenarioKind::Burst { .. } => "burst",
            ScenarioKind::Backpressure { .. } => "backpressure",
        }
    }

    pub(crate) fn consumer_delay(&self) -> Duration {
        match *self {
            ScenarioKind::Backpressure {
                consumer_delay_ms, ..
            } => Duration::from_millis(consumer_delay_ms),
            _ => Duration::ZERO,
        }
    }
}

/// Everything needed to run one scenario: pool shape, workload and retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub pool: BlockPoolConfig,
    pub scenario: ScenarioKind,
    pub poll: PollPolicy,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            pool: BlockPoolConfig {
                block_size: 8,
                capacity: 10,
            },
            scenario: ScenarioKind::Flood { items: 1_000 },
            poll: PollPolicy {
                interval: Duration::from_millis(1),
                max_idle_polls: Some(1_000),
            },
        }
    }
}

impl ScenarioConfig {
    pub fn from_toml_str(text: &str) -> ScenarioResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects workloads above [`MAX_SCENARIO_ITEMS`].
    pub fn validate(&self) -> ScenarioResult<()> {
        let requested = self.scenario.requested_items();
        if requested > u64::from(MAX_SCENARIO_ITEMS) {
            return Err(ScenarioError::TooManyItems {
                requested,
                limit: MAX_SCENARIO_ITEMS,
            });
        }
        Ok(())
    }

    pub fn load(path: &Path) -> ScenarioResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ScenarioConfig::from_toml_str("").expect("parse");
        assert_eq!(config, ScenarioConfig::default());
    }

    #[test]
    fn parses_full_document() {
        let config = ScenarioConfig::from_toml_str(
            r#"
            [pool]
            block_size = 64
            capacity = 4

            [scenario]
            kind = "burst"
            bursts = 3
            burst_size = 16
            pause_ms = 2

            [poll]
            interval = 5
            max_idle_polls = 50
            "#,
        )
        .expect("parse");

        assert_eq!(
            config.pool,
            BlockPoolConfig {
                block_size: 64,
                capacity: 4
            }
        );
        assert_eq!(
            config.scenario,
            ScenarioKind::Burst {
                bursts: 3,
                burst_size: 16,
                pause_ms: 2
            }
        );
        assert_eq!(config.scenario.total_items(), 48);
        assert_eq!(config.poll.interval, Duration::from_millis(5));
        assert_eq!(config.poll.max_idle_polls, Some(50));
    }

    #[test]
    fn partial_pool_table_keeps_other_defaults() {
        let config = ScenarioConfig::from_toml_str(
            r#"
            [pool]
            capacity = 2

            [scenario]
            kind = "backpressure"
            items = 10
            consumer_delay_ms = 1
            "#,
        )
        .expect("parse");
        assert_eq!(config.pool.capacity, 2);
        assert_eq!(config.pool.block_size, BlockPoolConfig::default().block_size);
        assert_eq!(config.scenario.name(), "backpressure");
        assert_eq!(config.scenario.consumer_delay(), Duration::from_millis(1));
    }

    #[test]
    fn oversized_burst_is_rejected() {
        let err = ScenarioConfig::from_toml_str(
            r#"
            [scenario]
            kind = "burst"
            bursts = 4294967295
            burst_size = 2
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::TooManyItems {
                requested: 8_589_934_590,
                limit: MAX_SCENARIO_ITEMS
            }
        ));
    }

    #[test]
    fn workload_at_limit_is_accepted() {
        let config = ScenarioConfig {
            scenario: ScenarioKind::Flood {
                items: MAX_SCENARIO_ITEMS,
            },
            ..ScenarioConfig::default()
        };
        config.validate().expect("limit is inclusive");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = ScenarioConfig::from_toml_str("[scenario]\nkind = \"trickle\"\n").unwrap_err();
        assert!(matches!(err, ScenarioError::Config(_)));
    }
}
