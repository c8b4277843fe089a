use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use block_pool::{poll, BlockPool, BlockPoolConfig, PoolStats};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::checks::{verify, CheckResult, DrainReport};
use crate::config::{ScenarioConfig, ScenarioKind, MAX_SCENARIO_ITEMS};
use crate::stats::{ArcStatsSink, ScenarioStats, StatsSink};
use crate::{read_sequence, truncated_sequence, write_sequence, ScenarioError, ScenarioResult};

/// Drives one producer thread and one consumer thread over a shared pool.
pub struct ScenarioRunner<S = ArcStatsSink> {
    pool: Arc<BlockPool>,
    config: ScenarioConfig,
    stats: S,
}

/// Outcome of a scenario run.
#[derive(Clone, Debug, Serialize)]
pub struct ScenarioReport {
    pub scenario: ScenarioKind,
    pub pool: BlockPoolConfig,
    pub stats: ScenarioStats,
    pub final_pool: PoolStats,
    pub elapsed_ms: u64,
    /// Values the consumer should have observed, in order.
    #[serde(skip)]
    pub expected: Vec<u64>,
    /// Values the consumer actually observed, in order.
    #[serde(skip)]
    pub consumed: Vec<u64>,
}

impl ScenarioReport {
    pub fn drain(&self) -> DrainReport<'_> {
        DrainReport {
            expected: &self.expected,
            consumed: &self.consumed,
            final_pool: self.final_pool,
            capacity: self.pool.capacity,
        }
    }

    pub fn verify(&self) -> CheckResult {
        verify(self)
    }
}

impl ScenarioRunner<ArcStatsSink> {
    pub fn new(config: ScenarioConfig) -> ScenarioResult<Self> {
        Self::with_sink(config, ArcStatsSink::default())
    }
}

impl<S> ScenarioRunner<S>
where
    S: StatsSink,
{
    pub fn with_sink(config: ScenarioConfig, stats: S) -> ScenarioResult<Self> {
        config.validate()?;
        let pool = Arc::new(BlockPool::with_config(config.pool)?);
        Ok(Self {
            pool,
            config,
            stats,
        })
    }

    pub fn pool(&self) -> &Arc<BlockPool> {
        &self.pool
    }

    pub fn stats(&self) -> &S {
        &self.stats
    }

    /// Runs the configured scenario to completion.
    ///
    /// Fails when either side exhausts its poll budget or a thread panics; the
    /// report is returned unverified so callers can decide how to check it.
    pub fn run(&self) -> ScenarioResult<ScenarioReport> {
        let kind = self.config.scenario;
        let total = kind.total_items();
        info!(
            scenario = kind.name(),
            capacity = self.config.pool.capacity,
            block_size = self.config.pool.block_size,
            items = total,
            "starting scenario"
        );

        let started = Instant::now();
        let aborted = AtomicBool::new(false);
        let (produced, consumed) = thread::scope(|scope| {
            let producer = scope.spawn(|| {
                let result = self.produce(kind);
                if result.is_err() {
                    aborted.store(true, Ordering::Release);
                }
                result
            });
            let consumer = scope.spawn(|| self.consume(kind, total, &aborted));
            (producer.join(), consumer.join())
        });

        let produced = produced.map_err(|_| ScenarioError::Panicked { role: "producer" });
        let consumed = consumed.map_err(|_| ScenarioError::Panicked { role: "consumer" });
        produced??;
        let consumed = consumed??;

        let block_size = self.config.pool.block_size;
        let report = ScenarioReport {
            scenario: kind,
            pool: self.config.pool,
            stats: self.stats.snapshot(),
            final_pool: self.pool.stats(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            expected: (0..total as u64)
                .map(|seq| truncated_sequence(seq, block_size))
                .collect(),
            consumed,
        };
        info!(
            scenario = kind.name(),
            elapsed_ms = report.elapsed_ms,
            free_misses = report.stats.free_misses,
            ready_misses = report.stats.ready_misses,
            max_ready_depth = report.stats.max_ready_depth,
            "scenario finished"
        );
        Ok(report)
    }

    fn produce(&self, kind: ScenarioKind) -> ScenarioResult<()> {
        match kind {
            ScenarioKind::Flood { items } | ScenarioKind::Backpressure { items, .. } => {
                for seq in 0..items {
                    self.produce_one(seq, items)?;
                }
            }
            ScenarioKind::Burst {
                bursts,
                burst_size,
                pause_ms,
            } => {
                let total = kind.total_items();
                let too_many = || ScenarioError::TooManyItems {
                    requested: kind.requested_items(),
                    limit: MAX_SCENARIO_ITEMS,
                };
                for burst in 0..bursts {
                    let first = burst.checked_mul(burst_size).ok_or_else(too_many)?;
                    for offset in 0..burst_size {
                        let seq = first.checked_add(offset).ok_or_else(too_many)?;
                        self.produce_one(seq, total)?;
                    }
                    debug!(burst, burst_size, "burst published");
                    if pause_ms > 0 {
                        thread::sleep(Duration::from_millis(pause_ms));
                    }
                }
            }
        }
        Ok(())
    }

    fn produce_one(&self, seq: u32, expected: u32) -> ScenarioResult<()> {
        let pool = &self.pool;
        let stats = &self.stats;
        let claimed = poll(&self.config.poll, || {
            let claimed = pool.claim_free();
            if claimed.is_none() {
                stats.with_stats(|stats| stats.free_misses = stats.free_misses.wrapping_add(1));
            }
            claimed
        });
        let Some(id) = claimed else {
            warn!(seq, "producer starved waiting for a free block");
            return Err(ScenarioError::Starved {
                role: "producer",
                completed: seq,
                expected,
            });
        };

        match pool.block(id) {
            Some(mut block) => write_sequence(&mut block, u64::from(seq)),
            None => {
                pool.release_free(id);
                return Err(ScenarioError::Check(format!(
                    "block {} unavailable right after claim",
                    id.slot()
                )))
            }
        }
        pool.publish_ready(id);

        let depth = pool.ready_count();
        stats.with_stats(|stats| {
            stats.produced = stats.produced.wrapping_add(1);
            stats.max_ready_depth = stats.max_ready_depth.max(depth);
        });
        Ok(())
    }

    fn consume(
        &self,
        kind: ScenarioKind,
        total: u32,
        aborted: &AtomicBool,
    ) -> ScenarioResult<Vec<u64>> {
        let pool = &self.pool;
        let stats = &self.stats;
        let delay = kind.consumer_delay();
        let mut seen = Vec::with_capacity(total as usize);

        while (seen.len() as u32) < total {
            let next = poll(&self.config.poll, || {
                if aborted.load(Ordering::Acquire) {
                    return Some(None);
                }
                let ready = pool.consume_ready();
                if ready.is_none() {
                    stats.with_stats(|stats| stats.ready_misses = stats.ready_misses.wrapping_add(1));
                }
                ready.map(Some)
            });
            let id = match next {
                Some(Some(id)) => id,
                // Producer failed; its error is the one worth reporting.
                Some(None) => break,
                None => {
                    warn!(consumed = seen.len(), "consumer starved waiting for a ready block");
                    return Err(ScenarioError::Starved {
                        role: "consumer",
                        completed: seen.len() as u32,
                        expected: total,
                    });
                }
            };

            let value = match pool.block(id) {
                Some(block) => read_sequence(&block),
                None => {
                    pool.release_free(id);
                    return Err(ScenarioError::Check(format!(
                        "block {} unavailable right after consume",
                        id.slot()
                    )))
                }
            };
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            pool.release_free(id);

            seen.push(value);
            stats.with_stats(|stats| stats.consumed = stats.consumed.wrapping_add(1));
        }
        Ok(seen)
    }
}
