use block_pool::PoolStats;

use crate::config::ScenarioKind;
use crate::engine::ScenarioReport;
use crate::stats::ScenarioStats;

/// Borrowed view over drained values and the pool's end state for verification helpers.
pub struct DrainReport<'a> {
    pub expected: &'a [u64],
    pub consumed: &'a [u64],
    pub final_pool: PoolStats,
    pub capacity: u32,
}

pub type CheckResult = Result<(), String>;

/// Runs the checks matching the report's scenario kind.
pub fn verify(report: &ScenarioReport) -> CheckResult {
    let drain = report.drain();
    let expected = report.scenario.total_items();
    match report.scenario {
        ScenarioKind::Flood { .. } => verify_flood(&drain, &report.stats, expected),
        ScenarioKind::Burst { .. } => verify_burst(&drain, &report.stats, expected),
        ScenarioKind::Backpressure { .. } => verify_backpressure(&drain, &report.stats, expected),
    }
}

pub fn verify_flood(
    drain: &DrainReport<'_>,
    stats: &ScenarioStats,
    expected_items: u32,
) -> CheckResult {
    if drain.consumed.len() as u32 != expected_items {
        return Err(format!(
            "drained {} items (expected {})",
            drain.consumed.len(),
            expected_items
        ));
    }
    if let Some(pos) = drain
        .consumed
        .iter()
        .zip(drain.expected)
        .position(|(seen, want)| seen != want)
    {
        return Err(format!(
            "item {pos} out of order: saw {} expected {}",
            drain.consumed[pos], drain.expected[pos]
        ));
    }
    if stats.produced != expected_items {
        return Err(format!(
            "stats produced {} items (expected {})",
            stats.produced, expected_items
        ));
    }
    if stats.consumed != expected_items {
        return Err(format!(
            "stats consumed {} items (expected {})",
            stats.consumed, expected_items
        ));
    }
    if drain.final_pool.free != drain.capacity || drain.final_pool.ready != 0 {
        return Err(format!(
            "pool did not drain: {} free, {} ready (capacity {})",
            drain.final_pool.free, drain.final_pool.ready, drain.capacity
        ));
    }
    Ok(())
}

pub fn verify_burst(
    drain: &DrainReport<'_>,
    stats: &ScenarioStats,
    expected_items: u32,
) -> CheckResult {
    verify_flood(drain, stats, expected_items)?;
    if stats.max_ready_depth > drain.capacity {
        return Err(format!(
            "ready queue depth {} exceeded capacity {}",
            stats.max_ready_depth, drain.capacity
        ));
    }
    Ok(())
}

pub fn verify_backpressure(
    drain: &DrainReport<'_>,
    stats: &ScenarioStats,
    expected_items: u32,
) -> CheckResult {
    verify_burst(drain, stats, expected_items)?;
    if expected_items > drain.capacity && stats.free_misses == 0 {
        return Err(
            "backpressure scenario expected the producer to hit an exhausted pool, it never did"
                .into(),
        );
    }
    Ok(())
}
