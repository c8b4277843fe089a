#![allow(missing_docs)]

mod checks;
mod config;
mod engine;
mod error;
mod stats;

pub use checks::{verify, verify_backpressure, verify_burst, verify_flood, CheckResult, DrainReport};
pub use config::{ScenarioConfig, ScenarioKind, MAX_SCENARIO_ITEMS};
pub use engine::{ScenarioReport, ScenarioRunner};
pub use error::{ScenarioError, ScenarioResult};
pub use stats::{ArcStatsSink, ScenarioStats, StatsSink};

/// Encodes a sequence number into a block, truncated to the block length.
#[inline]
pub fn write_sequence(block: &mut [u8], seq: u64) {
    let bytes = seq.to_le_bytes();
    let len = block.len().min(bytes.len());
    block[..len].copy_from_slice(&bytes[..len]);
}

/// Decodes a sequence number written by [`write_sequence`].
#[inline]
pub fn read_sequence(block: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    let len = block.len().min(bytes.len());
    bytes[..len].copy_from_slice(&block[..len]);
    u64::from_le_bytes(bytes)
}

/// Value a consumer observes for `seq` when blocks are `block_size` bytes wide.
#[inline]
pub fn truncated_sequence(seq: u64, block_size: usize) -> u64 {
    match block_size {
        0 => 0,
        n if n >= 8 => seq,
        n => seq & ((1u64 << (n * 8)) - 1),
    }
}
