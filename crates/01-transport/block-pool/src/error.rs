//! Error handling for the block pool.
//!
//! The pool keeps its error surface to construction: once the block region is
//! allocated, exhaustion is reported through `Option` and misuse is ignored.

use thiserror::Error;

/// Convenience result alias for fallible pool operations.
pub type PoolResult<T, E = PoolError> = Result<T, E>;

/// Errors surfaced while building a [`BlockPool`](crate::BlockPool).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// `block_size * capacity` (after alignment padding) does not fit in `usize`.
    #[error("block size {block_size} x capacity {capacity} overflows the address space")]
    SizeOverflow { block_size: usize, capacity: u32 },

    /// The backing region could not be allocated for the given size/alignment pair.
    #[error("failed to allocate block region of {size} bytes aligned to {alignment}")]
    AllocationFailed { size: usize, alignment: usize },
}
