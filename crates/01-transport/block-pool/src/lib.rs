//! Fixed-capacity block pool shared between producer and consumer threads.
//!
//! The crate exposes the pieces a frame-capture style pipeline needs:
//! * [`BlockPool`] – `N` fixed-size blocks cycling Free → Allocated → Ready → Free.
//! * [`BlockId`] – the handle producers and consumers pass back to the pool.
//! * [`BlockGuard`] – exclusive view over one block's bytes.
//! * [`PollPolicy`] / [`poll`] – caller-side retry loop for the non-blocking operations.
//! * [`PoolError`] – construction-time allocation failures.

mod buffer;
mod error;
mod free_tracker;
mod index_ring;
mod poll;
mod pool;
mod ready_queue;
mod region;
mod storage;
mod sync;

pub use error::{PoolError, PoolResult};
pub use poll::{poll, PollPolicy};
pub use pool::{BlockId, BlockPool, BlockPoolConfig, PoolStats};
pub use storage::{BlockGuard, BLOCK_ALIGNMENT};
