//! Fixed-capacity block pool with independently locked free and ready stages.
//!
//! Producers claim a free block, fill it through [`BlockPool::block`], then
//! publish it. Consumers pull the oldest published block, read it, then release
//! it back to the free set. Claim/release only touch the free tracker's lock
//! and publish/consume only touch the ready queue's lock, so a producer looking
//! for space never contends with a consumer draining work.

use crate::free_tracker::{FreeTracker, Release};
use crate::poll::{poll, PollPolicy};
use crate::ready_queue::{Publish, ReadyQueue};
use crate::storage::{BlockGuard, BlockStorage};
use crate::PoolResult;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, trace};

static NEXT_POOL_TAG: AtomicU32 = AtomicU32::new(1);

/// Handle to one block of a [`BlockPool`].
///
/// Carries the slot index and a tag identifying the issuing pool, so handles
/// from another pool are recognised as foreign and ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId {
    pool: u32,
    slot: u32,
}

impl BlockId {
    /// Stable slot index of the block, in `0..capacity`.
    pub fn slot(self) -> u32 {
        self.slot
    }
}

/// Shape of a block pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockPoolConfig {
    /// Size in bytes of every block; zero is allowed.
    pub block_size: usize,
    /// Number of blocks; zero is allowed.
    pub capacity: u32,
}

impl Default for BlockPoolConfig {
    fn default() -> Self {
        Self {
            block_size: 4096,
            capacity: 8,
        }
    }
}

/// Point-in-time counters. Each field is read under its own lock, so under
/// concurrent use the snapshot may already be stale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub free: u32,
    pub busy: u32,
    pub ready: u32,
}

/// Fixed-size block pool shared between producer and consumer threads.
#[derive(Debug)]
pub struct BlockPool {
    tag: u32,
    capacity: u32,
    storage: BlockStorage,
    free: FreeTracker,
    ready: ReadyQueue,
}

impl BlockPool {
    /// Allocates `capacity` blocks of `block_size` bytes, all initially free.
    ///
    /// Zero capacity and zero block size are both accepted. The only failures
    /// are an unrepresentable total size and allocation failure.
    pub fn new(block_size: usize, capacity: u32) -> PoolResult<Self> {
        let storage = BlockStorage::new(block_size, capacity)?;
        let free = FreeTracker::new(capacity)?;
        let ready = ReadyQueue::new(capacity)?;
        let tag = NEXT_POOL_TAG.fetch_add(1, Ordering::Relaxed);

        debug!(
            pool = tag,
            block_size,
            capacity,
            stride = storage.stride(),
            region_bytes = storage.region_len(),
            alignment = storage.region_alignment(),
            backing = storage.backing_name(),
            "block pool allocated"
        );

        Ok(Self {
            tag,
            capacity,
            storage,
            free,
            ready,
        })
    }

    /// Builds a pool from a [`BlockPoolConfig`].
    pub fn with_config(config: BlockPoolConfig) -> PoolResult<Self> {
        Self::new(config.block_size, config.capacity)
    }

    /// Number of blocks managed by the pool.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Size in bytes of each block.
    pub fn block_size(&self) -> usize {
        self.storage.block_size()
    }

    /// Claims any free block. Returns `None` when every block is checked out.
    pub fn claim_free(&self) -> Option<BlockId> {
        let slot = self.free.claim()?;
        Some(self.id(slot))
    }

    /// Appends a block to the tail of the ready queue.
    ///
    /// Foreign handles and blocks already in the ready queue are ignored. Only
    /// ready-queue membership is checked: a block that is still free can be
    /// published if the caller holds its handle.
    pub fn publish_ready(&self, id: BlockId) {
        match self.owned_slot(id).map(|slot| self.ready.push(slot)) {
            Some(Publish::Queued) => {}
            Some(Publish::AlreadyQueued) => {
                trace!(pool = self.tag, slot = id.slot, "ignoring duplicate publish");
            }
            None | Some(Publish::OutOfRange) => {
                trace!(pool = self.tag, ?id, "ignoring publish of foreign block");
            }
        }
    }

    /// Pops the oldest published block. Returns `None` when nothing is ready.
    ///
    /// The block stays non-free until it is handed to [`BlockPool::release_free`].
    pub fn consume_ready(&self) -> Option<BlockId> {
        let slot = self.ready.pop()?;
        Some(self.id(slot))
    }

    /// Returns a block to the free set.
    ///
    /// Foreign handles and blocks that are already free are ignored.
    pub fn release_free(&self, id: BlockId) {
        match self.owned_slot(id).map(|slot| self.free.release(slot)) {
            Some(Release::Released) => {}
            Some(Release::AlreadyFree) => {
                trace!(pool = self.tag, slot = id.slot, "ignoring release of free block");
            }
            None | Some(Release::OutOfRange) => {
                trace!(pool = self.tag, ?id, "ignoring release of foreign block");
            }
        }
    }

    /// Exclusive view over the bytes of `id`.
    ///
    /// Returns `None` for foreign handles or while another guard for the same
    /// block is alive. The view does not change the block's state.
    pub fn block(&self, id: BlockId) -> Option<BlockGuard<'_>> {
        let slot = self.owned_slot(id)?;
        self.storage.borrow(slot)
    }

    /// Number of free blocks.
    pub fn free_count(&self) -> u32 {
        self.free.free_count()
    }

    /// Number of blocks claimed, ready, or checked out by a consumer.
    pub fn busy_count(&self) -> u32 {
        self.capacity - self.free_count()
    }

    /// Number of blocks waiting in the ready queue.
    pub fn ready_count(&self) -> u32 {
        self.ready.len()
    }

    /// Snapshot of all three counters.
    pub fn stats(&self) -> PoolStats {
        let free = self.free_count();
        PoolStats {
            free,
            busy: self.capacity - free,
            ready: self.ready_count(),
        }
    }

    /// Claims a free block, polling under `policy` while the pool is exhausted.
    pub fn claim_free_polling(&self, policy: &PollPolicy) -> Option<BlockId> {
        poll(policy, || self.claim_free())
    }

    /// Consumes a ready block, polling under `policy` while the queue is empty.
    pub fn consume_ready_polling(&self, policy: &PollPolicy) -> Option<BlockId> {
        poll(policy, || self.consume_ready())
    }

    fn id(&self, slot: u32) -> BlockId {
        BlockId {
            pool: self.tag,
            slot,
        }
    }

    fn owned_slot(&self, id: BlockId) -> Option<u32> {
        (id.pool == self.tag && id.slot < self.capacity).then_some(id.slot)
    }
}


#[cfg(all(test, feature = "loom"))]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;
    use loom::thread;

    fn claim_spinning(pool: &BlockPool) -> BlockId {
        loop {
            if let Some(id) = pool.claim_free() {
                return id;
            }
            thread::yield_now();
        }
    }

    fn consume_spinning(pool: &BlockPool) -> BlockId {
        loop {
            if let Some(id) = pool.consume_ready() {
                return id;
            }
            thread::yield_now();
        }
    }

    #[test]
    #[ignore]
    fn slow_loom_producer_consumer_preserves_order() {
        loom::model(|| {
            const CAPACITY: u32 = 2;
            const ITEMS: u8 = 3;
            let pool = Arc::new(BlockPool::new(1, CAPACITY).expect("pool"));

            let producer = pool.clone();
            let producer_thread = thread::spawn(move || {
                for value in 0..ITEMS {
                    let id = claim_spinning(&producer);
                    producer.block(id).expect("block view")[0] = value;
                    producer.publish_ready(id);
                    // Duplicate publishes must not enqueue the block twice.
                    producer.publish_ready(id);
                }
            });

            let consumer = pool.clone();
            let consumer_thread = thread::spawn(move || {
                for expected in 0..ITEMS {
                    let id = consume_spinning(&consumer);
                    assert_eq!(consumer.block(id).expect("block view")[0], expected);
                    consumer.release_free(id);
                    consumer.release_free(id);
                }
            });

            producer_thread.join().unwrap();
            consumer_thread.join().unwrap();
            assert_eq!(pool.free_count(), CAPACITY);
            assert_eq!(pool.ready_count(), 0);
        });
    }

    #[test]
    #[ignore]
    fn slow_loom_concurrent_claims_are_exclusive() {
        loom::model(|| {
            let pool = Arc::new(BlockPool::new(0, 1).expect("pool"));
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let pool = pool.clone();
                    thread::spawn(move || pool.claim_free())
                })
                .collect();
            let claimed: Vec<BlockId> = handles
                .into_iter()
                .filter_map(|handle| handle.join().unwrap())
                .collect();
            assert_eq!(claimed.len(), 1);
            assert_eq!(pool.free_count(), 0);
        });
    }
}
