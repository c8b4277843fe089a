//! Fixed-size block storage.
//!
//! All blocks live in a single [`BlockRegion`] laid out at a fixed stride. The
//! pool hands out slot indices; byte access goes through [`BlockGuard`], which
//! holds a per-slot borrow flag so two views of the same block never overlap.

use crate::buffer::try_filled;
use crate::region::BlockRegion;
use crate::sync::{AtomicBool, Ordering};
use crate::{PoolError, PoolResult};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Alignment enforced for the start of every block.
pub const BLOCK_ALIGNMENT: usize = 64;

pub(crate) struct BlockStorage {
    region: BlockRegion,
    block_size: usize,
    stride: usize,
    borrowed: Box<[AtomicBool]>,
}

impl BlockStorage {
    pub(crate) fn new(block_size: usize, capacity: u32) -> PoolResult<Self> {
        let overflow = || PoolError::SizeOverflow {
            block_size,
            capacity,
        };
        let stride = if block_size == 0 {
            0
        } else {
            block_size
                .checked_next_multiple_of(BLOCK_ALIGNMENT)
                .ok_or_else(overflow)?
        };
        let len = stride
            .checked_mul(capacity as usize)
            .ok_or_else(overflow)?;

        let region = BlockRegion::new_aligned(len, BLOCK_ALIGNMENT)?;
        let borrowed = try_filled(capacity as usize, |_| AtomicBool::new(false))?;

        Ok(Self {
            region,
            block_size,
            stride,
            borrowed,
        })
    }

    pub(crate) fn block_size(&self) -> usize {
        self.block_size
    }

    pub(crate) fn stride(&self) -> usize {
        self.stride
    }

    pub(crate) fn region_len(&self) -> usize {
        self.region.len()
    }

    pub(crate) fn region_alignment(&self) -> usize {
        self.region.alignment()
    }

    pub(crate) fn backing_name(&self) -> &'static str {
        self.region.backing_name()
    }

    /// Borrows the bytes of `slot` exclusively.
    ///
    /// Returns `None` when `slot` is out of range or another guard for it is live.
    pub(crate) fn borrow(&self, slot: u32) -> Option<BlockGuard<'_>> {
        let flag = self.borrowed.get(slot as usize)?;
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }

        let offset = slot as usize * self.stride;
        // SAFETY: `slot < capacity`, so `offset + block_size <= region.len()`
        // (or the slice is empty at a dangling, aligned pointer). The borrow
        // flag we just set guarantees no other guard aliases these bytes until
        // this guard drops and clears it.
        let bytes = unsafe {
            std::slice::from_raw_parts_mut(self.region.base().as_ptr().add(offset), self.block_size)
        };
        Some(BlockGuard { bytes, flag, slot })
    }
}

impl fmt::Debug for BlockStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockStorage")
            .field("block_size", &self.block_size)
            .field("stride", &self.stride)
            .field("blocks", &self.borrowed.len())
            .field("backing", &self.region.backing_name())
            .finish()
    }
}

/// Exclusive view over one block's bytes.
///
/// Dereferences to a `[u8]` of exactly the pool's block size. Dropping the
/// guard makes the block available to the next [`BlockPool::block`] call; it
/// does not change the block's free/ready state.
///
/// [`BlockPool::block`]: crate::BlockPool::block
pub struct BlockGuard<'a> {
    bytes: &'a mut [u8],
    flag: &'a AtomicBool,
    slot: u32,
}

impl BlockGuard<'_> {
    /// Slot index of the block being viewed.
    pub fn slot(&self) -> u32 {
        self.slot
    }
}

impl Deref for BlockGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl DerefMut for BlockGuard<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.bytes
    }
}

impl Drop for BlockGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl fmt::Debug for BlockGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockGuard")
            .field("slot", &self.slot)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_rounds_up_to_alignment() {
        let storage = BlockStorage::new(10, 4).expect("storage");
        assert_eq!(storage.stride(), BLOCK_ALIGNMENT);
        assert_eq!(storage.region_len(), BLOCK_ALIGNMENT * 4);

        let storage = BlockStorage::new(BLOCK_ALIGNMENT * 2, 4).expect("storage");
        assert_eq!(storage.stride(), BLOCK_ALIGNMENT * 2);
    }

    #[test]
    fn blocks_are_aligned_and_sized() {
        let storage = BlockStorage::new(100, 3).expect("storage");
        for slot in 0..3 {
            let guard = storage.borrow(slot).expect("block");
            assert_eq!(guard.len(), 100);
            assert_eq!(guard.as_ptr() as usize % BLOCK_ALIGNMENT, 0);
        }
    }

    #[test]
    fn guard_is_exclusive_until_dropped() {
        let storage = BlockStorage::new(8, 2).expect("storage");
        let mut first = storage.borrow(0).expect("first borrow");
        assert!(storage.borrow(0).is_none(), "overlapping borrow must fail");
        assert!(storage.borrow(1).is_some(), "other slots stay available");
        first.copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        drop(first);

        let again = storage.borrow(0).expect("borrow after drop");
        assert_eq!(&again[..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn blocks_do_not_overlap() {
        let storage = BlockStorage::new(16, 4).expect("storage");
        for slot in 0..4u32 {
            storage.borrow(slot).expect("block").fill(slot as u8 + 1);
        }
        for slot in 0..4u32 {
            let guard = storage.borrow(slot).expect("block");
            assert!(guard.iter().all(|&b| b == slot as u8 + 1));
        }
    }

    #[test]
    fn zero_sized_blocks_are_distinct_and_empty() {
        let storage = BlockStorage::new(0, 3).expect("storage");
        assert_eq!(storage.region_len(), 0);
        let a = storage.borrow(0).expect("slot 0");
        let b = storage.borrow(1).expect("slot 1");
        assert!(a.is_empty() && b.is_empty());
        assert_ne!(a.slot(), b.slot());
    }

    #[test]
    fn out_of_range_borrow_is_none() {
        let storage = BlockStorage::new(8, 1).expect("storage");
        assert!(storage.borrow(1).is_none());
    }

    #[test]
    fn size_overflow_is_reported() {
        let err = BlockStorage::new(usize::MAX, 2).unwrap_err();
        assert_eq!(
            err,
            PoolError::SizeOverflow {
                block_size: usize::MAX,
                capacity: 2
            }
        );
    }
}
