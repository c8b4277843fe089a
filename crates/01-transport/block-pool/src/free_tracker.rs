//! Free-slot bookkeeping.
//!
//! A ring of free indices gives O(1) claims; a per-slot flag answers "is this
//! slot free?" for the release path. The ring holds exactly the slots whose
//! flag is set, so its length is the free count.

use crate::buffer::try_filled;
use crate::index_ring::IndexRing;
use crate::sync::Mutex;
use crate::PoolResult;

#[derive(Debug)]
struct FreeSet {
    ring: IndexRing,
    is_free: Box<[bool]>,
}

#[derive(Debug)]
pub(crate) struct FreeTracker {
    inner: Mutex<FreeSet>,
}

/// Outcome of returning a slot to the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Release {
    Released,
    AlreadyFree,
    OutOfRange,
}

impl FreeTracker {
    /// All `capacity` slots start free.
    pub(crate) fn new(capacity: u32) -> PoolResult<Self> {
        Ok(Self {
            inner: Mutex::new(FreeSet {
                ring: IndexRing::sequential(capacity)?,
                is_free: try_filled(capacity as usize, |_| true)?,
            }),
        })
    }

    /// Takes any free slot, marking it non-free.
    pub(crate) fn claim(&self) -> Option<u32> {
        let mut set = self.inner.lock();
        let slot = set.ring.pop()?;
        set.is_free[slot as usize] = false;
        Some(slot)
    }

    /// Marks `slot` free again unless it already is.
    pub(crate) fn release(&self, slot: u32) -> Release {
        let mut set = self.inner.lock();
        match set.is_free.get(slot as usize).copied() {
            None => Release::OutOfRange,
            Some(true) => Release::AlreadyFree,
            Some(false) => {
                set.is_free[slot as usize] = true;
                if set.ring.push(slot).is_err() {
                    debug_assert!(false, "free ring overflowed while releasing slot {slot}");
                }
                Release::Released
            }
        }
    }

    pub(crate) fn free_count(&self) -> u32 {
        self.inner.lock().ring.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_every_slot_once() {
        let tracker = FreeTracker::new(5).expect("tracker");
        let mut claimed: Vec<u32> = std::iter::from_fn(|| tracker.claim()).collect();
        claimed.sort_unstable();
        assert_eq!(claimed, vec![0, 1, 2, 3, 4]);
        assert_eq!(tracker.free_count(), 0);
    }

    #[test]
    fn release_is_idempotent() {
        let tracker = FreeTracker::new(2).expect("tracker");
        let slot = tracker.claim().expect("free slot");
        assert_eq!(tracker.release(slot), Release::Released);
        assert_eq!(tracker.release(slot), Release::AlreadyFree);
        assert_eq!(tracker.free_count(), 2);
    }

    #[test]
    fn release_rejects_out_of_range() {
        let tracker = FreeTracker::new(2).expect("tracker");
        assert_eq!(tracker.release(2), Release::OutOfRange);
        assert_eq!(tracker.free_count(), 2);
    }

    #[test]
    fn zero_capacity_never_claims() {
        let tracker = FreeTracker::new(0).expect("tracker");
        assert_eq!(tracker.claim(), None);
        assert_eq!(tracker.release(0), Release::OutOfRange);
    }
}
