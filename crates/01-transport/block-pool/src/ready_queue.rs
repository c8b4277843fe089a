//! FIFO of published slots awaiting a consumer.
//!
//! Guarded by its own lock, independent of the free tracker. A per-slot
//! membership flag keeps each slot in the queue at most once, which also bounds
//! the ring occupancy by the pool capacity.

use crate::buffer::try_filled;
use crate::index_ring::IndexRing;
use crate::sync::Mutex;
use crate::PoolResult;

#[derive(Debug)]
struct Queue {
    ring: IndexRing,
    queued: Box<[bool]>,
}

#[derive(Debug)]
pub(crate) struct ReadyQueue {
    inner: Mutex<Queue>,
}

/// Outcome of publishing a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Publish {
    Queued,
    AlreadyQueued,
    OutOfRange,
}

impl ReadyQueue {
    pub(crate) fn new(capacity: u32) -> PoolResult<Self> {
        Ok(Self {
            inner: Mutex::new(Queue {
                ring: IndexRing::new(capacity)?,
                queued: try_filled(capacity as usize, |_| false)?,
            }),
        })
    }

    /// Appends `slot` at the tail unless it is already queued.
    pub(crate) fn push(&self, slot: u32) -> Publish {
        let mut queue = self.inner.lock();
        match queue.queued.get(slot as usize).copied() {
            None => Publish::OutOfRange,
            Some(true) => Publish::AlreadyQueued,
            Some(false) => {
                queue.queued[slot as usize] = true;
                if queue.ring.push(slot).is_err() {
                    debug_assert!(false, "ready ring overflowed while publishing slot {slot}");
                }
                Publish::Queued
            }
        }
    }

    /// Removes the oldest published slot.
    pub(crate) fn pop(&self) -> Option<u32> {
        let mut queue = self.inner.lock();
        let slot = queue.ring.pop()?;
        queue.queued[slot as usize] = false;
        Some(slot)
    }

    pub(crate) fn len(&self) -> u32 {
        self.inner.lock().ring.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_publish_order() {
        let queue = ReadyQueue::new(4).expect("queue");
        for slot in [2, 0, 3, 1] {
            assert_eq!(queue.push(slot), Publish::Queued);
        }
        let order: Vec<u32> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(order, vec![2, 0, 3, 1]);
    }

    #[test]
    fn duplicate_publish_is_ignored() {
        let queue = ReadyQueue::new(4).expect("queue");
        assert_eq!(queue.push(1), Publish::Queued);
        assert_eq!(queue.push(1), Publish::AlreadyQueued);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn slot_can_requeue_after_pop() {
        let queue = ReadyQueue::new(1).expect("queue");
        assert_eq!(queue.push(0), Publish::Queued);
        assert_eq!(queue.pop(), Some(0));
        assert_eq!(queue.push(0), Publish::Queued);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn out_of_range_publish_is_ignored() {
        let queue = ReadyQueue::new(2).expect("queue");
        assert_eq!(queue.push(9), Publish::OutOfRange);
        assert_eq!(queue.pop(), None);
    }
}
