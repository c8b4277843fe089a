//! Bounded FIFO ring of slot indices.
//!
//! Both pool stages keep their slot indices in one of these. The ring itself
//! is not synchronised; each owner wraps it in its own lock. `head` always
//! points at the oldest entry and stays below `capacity`.

use crate::buffer::try_filled;
use crate::PoolResult;

#[derive(Debug)]
pub(crate) struct IndexRing {
    capacity: u32,
    head: u32,
    len: u32,
    entries: Box<[u32]>,
}

impl IndexRing {
    /// Creates an empty ring able to hold `capacity` indices.
    pub(crate) fn new(capacity: u32) -> PoolResult<Self> {
        Ok(Self {
            capacity,
            head: 0,
            len: 0,
            entries: try_filled(capacity as usize, |_| 0)?,
        })
    }

    /// Creates a full ring holding `0..capacity` in ascending order.
    pub(crate) fn sequential(capacity: u32) -> PoolResult<Self> {
        Ok(Self {
            capacity,
            head: 0,
            len: capacity,
            entries: try_filled(capacity as usize, |i| i as u32)?,
        })
    }

    pub(crate) fn len(&self) -> u32 {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `value` at the tail. Fails when the ring is full.
    pub(crate) fn push(&mut self, value: u32) -> Result<(), u32> {
        if self.len >= self.capacity {
            return Err(value);
        }
        let index = (self.head as u64 + self.len as u64) % self.capacity as u64;
        self.entries[index as usize] = value;
        self.len += 1;
        Ok(())
    }

    /// Removes the oldest value.
    pub(crate) fn pop(&mut self) -> Option<u32> {
        if self.is_empty() {
            return None;
        }
        let value = self.entries[self.head as usize];
        self.head = (self.head + 1) % self.capacity;
        self.len -= 1;
        Some(value)
    }
}
