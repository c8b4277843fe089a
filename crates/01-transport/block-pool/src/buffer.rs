//! Fallible allocation of per-slot bookkeeping.

use crate::{PoolError, PoolResult};
use std::mem;

/// Allocates `len` entries produced by `fill`, reporting allocation failure
/// instead of aborting.
pub(crate) fn try_filled<T>(len: usize, fill: impl FnMut(usize) -> T) -> PoolResult<Box<[T]>> {
    let mut entries = Vec::new();
    entries
        .try_reserve_exact(len)
        .map_err(|_| PoolError::AllocationFailed {
            size: len.saturating_mul(mem::size_of::<T>()),
            alignment: mem::align_of::<T>(),
        })?;
    entries.extend((0..len).map(fill));
    Ok(entries.into_boxed_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_entry() {
        let entries = try_filled(4, |i| i as u32 * 2).expect("small buffer");
        assert_eq!(&*entries, &[0, 2, 4, 6]);
    }

    #[test]
    fn empty_buffer_allocates_nothing() {
        let entries = try_filled(0, |_| true).expect("empty buffer");
        assert!(entries.is_empty());
    }

    #[test]
    fn unrepresentable_length_is_an_error() {
        let err = try_filled(usize::MAX, |i| i as u64).unwrap_err();
        assert_eq!(
            err,
            PoolError::AllocationFailed {
                size: usize::MAX,
                alignment: mem::align_of::<u64>(),
            }
        );
    }
}
