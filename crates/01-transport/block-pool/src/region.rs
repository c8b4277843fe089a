//! Backing memory for the block storage.
//!
//! Native targets prefer an anonymous `mmap` (page aligned, zero-filled by the
//! kernel). When that is not possible, or on WebAssembly, we fall back to a
//! zeroed heap allocation honoring the requested alignment. The unsafe surface
//! stays inside this module: callers only see a base pointer and a length.

use crate::{PoolError, PoolResult};
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

#[cfg(not(target_arch = "wasm32"))]
type NativeMap = memmap2::MmapMut;

#[derive(Debug)]
enum Backing {
    /// Zero-length region; nothing was allocated.
    Empty,
    /// Keeps the anonymous mapping alive; accessed through `BlockRegion::base`.
    #[cfg(not(target_arch = "wasm32"))]
    Native(#[allow(dead_code)] NativeMap),
    Owned { layout: Layout },
}

impl Backing {
    fn name(&self) -> &'static str {
        match self {
            Backing::Empty => "empty",
            #[cfg(not(target_arch = "wasm32"))]
            Backing::Native(_) => "mmap",
            Backing::Owned { .. } => "heap",
        }
    }
}

/// Contiguous, aligned, zero-initialised byte region owned by a pool.
///
/// The region is allocated once and never resized. Its base pointer stays
/// valid until the region is dropped.
#[derive(Debug)]
pub(crate) struct BlockRegion {
    base: NonNull<u8>,
    len: usize,
    alignment: usize,
    backing: Backing,
}

// SAFETY: the region is plain bytes with a stable base pointer; concurrent
// access to disjoint blocks is coordinated by `BlockStorage`.
unsafe impl Send for BlockRegion {}
// SAFETY: see above; the region itself never mutates after construction.
unsafe impl Sync for BlockRegion {}

impl BlockRegion {
    /// Allocates `len` zeroed bytes aligned to `alignment`.
    pub(crate) fn new_aligned(len: usize, alignment: usize) -> PoolResult<Self> {
        if alignment == 0 || !alignment.is_power_of_two() {
            return Err(PoolError::AllocationFailed {
                size: len,
                alignment,
            });
        }

        if len == 0 {
            return Ok(Self {
                base: NonNull::dangling(),
                len,
                alignment,
                backing: Backing::Empty,
            });
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            if let Some(region) = Self::mmap_backed(len, alignment) {
                return Ok(region);
            }
        }

        Self::heap_backed(len, alignment)
    }

    fn heap_backed(len: usize, alignment: usize) -> PoolResult<Self> {
        let layout = Layout::from_size_align(len, alignment).map_err(|_| {
            PoolError::AllocationFailed {
                size: len,
                alignment,
            }
        })?;

        // SAFETY: `len` is non-zero here, so the layout has a non-zero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        let base = NonNull::new(ptr).ok_or(PoolError::AllocationFailed {
            size: len,
            alignment,
        })?;

        Ok(Self {
            base,
            len,
            alignment,
            backing: Backing::Owned { layout },
        })
    }

    /// Returns `None` when the mapping failed or came back misaligned so the
    /// caller can fall back to the heap.
    #[cfg(not(target_arch = "wasm32"))]
    fn mmap_backed(len: usize, alignment: usize) -> Option<Self> {
        let mut map = match memmap2::MmapOptions::new().len(len).map_anon() {
            Ok(map) => map,
            Err(err) => {
                tracing::debug!("anonymous mmap of {len} bytes failed, using heap: {err}");
                return None;
            }
        };

        let base = NonNull::new(map.as_mut_ptr())?;
        if base.as_ptr() as usize % alignment != 0 {
            return None;
        }

        Some(Self {
            base,
            len,
            alignment,
            backing: Backing::Native(map),
        })
    }

    /// Total number of bytes managed by this region.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Returns the alignment the region was allocated with.
    pub(crate) fn alignment(&self) -> usize {
        self.alignment
    }

    /// Short label for the backing kind, used in diagnostics.
    pub(crate) fn backing_name(&self) -> &'static str {
        self.backing.name()
    }

    /// Base pointer of the region. Dangling (but aligned) when the region is empty.
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }
}

impl Drop for BlockRegion {
    fn drop(&mut self) {
        if let Backing::Owned { layout } = &self.backing {
            // SAFETY: `base` was returned by `alloc_zeroed` with this exact layout.
            unsafe {
                dealloc(self.base.as_ptr(), *layout);
            }
        }
    }
}
