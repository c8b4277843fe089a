//! Synchronisation primitives, swapped for loom's under the `loom` feature.
//!
//! With `loom` enabled, pools must be built inside `loom::model`.

#[cfg(not(feature = "loom"))]
pub(crate) use parking_lot::Mutex;
#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "loom")]
pub(crate) use loom_mutex::Mutex;

#[cfg(feature = "loom")]
mod loom_mutex {
    use std::fmt;
    use std::sync::PoisonError;

    /// `loom` mutex with the non-poisoning `lock()` signature of `parking_lot`.
    pub(crate) struct Mutex<T>(loom::sync::Mutex<T>);

    impl<T> Mutex<T> {
        pub(crate) fn new(value: T) -> Self {
            Self(loom::sync::Mutex::new(value))
        }

        pub(crate) fn lock(&self) -> loom::sync::MutexGuard<'_, T> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl<T> fmt::Debug for Mutex<T> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Mutex").finish_non_exhaustive()
        }
    }
}
