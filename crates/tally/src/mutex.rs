#[cfg(not(feature = "parking-lot"))]
pub use std::sync::{Mutex, MutexGuard};

#[cfg(feature = "parking-lot")]
pub use parking_lot::{Mutex, MutexGuard};

/// Marker for a mutex that was poisoned by a panicking holder.
///
/// Never produced when the `parking-lot` feature is enabled.
#[cfg_attr(feature = "parking-lot", allow(dead_code))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Poisoned;

/// Locks `mutex`, mapping std poisoning onto [`Poisoned`].
#[inline]
pub(crate) fn acquire<T: ?Sized>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, Poisoned> {
    #[cfg(feature = "parking-lot")]
    {
        Ok(mutex.lock())
    }
    #[cfg(not(feature = "parking-lot"))]
    {
        mutex.lock().map_err(|_| Poisoned)
    }
}
