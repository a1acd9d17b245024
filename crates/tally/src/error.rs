//! Error types for sequence allocation.
//!
//! Two layers exist:
//! - [`StoreError`]: raised by a [`CounterStore`] when a read or write cannot
//!   complete.
//! - [`Error`]: everything an allocator can return. Storage failures are
//!   wrapped unmodified in [`Error::Storage`] and are never retried.
//!
//! [`CounterStore`]: crate::CounterStore

use crate::{mutex::Poisoned, scope::SequenceScope};

/// A result type defaulting to the allocator [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Failures reported by a counter store backend.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The backing file or device could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored counters could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backend refused or could not serve the request.
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    /// The store's internal lock was poisoned by a panicking writer.
    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// All errors a [`SequenceAllocator`] can produce.
///
/// [`SequenceAllocator`]: crate::SequenceAllocator
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The persistence collaborator failed a read or write.
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),

    /// The allocator lock was poisoned.
    ///
    /// Only reachable with `std::sync::Mutex`. When the `parking-lot` feature
    /// is enabled, mutexes do not poison and this variant is never produced.
    #[error("Allocator lock poisoned")]
    LockPoisoned,

    /// The counter cannot move any further without leaving the `i64` range.
    /// Nothing was written.
    #[error("Counter for {scope} is out of range")]
    Overflow { scope: SequenceScope },

    /// A revert would take the counter below the configured floor. Nothing was
    /// written.
    #[error("Revert of {scope} refused: counter is {current}, floor is {floor}")]
    BelowFloor {
        scope: SequenceScope,
        current: i64,
        floor: i64,
    },
}

impl From<Poisoned> for Error {
    fn from(_: Poisoned) -> Self {
        Self::LockPoisoned
    }
}

impl From<Poisoned> for StoreError {
    fn from(_: Poisoned) -> Self {
        Self::LockPoisoned
    }
}

#[cfg(feature = "file-store")]
impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
