use uuid::Uuid;

use crate::{Result, SequenceScope};

/// Hands out increment-by-one sequence numbers per [`SequenceScope`].
///
/// Every operation runs its full find-modify-save cycle under a lock, so two
/// callers never observe the same pre-increment value for a scope.
/// Implementations differ only in how coarse that lock is.
pub trait SequenceAllocator {
    /// Allocates the next number for `scope`.
    ///
    /// The first allocation for a scope creates its counter and returns `1`.
    /// Every later one returns the previous value plus one. The new value is
    /// persisted before it is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::Storage`] if the store fails a read or write.
    /// - [`Error::Overflow`] if the counter is already at `i64::MAX`.
    /// - [`Error::LockPoisoned`] if a previous holder panicked.
    ///
    /// [`Error::Storage`]: crate::Error::Storage
    /// [`Error::Overflow`]: crate::Error::Overflow
    /// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
    fn allocate(&self, scope: &SequenceScope) -> Result<i64>;

    /// Undoes one allocation for `scope` by decrementing its counter.
    ///
    /// A scope without a counter is left alone: nothing is created and no
    /// error is raised.
    ///
    /// # Errors
    ///
    /// - [`Error::Storage`] if the store fails a read or write.
    /// - [`Error::BelowFloor`] if the configured [`RevertFloor`] forbids the
    ///   decrement.
    /// - [`Error::LockPoisoned`] if a previous holder panicked.
    ///
    /// [`Error::Storage`]: crate::Error::Storage
    /// [`Error::BelowFloor`]: crate::Error::BelowFloor
    /// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
    /// [`RevertFloor`]: crate::RevertFloor
    fn revert(&self, scope: &SequenceScope) -> Result<()>;

    /// The last number allocated for `scope`, or `None` if it has no counter.
    ///
    /// # Errors
    ///
    /// Same as [`SequenceAllocator::allocate`], minus overflow.
    fn current(&self, scope: &SequenceScope) -> Result<Option<i64>>;

    /// [`SequenceAllocator::allocate`] keyed by the scope's parts.
    fn allocate_for(
        &self,
        facility_id: Uuid,
        program_id: Uuid,
        year: i32,
        emergency: bool,
    ) -> Result<i64> {
        self.allocate(&SequenceScope::new(facility_id, program_id, year, emergency))
    }

    /// [`SequenceAllocator::revert`] keyed by the scope's parts.
    fn revert_for(
        &self,
        facility_id: Uuid,
        program_id: Uuid,
        year: i32,
        emergency: bool,
    ) -> Result<()> {
        self.revert(&SequenceScope::new(facility_id, program_id, year, emergency))
    }
}
