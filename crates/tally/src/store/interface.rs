use alloc::sync::Arc;

use crate::{SequenceCounter, SequenceScope, StoreError};

/// The persistence collaborator behind every allocator.
///
/// A store only needs atomic single-key reads and upserts. Serializing the
/// read-modify-write cycle is the allocator's job, not the store's: every
/// allocator runs its cycles through [`exclusive`](Self::exclusive) while
/// holding its own lock.
///
/// A store whose data can also be changed by other handles or processes
/// overrides [`exclusive`](Self::exclusive) to lock that data and re-read it
/// before the cycle runs.
pub trait CounterStore {
    /// Looks up the counter for `scope`, returning `None` if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot complete the read.
    fn find_counter(&self, scope: &SequenceScope) -> Result<Option<SequenceCounter>, StoreError>;

    /// Inserts or replaces the counter for `counter.scope` and returns the
    /// stored value.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write did not reach the backend. The
    /// previously stored value is left in place.
    fn save_counter(&self, counter: SequenceCounter) -> Result<SequenceCounter, StoreError>;

    /// Snapshot of every stored counter, ordered by scope.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot complete the read.
    fn counters(&self) -> Result<Vec<SequenceCounter>, StoreError>;

    /// Runs one find-modify-save `cycle` with exclusive access to the table.
    ///
    /// `cycle` is handed the view to read and write through. The default
    /// hands over the store itself and relies on the caller's lock.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if exclusive access could not be taken. Errors
    /// raised inside `cycle` are returned through `R`.
    fn exclusive<R>(&self, cycle: impl FnOnce(&dyn CounterStore) -> R) -> Result<R, StoreError>
    where
        Self: Sized,
    {
        Ok(cycle(self))
    }
}

impl<S: CounterStore> CounterStore for Arc<S> {
    fn find_counter(&self, scope: &SequenceScope) -> Result<Option<SequenceCounter>, StoreError> {
        (**self).find_counter(scope)
    }

    fn save_counter(&self, counter: SequenceCounter) -> Result<SequenceCounter, StoreError> {
        (**self).save_counter(counter)
    }

    fn counters(&self) -> Result<Vec<SequenceCounter>, StoreError> {
        (**self).counters()
    }

    fn exclusive<R>(&self, cycle: impl FnOnce(&dyn CounterStore) -> R) -> Result<R, StoreError>
    where
        Self: Sized,
    {
        (**self).exclusive(cycle)
    }
}

impl<S: CounterStore> CounterStore for &S {
    fn find_counter(&self, scope: &SequenceScope) -> Result<Option<SequenceCounter>, StoreError> {
        (**self).find_counter(scope)
    }

    fn save_counter(&self, counter: SequenceCounter) -> Result<SequenceCounter, StoreError> {
        (**self).save_counter(counter)
    }

    fn counters(&self) -> Result<Vec<SequenceCounter>, StoreError> {
        (**self).counters()
    }

    fn exclusive<R>(&self, cycle: impl FnOnce(&dyn CounterStore) -> R) -> Result<R, StoreError>
    where
        Self: Sized,
    {
        (**self).exclusive(cycle)
    }
}
