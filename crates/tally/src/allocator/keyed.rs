use alloc::sync::Arc;
use std::collections::HashMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    CounterStore, Result, RevertFloor, SequenceAllocator, SequenceScope,
    allocator::cycle::{allocate_in, current_in, revert_in},
    mutex::{Mutex, acquire},
};

type ScopeLocks = HashMap<SequenceScope, Arc<Mutex<()>>>;

/// A [`SequenceAllocator`] that serializes operations per scope.
///
/// Each [`SequenceScope`] in use gets its own lock. The lock for a scope is
/// held for the whole find-modify-save cycle, so callers on the same scope
/// never interleave, while callers on unrelated scopes run in parallel. The
/// lock table itself is only held long enough to look up, insert or evict a
/// scope's lock, and a scope's entry is evicted as soon as no caller holds or
/// waits on it.
///
/// The store is shared between scopes without an outer lock and must be safe
/// for concurrent use on distinct keys. Every store in this crate is.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ No contention between unrelated scopes
///
/// ## Recommended When
/// - Many facilities or programs allocate at the same time
///
/// ## See Also
/// - [`LockSequenceAllocator`]
///
/// [`LockSequenceAllocator`]: crate::LockSequenceAllocator
#[derive(Debug)]
pub struct KeyedSequenceAllocator<S>
where
    S: CounterStore,
{
    pub(crate) store: Arc<S>,
    pub(crate) locks: Arc<Mutex<ScopeLocks>>,
    pub(crate) floor: RevertFloor,
}

impl<S> Clone for KeyedSequenceAllocator<S>
where
    S: CounterStore,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            locks: Arc::clone(&self.locks),
            floor: self.floor,
        }
    }
}

impl<S> KeyedSequenceAllocator<S>
where
    S: CounterStore,
{
    /// Creates an allocator over `store` with an unbounded revert floor.
    ///
    /// # Example
    /// ```
    /// use tally::{KeyedSequenceAllocator, MemoryCounterStore, SequenceScope};
    /// use uuid::Uuid;
    ///
    /// let allocator = KeyedSequenceAllocator::new(MemoryCounterStore::new());
    /// let regular = SequenceScope::new(Uuid::from_u128(1), Uuid::from_u128(2), 2024, false);
    /// let emergency = regular.with_emergency(true);
    ///
    /// assert_eq!(allocator.allocate(&regular).unwrap(), 1);
    /// assert_eq!(allocator.allocate(&regular).unwrap(), 2);
    /// assert_eq!(allocator.allocate(&emergency).unwrap(), 1);
    /// ```
    pub fn new(store: S) -> Self {
        Self::with_floor(store, RevertFloor::Unbounded)
    }

    /// Creates an allocator over `store` that enforces `floor` on reverts.
    pub fn with_floor(store: S, floor: RevertFloor) -> Self {
        Self {
            store: Arc::new(store),
            locks: Arc::new(Mutex::new(HashMap::new())),
            floor,
        }
    }

    /// The revert policy in effect.
    pub fn floor(&self) -> RevertFloor {
        self.floor
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs `cycle` while holding the lock for `scope`.
    fn with_scope<R>(
        &self,
        scope: &SequenceScope,
        cycle: impl FnOnce(&S) -> Result<R>,
    ) -> Result<R> {
        let lock = {
            let mut locks = acquire(&self.locks)?;
            Arc::clone(locks.entry(*scope).or_default())
        };

        let result = match acquire(&lock) {
            Ok(_guard) => cycle(&*self.store),
            Err(poisoned) => Err(poisoned.into()),
        };

        let mut locks = acquire(&self.locks)?;
        // Only the table and `lock` are left, so nobody else holds or waits
        // on this scope.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(scope);
        }

        result
    }

    /// See [`SequenceAllocator::allocate`].
    ///
    /// # Errors
    ///
    /// See [`SequenceAllocator::allocate`].
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), err))]
    pub fn allocate(&self, scope: &SequenceScope) -> Result<i64> {
        self.with_scope(scope, |store| store.exclusive(|table| allocate_in(table, scope))?)
    }

    /// See [`SequenceAllocator::revert`].
    ///
    /// # Errors
    ///
    /// See [`SequenceAllocator::revert`].
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), err))]
    pub fn revert(&self, scope: &SequenceScope) -> Result<()> {
        self.with_scope(scope, |store| {
            store.exclusive(|table| revert_in(table, scope, self.floor))?
        })
    }

    /// See [`SequenceAllocator::current`].
    ///
    /// # Errors
    ///
    /// See [`SequenceAllocator::current`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn current(&self, scope: &SequenceScope) -> Result<Option<i64>> {
        self.with_scope(scope, |store| current_in(store, scope))
    }
}

impl<S> SequenceAllocator for KeyedSequenceAllocator<S>
where
    S: CounterStore,
{
    fn allocate(&self, scope: &SequenceScope) -> Result<i64> {
        self.allocate(scope)
    }

    fn revert(&self, scope: &SequenceScope) -> Result<()> {
        self.revert(scope)
    }

    fn current(&self, scope: &SequenceScope) -> Result<Option<i64>> {
        self.current(scope)
    }
}
