use alloc::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    CounterStore, Result, RevertFloor, SequenceAllocator, SequenceScope,
    allocator::cycle::{allocate_in, current_in, revert_in},
    mutex::{Mutex, acquire},
};

/// A [`SequenceAllocator`] that serializes every operation behind one lock.
///
/// The store lives inside an [`Arc<Mutex<_>>`], so the lock is held for the
/// whole find-modify-save cycle regardless of scope. Allocations for
/// unrelated scopes wait on each other too. Clones share the same lock and
/// store. Each cycle also runs inside [`CounterStore::exclusive`], which is
/// what keeps separate allocators over one shared file apart.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Works with any [`CounterStore`], even one without internal locking
///
/// ## Recommended When
/// - Allocation is rare compared to the rest of the request
/// - The store is not safe for concurrent use
///
/// ## See Also
/// - [`KeyedSequenceAllocator`]
///
/// [`KeyedSequenceAllocator`]: crate::KeyedSequenceAllocator
#[derive(Debug)]
pub struct LockSequenceAllocator<S>
where
    S: CounterStore,
{
    pub(crate) state: Arc<Mutex<S>>,
    pub(crate) floor: RevertFloor,
}

impl<S> Clone for LockSequenceAllocator<S>
where
    S: CounterStore,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            floor: self.floor,
        }
    }
}

impl<S> LockSequenceAllocator<S>
where
    S: CounterStore,
{
    /// Creates an allocator over `store` with an unbounded revert floor.
    ///
    /// # Example
    /// ```
    /// use tally::{LockSequenceAllocator, MemoryCounterStore, SequenceScope};
    /// use uuid::Uuid;
    ///
    /// let allocator = LockSequenceAllocator::new(MemoryCounterStore::new());
    /// let scope = SequenceScope::new(Uuid::from_u128(1), Uuid::from_u128(2), 2024, false);
    ///
    /// assert_eq!(allocator.allocate(&scope).unwrap(), 1);
    /// assert_eq!(allocator.allocate(&scope).unwrap(), 2);
    /// allocator.revert(&scope).unwrap();
    /// assert_eq!(allocator.current(&scope).unwrap(), Some(1));
    /// ```
    pub fn new(store: S) -> Self {
        Self::with_floor(store, RevertFloor::Unbounded)
    }

    /// Creates an allocator over `store` that enforces `floor` on reverts.
    pub fn with_floor(store: S, floor: RevertFloor) -> Self {
        Self {
            state: Arc::new(Mutex::new(store)),
            floor,
        }
    }

    /// The revert policy in effect.
    pub fn floor(&self) -> RevertFloor {
        self.floor
    }

    /// See [`SequenceAllocator::allocate`].
    ///
    /// # Errors
    ///
    /// See [`SequenceAllocator::allocate`].
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), err))]
    pub fn allocate(&self, scope: &SequenceScope) -> Result<i64> {
        let store = acquire(&self.state)?;
        store.exclusive(|table| allocate_in(table, scope))?
    }

    /// See [`SequenceAllocator::revert`].
    ///
    /// # Errors
    ///
    /// See [`SequenceAllocator::revert`].
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), err))]
    pub fn revert(&self, scope: &SequenceScope) -> Result<()> {
        let store = acquire(&self.state)?;
        store.exclusive(|table| revert_in(table, scope, self.floor))?
    }

    /// See [`SequenceAllocator::current`].
    ///
    /// # Errors
    ///
    /// See [`SequenceAllocator::current`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn current(&self, scope: &SequenceScope) -> Result<Option<i64>> {
        let store = acquire(&self.state)?;
        current_in(&*store, scope)
    }
}

impl<S> SequenceAllocator for LockSequenceAllocator<S>
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
