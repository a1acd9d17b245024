//! The read-modify-persist cycles shared by every allocator.
//!
//! Callers must hold the lock covering `scope` for the whole call, and pass
//! the view handed out by [`CounterStore::exclusive`] for cycles that write.

use crate::{CounterStore, Error, Result, RevertFloor, SequenceCounter, SequenceScope};

pub(crate) fn allocate_in<S>(store: &S, scope: &SequenceScope) -> Result<i64>
where
    S: CounterStore + ?Sized,
{
    let next = match store.find_counter(scope)? {
        Some(counter) => counter
            .incremented()
            .ok_or(Error::Overflow { scope: *scope })?,
        None => {
            #[cfg(feature = "tracing")]
            tracing::debug!(%scope, "creating counter");
            SequenceCounter::first(*scope)
        }
    };

    let saved = store.save_counter(next)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(%scope, value = saved.current_value, "allocated");

    Ok(saved.current_value)
}

pub(crate) fn revert_in<S>(store: &S, scope: &SequenceScope, floor: RevertFloor) -> Result<()>
where
    S: CounterStore + ?Sized,
{
    let Some(counter) = store.find_counter(scope)? else {
        #[cfg(feature = "tracing")]
        tracing::debug!(%scope, "no counter to revert");
        return Ok(());
    };

    if let RevertFloor::AtLeast(bound) = floor {
        if !floor.permits(counter.current_value) {
            #[cfg(feature = "tracing")]
            tracing::warn!(%scope, current = counter.current_value, floor = bound, "revert refused");
            return Err(Error::BelowFloor {
                scope: *scope,
                current: counter.current_value,
                floor: bound,
            });
        }
    }

    let previous = counter
        .decremented()
        .ok_or(Error::Overflow { scope: *scope })?;
    let _saved = store.save_counter(previous)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(%scope, value = _saved.current_value, "reverted");

    Ok(())
}

pub(crate) fn current_in<S>(store: &S, scope: &SequenceScope) -> Result<Option<i64>>
where
    S: CounterStore + ?Sized,
{
    Ok(store.find_counter(scope)?.map(|c| c.current_value))
}
