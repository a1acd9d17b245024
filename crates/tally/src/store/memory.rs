use std::collections::BTreeMap;

use crate::{
    CounterStore, SequenceCounter, SequenceScope, StoreError,
    mutex::{Mutex, acquire},
};

/// A non-durable [`CounterStore`] backed by an ordered map.
///
/// Counters are lost when the store is dropped. Useful for tests and for
/// embedding where another layer owns durability.
///
/// # Example
/// ```
/// use tally::{CounterStore, MemoryCounterStore, SequenceCounter, SequenceScope};
/// use uuid::Uuid;
///
/// let store = MemoryCounterStore::new();
/// let scope = SequenceScope::new(Uuid::from_u128(1), Uuid::from_u128(2), 2024, false);
///
/// assert_eq!(store.find_counter(&scope).unwrap(), None);
/// store.save_counter(SequenceCounter::first(scope)).unwrap();
/// assert_eq!(store.find_counter(&scope).unwrap().unwrap().current_value, 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    table: Mutex<BTreeMap<SequenceScope, i64>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store preloaded with `counters`. Later entries win on
    /// duplicate scopes.
    pub fn with_counters(counters: impl IntoIterator<Item = SequenceCounter>) -> Self {
        let table = counters
            .into_iter()
            .map(|c| (c.scope, c.current_value))
            .collect();
        Self {
            table: Mutex::new(table),
        }
    }
}

impl CounterStore for MemoryCounterStore {
    fn find_counter(&self, scope: &SequenceScope) -> Result<Option<SequenceCounter>, StoreError> {
        let table = acquire(&self.table)?;
        Ok(table
            .get(scope)
            .map(|&value| SequenceCounter::new(*scope, value)))
    }

    fn save_counter(&self, counter: SequenceCounter) -> Result<SequenceCounter, StoreError> {
        acquire(&self.table)?.insert(counter.scope, counter.current_value);
        Ok(counter)
    }

    fn counters(&self) -> Result<Vec<SequenceCounter>, StoreError> {
        let table = acquire(&self.table)?;
        Ok(table
            .iter()
            .map(|(&scope, &value)| SequenceCounter::new(scope, value))
            .collect())
    }
}
