use std::{
    cell::RefCell,
    collections::BTreeMap,
    fs,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use fs4::fs_std::FileExt;
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{CounterStore, SequenceCounter, SequenceScope, StoreError};

type Table = BTreeMap<SequenceScope, i64>;

/// On-disk layout of the counter table.
#[derive(serde::Serialize, serde::Deserialize)]
struct CounterFile {
    counters: Vec<SequenceCounter>,
}

/// A durable [`CounterStore`] that keeps the whole counter table in one JSON
/// file.
///
/// Every write rewrites the file: the new table is written to a temporary
/// file in the same directory, synced, then renamed over the old one. A crash
/// mid-save leaves either the old or the new table on disk, never a torn one,
/// so reads need no lock.
///
/// Writers take an exclusive advisory lock on a sidecar file (`<path>.lock`)
/// and re-read the table under it. [`exclusive`](CounterStore::exclusive)
/// holds that lock for a whole find-modify-save cycle, so any number of
/// handles, in this process or others, can share one file without handing
/// out the same value twice or dropping each other's updates.
///
/// # Example
/// ```
/// use tally::{CounterStore, JsonFileCounterStore, SequenceCounter, SequenceScope};
/// use uuid::Uuid;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("counters.json");
/// let scope = SequenceScope::new(Uuid::from_u128(1), Uuid::from_u128(2), 2024, false);
///
/// let first = JsonFileCounterStore::open(&path)?;
/// let second = JsonFileCounterStore::open(&path)?;
/// first.save_counter(SequenceCounter::new(scope, 12))?;
///
/// assert_eq!(second.find_counter(&scope)?.map(|c| c.current_value), Some(12));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct JsonFileCounterStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileCounterStore {
    /// Opens the store at `path`, checking any counters already there.
    ///
    /// A missing file is an empty table; the file is created on the first
    /// save.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Io`] if the file exists but cannot be read.
    /// - [`StoreError::Serialization`] if its contents are not a counter
    ///   table.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(path = %path.as_ref().display())))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let _table = load(&path)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(counters = _table.len(), "loaded counter table");

        let mut lock_path = path.clone().into_os_string();
        lock_path.push(".lock");

        Ok(Self {
            path,
            lock_path: PathBuf::from(lock_path),
        })
    }

    /// The file backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The sidecar file writers lock. Created on the first write and left in
    /// place afterwards.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    fn lock(&self) -> Result<TableLock, StoreError> {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        FileExt::lock_exclusive(&file)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(path = %self.lock_path.display(), "locked counter table");

        Ok(TableLock(file))
    }
}

impl CounterStore for JsonFileCounterStore {
    fn find_counter(&self, scope: &SequenceScope) -> Result<Option<SequenceCounter>, StoreError> {
        Ok(load(&self.path)?
            .get(scope)
            .map(|&value| SequenceCounter::new(*scope, value)))
    }

    fn save_counter(&self, counter: SequenceCounter) -> Result<SequenceCounter, StoreError> {
        self.exclusive(|table| table.save_counter(counter))?
    }

    fn counters(&self) -> Result<Vec<SequenceCounter>, StoreError> {
        Ok(snapshot(&load(&self.path)?))
    }

    fn exclusive<R>(&self, cycle: impl FnOnce(&dyn CounterStore) -> R) -> Result<R, StoreError>
    where
        Self: Sized,
    {
        let _lock = self.lock()?;
        let table = LockedTable {
            path: &self.path,
            table: RefCell::new(load(&self.path)?),
        };
        Ok(cycle(&table))
    }
}

/// Exclusive hold on a store's sidecar lock file, released on drop.
struct TableLock(fs::File);

impl Drop for TableLock {
    fn drop(&mut self) {
        // Closing the file releases the lock as well.
        let _ = FileExt::unlock(&self.0);
    }
}

/// The table as read under the lock, for the length of one cycle.
///
/// A failed save rolls the entry back, so the cycle never reads a value that
/// is not on disk.
struct LockedTable<'a> {
    path: &'a Path,
    table: RefCell<Table>,
}

impl CounterStore for LockedTable<'_> {
    fn find_counter(&self, scope: &SequenceScope) -> Result<Option<SequenceCounter>, StoreError> {
        Ok(self
            .table
            .borrow()
            .get(scope)
            .map(|&value| SequenceCounter::new(*scope, value)))
    }

    fn save_counter(&self, counter: SequenceCounter) -> Result<SequenceCounter, StoreError> {
        let mut table = self.table.borrow_mut();
        let previous = table.insert(counter.scope, counter.current_value);

        if let Err(e) = flush(self.path, &table) {
            match previous {
                Some(value) => table.insert(counter.scope, value),
                None => table.remove(&counter.scope),
            };
            return Err(e);
        }

        Ok(counter)
    }

    fn counters(&self) -> Result<Vec<SequenceCounter>, StoreError> {
        Ok(snapshot(&self.table.borrow()))
    }
}

fn snapshot(table: &Table) -> Vec<SequenceCounter> {
    table
        .iter()
        .map(|(&scope, &value)| SequenceCounter::new(scope, value))
        .collect()
}

fn load(path: &Path) -> Result<Table, StoreError> {
    match fs::File::open(path) {
        Ok(file) => {
            let stored: CounterFile = serde_json::from_reader(BufReader::new(file))?;
            Ok(stored
                .counters
                .into_iter()
                .map(|c| (c.scope, c.current_value))
                .collect())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Table::new()),
        Err(e) => Err(e.into()),
    }
}

fn flush(path: &Path, table: &Table) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let stored = CounterFile {
        counters: snapshot(table),
    };

    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, &stored)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| StoreError::Io(e.error))?;

    #[cfg(feature = "tracing")]
    tracing::trace!(path = %path.display(), counters = table.len(), "flushed counter table");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scope(emergency: bool) -> SequenceScope {
        SequenceScope::new(Uuid::from_u128(0xfac), Uuid::from_u128(0xb0b), 2024, emergency)
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCounterStore::open(dir.path().join("absent.json")).unwrap();

        assert!(store.counters().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn counters_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");

        {
            let store = JsonFileCounterStore::open(&path).unwrap();
            store.save_counter(SequenceCounter::new(scope(false), 3)).unwrap();
            store.save_counter(SequenceCounter::new(scope(true), 1)).unwrap();
            store.save_counter(SequenceCounter::new(scope(false), 4)).unwrap();
        }

        let store = JsonFileCounterStore::open(&path).unwrap();
        assert_eq!(
            store.counters().unwrap(),
            [
                SequenceCounter::new(scope(false), 4),
                SequenceCounter::new(scope(true), 1),
            ]
        );
    }

    #[test]
    fn corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileCounterStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)), "{err:?}");
    }

    #[test]
    fn failed_save_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("counters.json");
        let store = JsonFileCounterStore::open(&path).unwrap();

        // The parent directory does not exist, so neither the lock nor the
        // staged write can be created.
        let err = store
            .save_counter(SequenceCounter::first(scope(false)))
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)), "{err:?}");
        assert_eq!(store.find_counter(&scope(false)).unwrap(), None);

        fs::create_dir(dir.path().join("nested")).unwrap();
        store.save_counter(SequenceCounter::first(scope(false))).unwrap();
        assert_eq!(
            store.find_counter(&scope(false)).unwrap(),
            Some(SequenceCounter::first(scope(false)))
        );
    }

    #[test]
    fn handles_on_one_path_see_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let first = JsonFileCounterStore::open(&path).unwrap();
        let second = JsonFileCounterStore::open(&path).unwrap();

        first.save_counter(SequenceCounter::new(scope(false), 1)).unwrap();
        assert_eq!(
            second.find_counter(&scope(false)).unwrap(),
            Some(SequenceCounter::new(scope(false), 1))
        );

        // Opened before the first save, `second` must not write its stale
        // view over it.
        second.save_counter(SequenceCounter::new(scope(true), 5)).unwrap();
        assert_eq!(
            JsonFileCounterStore::open(&path).unwrap().counters().unwrap(),
            [
                SequenceCounter::new(scope(false), 1),
                SequenceCounter::new(scope(true), 5),
            ]
        );
    }

    #[test]
    fn exclusive_cycle_reads_the_latest_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let first = JsonFileCounterStore::open(&path).unwrap();
        let second = JsonFileCounterStore::open(&path).unwrap();

        first.save_counter(SequenceCounter::new(scope(false), 7)).unwrap();

        let next = second
            .exclusive(|table| {
                let seen = table.find_counter(&scope(false))?;
                let next = seen.and_then(|c| c.incremented()).unwrap();
                table.save_counter(next)
            })
            .unwrap()
            .unwrap();
        assert_eq!(next.current_value, 8);
        assert_eq!(
            first.find_counter(&scope(false)).unwrap().map(|c| c.current_value),
            Some(8)
        );
    }

    #[test]
    fn writes_lock_a_sidecar_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let store = JsonFileCounterStore::open(&path).unwrap();
        assert_eq!(store.lock_path(), dir.path().join("counters.json.lock"));

        assert!(!store.lock_path().exists());
        store.save_counter(SequenceCounter::first(scope(false))).unwrap();
        assert!(store.lock_path().exists());
    }

    #[test]
    fn file_is_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let store = JsonFileCounterStore::open(&path).unwrap();
        store.save_counter(SequenceCounter::new(scope(true), 7)).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"current_value\": 7"), "{raw}");
        assert!(raw.contains("\"emergency\": true"), "{raw}");
        assert!(raw.contains("\"year\": 2024"), "{raw}");
    }
}
