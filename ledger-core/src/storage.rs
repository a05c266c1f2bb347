//! Storage layer
//!
//! # Column Families (RocksDB)
//!
//! - `state` - World state (key: ledger key, value: latest bytes)
//! - `commits` - Append-only commit log (key: height, big-endian)
//!
//! Every commit writes its state mutations and its commit record through one
//! atomic batch, so the log and the world state never disagree.

use crate::{
    error::{Error, Result},
    types::{CommitRecord, KeyWrite},
    Config, StorageBackend,
};
use parking_lot::{Mutex, RwLock};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Column family names
const CF_STATE: &str = "state";
const CF_COMMITS: &str = "commits";

/// Backing store for world state and the commit log
pub trait StateStore: Send + Sync {
    /// Latest committed value for a key
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Apply a commit record's writes and append the record, atomically.
    ///
    /// The record must extend the current log head. A record chained from an
    /// older head fails with [`Error::Concurrency`] and writes nothing.
    fn apply(&self, record: &CommitRecord) -> Result<()>;

    /// Most recent commit record
    fn latest_commit(&self) -> Result<Option<CommitRecord>>;

    /// Commit record at a height
    fn commit_at(&self, height: u64) -> Result<CommitRecord>;

    /// Full commit log in height order
    fn commits(&self) -> Result<Vec<CommitRecord>>;

    /// Full world state in key order
    fn snapshot(&self) -> Result<BTreeMap<String, Vec<u8>>>;
}

/// Open the store selected by configuration
pub fn open_store(config: &Config) -> Result<Arc<dyn StateStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::RocksDb => Ok(Arc::new(RocksStore::open(config)?)),
    }
}

// In-memory store

#[derive(Debug, Default)]
struct MemoryInner {
    state: BTreeMap<String, Vec<u8>>,
    commits: Vec<CommitRecord>,
}

/// Process-local store for tests and ephemeral nodes
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.read().state.get(key).cloned())
    }

    fn apply(&self, record: &CommitRecord) -> Result<()> {
        let mut inner = self.inner.write();
        check_extends(record, inner.commits.len() as u64)?;

        for write in &record.writes {
            match write {
                KeyWrite::Put { key, value } => {
                    inner.state.insert(key.clone(), value.clone());
                }
                KeyWrite::Delete { key } => {
                    inner.state.remove(key);
                }
            }
        }
        inner.commits.push(record.clone());

        Ok(())
    }

    fn latest_commit(&self) -> Result<Option<CommitRecord>> {
        Ok(self.inner.read().commits.last().cloned())
    }

    fn commit_at(&self, height: u64) -> Result<CommitRecord> {
        self.inner
            .read()
            .commits
            .get(height as usize)
            .cloned()
            .ok_or_else(|| Error::CommitNotFound(height.to_string()))
    }

    fn commits(&self) -> Result<Vec<CommitRecord>> {
        Ok(self.inner.read().commits.clone())
    }

    fn snapshot(&self) -> Result<BTreeMap<String, Vec<u8>>> {
        Ok(self.inner.read().state.clone())
    }
}

// RocksDB store

/// Persistent store backed by RocksDB
pub struct RocksStore {
    db: Arc<DB>,

    /// Held from the head check until the batch is written
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore")
            .field("path", &self.db.path())
            .finish()
    }
}

impl RocksStore {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_STATE, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_COMMITS, Self::cf_options_commits()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB ledger store");

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    fn cf_options_state() -> Options {
        let mut opts = Options::default();
        // State is read on every invocation, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_options_commits() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }
}

impl StateStore for RocksStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let cf = self.cf_handle(CF_STATE)?;
        Ok(self.db.get_cf(cf, key.as_bytes())?)
    }

    fn apply(&self, record: &CommitRecord) -> Result<()> {
        let _guard = self.write_lock.lock();

        let next_height = match self.latest_commit()? {
            Some(prev) => prev.height + 1,
            None => 0,
        };
        check_extends(record, next_height)?;

        let mut batch = WriteBatch::default();

        let cf_state = self.cf_handle(CF_STATE)?;
        for write in &record.writes {
            match write {
                KeyWrite::Put { key, value } => batch.put_cf(cf_state, key.as_bytes(), value),
                KeyWrite::Delete { key } => batch.delete_cf(cf_state, key.as_bytes()),
            }
        }

        let cf_commits = self.cf_handle(CF_COMMITS)?;
        let record_value = bincode::serialize(record)?;
        batch.put_cf(cf_commits, record.height.to_be_bytes(), &record_value);

        // Atomic commit
        self.db.write(batch)?;

        tracing::debug!(
            height = record.height,
            label = %record.label,
            writes = record.writes.len(),
            "Commit persisted"
        );

        Ok(())
    }

    fn latest_commit(&self) -> Result<Option<CommitRecord>> {
        let cf = self.cf_handle(CF_COMMITS)?;

        if let Some(item) = self.db.iterator_cf(cf, IteratorMode::End).next() {
            let (_, value) = item?;
            return Ok(Some(bincode::deserialize(&value)?));
        }

        Ok(None)
    }

    fn commit_at(&self, height: u64) -> Result<CommitRecord> {
        let cf = self.cf_handle(CF_COMMITS)?;

        let value = self
            .db
            .get_cf(cf, height.to_be_bytes())?
            .ok_or_else(|| Error::CommitNotFound(height.to_string()))?;

        Ok(bincode::deserialize(&value)?)
    }

    fn commits(&self) -> Result<Vec<CommitRecord>> {
        let cf = self.cf_handle(CF_COMMITS)?;

        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            records.push(bincode::deserialize(&value)?);
        }

        Ok(records)
    }

    fn snapshot(&self) -> Result<BTreeMap<String, Vec<u8>>> {
        let cf = self.cf_handle(CF_STATE)?;

        let mut state = BTreeMap::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| Error::Storage(format!("Non UTF-8 state key: {}", e)))?;
            state.insert(key, value.to_vec());
        }

        Ok(state)
    }
}

/// Check that `record` lands exactly at `next_height`
fn check_extends(record: &CommitRecord, next_height: u64) -> Result<()> {
    if record.height < next_height {
        return Err(Error::Concurrency(format!(
            "Commit {} targets height {} but the log has moved to {}",
            record.label, record.height, next_height
        )));
    }
    if record.height > next_height {
        return Err(Error::InvariantViolation(format!(
            "Commit height {} leaves a gap (next is {})",
            record.height, next_height
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config() -> (Config, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (config, temp_dir)
    }

    fn put(key: &str, value: &str) -> KeyWrite {
        KeyWrite::Put {
            key: key.to_string(),
            value: value.as_bytes().to_vec(),
        }
    }

    fn exercise(store: &dyn StateStore) {
        let first = CommitRecord::next(None, "init", vec![put("a", "1"), put("b", "2")]);
        store.apply(&first).unwrap();

        let second = CommitRecord::next(
            Some(&first),
            "update",
            vec![put("a", "3"), KeyWrite::Delete { key: "b".into() }],
        );
        store.apply(&second).unwrap();

        assert_eq!(store.get("a").unwrap(), Some(b"3".to_vec()));
        assert_eq!(store.get("b").unwrap(), None);
        assert_eq!(store.latest_commit().unwrap().unwrap().height, 1);
        assert_eq!(store.commit_at(0).unwrap(), first);
        assert_eq!(store.commits().unwrap().len(), 2);
        assert_eq!(store.snapshot().unwrap().len(), 1);

        // A record chained from an old head is refused
        let stale = CommitRecord::next(None, "stale", vec![put("c", "x")]);
        assert!(matches!(store.apply(&stale), Err(Error::Concurrency(_))));
        assert_eq!(store.get("c").unwrap(), None);

        // So is one that skips a height
        let mut gap = CommitRecord::next(Some(&second), "gap", vec![put("c", "x")]);
        gap.height += 1;
        assert!(matches!(store.apply(&gap), Err(Error::InvariantViolation(_))));
        assert_eq!(store.commits().unwrap().len(), 2);
    }

    fn racing_applies(store: Arc<dyn StateStore>) {
        let base = CommitRecord::next(None, "init", vec![put("balance", "100")]);
        store.apply(&base).unwrap();

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let record = CommitRecord::next(Some(&base), "pay", vec![put("balance", &i.to_string())]);
                std::thread::spawn(move || store.apply(&record))
            })
            .collect();

        let results: Vec<Result<()>> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, Error::Concurrency(_))));
        assert_eq!(store.commits().unwrap().len(), 2);
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_rocks_store() {
        let (config, _temp) = test_config();
        let store = RocksStore::open(&config).unwrap();
        exercise(&store);
    }

    #[test]
    fn test_memory_store_racing_applies() {
        racing_applies(Arc::new(MemoryStore::new()));
    }

    #[test]
    fn test_rocks_store_racing_applies() {
        let (config, _temp) = test_config();
        racing_applies(Arc::new(RocksStore::open(&config).unwrap()));
    }

    #[test]
    fn test_rocks_store_reopen_preserves_log() {
        let (config, _temp) = test_config();
        {
            let store = RocksStore::open(&config).unwrap();
            let record = CommitRecord::next(None, "init", vec![put("k", "v")]);
            store.apply(&record).unwrap();
        }

        let store = RocksStore::open(&config).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.commits().unwrap().len(), 1);
    }

    #[test]
    fn test_commit_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.commit_at(3), Err(Error::CommitNotFound(_))));
    }
}
