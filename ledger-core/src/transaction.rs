//! Invocation-scoped access to the ledger
//!
//! A [`Transaction`] buffers every write of one invocation. Reads see the
//! transaction's own pending writes first, then committed state. Nothing
//! reaches the store until [`Transaction::commit`], which applies the whole
//! write set and its commit record in one atomic step. Dropping an
//! uncommitted transaction discards its writes.
//!
//! A transaction chains its commit from the log head it saw at
//! [`Transaction::begin`]. If another commit lands in between, the store
//! refuses the record with [`Error::Concurrency`] and nothing is written.

use crate::{
    keys,
    storage::StateStore,
    types::{CommitRecord, WriteSet},
    Error, Result,
};

/// The narrow ledger interface consumed by workflow handlers
pub trait LedgerContext {
    /// Current value of a key, `None` when absent
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set a key
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Remove a key
    fn del_state(&mut self, key: &str) -> Result<()>;

    /// Build a composite key (see [`keys::composite_key`])
    fn create_composite_key(&self, object_type: &str, attributes: &[&str]) -> Result<String> {
        keys::composite_key(object_type, attributes)
    }
}

/// Uncommitted unit of work against a [`StateStore`]
pub struct Transaction<'a> {
    store: &'a dyn StateStore,
    label: String,
    base: Option<CommitRecord>,
    writes: WriteSet,
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("label", &self.label)
            .field("base_height", &self.base_height())
            .field("pending_writes", &self.writes.len())
            .finish()
    }
}

impl<'a> Transaction<'a> {
    /// Begin a transaction labelled with the invocation name
    pub fn begin(store: &'a dyn StateStore, label: impl Into<String>) -> Result<Self> {
        let base = store.latest_commit()?;
        Ok(Self {
            store,
            label: label.into(),
            base,
            writes: WriteSet::new(),
        })
    }

    /// Height of the log head when the transaction began
    pub fn base_height(&self) -> Option<u64> {
        self.base.as_ref().map(|c| c.height)
    }

    /// Pending writes
    pub fn write_set(&self) -> &WriteSet {
        &self.writes
    }

    /// Commit all pending writes atomically.
    ///
    /// Returns `None` when nothing was written; read-only invocations leave
    /// the commit log untouched. Fails with [`Error::Concurrency`] when the
    /// log moved since [`Transaction::begin`].
    pub fn commit(self) -> Result<Option<CommitRecord>> {
        if self.writes.is_empty() {
            return Ok(None);
        }

        let record = CommitRecord::next(self.base.as_ref(), &self.label, self.writes.writes());
        self.store.apply(&record)?;

        tracing::debug!(
            commit = %record,
            keys = ?record.writes.iter().map(|w| keys::printable(w.key())).collect::<Vec<_>>(),
            "Transaction committed"
        );

        Ok(Some(record))
    }
}

impl LedgerContext for Transaction<'_> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.writes.lookup(key) {
            Some(pending) => Ok(pending.map(|v| v.to_vec())),
            None => self.store.get(key),
        }
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        check_key(key)?;
        self.writes.put(key, value);
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> Result<()> {
        check_key(key)?;
        self.writes.delete(key);
        Ok(())
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("Key must not be empty".to_string()));
    }
    Ok(())
}

/// Run `f` inside a fresh transaction; commit on `Ok`, discard on `Err`
pub fn run_transaction<T, E, F>(store: &dyn StateStore, label: &str, f: F) -> std::result::Result<T, E>
where
    F: FnOnce(&mut Transaction<'_>) -> std::result::Result<T, E>,
    E: From<Error>,
{
    let mut tx = Transaction::begin(store, label)?;
    let value = f(&mut tx)?;
    tx.commit()?;
    Ok(value)
}
