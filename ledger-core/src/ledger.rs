//! Main ledger orchestration layer
//!
//! This module ties together storage, the commit log, and the actor
//! into the API the workflow layer runs its invocations against.
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{Config, Ledger, LedgerContext};
//!
//! #[tokio::main]
//! async fn main() -> ledger_core::Result<()> {
//!     let ledger = Ledger::open(Config::in_memory()).await?;
//!
//!     ledger
//!         .execute("put", |tx| tx.put_state("greeting", b"hello".to_vec()))
//!         .await?;
//!
//!     assert_eq!(ledger.get_state("greeting")?, Some(b"hello".to_vec()));
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    crypto,
    metrics::Metrics,
    storage::{open_store, StateStore},
    transaction::Transaction,
    types::{CommitRecord, KeyWrite},
    Config, Error, Result,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of replaying the commit log from empty state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// Commit records replayed
    pub commits: usize,

    /// Keys present after replay
    pub keys: usize,

    /// Whether the replayed state equals the live world state
    pub matches: bool,
}

/// Main ledger interface
pub struct Ledger {
    /// Actor handle for writes
    handle: LedgerHandle,

    /// Direct storage access (for reads)
    store: Arc<dyn StateStore>,

    /// Metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("backend", &self.config.backend)
            .field("service_name", &self.config.service_name)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Open ledger with configuration
    pub async fn open(config: Config) -> Result<Self> {
        let store = open_store(&config)?;
        Self::with_store(store, config)
    }

    /// Run a ledger over an already opened store
    pub fn with_store(store: Arc<dyn StateStore>, config: Config) -> Result<Self> {
        let metrics = Metrics::new()?;
        let handle = spawn_ledger_actor(store.clone(), config.mailbox_capacity, metrics.clone());

        let height = store.latest_commit()?.map(|c| c.height);
        tracing::info!(
            service = %config.service_name,
            backend = ?config.backend,
            height = ?height,
            "Ledger opened"
        );

        Ok(Self {
            handle,
            store,
            metrics,
            config,
        })
    }

    /// Run `f` as one serialized transaction.
    ///
    /// Writes commit atomically when `f` returns `Ok` and are discarded when
    /// it returns `Err`.
    pub async fn execute<T, E, F>(&self, label: impl Into<String>, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<Error> + Send + 'static,
    {
        self.handle.execute(label, f).await
    }

    /// Committed value of a key
    pub fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.store.get(key)
    }

    /// Most recent commit record
    pub fn latest_commit(&self) -> Result<Option<CommitRecord>> {
        self.store.latest_commit()
    }

    /// Commit record at a height
    pub fn commit_at(&self, height: u64) -> Result<CommitRecord> {
        self.store.commit_at(height)
    }

    /// Full commit log
    pub fn commits(&self) -> Result<Vec<CommitRecord>> {
        self.store.commits()
    }

    /// Full committed world state
    pub fn snapshot(&self) -> Result<BTreeMap<String, Vec<u8>>> {
        self.store.snapshot()
    }

    /// Check the commit log's hash chain
    pub fn verify_chain(&self) -> Result<()> {
        crypto::verify_chain(&self.store.commits()?)
    }

    /// Rebuild world state from the commit log and compare with the live state
    pub fn replay(&self) -> Result<ReplayReport> {
        let commits = self.store.commits()?;
        crypto::verify_chain(&commits)?;

        let mut state: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for record in &commits {
            for write in &record.writes {
                match write {
                    KeyWrite::Put { key, value } => {
                        state.insert(key.clone(), value.clone());
                    }
                    KeyWrite::Delete { key } => {
                        state.remove(key);
                    }
                }
            }
        }

        let matches = state == self.store.snapshot()?;
        if !matches {
            tracing::warn!(commits = commits.len(), "Replayed state diverges from world state");
        }

        Ok(ReplayReport {
            commits: commits.len(),
            keys: state.len(),
            matches,
        })
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown ledger after pending invocations complete
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}
