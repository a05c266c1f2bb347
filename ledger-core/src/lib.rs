//! Trade Ledger Core
//!
//! Append-only key-value ledger that backs the trade workflow.
//!
//! # Architecture
//!
//! - **World State**: Latest value per key, read through invocation-scoped transactions
//! - **Commit Log**: Every committed write set is appended as a hash-chained record
//! - **Single Writer**: One actor task executes invocations strictly one at a time
//! - **Composite Keys**: Deterministic, collision-free keys from a tag and its parts
//!
//! # Invariants
//!
//! - Atomicity: A transaction's writes become visible together or not at all
//! - Append-only: Commit records are never modified or deleted
//! - Deterministic replay: Replaying the commit log reproduces the world state
//! - Serializability: Invocations observe the effects of all earlier commits

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod keys;
pub mod storage;
pub mod transaction;
pub mod ledger;
pub mod crypto;
pub mod error;
pub mod actor;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{CommitRecord, KeyWrite, WriteSet};
pub use keys::{composite_key, printable};
pub use storage::{open_store, MemoryStore, RocksStore, StateStore};
pub use transaction::{run_transaction, LedgerContext, Transaction};
pub use ledger::{Ledger, ReplayReport};
pub use config::{Config, StorageBackend};
