//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode, keys in sorted order)
//! - Memory safety (no unsafe code)
//! - Append-only history (commit records are immutable once written)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// A single mutation inside a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyWrite {
    /// Key set to value
    Put {
        /// Ledger key
        key: String,
        /// New value
        value: Vec<u8>,
    },
    /// Key removed
    Delete {
        /// Ledger key
        key: String,
    },
}

impl KeyWrite {
    /// Key touched by this write
    pub fn key(&self) -> &str {
        match self {
            KeyWrite::Put { key, .. } | KeyWrite::Delete { key } => key,
        }
    }
}

/// Uncommitted writes of one transaction, last write per key wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    entries: BTreeMap<String, Option<Vec<u8>>>,
}

impl WriteSet {
    /// Create empty write set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a put
    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.entries.insert(key.into(), Some(value));
    }

    /// Record a delete
    pub fn delete(&mut self, key: impl Into<String>) {
        self.entries.insert(key.into(), None);
    }

    /// Pending value for a key.
    ///
    /// `None` = untouched, `Some(None)` = deleted, `Some(Some(v))` = written.
    pub fn lookup(&self, key: &str) -> Option<Option<&[u8]>> {
        self.entries.get(key).map(|v| v.as_deref())
    }

    /// Number of keys touched
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was written
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes in key order
    pub fn writes(&self) -> Vec<KeyWrite> {
        self.entries
            .iter()
            .map(|(key, value)| match value {
                Some(value) => KeyWrite::Put {
                    key: key.clone(),
                    value: value.clone(),
                },
                None => KeyWrite::Delete { key: key.clone() },
            })
            .collect()
    }
}

/// Append-only record of one committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Transaction ID (UUIDv7 for time-ordering)
    pub tx_id: Uuid,

    /// Position in the commit log (0-based, gap-free)
    pub height: u64,

    /// Invocation label (function name)
    pub label: String,

    /// Writes applied by this commit, in key order
    pub writes: Vec<KeyWrite>,

    /// Hash of the previous record (zeroes for height 0)
    pub previous_hash: [u8; 32],

    /// Hash of this record's contents
    pub hash: [u8; 32],

    /// Commit timestamp
    pub committed_at: DateTime<Utc>,
}

impl CommitRecord {
    /// Build the record that follows `previous` in the log
    pub fn next(previous: Option<&CommitRecord>, label: &str, writes: Vec<KeyWrite>) -> Self {
        let (height, previous_hash) = match previous {
            Some(prev) => (prev.height + 1, prev.hash),
            None => (0, [0u8; 32]),
        };

        let mut record = Self {
            tx_id: Uuid::now_v7(),
            height,
            label: label.to_string(),
            writes,
            previous_hash,
            hash: [0u8; 32],
            committed_at: Utc::now(),
        };
        record.hash = record.compute_hash();
        record
    }

    /// Compute record hash
    pub fn compute_hash(&self) -> [u8; 32] {
        crate::crypto::hash_record(self)
    }
}

impl fmt::Display for CommitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} ({} writes, {})",
            self.height,
            self.label,
            self.writes.len(),
            crate::crypto::short_hex(&self.hash)
        )
    }
}
