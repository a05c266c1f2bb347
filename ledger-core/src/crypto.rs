//! Hashing for the commit log
//!
//! This module provides:
//! - SHA-256 hashing for commit records
//! - Hash-chain verification over a sequence of records

use crate::types::CommitRecord;
use crate::{Error, Result};
use sha2::{Digest, Sha256};

/// Hash a commit record using SHA-256
///
/// Covers every field except `hash` itself.
pub fn hash_record(record: &CommitRecord) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(record.tx_id.as_bytes());
    hasher.update(record.height.to_be_bytes());
    hasher.update((record.label.len() as u64).to_be_bytes());
    hasher.update(record.label.as_bytes());
    // bincode of a Vec<KeyWrite> cannot fail
    let writes = bincode::serialize(&record.writes).unwrap_or_default();
    hasher.update(&writes);
    hasher.update(record.previous_hash);
    hasher.update(
        record
            .committed_at
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_be_bytes(),
    );
    hasher.finalize().into()
}

/// Verify heights, hashes, and links of a commit log in order
pub fn verify_chain(records: &[CommitRecord]) -> Result<()> {
    let mut previous_hash = [0u8; 32];

    for (expected_height, record) in records.iter().enumerate() {
        if record.height != expected_height as u64 {
            return Err(Error::InvariantViolation(format!(
                "Commit height gap: expected {}, found {}",
                expected_height, record.height
            )));
        }

        if record.previous_hash != previous_hash {
            return Err(Error::InvariantViolation(format!(
                "Commit #{} does not link to its predecessor",
                record.height
            )));
        }

        if record.hash != hash_record(record) {
            return Err(Error::InvariantViolation(format!(
                "Commit #{} hash mismatch",
                record.height
            )));
        }

        previous_hash = record.hash;
    }

    Ok(())
}

/// First 8 bytes of a hash as hex, for logs
pub fn short_hex(hash: &[u8; 32]) -> String {
    hash[..8].iter().map(|b| format!("{:02x}", b)).collect()
}
