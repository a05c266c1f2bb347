//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Composite keys are injective
//! - Deterministic replay: the commit log reproduces world state
//! - Atomicity: rejected transactions leave no trace
//! - Hash chain: any tampered record is detected

use ledger_core::{composite_key, Config, Error, Ledger, LedgerContext};
use proptest::prelude::*;

/// Strategy for composite key components (no reserved characters, non-empty)
fn component_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 _.-]{1,12}"
}

/// A single scripted mutation: (key index, Some(value) = put, None = delete)
fn op_strategy() -> impl Strategy<Value = (u8, Option<Vec<u8>>)> {
    (
        0u8..8,
        prop::option::of(prop::collection::vec(any::<u8>(), 0..16)),
    )
}

/// A scripted transaction: its mutations and whether it is rejected
fn tx_strategy() -> impl Strategy<Value = (Vec<(u8, Option<Vec<u8>>)>, bool)> {
    (prop::collection::vec(op_strategy(), 1..6), any::<bool>())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: Different (tag, parts) pairs never produce the same key
    #[test]
    fn prop_composite_keys_injective(
        tag_a in component_strategy(),
        parts_a in prop::collection::vec(component_strategy(), 0..4),
        tag_b in component_strategy(),
        parts_b in prop::collection::vec(component_strategy(), 0..4),
    ) {
        let refs_a: Vec<&str> = parts_a.iter().map(String::as_str).collect();
        let refs_b: Vec<&str> = parts_b.iter().map(String::as_str).collect();

        let key_a = composite_key(&tag_a, &refs_a).unwrap();
        let key_b = composite_key(&tag_b, &refs_b).unwrap();

        let same_input = tag_a == tag_b && parts_a == parts_b;
        prop_assert_eq!(key_a == key_b, same_input);
    }

    /// Property: Replaying the commit log reproduces world state, and
    /// rejected transactions contribute nothing to either
    #[test]
    fn prop_deterministic_replay(txs in prop::collection::vec(tx_strategy(), 1..20)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = Ledger::open(Config::in_memory()).await.unwrap();

            let mut accepted = 0usize;
            for (ops, reject) in txs {
                let result: Result<(), Error> = ledger
                    .execute("scripted", move |tx| {
                        for (key, value) in ops {
                            let key = format!("key-{}", key);
                            match value {
                                Some(value) => tx.put_state(&key, value)?,
                                None => tx.del_state(&key)?,
                            }
                        }
                        if reject {
                            return Err(Error::InvalidArgument("rejected".into()));
                        }
                        Ok(())
                    })
                    .await;

                prop_assert_eq!(result.is_ok(), !reject);
                if !reject {
                    accepted += 1;
                }
            }

            ledger.verify_chain().unwrap();
            let report = ledger.replay().unwrap();
            prop_assert!(report.matches);
            prop_assert_eq!(report.commits, accepted);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use ledger_core::{CommitRecord, KeyWrite};

    #[test]
    fn test_tampered_record_detected() {
        let first = CommitRecord::next(
            None,
            "init",
            vec![KeyWrite::Put {
                key: "balance".into(),
                value: b"100000".to_vec(),
            }],
        );
        let mut second = CommitRecord::next(
            Some(&first),
            "makePayment",
            vec![KeyWrite::Put {
                key: "balance".into(),
                value: b"125000".to_vec(),
            }],
        );

        ledger_core::crypto::verify_chain(&[first.clone(), second.clone()]).unwrap();

        second.writes = vec![KeyWrite::Put {
            key: "balance".into(),
            value: b"999999".to_vec(),
        }];
        assert!(ledger_core::crypto::verify_chain(&[first, second]).is_err());
    }

    #[tokio::test]
    async fn test_read_only_invocation_does_not_commit() {
        let ledger = Ledger::open(Config::in_memory()).await.unwrap();

        let value: Option<Vec<u8>> = ledger
            .execute("query", |tx| tx.get_state("missing"))
            .await
            .unwrap();

        assert!(value.is_none());
        assert!(ledger.latest_commit().unwrap().is_none());
        ledger.shutdown().await.unwrap();
    }
}
