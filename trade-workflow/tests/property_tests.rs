//! Property-based tests for settlement invariants
//!
//! - Paid amount never decreases and never exceeds the trade amount
//! - Funds are conserved between the two balances
//! - Two tranches (source, then anywhere else) settle a trade exactly
//! - Rejected invocations never commit

use ledger_core::{MemoryStore, StateStore, Transaction};
use proptest::prelude::*;
use trade_workflow::documents::{ShipmentLocation, TradeAgreement, TradeStatus};
use trade_workflow::payment::{settle, InsufficientFundsPolicy, Tranche};
use trade_workflow::roles::AccountBalances;
use trade_workflow::{Config, InvocationContext, TradeWorkflowService};

fn location_strategy() -> impl Strategy<Value = ShipmentLocation> {
    prop_oneof![
        Just(ShipmentLocation::Source),
        Just(ShipmentLocation::Destination),
        "[A-Za-z ]{1,10}".prop_map(|s| ShipmentLocation::parse(&s)),
    ]
}

fn trade(amount: i64) -> TradeAgreement {
    TradeAgreement {
        amount,
        description_of_goods: "Goods".to_string(),
        status: TradeStatus::Accepted,
        payment_to_date: 0,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: Any sequence of tranches keeps payment monotone and bounded
    #[test]
    fn prop_payment_monotone_and_bounded(
        amount in 0i64..10_000_000,
        locations in prop::collection::vec(location_strategy(), 1..8),
    ) {
        let mut t = trade(amount);
        let mut balances = AccountBalances { exporter: 0, importer: amount };
        let total = balances.exporter + balances.importer;

        for location in &locations {
            let before = t.payment_to_date;
            let tranche = Tranche::compute(location, &t);
            prop_assert!(tranche.amount() >= 0);

            settle(&mut t, &mut balances, tranche, InsufficientFundsPolicy::Reject).unwrap();

            prop_assert!(t.payment_to_date >= before);
            prop_assert!(t.payment_to_date <= t.amount);
            prop_assert!(balances.importer >= 0);
            prop_assert_eq!(balances.exporter + balances.importer, total);
        }
    }

    /// Property: Source then any other location pays exactly the trade amount
    #[test]
    fn prop_two_tranches_settle_exactly(
        amount in 0i64..10_000_000,
        importer in 0i64..20_000_000,
    ) {
        let mut t = trade(amount);
        let mut balances = AccountBalances { exporter: 0, importer };

        let first = Tranche::compute(&ShipmentLocation::Source, &t);
        prop_assert_eq!(first.amount(), amount / 2);
        settle(&mut t, &mut balances, first, InsufficientFundsPolicy::Warn).unwrap();

        let second = Tranche::compute(&ShipmentLocation::Destination, &t);
        settle(&mut t, &mut balances, second, InsufficientFundsPolicy::Warn).unwrap();

        prop_assert!(t.is_settled());
        prop_assert_eq!(t.payment_to_date, amount);
        prop_assert_eq!(balances.exporter, amount);
        prop_assert_eq!(balances.importer, importer - amount);
    }

    /// Property: Calls from unknown organizations never reach the ledger
    #[test]
    fn prop_unauthorized_calls_never_commit(
        org in "[A-Za-z]{1,12}",
        function_index in 0usize..18,
    ) {
        let service = TradeWorkflowService::new(&Config::in_memory()).unwrap();
        let store = MemoryStore::new();
        let function = trade_workflow::Operation::ALL[function_index].name();
        let caller = InvocationContext::for_member(&format!("{}Stranger", org), "ca.unknown.com");
        let args = vec!["t1".to_string(), "100".to_string(), "Goods".to_string()];

        let result = ledger_core::run_transaction(&store, function, |tx: &mut Transaction<'_>| {
            service.invoke(tx, &caller, function, &args)
        });

        prop_assert!(result.is_err());
        prop_assert!(store.latest_commit().unwrap().is_none());
    }
}
