//! Property-based tests for the inventory ledger and the status table
//!
//! This module uses proptest to verify that the two pieces with real
//! invariants behave correctly across a wide variety of inputs: the stock
//! counter must never go negative under any operation sequence, and the
//! transition table must only ever admit the documented moves.

use proptest::prelude::*;
use request_fulfillment::{
    error::InsufficientStock,
    industry::Industry,
    inventory::{InventoryLedger, StockOp},
    listing::ListingDraft,
    request::RequestStatus,
};
use std::sync::Arc;

fn stock_op_strategy() -> impl Strategy<Value = StockOp> {
    prop_oneof![
        Just(StockOp::Add),
        Just(StockOp::Subtract),
        Just(StockOp::Set),
    ]
}

fn status_strategy() -> impl Strategy<Value = RequestStatus> {
    prop_oneof![
        Just(RequestStatus::New),
        Just(RequestStatus::Reviewed),
        Just(RequestStatus::Confirmed),
        Just(RequestStatus::Dispatched),
        Just(RequestStatus::Completed),
        Just(RequestStatus::Cancelled),
    ]
}

/// Open a throwaway ledger seeded with one material listing.
fn seeded_ledger(quantity: u64) -> (InventoryLedger, String, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = Arc::new(sled::open(temp_dir.path().join("prop.db")).unwrap());
    let tree = db.open_tree("listings").unwrap();

    let industry = Industry::new("Recycled Plastics", "plas_").unwrap();
    let listing = ListingDraft::new()
        .set_name("HDPE regrind")
        .set_company_name("Polyloop GmbH")
        .set_available_quantity(quantity)
        .set_minimum_order_quantity(1)
        .validate_and_finalise(&industry)
        .unwrap();
    tree.insert(listing.id.as_bytes(), minicbor::to_vec(&listing).unwrap())
        .unwrap();

    (InventoryLedger::new(tree), listing.id, temp_dir)
}

proptest! {
    /// Property: the pure clamping rule matches wide-integer arithmetic —
    /// subtract and set can never produce a value below zero, add never
    /// wraps.
    #[test]
    fn prop_apply_never_goes_negative(
        current in any::<u64>(),
        op in stock_op_strategy(),
        amount in any::<u64>(),
    ) {
        let result = op.apply(current, amount);

        let expected: i128 = match op {
            StockOp::Add => (current as i128 + amount as i128).min(u64::MAX as i128),
            StockOp::Subtract => (current as i128 - amount as i128).max(0),
            StockOp::Set => amount as i128,
        };

        prop_assert_eq!(result as i128, expected);
    }

    /// Property: the transition table admits exactly the documented moves —
    /// same-status reissue, one step forward, or cancellation from a
    /// non-terminal state.
    #[test]
    fn prop_transition_table_is_exactly_the_documented_one(
        from in status_strategy(),
        to in status_strategy(),
    ) {
        use RequestStatus::*;

        let forward = matches!(
            (from, to),
            (New, Reviewed) | (Reviewed, Confirmed) | (Confirmed, Dispatched) | (Dispatched, Completed)
        );
        let cancel = to == Cancelled && !from.is_terminal();
        let reissue = from == to;

        prop_assert_eq!(from.can_transition(to), forward || cancel || reissue);
    }

    /// Property: terminal states admit nothing but their own reissue.
    #[test]
    fn prop_terminal_states_are_stable(to in status_strategy()) {
        for terminal in [RequestStatus::Completed, RequestStatus::Cancelled] {
            prop_assert_eq!(terminal.can_transition(to), terminal == to);
        }
    }

    /// Property: statuses round-trip through their wire representation.
    #[test]
    fn prop_status_roundtrips_through_str(status in status_strategy()) {
        prop_assert_eq!(RequestStatus::parse(status.as_str()).unwrap(), status);
    }
}

proptest! {
    // sled-backed cases open a real database each, keep the count modest
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: for any interleaving of adjustments and deductions the
    /// stored quantity tracks the model exactly — deduct fails rather than
    /// clamps, adjust clamps rather than fails.
    #[test]
    fn prop_ledger_tracks_the_model(
        initial in 0u64..1_000,
        ops in prop::collection::vec(
            prop_oneof![
                (stock_op_strategy(), 0u64..1_000).prop_map(|(op, amount)| (Some(op), amount)),
                (0u64..1_000).prop_map(|amount| (None, amount)), // None = deduct
            ],
            1..12,
        ),
    ) {
        let (ledger, listing_id, _dir) = seeded_ledger(initial);
        let mut model = initial;

        for (op, amount) in ops {
            match op {
                Some(op) => {
                    let stored = ledger.adjust(&listing_id, op, amount).unwrap();
                    model = op.apply(model, amount);
                    prop_assert_eq!(stored, model);
                }
                None => {
                    let outcome = ledger.deduct(&listing_id, amount);
                    if model >= amount {
                        model -= amount;
                        prop_assert_eq!(outcome.unwrap(), model);
                    } else {
                        let err = outcome.unwrap_err();
                        let insufficient = err.downcast_ref::<InsufficientStock>().unwrap();
                        prop_assert_eq!(insufficient.available, model);
                        prop_assert_eq!(insufficient.requested, amount);
                    }
                }
            }
        }
    }
}
