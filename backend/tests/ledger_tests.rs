//! Stock ledger tests
//!
//! Tests for balance arithmetic including:
//! - Sign derivation from transaction types
//! - Available-stock guard on outbound entries
//! - Weighted-average cost updates on inbound entries
//! - Property: ledger entries reconcile with the running balance

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::calculations::ledger::{
    apply_transaction, reconciles, weighted_average_cost, BalanceState, LedgerError,
};
use shared::models::TransactionType;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn state(on_hand: &str, reserved: &str, cost: &str) -> BalanceState {
    BalanceState {
        quantity_on_hand: dec(on_hand),
        quantity_reserved: dec(reserved),
        average_cost: dec(cost),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Inbound types add, outbound types subtract
    #[test]
    fn test_transaction_sign_derivation() {
        let inbound = [
            TransactionType::Receive,
            TransactionType::TransferIn,
            TransactionType::AdjustUp,
        ];
        let outbound = [
            TransactionType::Issue,
            TransactionType::TransferOut,
            TransactionType::AdjustDown,
            TransactionType::Waste,
        ];

        for t in inbound {
            assert!(t.is_inbound());
            assert_eq!(t.sign(), Decimal::ONE);
        }
        for t in outbound {
            assert!(!t.is_inbound());
            assert_eq!(t.sign(), Decimal::NEGATIVE_ONE);
        }
    }

    /// Receiving onto an empty balance takes the incoming cost
    #[test]
    fn test_receive_onto_empty_balance() {
        let applied = apply_transaction(
            state("0", "0", "0"),
            TransactionType::Receive,
            dec("100"),
            dec("10"),
        )
        .unwrap();

        assert_eq!(applied.signed_quantity, dec("100"));
        assert_eq!(applied.new_on_hand, dec("100"));
        assert_eq!(applied.new_average_cost, dec("10"));
    }

    /// A second receipt moves the weighted average: (100×10 + 50×12) / 150
    #[test]
    fn test_weighted_average_on_second_receipt() {
        let applied = apply_transaction(
            state("100", "0", "10"),
            TransactionType::Receive,
            dec("50"),
            dec("12"),
        )
        .unwrap();

        assert_eq!(applied.new_on_hand, dec("150"));
        assert_eq!(applied.new_average_cost.round_dp(2), dec("10.67"));
    }

    /// Issues leave the average cost untouched
    #[test]
    fn test_issue_preserves_average_cost() {
        let applied = apply_transaction(
            state("150", "0", "10.67"),
            TransactionType::Issue,
            dec("40"),
            dec("0"),
        )
        .unwrap();

        assert_eq!(applied.signed_quantity, dec("-40"));
        assert_eq!(applied.new_on_hand, dec("110"));
        assert_eq!(applied.new_average_cost, dec("10.67"));
    }

    /// Outbound entries are capped by the available (unreserved) quantity
    #[test]
    fn test_insufficient_stock_respects_reservations() {
        let result = apply_transaction(
            state("100", "30", "10"),
            TransactionType::Issue,
            dec("80"),
            dec("0"),
        );

        assert_eq!(
            result,
            Err(LedgerError::InsufficientStock {
                requested: dec("80"),
                available: dec("70"),
            })
        );
    }

    /// ADJUST_DOWN is a physical correction: it answers to the on-hand
    /// quantity, shrinking the reservation along with the shelf count
    #[test]
    fn test_adjust_down_answers_to_on_hand_not_available() {
        let applied = apply_transaction(
            state("100", "60", "10"),
            TransactionType::AdjustDown,
            dec("50"),
            dec("0"),
        )
        .unwrap();

        assert_eq!(applied.new_on_hand, dec("50"));
        assert_eq!(applied.new_reserved, dec("50"));
    }

    /// ADJUST_DOWN still cannot drive the on-hand quantity negative
    #[test]
    fn test_adjust_down_capped_by_on_hand() {
        let result = apply_transaction(
            state("100", "60", "10"),
            TransactionType::AdjustDown,
            dec("120"),
            dec("0"),
        );

        assert_eq!(
            result,
            Err(LedgerError::InsufficientStock {
                requested: dec("120"),
                available: dec("100"),
            })
        );
    }

    /// Consumption leaves the reservation untouched when stock remains
    #[test]
    fn test_issue_preserves_reservation() {
        let applied = apply_transaction(
            state("100", "30", "10"),
            TransactionType::Issue,
            dec("50"),
            dec("0"),
        )
        .unwrap();
        assert_eq!(applied.new_reserved, dec("30"));
    }

    /// Each entry must apply to the balance the previous one produced;
    /// two first entries both applied to the empty state lose quantity
    #[test]
    fn test_entries_chain_through_latest_balance() {
        let empty = state("0", "0", "0");
        let first =
            apply_transaction(empty, TransactionType::Receive, dec("100"), dec("10")).unwrap();
        let next = BalanceState {
            quantity_on_hand: first.new_on_hand,
            quantity_reserved: first.new_reserved,
            average_cost: first.new_average_cost,
        };
        let second =
            apply_transaction(next, TransactionType::Receive, dec("40"), dec("10")).unwrap();
        assert!(reconciles(
            &[first.signed_quantity, second.signed_quantity],
            second.new_on_hand
        ));

        // Applied against the stale empty state instead, the resulting
        // balance forgets the first entry and reconciliation breaks.
        let stale =
            apply_transaction(empty, TransactionType::Receive, dec("40"), dec("10")).unwrap();
        assert!(!reconciles(
            &[first.signed_quantity, stale.signed_quantity],
            stale.new_on_hand
        ));
    }

    /// Issuing exactly the available quantity succeeds
    #[test]
    fn test_issue_entire_available_quantity() {
        let applied = apply_transaction(
            state("100", "30", "10"),
            TransactionType::Issue,
            dec("70"),
            dec("0"),
        )
        .unwrap();
        assert_eq!(applied.new_on_hand, dec("30"));
    }

    /// Zero and negative quantities are rejected
    #[test]
    fn test_non_positive_quantity_rejected() {
        for qty in ["0", "-5"] {
            let result = apply_transaction(
                state("100", "0", "10"),
                TransactionType::Receive,
                dec(qty),
                dec("10"),
            );
            assert_eq!(result, Err(LedgerError::NonPositiveQuantity(dec(qty))));
        }
    }

    /// Negative unit cost is rejected
    #[test]
    fn test_negative_unit_cost_rejected() {
        let result = apply_transaction(
            state("100", "0", "10"),
            TransactionType::Receive,
            dec("10"),
            dec("-1"),
        );
        assert_eq!(result, Err(LedgerError::NegativeUnitCost(dec("-1"))));
    }

    /// A balance driven to zero carries no cost weight into the next receipt
    #[test]
    fn test_average_cost_reset_after_zero_balance() {
        let cost = weighted_average_cost(dec("0"), dec("10"), dec("50"), dec("20"));
        assert_eq!(cost, dec("20"));
    }

    /// Reconciliation: signed entries sum to the on-hand quantity
    #[test]
    fn test_reconciliation_check() {
        let entries = [dec("100"), dec("-40"), dec("50"), dec("-10")];
        assert!(reconciles(&entries, dec("100")));
        assert!(!reconciles(&entries, dec("99")));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Receive(u32, u32),
        Issue(u32),
    }

    fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
        prop::collection::vec(
            prop_oneof![
                (1u32..500, 1u32..100).prop_map(|(q, c)| Op::Receive(q, c)),
                (1u32..500).prop_map(Op::Issue),
            ],
            1..40,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Applied entries always reconcile and never drive stock negative
        #[test]
        fn prop_ledger_reconciles_and_stays_non_negative(ops in arb_ops()) {
            let mut state = BalanceState {
                quantity_on_hand: Decimal::ZERO,
                quantity_reserved: Decimal::ZERO,
                average_cost: Decimal::ZERO,
            };
            let mut entries = Vec::new();

            for op in ops {
                let (transaction_type, qty, cost) = match op {
                    Op::Receive(q, c) => (TransactionType::Receive, Decimal::from(q), Decimal::from(c)),
                    Op::Issue(q) => (TransactionType::Issue, Decimal::from(q), Decimal::ZERO),
                };
                match apply_transaction(state, transaction_type, qty, cost) {
                    Ok(applied) => {
                        entries.push(applied.signed_quantity);
                        state.quantity_on_hand = applied.new_on_hand;
                        state.quantity_reserved = applied.new_reserved;
                        state.average_cost = applied.new_average_cost;
                    }
                    Err(LedgerError::InsufficientStock { .. }) => {
                        // Rejected entries must leave the balance untouched.
                    }
                    Err(e) => return Err(TestCaseError::fail(format!("unexpected error: {e}"))),
                }

                prop_assert!(state.quantity_on_hand >= Decimal::ZERO);
                prop_assert!(reconciles(&entries, state.quantity_on_hand));
            }
        }

        /// The weighted average stays between the carried and incoming costs
        #[test]
        fn prop_weighted_average_within_bounds(
            on_hand in 1u32..1000,
            current in 1u32..100,
            incoming_qty in 1u32..1000,
            incoming_cost in 1u32..100,
        ) {
            let cost = weighted_average_cost(
                Decimal::from(on_hand),
                Decimal::from(current),
                Decimal::from(incoming_qty),
                Decimal::from(incoming_cost),
            );
            let low = Decimal::from(current.min(incoming_cost));
            let high = Decimal::from(current.max(incoming_cost));
            prop_assert!(cost >= low && cost <= high);
        }
    }
}
