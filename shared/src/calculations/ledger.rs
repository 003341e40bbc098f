//! Pure balance arithmetic for the stock ledger.
//!
//! The persistence layer locks the balance row and delegates here, so the
//! quantity and cost rules stay testable without a database.

use rust_decimal::Decimal;

use crate::models::TransactionType;

/// Balance-level failure applying a ledger entry
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
    },
    #[error("transaction quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),
    #[error("unit cost cannot be negative, got {0}")]
    NegativeUnitCost(Decimal),
}

/// The quantity/cost state of a balance before an entry is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceState {
    pub quantity_on_hand: Decimal,
    pub quantity_reserved: Decimal,
    pub average_cost: Decimal,
}

impl BalanceState {
    pub fn quantity_available(&self) -> Decimal {
        self.quantity_on_hand - self.quantity_reserved
    }
}

/// The effect of one validated ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedEntry {
    /// Quantity with the type's sign applied, as stored on the ledger row
    pub signed_quantity: Decimal,
    pub new_on_hand: Decimal,
    /// Reserved quantity clamped to the new on-hand, so the available
    /// quantity never goes negative
    pub new_reserved: Decimal,
    pub new_average_cost: Decimal,
}

/// Validate and apply one transaction to a balance state.
///
/// `quantity` is the positive magnitude; the sign comes from the type.
/// Consumption entries must not eat into reserved stock; ADJUST_DOWN is a
/// physical correction and answers only to what is on the shelf, shrinking
/// the reservation along with it when necessary. The average cost moves as
/// a running weighted average on inbound entries and is left untouched on
/// outbound ones.
pub fn apply_transaction(
    state: BalanceState,
    transaction_type: TransactionType,
    quantity: Decimal,
    unit_cost: Decimal,
) -> Result<AppliedEntry, LedgerError> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveQuantity(quantity));
    }
    if unit_cost < Decimal::ZERO {
        return Err(LedgerError::NegativeUnitCost(unit_cost));
    }

    let signed_quantity = transaction_type.sign() * quantity;

    if !transaction_type.is_inbound() {
        let ceiling = if transaction_type == TransactionType::AdjustDown {
            state.quantity_on_hand
        } else {
            state.quantity_available()
        };
        if quantity > ceiling {
            return Err(LedgerError::InsufficientStock {
                requested: quantity,
                available: ceiling,
            });
        }
    }

    let new_on_hand = state.quantity_on_hand + signed_quantity;
    let new_reserved = state.quantity_reserved.min(new_on_hand);
    let new_average_cost = if transaction_type.is_inbound() {
        weighted_average_cost(
            state.quantity_on_hand,
            state.average_cost,
            quantity,
            unit_cost,
        )
    } else {
        state.average_cost
    };

    Ok(AppliedEntry {
        signed_quantity,
        new_on_hand,
        new_reserved,
        new_average_cost,
    })
}

/// Running weighted-average cost after receiving `incoming_qty` at
/// `incoming_cost` on top of `on_hand` units carried at `current_cost`.
pub fn weighted_average_cost(
    on_hand: Decimal,
    current_cost: Decimal,
    incoming_qty: Decimal,
    incoming_cost: Decimal,
) -> Decimal {
    let total_qty = on_hand + incoming_qty;
    if total_qty <= Decimal::ZERO {
        return incoming_cost;
    }
    // A balance driven to zero carries no cost weight forward.
    let carried = on_hand.max(Decimal::ZERO);
    (carried * current_cost + incoming_qty * incoming_cost) / (carried + incoming_qty)
}

/// Reconciliation check: the signed sum of ledger entries for an
/// item/location must equal its current on-hand quantity.
pub fn reconciles(signed_quantities: &[Decimal], quantity_on_hand: Decimal) -> bool {
    let sum: Decimal = signed_quantities.iter().copied().sum();
    sum == quantity_on_hand
}
