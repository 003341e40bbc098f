//! Unit-cost selection under the supported costing methods.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::CostingMethod;

/// One receipt drawn from the ledger's inbound history, oldest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptLayer {
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub received_at: DateTime<Utc>,
}

/// Unit cost for an item under `method`, given its receipt history.
///
/// `receipts` must be sorted by `received_at` ascending and restricted to
/// the as-of date by the caller. `total_issued` is the cumulative outbound
/// magnitude over the same window, used by FIFO to find the earliest
/// receipt not yet fully consumed. With no receipts on file every
/// history-based method falls back to the standard cost.
pub fn unit_cost_by_method(
    method: CostingMethod,
    receipts: &[ReceiptLayer],
    total_issued: Decimal,
    standard_cost: Decimal,
) -> Decimal {
    if method == CostingMethod::StandardCost {
        return standard_cost;
    }
    if receipts.is_empty() {
        return standard_cost;
    }

    match method {
        CostingMethod::Fifo => fifo_cost(receipts, total_issued),
        CostingMethod::Lifo => receipts[receipts.len() - 1].unit_cost,
        CostingMethod::WeightedAverage | CostingMethod::MovingAverage => {
            weighted_average(receipts)
        }
        CostingMethod::StandardCost => standard_cost,
    }
}

fn fifo_cost(receipts: &[ReceiptLayer], total_issued: Decimal) -> Decimal {
    let mut remaining_issued = total_issued.max(Decimal::ZERO);
    for layer in receipts {
        if remaining_issued < layer.quantity {
            return layer.unit_cost;
        }
        remaining_issued -= layer.quantity;
    }
    // Every layer consumed; remaining stock (if any) carries the latest cost.
    receipts[receipts.len() - 1].unit_cost
}

fn weighted_average(receipts: &[ReceiptLayer]) -> Decimal {
    let total_qty: Decimal = receipts.iter().map(|r| r.quantity).sum();
    if total_qty <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let total_value: Decimal = receipts.iter().map(|r| r.quantity * r.unit_cost).sum();
    total_value / total_qty
}
