//! Stock balance models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Money;

/// Current stock position for one item at one location.
///
/// `quantity_available` is always `quantity_on_hand - quantity_reserved`;
/// all three quantities stay non-negative. Balances are created on the
/// first transaction for an item/location pair and only ever zeroed,
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockBalance {
    pub id: Uuid,
    pub item_id: Uuid,
    pub location: String,
    pub quantity_on_hand: Decimal,
    pub quantity_reserved: Decimal,
    pub quantity_available: Decimal,
    pub average_cost: Money,
    pub last_movement_date: Option<DateTime<Utc>>,
    pub last_count_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl StockBalance {
    /// Recompute the derived available quantity.
    pub fn recompute_available(&mut self) {
        self.quantity_available = self.quantity_on_hand - self.quantity_reserved;
    }

    pub fn total_value(&self) -> Money {
        Money::new(
            self.quantity_on_hand * self.average_cost.amount,
            self.average_cost.currency.clone(),
        )
    }
}

/// Stock health band reported by the enhanced status view
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockHealth {
    OutOfStock,
    BelowMinimum,
    BelowReorderPoint,
    Normal,
    Overstocked,
}

impl StockHealth {
    /// Classify a balance against the item's thresholds.
    pub fn classify(
        on_hand: Decimal,
        minimum: Decimal,
        reorder_point: Decimal,
        maximum: Option<Decimal>,
    ) -> Self {
        if on_hand <= Decimal::ZERO {
            StockHealth::OutOfStock
        } else if on_hand < minimum {
            StockHealth::BelowMinimum
        } else if on_hand <= reorder_point {
            StockHealth::BelowReorderPoint
        } else if maximum.map_or(false, |max| on_hand > max) {
            StockHealth::Overstocked
        } else {
            StockHealth::Normal
        }
    }
}
