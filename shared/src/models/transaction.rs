//! Append-only inventory ledger models

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Money;

/// One immutable ledger entry.
///
/// `quantity` is stored signed: positive for inbound types, negative for
/// outbound. The signed sum of all entries for an item/location equals the
/// balance's `quantity_on_hand` at all times; `balance_after` snapshots the
/// on-hand quantity immediately after this entry was applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub transaction_number: String,
    pub item_id: Uuid,
    pub location: String,
    pub transaction_type: TransactionType,
    pub quantity: Decimal,
    pub unit_cost: Money,
    pub balance_after: Decimal,
    pub reference_number: Option<String>,
    pub reference_type: Option<String>,
    pub batch_number: Option<String>,
    pub lot_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub performed_by: String,
    pub transaction_date: DateTime<Utc>,
}

/// Ledger transaction types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Receive,
    Issue,
    TransferIn,
    TransferOut,
    AdjustUp,
    AdjustDown,
    Waste,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Receive => "RECEIVE",
            TransactionType::Issue => "ISSUE",
            TransactionType::TransferIn => "TRANSFER_IN",
            TransactionType::TransferOut => "TRANSFER_OUT",
            TransactionType::AdjustUp => "ADJUST_UP",
            TransactionType::AdjustDown => "ADJUST_DOWN",
            TransactionType::Waste => "WASTE",
        }
    }

    /// Whether this type adds stock to the location.
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            TransactionType::Receive | TransactionType::TransferIn | TransactionType::AdjustUp
        )
    }

    /// Sign applied to the quantity magnitude when writing the ledger.
    pub fn sign(&self) -> Decimal {
        if self.is_inbound() {
            Decimal::ONE
        } else {
            Decimal::NEGATIVE_ONE
        }
    }

    /// Types counted as consumption by analytics (usage, forecasting).
    pub fn is_consumption(&self) -> bool {
        matches!(
            self,
            TransactionType::Issue | TransactionType::TransferOut | TransactionType::Waste
        )
    }
}

impl FromStr for TransactionType {
    type Err = super::UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIVE" => Ok(TransactionType::Receive),
            "ISSUE" => Ok(TransactionType::Issue),
            "TRANSFER_IN" => Ok(TransactionType::TransferIn),
            "TRANSFER_OUT" => Ok(TransactionType::TransferOut),
            "ADJUST_UP" => Ok(TransactionType::AdjustUp),
            "ADJUST_DOWN" => Ok(TransactionType::AdjustDown),
            "WASTE" => Ok(TransactionType::Waste),
            other => Err(super::UnknownEnumValue::new("transaction_type", other)),
        }
    }
}
