//! Item master models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Money;

/// An item in the procurement item master.
///
/// Identity fields (`item_code`, `item_name`) are immutable once created;
/// thresholds are maintained by procurement staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub item_code: String,
    pub item_name: String,
    pub category: Option<String>,
    pub unit_of_measure: String,
    /// Reference cost used by the STANDARD_COST method
    pub standard_cost: Money,
    pub costing_method: CostingMethod,
    pub reorder_point: Decimal,
    pub reorder_quantity: Decimal,
    pub lead_time_days: i32,
    pub minimum_quantity: Decimal,
    pub maximum_quantity: Option<Decimal>,
    pub abc_class: Option<AbcClass>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Costing methods the valuation engine supports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostingMethod {
    Fifo,
    Lifo,
    WeightedAverage,
    MovingAverage,
    StandardCost,
}

impl CostingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostingMethod::Fifo => "FIFO",
            CostingMethod::Lifo => "LIFO",
            CostingMethod::WeightedAverage => "WEIGHTED_AVERAGE",
            CostingMethod::MovingAverage => "MOVING_AVERAGE",
            CostingMethod::StandardCost => "STANDARD_COST",
        }
    }
}

/// Unknown costing-method token
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("unsupported costing method: {0}")]
pub struct UnsupportedCostingMethod(pub String);

impl FromStr for CostingMethod {
    type Err = UnsupportedCostingMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FIFO" => Ok(CostingMethod::Fifo),
            "LIFO" => Ok(CostingMethod::Lifo),
            "WEIGHTED_AVERAGE" => Ok(CostingMethod::WeightedAverage),
            "MOVING_AVERAGE" => Ok(CostingMethod::MovingAverage),
            "STANDARD_COST" => Ok(CostingMethod::StandardCost),
            other => Err(UnsupportedCostingMethod(other.to_string())),
        }
    }
}

/// ABC value tier assigned by the classification engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl AbcClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbcClass::A => "A",
            AbcClass::B => "B",
            AbcClass::C => "C",
        }
    }
}

impl FromStr for AbcClass {
    type Err = super::UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(AbcClass::A),
            "B" => Ok(AbcClass::B),
            "C" => Ok(AbcClass::C),
            other => Err(super::UnknownEnumValue::new("abc_class", other)),
        }
    }
}
