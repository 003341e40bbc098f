//! Dead and slow-moving stock assessment from real movement history.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ObsolescenceRisk {
    Low,
    Medium,
    High,
    Obsolete,
}

impl ObsolescenceRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObsolescenceRisk::Low => "low",
            ObsolescenceRisk::Medium => "medium",
            ObsolescenceRisk::High => "high",
            ObsolescenceRisk::Obsolete => "obsolete",
        }
    }
}

/// Inputs derived from the ledger for one item/location
#[derive(Debug, Clone)]
pub struct DeadStockInput {
    pub item_id: Uuid,
    pub current_stock: Decimal,
    pub stock_value: Decimal,
    pub last_movement_date: Option<NaiveDate>,
    /// Average monthly consumption over the trailing 12 months
    pub avg_monthly_usage: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadStockAssessment {
    pub item_id: Uuid,
    pub current_stock: Decimal,
    pub stock_value: Decimal,
    pub days_since_last_movement: Option<i64>,
    /// Months of cover at the trailing usage rate; `None` when usage is zero
    pub months_of_stock: Option<f64>,
    pub risk: ObsolescenceRisk,
    pub recommended_action: &'static str,
}

/// Assess one item from days-without-movement and months of cover.
///
/// Risk escalates at 90/180/365 days without movement or 6/12/24 months
/// of cover, whichever is worse. Items that never moved are treated as
/// obsolete candidates.
pub fn assess(input: &DeadStockInput, today: NaiveDate) -> DeadStockAssessment {
    let days_since = input
        .last_movement_date
        .map(|d| (today - d).num_days());

    let months_of_stock = if input.avg_monthly_usage > Decimal::ZERO {
        (input.current_stock / input.avg_monthly_usage).to_f64()
    } else {
        None
    };

    let day_risk = match days_since {
        None => ObsolescenceRisk::Obsolete,
        Some(d) if d >= 365 => ObsolescenceRisk::Obsolete,
        Some(d) if d >= 180 => ObsolescenceRisk::High,
        Some(d) if d >= 90 => ObsolescenceRisk::Medium,
        Some(_) => ObsolescenceRisk::Low,
    };
    let cover_risk = match months_of_stock {
        None => ObsolescenceRisk::Medium,
        Some(m) if m >= 24.0 => ObsolescenceRisk::Obsolete,
        Some(m) if m >= 12.0 => ObsolescenceRisk::High,
        Some(m) if m >= 6.0 => ObsolescenceRisk::Medium,
        Some(_) => ObsolescenceRisk::Low,
    };
    let risk = day_risk.max(cover_risk);

    let recommended_action = match risk {
        ObsolescenceRisk::Obsolete => "write_off_or_dispose",
        ObsolescenceRisk::High => "discount_or_return_to_vendor",
        ObsolescenceRisk::Medium => "stop_replenishment",
        ObsolescenceRisk::Low => "monitor",
    };

    DeadStockAssessment {
        item_id: input.item_id,
        current_stock: input.current_stock,
        stock_value: input.stock_value,
        days_since_last_movement: days_since,
        months_of_stock,
        risk,
        recommended_action,
    }
}
