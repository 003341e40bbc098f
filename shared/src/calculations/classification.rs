//! ABC classification and reorder-suggestion arithmetic.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::AbcClass;

/// Per-item consumption input to the ABC walk
#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub item_id: Uuid,
    /// Sum of absolute consumption quantities over the trailing 12 months
    pub annual_usage: Decimal,
    /// `annual_usage × average transaction cost`
    pub annual_value: Decimal,
}

/// One row of the classification result, in descending value order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbcResult {
    pub item_id: Uuid,
    pub annual_usage: Decimal,
    pub annual_value: Decimal,
    pub value_percentage: f64,
    pub cumulative_percentage: f64,
    pub class: AbcClass,
    pub recommended_reorder_level: Decimal,
    pub recommended_max_level: Decimal,
}

/// Sort by annual value descending and walk the cumulative percentage:
/// class A while ≤ 80, B while ≤ 95, C otherwise. Recommended levels
/// scale daily usage by class-specific day counts.
pub fn classify_abc(mut records: Vec<UsageRecord>) -> Vec<AbcResult> {
    records.sort_by(|a, b| b.annual_value.cmp(&a.annual_value));

    let total_value: Decimal = records.iter().map(|r| r.annual_value).sum();
    let mut cumulative = Decimal::ZERO;
    let mut results = Vec::with_capacity(records.len());

    for record in records {
        cumulative += record.annual_value;
        let value_pct = percentage(record.annual_value, total_value);
        let cumulative_pct = percentage(cumulative, total_value);
        let class = if cumulative_pct <= 80.0 {
            AbcClass::A
        } else if cumulative_pct <= 95.0 {
            AbcClass::B
        } else {
            AbcClass::C
        };

        let daily_usage = record.annual_usage / Decimal::from(365);
        let (reorder_days, max_days) = class_level_days(class);
        results.push(AbcResult {
            item_id: record.item_id,
            annual_usage: record.annual_usage,
            annual_value: record.annual_value,
            value_percentage: value_pct,
            cumulative_percentage: cumulative_pct,
            class,
            recommended_reorder_level: (daily_usage * Decimal::from(reorder_days)).ceil(),
            recommended_max_level: (daily_usage * Decimal::from(max_days)).ceil(),
        });
    }

    results
}

/// Days of cover backing the recommended reorder/max levels per class
pub fn class_level_days(class: AbcClass) -> (u32, u32) {
    match class {
        AbcClass::A => (7, 30),
        AbcClass::B => (14, 45),
        AbcClass::C => (30, 90),
    }
}

fn percentage(part: Decimal, total: Decimal) -> f64 {
    if total <= Decimal::ZERO {
        return 0.0;
    }
    (part / total * Decimal::ONE_HUNDRED)
        .to_f64()
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn score(&self) -> u8 {
        match self {
            Urgency::Critical => 4,
            Urgency::High => 3,
            Urgency::Medium => 2,
            Urgency::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "critical",
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BusinessImpact {
    Minimal,
    Moderate,
    Significant,
    Critical,
}

impl BusinessImpact {
    pub fn score(&self) -> u8 {
        match self {
            BusinessImpact::Critical => 4,
            BusinessImpact::Significant => 3,
            BusinessImpact::Moderate => 2,
            BusinessImpact::Minimal => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessImpact::Critical => "critical",
            BusinessImpact::Significant => "significant",
            BusinessImpact::Moderate => "moderate",
            BusinessImpact::Minimal => "minimal",
        }
    }
}

/// Inputs for one reorder suggestion
#[derive(Debug, Clone)]
pub struct ReorderInput {
    pub item_id: Uuid,
    pub current_stock: Decimal,
    /// Average daily consumption over the trailing 90 days
    pub avg_daily_usage: Decimal,
    pub lead_time_days: i32,
    pub reorder_quantity: Decimal,
}

/// A ranked replenishment suggestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderSuggestion {
    pub item_id: Uuid,
    pub current_stock: Decimal,
    pub avg_daily_usage: Decimal,
    pub days_of_stock: f64,
    pub urgency: Urgency,
    pub business_impact: BusinessImpact,
    pub safety_stock: Decimal,
    pub recommended_order_quantity: Decimal,
    pub estimated_stockout_date: Option<NaiveDate>,
}

/// Days of cover treated as effectively unlimited when usage is zero.
const NO_USAGE_DAYS_OF_STOCK: f64 = f64::INFINITY;

/// Build one suggestion from current stock and trailing usage.
///
/// `days_of_stock` is infinite for items with no usage; such items rank
/// lowest. `recommended_order_quantity` never drops below zero and never
/// below the item's configured reorder quantity.
pub fn build_suggestion(input: &ReorderInput, today: NaiveDate) -> ReorderSuggestion {
    let days_of_stock = if input.avg_daily_usage > Decimal::ZERO {
        (input.current_stock / input.avg_daily_usage)
            .to_f64()
            .unwrap_or(NO_USAGE_DAYS_OF_STOCK)
    } else {
        NO_USAGE_DAYS_OF_STOCK
    };

    let urgency = if days_of_stock <= 3.0 {
        Urgency::Critical
    } else if days_of_stock <= 7.0 {
        Urgency::High
    } else if days_of_stock <= 14.0 {
        Urgency::Medium
    } else {
        Urgency::Low
    };

    let business_impact = if days_of_stock <= 1.0 {
        BusinessImpact::Critical
    } else if days_of_stock <= 3.0 {
        BusinessImpact::Significant
    } else if days_of_stock <= 7.0 {
        BusinessImpact::Moderate
    } else {
        BusinessImpact::Minimal
    };

    let lead_time = Decimal::from(input.lead_time_days.max(0));
    let safety_stock = input.avg_daily_usage * lead_time * Decimal::new(5, 1);
    let lead_time_demand = input.avg_daily_usage * lead_time;
    let shortfall = (lead_time_demand + safety_stock - input.current_stock).max(Decimal::ZERO);
    let recommended_order_quantity = input.reorder_quantity.max(shortfall);

    let estimated_stockout_date = if days_of_stock.is_finite() {
        today.checked_add_days(chrono::Days::new(days_of_stock.floor().max(0.0) as u64))
    } else {
        None
    };

    ReorderSuggestion {
        item_id: input.item_id,
        current_stock: input.current_stock,
        avg_daily_usage: input.avg_daily_usage,
        days_of_stock,
        urgency,
        business_impact,
        safety_stock,
        recommended_order_quantity,
        estimated_stockout_date,
    }
}

/// Sort suggestions by combined urgency + impact score, most pressing first.
pub fn rank_suggestions(suggestions: &mut [ReorderSuggestion]) {
    suggestions.sort_by(|a, b| {
        let score_a = a.urgency.score() + a.business_impact.score();
        let score_b = b.urgency.score() + b.business_impact.score();
        score_b
            .cmp(&score_a)
            .then_with(|| a.days_of_stock.partial_cmp(&b.days_of_stock).unwrap_or(std::cmp::Ordering::Equal))
    });
}
