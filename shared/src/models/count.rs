//! Physical count, spot check, and adjustment models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Money;

/// A count session over a planned set of items at one location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalCount {
    pub id: Uuid,
    pub count_number: String,
    pub count_type: CountType,
    pub location: String,
    pub status: CountStatus,
    pub total_items: u32,
    pub counted_items: u32,
    pub items_with_variance: u32,
    pub total_variance_value: Money,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: String,
    pub finalized_by: Option<String>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CountType {
    Full,
    Cycle,
    Spot,
}

impl CountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountType::Full => "full",
            CountType::Cycle => "cycle",
            CountType::Spot => "spot",
        }
    }

    /// Prefix used when generating count numbers (FC-, CC-, SC-).
    pub fn number_prefix(&self) -> &'static str {
        match self {
            CountType::Full => "FC",
            CountType::Cycle => "CC",
            CountType::Spot => "SC",
        }
    }
}

impl FromStr for CountType {
    type Err = super::UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(CountType::Full),
            "cycle" => Ok(CountType::Cycle),
            "spot" => Ok(CountType::Spot),
            other => Err(super::UnknownEnumValue::new("count_type", other)),
        }
    }
}

/// Count session lifecycle. Finalization is one-way.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CountStatus {
    Planning,
    Counting,
    Counted,
    Variance,
    Finalized,
    Cancelled,
}

impl CountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountStatus::Planning => "planning",
            CountStatus::Counting => "counting",
            CountStatus::Counted => "counted",
            CountStatus::Variance => "variance",
            CountStatus::Finalized => "finalized",
            CountStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the session still accepts item updates.
    pub fn accepts_updates(&self) -> bool {
        matches!(
            self,
            CountStatus::Planning | CountStatus::Counting | CountStatus::Counted | CountStatus::Variance
        )
    }
}

impl FromStr for CountStatus {
    type Err = super::UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(CountStatus::Planning),
            "counting" => Ok(CountStatus::Counting),
            "counted" => Ok(CountStatus::Counted),
            "variance" => Ok(CountStatus::Variance),
            "finalized" => Ok(CountStatus::Finalized),
            "cancelled" => Ok(CountStatus::Cancelled),
            other => Err(super::UnknownEnumValue::new("count_status", other)),
        }
    }
}

/// One item line of a count session.
///
/// `expected_quantity` is snapshotted from the balance when the session is
/// created; variance fields are filled in as counts are recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalCountItem {
    pub id: Uuid,
    pub count_id: Uuid,
    pub item_id: Uuid,
    pub expected_quantity: Decimal,
    pub counted_quantity: Option<Decimal>,
    pub variance_quantity: Decimal,
    pub variance_percentage: f64,
    pub variance_value: Money,
    pub status: CountItemStatus,
    pub reason_code: Option<String>,
    pub notes: Option<String>,
    pub counted_by: Option<String>,
    pub counted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CountItemStatus {
    Pending,
    Counted,
    Variance,
    RecountRequired,
    Investigation,
}

impl CountItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountItemStatus::Pending => "pending",
            CountItemStatus::Counted => "counted",
            CountItemStatus::Variance => "variance",
            CountItemStatus::RecountRequired => "recount_required",
            CountItemStatus::Investigation => "investigation",
        }
    }
}

impl FromStr for CountItemStatus {
    type Err = super::UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CountItemStatus::Pending),
            "counted" => Ok(CountItemStatus::Counted),
            "variance" => Ok(CountItemStatus::Variance),
            "recount_required" => Ok(CountItemStatus::RecountRequired),
            "investigation" => Ok(CountItemStatus::Investigation),
            other => Err(super::UnknownEnumValue::new("count_item_status", other)),
        }
    }
}

/// Aggregated variance picture produced at finalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceAnalysis {
    pub count_id: Uuid,
    pub total_items_counted: u32,
    pub items_with_variance: u32,
    /// Percentage of counted items that show any variance
    pub variance_rate: f64,
    pub total_variance_value: Money,
    pub positive_variance: VarianceSide,
    pub negative_variance: VarianceSide,
    pub significant_variances: Vec<SignificantVariance>,
    pub root_causes: RootCauseBreakdown,
}

/// One sign's share of the variance picture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceSide {
    pub items: u32,
    pub value: Money,
}

/// A count line whose variance exceeds the significance threshold (10%)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignificantVariance {
    pub item_id: Uuid,
    pub expected_quantity: Decimal,
    pub counted_quantity: Decimal,
    pub variance_quantity: Decimal,
    pub variance_percentage: f64,
    pub variance_value: Money,
    pub reason_code: Option<String>,
    pub investigation_required: bool,
}

/// Variance lines bucketed by recorded reason code
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootCauseBreakdown {
    pub system_errors: u32,
    pub processing_errors: u32,
    pub damaged_goods: u32,
    pub theft: u32,
    pub counting_errors: u32,
    pub other: u32,
}

/// A pending or approved stock correction generated from count variances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryAdjustment {
    pub id: Uuid,
    pub adjustment_number: String,
    pub count_id: Option<Uuid>,
    pub location: String,
    pub status: AdjustmentStatus,
    pub total_items: u32,
    pub total_value: Money,
    pub description: Option<String>,
    pub requested_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentStatus {
    Pending,
    Approved,
    Rejected,
}

impl AdjustmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentStatus::Pending => "pending",
            AdjustmentStatus::Approved => "approved",
            AdjustmentStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for AdjustmentStatus {
    type Err = super::UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AdjustmentStatus::Pending),
            "approved" => Ok(AdjustmentStatus::Approved),
            "rejected" => Ok(AdjustmentStatus::Rejected),
            other => Err(super::UnknownEnumValue::new("adjustment_status", other)),
        }
    }
}
