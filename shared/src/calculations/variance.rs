//! Count variance arithmetic and finalization aggregation.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    CountItemStatus, PhysicalCountItem, RootCauseBreakdown, SignificantVariance, VarianceAnalysis,
    VarianceSide,
};
use crate::types::Money;

/// Variance above which an item line is marked `variance` (percent)
pub const VARIANCE_TOLERANCE_PCT: f64 = 5.0;
/// Variance above which a recount is mandatory (percent)
pub const RECOUNT_THRESHOLD_PCT: f64 = 10.0;
/// Variance above which an investigation is triggered (percent)
pub const INVESTIGATION_THRESHOLD_PCT: f64 = 20.0;

/// Signed variance percentage of counted against expected quantity.
///
/// A count against a zero expectation reports 100% when anything was
/// found and 0% otherwise.
pub fn variance_percentage(expected: Decimal, counted: Decimal) -> f64 {
    if expected > Decimal::ZERO {
        ((counted - expected) / expected * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or(0.0)
    } else if counted > Decimal::ZERO {
        100.0
    } else {
        0.0
    }
}

/// Item status implied by a recorded variance percentage.
pub fn status_for_variance(variance_pct: f64) -> CountItemStatus {
    let magnitude = variance_pct.abs();
    if magnitude > INVESTIGATION_THRESHOLD_PCT {
        CountItemStatus::Investigation
    } else if magnitude > RECOUNT_THRESHOLD_PCT {
        CountItemStatus::RecountRequired
    } else if magnitude > VARIANCE_TOLERANCE_PCT {
        CountItemStatus::Variance
    } else {
        CountItemStatus::Counted
    }
}

/// Aggregate a finalizing count's item lines into a variance picture.
///
/// Only items with a recorded count participate; the caller has already
/// verified that none are missing.
pub fn analyze(count_id: Uuid, items: &[PhysicalCountItem], currency: &str) -> VarianceAnalysis {
    let counted: Vec<&PhysicalCountItem> =
        items.iter().filter(|i| i.counted_quantity.is_some()).collect();
    let with_variance: Vec<&PhysicalCountItem> = counted
        .iter()
        .copied()
        .filter(|i| i.variance_quantity != Decimal::ZERO)
        .collect();

    let total_variance_value: Decimal = with_variance
        .iter()
        .map(|i| i.variance_value.amount.abs())
        .sum();

    let positive: Vec<&PhysicalCountItem> = with_variance
        .iter()
        .copied()
        .filter(|i| i.variance_quantity > Decimal::ZERO)
        .collect();
    let negative_count = with_variance.len() - positive.len();
    let positive_value: Decimal = positive.iter().map(|i| i.variance_value.amount.abs()).sum();
    let negative_value = total_variance_value - positive_value;

    let significant_variances: Vec<SignificantVariance> = with_variance
        .iter()
        .filter(|i| i.variance_percentage.abs() > RECOUNT_THRESHOLD_PCT)
        .map(|i| SignificantVariance {
            item_id: i.item_id,
            expected_quantity: i.expected_quantity,
            counted_quantity: i.counted_quantity.unwrap_or(Decimal::ZERO),
            variance_quantity: i.variance_quantity,
            variance_percentage: i.variance_percentage,
            variance_value: i.variance_value.clone(),
            reason_code: i.reason_code.clone(),
            investigation_required: i.variance_percentage.abs() > INVESTIGATION_THRESHOLD_PCT,
        })
        .collect();

    let mut root_causes = RootCauseBreakdown::default();
    for item in with_variance.iter() {
        match item.reason_code.as_deref() {
            Some("system_error") => root_causes.system_errors += 1,
            Some("processing_error") => root_causes.processing_errors += 1,
            Some("damaged_goods") => root_causes.damaged_goods += 1,
            Some("theft") => root_causes.theft += 1,
            Some("counting_error") => root_causes.counting_errors += 1,
            _ => root_causes.other += 1,
        }
    }

    let variance_rate = if counted.is_empty() {
        0.0
    } else {
        with_variance.len() as f64 / counted.len() as f64 * 100.0
    };

    VarianceAnalysis {
        count_id,
        total_items_counted: counted.len() as u32,
        items_with_variance: with_variance.len() as u32,
        variance_rate,
        total_variance_value: Money::new(total_variance_value, currency),
        positive_variance: VarianceSide {
            items: positive.len() as u32,
            value: Money::new(positive_value, currency),
        },
        negative_variance: VarianceSide {
            items: negative_count as u32,
            value: Money::new(negative_value, currency),
        },
        significant_variances,
        root_causes,
    }
}
