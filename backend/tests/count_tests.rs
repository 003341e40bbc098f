//! Physical count tests
//!
//! Tests for count reconciliation including:
//! - Variance percentage edge cases (zero expectation)
//! - Item status thresholds at 5 / 10 / 20 percent
//! - Finalization variance aggregation and root-cause buckets
//! - Count session status machine

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::calculations::variance::{
    analyze, status_for_variance, variance_percentage, INVESTIGATION_THRESHOLD_PCT,
    RECOUNT_THRESHOLD_PCT, VARIANCE_TOLERANCE_PCT,
};
use shared::models::{CountItemStatus, CountStatus, CountType, PhysicalCountItem};
use shared::types::Money;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn count_item(expected: &str, counted: Option<&str>, reason: Option<&str>) -> PhysicalCountItem {
    let expected = dec(expected);
    let counted_qty = counted.map(dec);
    let variance = counted_qty.map(|c| c - expected).unwrap_or(Decimal::ZERO);
    let pct = counted_qty
        .map(|c| variance_percentage(expected, c))
        .unwrap_or(0.0);

    PhysicalCountItem {
        id: Uuid::new_v4(),
        count_id: Uuid::new_v4(),
        item_id: Uuid::new_v4(),
        expected_quantity: expected,
        counted_quantity: counted_qty,
        variance_quantity: variance,
        variance_percentage: pct,
        // Unit cost of 1 keeps variance value equal to variance quantity
        variance_value: Money::new(variance, "USD"),
        status: CountItemStatus::Pending,
        reason_code: reason.map(str::to_string),
        notes: None,
        counted_by: None,
        counted_at: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Signed percentage against the expected quantity
    #[test]
    fn test_variance_percentage() {
        assert!((variance_percentage(dec("100"), dec("110")) - 10.0).abs() < 1e-9);
        assert!((variance_percentage(dec("100"), dec("85")) + 15.0).abs() < 1e-9);
        assert!((variance_percentage(dec("100"), dec("100"))).abs() < 1e-9);
    }

    /// Zero expectation: anything found is 100%, nothing found is 0%
    #[test]
    fn test_variance_percentage_zero_expectation() {
        assert!((variance_percentage(dec("0"), dec("5")) - 100.0).abs() < 1e-9);
        assert!((variance_percentage(dec("0"), dec("0"))).abs() < 1e-9);
    }

    /// Status thresholds escalate at 5, 10, and 20 percent magnitude
    #[test]
    fn test_status_thresholds() {
        assert_eq!(status_for_variance(0.0), CountItemStatus::Counted);
        assert_eq!(status_for_variance(5.0), CountItemStatus::Counted);
        assert_eq!(status_for_variance(5.1), CountItemStatus::Variance);
        assert_eq!(status_for_variance(-8.0), CountItemStatus::Variance);
        assert_eq!(status_for_variance(10.1), CountItemStatus::RecountRequired);
        assert_eq!(status_for_variance(-15.0), CountItemStatus::RecountRequired);
        assert_eq!(status_for_variance(20.1), CountItemStatus::Investigation);
        assert_eq!(status_for_variance(-50.0), CountItemStatus::Investigation);
    }

    /// Aggregation splits variances by sign and totals absolute value
    #[test]
    fn test_analysis_aggregation() {
        let count_id = Uuid::new_v4();
        let items = vec![
            count_item("100", Some("100"), None),            // exact
            count_item("100", Some("110"), None),            // +10
            count_item("100", Some("70"), Some("theft")),    // -30
            count_item("50", Some("48"), Some("counting_error")), // -2
        ];

        let analysis = analyze(count_id, &items, "USD");

        assert_eq!(analysis.count_id, count_id);
        assert_eq!(analysis.total_items_counted, 4);
        assert_eq!(analysis.items_with_variance, 3);
        assert!((analysis.variance_rate - 75.0).abs() < 1e-9);
        assert_eq!(analysis.total_variance_value.amount, dec("42"));
        assert_eq!(analysis.positive_variance.items, 1);
        assert_eq!(analysis.positive_variance.value.amount, dec("10"));
        assert_eq!(analysis.negative_variance.items, 2);
        assert_eq!(analysis.negative_variance.value.amount, dec("32"));
    }

    /// Significant variances are those past the recount threshold, with
    /// investigation flagged past 20%
    #[test]
    fn test_significant_variances() {
        let items = vec![
            count_item("100", Some("92"), None),  // -8%: not significant
            count_item("100", Some("85"), None),  // -15%: significant
            count_item("100", Some("60"), None),  // -40%: investigation
        ];

        let analysis = analyze(Uuid::new_v4(), &items, "USD");

        assert_eq!(analysis.significant_variances.len(), 2);
        assert!(!analysis.significant_variances[0].investigation_required);
        assert!(analysis.significant_variances[1].investigation_required);
    }

    /// Root causes bucket on the recorded reason code
    #[test]
    fn test_root_cause_buckets() {
        let items = vec![
            count_item("10", Some("8"), Some("theft")),
            count_item("10", Some("8"), Some("theft")),
            count_item("10", Some("8"), Some("damaged_goods")),
            count_item("10", Some("8"), Some("system_error")),
            count_item("10", Some("8"), Some("processing_error")),
            count_item("10", Some("8"), Some("counting_error")),
            count_item("10", Some("8"), Some("mystery")),
            count_item("10", Some("8"), None),
        ];

        let analysis = analyze(Uuid::new_v4(), &items, "USD");

        assert_eq!(analysis.root_causes.theft, 2);
        assert_eq!(analysis.root_causes.damaged_goods, 1);
        assert_eq!(analysis.root_causes.system_errors, 1);
        assert_eq!(analysis.root_causes.processing_errors, 1);
        assert_eq!(analysis.root_causes.counting_errors, 1);
        assert_eq!(analysis.root_causes.other, 2);
    }

    /// Uncounted items are excluded from the analysis
    #[test]
    fn test_uncounted_items_excluded() {
        let items = vec![
            count_item("100", Some("90"), None),
            count_item("100", None, None),
        ];

        let analysis = analyze(Uuid::new_v4(), &items, "USD");

        assert_eq!(analysis.total_items_counted, 1);
        assert_eq!(analysis.items_with_variance, 1);
        assert!((analysis.variance_rate - 100.0).abs() < 1e-9);
    }

    /// Only pre-finalization statuses accept item updates
    #[test]
    fn test_count_status_machine() {
        assert!(CountStatus::Planning.accepts_updates());
        assert!(CountStatus::Counting.accepts_updates());
        assert!(CountStatus::Counted.accepts_updates());
        assert!(CountStatus::Variance.accepts_updates());
        assert!(!CountStatus::Finalized.accepts_updates());
        assert!(!CountStatus::Cancelled.accepts_updates());
    }

    /// Count numbers carry a type-specific prefix
    #[test]
    fn test_count_number_prefixes() {
        assert_eq!(CountType::Full.number_prefix(), "FC");
        assert_eq!(CountType::Cycle.number_prefix(), "CC");
        assert_eq!(CountType::Spot.number_prefix(), "SC");
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Status escalation is monotonic in variance magnitude
        #[test]
        fn prop_status_monotonic(pct in -100.0f64..100.0) {
            let status = status_for_variance(pct);
            let magnitude = pct.abs();

            let expected = if magnitude > INVESTIGATION_THRESHOLD_PCT {
                CountItemStatus::Investigation
            } else if magnitude > RECOUNT_THRESHOLD_PCT {
                CountItemStatus::RecountRequired
            } else if magnitude > VARIANCE_TOLERANCE_PCT {
                CountItemStatus::Variance
            } else {
                CountItemStatus::Counted
            };
            prop_assert_eq!(status, expected);
        }

        /// Sign of the percentage always matches the sign of the variance
        #[test]
        fn prop_percentage_sign_matches(expected in 1u32..10000, counted in 0u32..10000) {
            let pct = variance_percentage(Decimal::from(expected), Decimal::from(counted));

            if counted > expected {
                prop_assert!(pct > 0.0);
            } else if counted < expected {
                prop_assert!(pct < 0.0);
            } else {
                prop_assert!(pct.abs() < 1e-9);
            }
        }

        /// Positive and negative splits always sum to the totals
        #[test]
        fn prop_variance_split_sums(counts in prop::collection::vec((1u32..1000, 0u32..2000), 1..30)) {
            let items: Vec<PhysicalCountItem> = counts
                .iter()
                .map(|(e, c)| {
                    let e = e.to_string();
                    let c = c.to_string();
                    count_item(&e, Some(&c), None)
                })
                .collect();

            let analysis = analyze(Uuid::new_v4(), &items, "USD");

            prop_assert_eq!(
                analysis.positive_variance.items + analysis.negative_variance.items,
                analysis.items_with_variance
            );
            prop_assert_eq!(
                analysis.positive_variance.value.amount + analysis.negative_variance.value.amount,
                analysis.total_variance_value.amount
            );
            prop_assert!(analysis.variance_rate >= 0.0 && analysis.variance_rate <= 100.0);
        }
    }
}
