//! Transfer and reservation tests
//!
//! Tests for movement orchestration including:
//! - Reservation release flooring and idempotence
//! - Batch status derivation from completion counts
//! - Chunked completion-percentage reporting

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{
    completion_percentage, BatchOperationStatus, ReleaseOutcome, ReservationPriority,
    ReservationPurpose, ReservationStatus, StockReservation, BATCH_CHUNK_SIZE,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn reservation(quantity: &str) -> StockReservation {
    StockReservation {
        id: Uuid::new_v4(),
        item_id: Uuid::new_v4(),
        location: "WH-01".to_string(),
        quantity: dec(quantity),
        remaining_quantity: dec(quantity),
        purpose: ReservationPurpose::Order,
        priority: ReservationPriority::Normal,
        status: ReservationStatus::Active,
        reference_number: None,
        expires_at: None,
        notes: None,
        reserved_by: "tester".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        released_at: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// A partial release leaves the remainder held
    #[test]
    fn test_partial_release() {
        let mut r = reservation("100");
        let now = Utc::now();

        let (freed, outcome) = r.release(dec("40"), now);

        assert_eq!(freed, dec("40"));
        assert_eq!(outcome, ReleaseOutcome::Released { fully_released: false });
        assert_eq!(r.remaining_quantity, dec("60"));
        assert_eq!(r.status, ReservationStatus::PartialFulfilled);
        assert!(r.released_at.is_none());
    }

    /// A full release fulfills and stamps the release time
    #[test]
    fn test_full_release() {
        let mut r = reservation("100");
        let now = Utc::now();

        let (freed, outcome) = r.release(dec("100"), now);

        assert_eq!(freed, dec("100"));
        assert_eq!(outcome, ReleaseOutcome::Released { fully_released: true });
        assert_eq!(r.remaining_quantity, Decimal::ZERO);
        assert_eq!(r.status, ReservationStatus::Fulfilled);
        assert_eq!(r.released_at, Some(now));
    }

    /// Over-release is floored at the remaining quantity
    #[test]
    fn test_release_floored_at_remaining() {
        let mut r = reservation("30");
        let (freed, _) = r.release(dec("75"), Utc::now());

        assert_eq!(freed, dec("30"));
        assert_eq!(r.remaining_quantity, Decimal::ZERO);
        assert_eq!(r.status, ReservationStatus::Fulfilled);
    }

    /// Releasing a terminal reservation is a no-op
    #[test]
    fn test_release_is_idempotent_on_terminal() {
        let mut r = reservation("50");
        let now = Utc::now();
        r.release(dec("50"), now);

        let (freed, outcome) = r.release(dec("10"), Utc::now());

        assert_eq!(freed, Decimal::ZERO);
        assert_eq!(outcome, ReleaseOutcome::AlreadyTerminal);
        assert_eq!(r.status, ReservationStatus::Fulfilled);
        assert_eq!(r.released_at, Some(now));
    }

    /// Cancelled and expired reservations are terminal too
    #[test]
    fn test_terminal_statuses() {
        for status in [
            ReservationStatus::Fulfilled,
            ReservationStatus::Cancelled,
            ReservationStatus::Expired,
        ] {
            assert!(status.is_terminal());
        }
        assert!(!ReservationStatus::Active.is_terminal());
        assert!(!ReservationStatus::PartialFulfilled.is_terminal());
    }

    /// Final batch status reflects the completed/total split
    #[test]
    fn test_batch_status_from_counts() {
        assert_eq!(
            BatchOperationStatus::from_counts(10, 10),
            BatchOperationStatus::Completed
        );
        assert_eq!(
            BatchOperationStatus::from_counts(4, 10),
            BatchOperationStatus::PartialCompleted
        );
        assert_eq!(
            BatchOperationStatus::from_counts(0, 10),
            BatchOperationStatus::Failed
        );
    }

    /// Completion percentage over resolved items
    #[test]
    fn test_completion_percentage() {
        assert_eq!(completion_percentage(0, 10), 0.0);
        assert_eq!(completion_percentage(5, 10), 50.0);
        assert_eq!(completion_percentage(10, 10), 100.0);
        assert_eq!(completion_percentage(0, 0), 0.0);
    }

    /// Chunking covers every item exactly once
    #[test]
    fn test_chunking_covers_all_items() {
        let items: Vec<u32> = (0..37).collect();
        let chunks: Vec<&[u32]> = items.chunks(BATCH_CHUNK_SIZE).collect();

        assert_eq!(chunks.len(), 4);
        assert!(chunks[..3].iter().all(|c| c.len() == BATCH_CHUNK_SIZE));
        assert_eq!(chunks[3].len(), 7);
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 37);
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

        /// Released quantity never exceeds what was held, and the remainder
        /// never goes negative
        #[test]
        fn prop_release_conserves_quantity(held in 1u32..10000, requested in 0u32..20000) {
            let mut r = reservation(&held.to_string());
            let (freed, _) = r.release(Decimal::from(requested), Utc::now());

            prop_assert!(freed <= Decimal::from(held));
            prop_assert!(r.remaining_quantity >= Decimal::ZERO);
            prop_assert_eq!(freed + r.remaining_quantity, Decimal::from(held));
        }

        /// A second release after full fulfillment frees nothing
        #[test]
        fn prop_double_release_frees_nothing(held in 1u32..10000) {
            let mut r = reservation(&held.to_string());
            r.release(Decimal::from(held), Utc::now());
            let (freed, outcome) = r.release(Decimal::from(held), Utc::now());

            prop_assert_eq!(freed, Decimal::ZERO);
            prop_assert_eq!(outcome, ReleaseOutcome::AlreadyTerminal);
        }

        /// Batch status is total with all completed, failed with none
        #[test]
        fn prop_batch_status_consistent(total in 1u32..500, completed_raw in 0u32..500) {
            let completed = completed_raw.min(total);
            let status = BatchOperationStatus::from_counts(completed, total);

            if completed == total {
                prop_assert_eq!(status, BatchOperationStatus::Completed);
            } else if completed > 0 {
                prop_assert_eq!(status, BatchOperationStatus::PartialCompleted);
            } else {
                prop_assert_eq!(status, BatchOperationStatus::Failed);
            }
        }

        /// Completion percentage stays within [0, 100]
        #[test]
        fn prop_completion_percentage_bounded(total in 0u32..1000, resolved_raw in 0u32..1000) {
            let resolved = resolved_raw.min(total);
            let pct = completion_percentage(resolved, total);
            prop_assert!((0.0..=100.0).contains(&pct));
        }
    }
}
