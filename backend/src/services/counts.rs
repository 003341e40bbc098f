//! Physical count sessions: planning, item capture with variance
//! thresholds, spot checks, and one-way finalization with optional
//! stock adjustments.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use shared::calculations::variance::{
    self, status_for_variance, variance_percentage, INVESTIGATION_THRESHOLD_PCT,
    RECOUNT_THRESHOLD_PCT,
};
use shared::models::{
    AdjustmentStatus, CountItemStatus, CountStatus, CountType, InventoryAdjustment, PhysicalCount,
    PhysicalCountItem, TransactionType, VarianceAnalysis,
};
use shared::types::Money;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{generate_number, RecordTransactionInput, StockLedgerService};

/// Items sampled for a spot check when no size is requested
const DEFAULT_SPOT_SAMPLE: usize = 10;

#[derive(Clone)]
pub struct PhysicalCountService {
    db: PgPool,
    ledger: StockLedgerService,
}

/// Input for creating a count session
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCountInput {
    pub count_type: CountType,
    #[validate(length(min = 1, max = 100, message = "Location must be 1-100 characters"))]
    pub location: String,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Restrict the session to these items; all active stocked items otherwise
    pub item_ids: Option<Vec<Uuid>>,
    pub categories: Option<Vec<String>>,
}

/// Input for recording one item's counted quantity
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCountItemInput {
    pub counted_quantity: Decimal,
    pub reason_code: Option<String>,
    pub notes: Option<String>,
}

/// Input for finalizing a count session
#[derive(Debug, Clone, Deserialize)]
pub struct FinalizeCountInput {
    #[serde(default)]
    pub create_adjustment: bool,
    #[serde(default)]
    pub auto_approve: bool,
    pub notes: Option<String>,
}

/// How spot-check items are sampled
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpotCheckSelection {
    #[default]
    Random,
    HighValue,
}

/// Input for an ad-hoc spot check
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SpotCheckInput {
    #[validate(length(min = 1, max = 100, message = "Location must be 1-100 characters"))]
    pub location: String,
    pub item_ids: Option<Vec<Uuid>>,
    pub sample_size: Option<usize>,
    #[serde(default)]
    pub selection: SpotCheckSelection,
    pub notes: Option<String>,
}

/// A count session together with its item lines
#[derive(Debug, Clone, Serialize)]
pub struct CountWithItems {
    pub count: PhysicalCount,
    pub items: Vec<PhysicalCountItem>,
}

/// Finalization output: the closed session, its variance picture, and
/// the adjustment raised from it (if requested)
#[derive(Debug, Clone, Serialize)]
pub struct FinalizationResult {
    pub count: PhysicalCount,
    pub analysis: VarianceAnalysis,
    pub adjustment: Option<InventoryAdjustment>,
}

#[derive(Debug, FromRow)]
struct CountRow {
    id: Uuid,
    count_number: String,
    count_type: String,
    location: String,
    status: String,
    total_items: i32,
    counted_items: i32,
    items_with_variance: i32,
    total_variance_value: Decimal,
    currency: String,
    scheduled_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_by: String,
    finalized_by: Option<String>,
    finalized_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CountRow {
    fn into_model(self) -> AppResult<PhysicalCount> {
        Ok(PhysicalCount {
            id: self.id,
            count_number: self.count_number,
            count_type: CountType::from_str(&self.count_type)?,
            location: self.location,
            status: CountStatus::from_str(&self.status)?,
            total_items: self.total_items as u32,
            counted_items: self.counted_items as u32,
            items_with_variance: self.items_with_variance as u32,
            total_variance_value: Money::new(self.total_variance_value, &self.currency),
            scheduled_date: self.scheduled_date,
            notes: self.notes,
            created_by: self.created_by,
            finalized_by: self.finalized_by,
            finalized_at: self.finalized_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CountItemRow {
    id: Uuid,
    count_id: Uuid,
    item_id: Uuid,
    expected_quantity: Decimal,
    counted_quantity: Option<Decimal>,
    variance_quantity: Decimal,
    variance_percentage: f64,
    variance_value: Decimal,
    currency: String,
    status: String,
    reason_code: Option<String>,
    notes: Option<String>,
    counted_by: Option<String>,
    counted_at: Option<DateTime<Utc>>,
}

impl CountItemRow {
    fn into_model(self) -> AppResult<PhysicalCountItem> {
        Ok(PhysicalCountItem {
            id: self.id,
            count_id: self.count_id,
            item_id: self.item_id,
            expected_quantity: self.expected_quantity,
            counted_quantity: self.counted_quantity,
            variance_quantity: self.variance_quantity,
            variance_percentage: self.variance_percentage,
            variance_value: Money::new(self.variance_value, &self.currency),
            status: CountItemStatus::from_str(&self.status)?,
            reason_code: self.reason_code,
            notes: self.notes,
            counted_by: self.counted_by,
            counted_at: self.counted_at,
        })
    }
}

const COUNT_COLUMNS: &str = "id, count_number, count_type, location, status, total_items, \
     counted_items, items_with_variance, total_variance_value, currency, scheduled_date, notes, \
     created_by, finalized_by, finalized_at, created_at, updated_at";

const COUNT_ITEM_COLUMNS: &str = "id, count_id, item_id, expected_quantity, counted_quantity, \
     variance_quantity, variance_percentage, variance_value, currency, status, reason_code, \
     notes, counted_by, counted_at";

impl PhysicalCountService {
    pub fn new(db: PgPool) -> Self {
        let ledger = StockLedgerService::new(db.clone());
        Self { db, ledger }
    }

    /// Create a count session, snapshotting expected quantities from the
    /// current balances at the location.
    pub async fn create_count(
        &self,
        actor: &str,
        currency: &str,
        input: CreateCountInput,
    ) -> AppResult<CountWithItems> {
        input.validate()?;

        let item_filter = input.item_ids.clone().unwrap_or_default();
        let category_filter = input.categories.clone().unwrap_or_default();

        let snapshot = sqlx::query_as::<_, (Uuid, Decimal)>(
            r#"
            SELECT b.item_id, b.quantity_on_hand
            FROM stock_balances b
            JOIN inventory_items i ON i.id = b.item_id
            WHERE b.location = $1
              AND i.is_active
              AND (cardinality($2::uuid[]) = 0 OR b.item_id = ANY($2))
              AND (cardinality($3::text[]) = 0 OR i.category = ANY($3))
            ORDER BY i.item_code
            "#,
        )
        .bind(&input.location)
        .bind(&item_filter)
        .bind(&category_filter)
        .fetch_all(&self.db)
        .await?;

        if snapshot.is_empty() {
            return Err(AppError::Validation {
                field: "location".to_string(),
                message: "No stocked items match the count criteria".to_string(),
            });
        }

        let count_number = generate_number(input.count_type.number_prefix());
        let mut tx = self.db.begin().await?;

        let count_row = sqlx::query_as::<_, CountRow>(&format!(
            r#"
            INSERT INTO physical_counts (
                count_number, count_type, location, status, total_items, counted_items,
                items_with_variance, total_variance_value, currency, scheduled_date, notes, created_by
            )
            VALUES ($1, $2, $3, 'planning', $4, 0, 0, 0, $5, $6, $7, $8)
            RETURNING {COUNT_COLUMNS}
            "#
        ))
        .bind(&count_number)
        .bind(input.count_type.as_str())
        .bind(&input.location)
        .bind(snapshot.len() as i32)
        .bind(currency)
        .bind(input.scheduled_date)
        .bind(&input.notes)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(snapshot.len());
        for (item_id, expected) in &snapshot {
            let item_row = sqlx::query_as::<_, CountItemRow>(&format!(
                r#"
                INSERT INTO physical_count_items (
                    count_id, item_id, expected_quantity, variance_quantity,
                    variance_percentage, variance_value, currency, status
                )
                VALUES ($1, $2, $3, 0, 0, 0, $4, 'pending')
                RETURNING {COUNT_ITEM_COLUMNS}
                "#
            ))
            .bind(count_row.id)
            .bind(item_id)
            .bind(expected)
            .bind(currency)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item_row.into_model()?);
        }

        tx.commit().await?;

        tracing::info!(
            count_number = %count_number,
            count_type = input.count_type.as_str(),
            location = %input.location,
            total_items = snapshot.len(),
            "count session created"
        );

        Ok(CountWithItems {
            count: count_row.into_model()?,
            items,
        })
    }

    /// Record one item's counted quantity and roll its variance into the
    /// session aggregates. Returns accumulated warnings for variances
    /// over the recount threshold.
    pub async fn update_count_item(
        &self,
        actor: &str,
        count_item_id: Uuid,
        input: UpdateCountItemInput,
    ) -> AppResult<(PhysicalCountItem, PhysicalCount, Vec<String>)> {
        if input.counted_quantity < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "counted_quantity".to_string(),
                message: "Counted quantity cannot be negative".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let item_row = sqlx::query_as::<_, CountItemRow>(&format!(
            "SELECT {COUNT_ITEM_COLUMNS} FROM physical_count_items WHERE id = $1 FOR UPDATE"
        ))
        .bind(count_item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Count item".to_string()))?;

        let count_row = sqlx::query_as::<_, CountRow>(&format!(
            "SELECT {COUNT_COLUMNS} FROM physical_counts WHERE id = $1 FOR UPDATE"
        ))
        .bind(item_row.count_id)
        .fetch_one(&mut *tx)
        .await?;
        let status = CountStatus::from_str(&count_row.status)?;
        if !status.accepts_updates() {
            return Err(AppError::InvalidStateTransition(format!(
                "Count {} no longer accepts item updates (status: {})",
                count_row.count_number, count_row.status
            )));
        }

        let variance_qty = input.counted_quantity - item_row.expected_quantity;
        let variance_pct = variance_percentage(item_row.expected_quantity, input.counted_quantity);
        let item_status = status_for_variance(variance_pct);

        // Value the variance at the item's current carrying cost.
        let unit_cost = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(b.average_cost, i.standard_cost) \
             FROM inventory_items i \
             LEFT JOIN stock_balances b ON b.item_id = i.id AND b.location = $2 \
             WHERE i.id = $1",
        )
        .bind(item_row.item_id)
        .bind(&count_row.location)
        .fetch_one(&mut *tx)
        .await?;
        let variance_value = variance_qty * unit_cost;

        let updated_item = sqlx::query_as::<_, CountItemRow>(&format!(
            r#"
            UPDATE physical_count_items
            SET counted_quantity = $1, variance_quantity = $2, variance_percentage = $3,
                variance_value = $4, status = $5, reason_code = $6, notes = $7,
                counted_by = $8, counted_at = NOW()
            WHERE id = $9
            RETURNING {COUNT_ITEM_COLUMNS}
            "#
        ))
        .bind(input.counted_quantity)
        .bind(variance_qty)
        .bind(variance_pct)
        .bind(variance_value)
        .bind(item_status.as_str())
        .bind(&input.reason_code)
        .bind(&input.notes)
        .bind(actor)
        .bind(count_item_id)
        .fetch_one(&mut *tx)
        .await?;

        let (counted, with_variance, total_value) = sqlx::query_as::<_, (i64, i64, Decimal)>(
            "SELECT COUNT(*) FILTER (WHERE counted_quantity IS NOT NULL), \
                    COUNT(*) FILTER (WHERE counted_quantity IS NOT NULL AND variance_quantity <> 0), \
                    COALESCE(SUM(ABS(variance_value)) FILTER (WHERE counted_quantity IS NOT NULL), 0) \
             FROM physical_count_items WHERE count_id = $1",
        )
        .bind(item_row.count_id)
        .fetch_one(&mut *tx)
        .await?;

        let new_status = if counted >= i64::from(count_row.total_items) {
            if with_variance > 0 {
                CountStatus::Variance
            } else {
                CountStatus::Counted
            }
        } else {
            CountStatus::Counting
        };

        let updated_count = sqlx::query_as::<_, CountRow>(&format!(
            "UPDATE physical_counts SET counted_items = $1, items_with_variance = $2, \
             total_variance_value = $3, status = $4, updated_at = NOW() \
             WHERE id = $5 RETURNING {COUNT_COLUMNS}"
        ))
        .bind(counted as i32)
        .bind(with_variance as i32)
        .bind(total_value)
        .bind(new_status.as_str())
        .bind(item_row.count_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut warnings = Vec::new();
        if variance_pct.abs() > RECOUNT_THRESHOLD_PCT {
            warnings.push(format!(
                "Variance of {:.1}% on item {} exceeds the recount threshold",
                variance_pct, item_row.item_id
            ));
        }
        if variance_pct.abs() > INVESTIGATION_THRESHOLD_PCT {
            tracing::warn!(
                count_number = %count_row.count_number,
                item_id = %item_row.item_id,
                variance_percentage = variance_pct,
                "count variance requires investigation"
            );
        }

        Ok((updated_item.into_model()?, updated_count.into_model()?, warnings))
    }

    /// Finalize a count session. Every item must have a recorded count;
    /// finalization is one-way. When requested, variances are posted
    /// back to the ledger as paired adjustments.
    pub async fn finalize_count(
        &self,
        actor: &str,
        count_id: Uuid,
        input: FinalizeCountInput,
    ) -> AppResult<FinalizationResult> {
        let mut tx = self.db.begin().await?;

        let count_row = sqlx::query_as::<_, CountRow>(&format!(
            "SELECT {COUNT_COLUMNS} FROM physical_counts WHERE id = $1 FOR UPDATE"
        ))
        .bind(count_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Physical count".to_string()))?;

        let status = CountStatus::from_str(&count_row.status)?;
        if status == CountStatus::Finalized {
            return Err(AppError::CountNotFinalizable(format!(
                "Count {} is already finalized",
                count_row.count_number
            )));
        }
        if status == CountStatus::Cancelled {
            return Err(AppError::CountNotFinalizable(format!(
                "Count {} was cancelled",
                count_row.count_number
            )));
        }

        let item_rows = sqlx::query_as::<_, CountItemRow>(&format!(
            "SELECT {COUNT_ITEM_COLUMNS} FROM physical_count_items WHERE count_id = $1 FOR UPDATE"
        ))
        .bind(count_id)
        .fetch_all(&mut *tx)
        .await?;

        let uncounted = item_rows
            .iter()
            .filter(|i| i.counted_quantity.is_none())
            .count();
        if uncounted > 0 {
            return Err(AppError::CountNotFinalizable(format!(
                "{} of {} items have not been counted",
                uncounted,
                item_rows.len()
            )));
        }

        let mut items = Vec::with_capacity(item_rows.len());
        for row in item_rows {
            items.push(row.into_model()?);
        }
        let analysis = variance::analyze(count_id, &items, &count_row.currency);

        let adjustment = if input.create_adjustment && analysis.items_with_variance > 0 {
            Some(
                self.create_adjustment_from_count(
                    &mut tx,
                    actor,
                    &count_row,
                    &items,
                    &analysis,
                    input.auto_approve,
                )
                .await?,
            )
        } else {
            None
        };

        // Stamp the counted items' balances with the count date.
        sqlx::query(
            "UPDATE stock_balances SET last_count_date = NOW(), updated_at = NOW() \
             WHERE location = $1 AND item_id IN \
                 (SELECT item_id FROM physical_count_items WHERE count_id = $2)",
        )
        .bind(&count_row.location)
        .bind(count_id)
        .execute(&mut *tx)
        .await?;

        let finalized = sqlx::query_as::<_, CountRow>(&format!(
            "UPDATE physical_counts SET status = 'finalized', counted_items = $1, \
             items_with_variance = $2, total_variance_value = $3, notes = COALESCE($4, notes), \
             finalized_by = $5, finalized_at = NOW(), updated_at = NOW() \
             WHERE id = $6 RETURNING {COUNT_COLUMNS}"
        ))
        .bind(analysis.total_items_counted as i32)
        .bind(analysis.items_with_variance as i32)
        .bind(analysis.total_variance_value.amount)
        .bind(&input.notes)
        .bind(actor)
        .bind(count_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            count_number = %count_row.count_number,
            finalized_by = actor,
            items_with_variance = analysis.items_with_variance,
            variance_rate = analysis.variance_rate,
            total_variance_value = %analysis.total_variance_value.amount,
            adjustment = adjustment.as_ref().map(|a| a.adjustment_number.as_str()),
            "count finalized"
        );

        Ok(FinalizationResult {
            count: finalized.into_model()?,
            analysis,
            adjustment,
        })
    }

    /// Create an ad-hoc spot check, sampling items at the location when
    /// none are named explicitly.
    pub async fn create_spot_check(
        &self,
        actor: &str,
        currency: &str,
        input: SpotCheckInput,
    ) -> AppResult<CountWithItems> {
        input.validate()?;

        let sample_size = input.sample_size.unwrap_or(DEFAULT_SPOT_SAMPLE);
        let item_ids = match &input.item_ids {
            Some(ids) if !ids.is_empty() => ids.clone(),
            _ => {
                self.sample_items(&input.location, sample_size, input.selection)
                    .await?
            }
        };

        if item_ids.is_empty() {
            return Err(AppError::Validation {
                field: "location".to_string(),
                message: "No stocked items available for a spot check".to_string(),
            });
        }

        self.create_count(
            actor,
            currency,
            CreateCountInput {
                count_type: CountType::Spot,
                location: input.location,
                scheduled_date: None,
                notes: input.notes,
                item_ids: Some(item_ids),
                categories: None,
            },
        )
        .await
    }

    async fn sample_items(
        &self,
        location: &str,
        sample_size: usize,
        selection: SpotCheckSelection,
    ) -> AppResult<Vec<Uuid>> {
        let candidates = sqlx::query_as::<_, (Uuid, Decimal)>(
            "SELECT b.item_id, b.quantity_on_hand * b.average_cost \
             FROM stock_balances b \
             JOIN inventory_items i ON i.id = b.item_id \
             WHERE b.location = $1 AND i.is_active AND b.quantity_on_hand > 0",
        )
        .bind(location)
        .fetch_all(&self.db)
        .await?;

        Ok(match selection {
            SpotCheckSelection::HighValue => {
                let mut sorted = candidates;
                sorted.sort_by(|a, b| b.1.cmp(&a.1));
                sorted.into_iter().take(sample_size).map(|(id, _)| id).collect()
            }
            SpotCheckSelection::Random => {
                let ids: Vec<Uuid> = candidates.into_iter().map(|(id, _)| id).collect();
                let mut rng = rand::thread_rng();
                ids.choose_multiple(&mut rng, sample_size).copied().collect()
            }
        })
    }

    /// Raise an adjustment covering the count's variance lines. Approved
    /// adjustments post paired ADJUST_UP/ADJUST_DOWN ledger transactions
    /// inside the finalization transaction.
    async fn create_adjustment_from_count(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        actor: &str,
        count_row: &CountRow,
        items: &[PhysicalCountItem],
        analysis: &VarianceAnalysis,
        auto_approve: bool,
    ) -> AppResult<InventoryAdjustment> {
        let adjustment_number = generate_number("ADJ");
        let status = if auto_approve {
            AdjustmentStatus::Approved
        } else {
            AdjustmentStatus::Pending
        };
        let description = format!("Adjustment from physical count {}", count_row.count_number);

        let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO inventory_adjustments (
                adjustment_number, count_id, location, status, total_items, total_value,
                currency, description, requested_by, approved_by, approved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                    CASE WHEN $4 = 'approved' THEN $9 END,
                    CASE WHEN $4 = 'approved' THEN NOW() END)
            RETURNING id, created_at
            "#,
        )
        .bind(&adjustment_number)
        .bind(count_row.id)
        .bind(&count_row.location)
        .bind(status.as_str())
        .bind(analysis.items_with_variance as i32)
        .bind(analysis.total_variance_value.amount)
        .bind(&count_row.currency)
        .bind(&description)
        .bind(actor)
        .fetch_one(&mut **tx)
        .await?;

        if status == AdjustmentStatus::Approved {
            for item in items.iter().filter(|i| i.variance_quantity != Decimal::ZERO) {
                let transaction_type = if item.variance_quantity > Decimal::ZERO {
                    TransactionType::AdjustUp
                } else {
                    TransactionType::AdjustDown
                };
                let quantity = item.variance_quantity.abs();
                let unit_cost = if quantity > Decimal::ZERO {
                    (item.variance_value.amount / item.variance_quantity).abs()
                } else {
                    Decimal::ZERO
                };

                self.ledger
                    .apply_locked(
                        tx,
                        actor,
                        &RecordTransactionInput {
                            item_id: item.item_id,
                            location: count_row.location.clone(),
                            transaction_type,
                            quantity,
                            unit_cost,
                            currency: Some(count_row.currency.clone()),
                            reference_number: Some(adjustment_number.clone()),
                            reference_type: Some("inventory_adjustment".to_string()),
                            batch_number: None,
                            lot_number: None,
                            expiry_date: None,
                            notes: Some(description.clone()),
                        },
                        &count_row.currency,
                    )
                    .await?;
            }
        }

        Ok(InventoryAdjustment {
            id,
            adjustment_number,
            count_id: Some(count_row.id),
            location: count_row.location.clone(),
            status,
            total_items: analysis.items_with_variance,
            total_value: analysis.total_variance_value.clone(),
            description: Some(description),
            requested_by: actor.to_string(),
            approved_by: if auto_approve {
                Some(actor.to_string())
            } else {
                None
            },
            approved_at: if auto_approve { Some(Utc::now()) } else { None },
            created_at,
        })
    }
}
