//! Stock ledger service: the append-only source of truth for quantity
//! movement.
//!
//! Every balance mutation runs inside a database transaction that locks
//! the balance row with `SELECT ... FOR UPDATE`, serializing writers per
//! item/location key. Distinct keys proceed in parallel.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use shared::calculations::ledger::{apply_transaction, BalanceState};
use shared::models::{InventoryTransaction, StockBalance, StockHealth, TransactionType};
use shared::types::{DateRange, Money};
use shared::validation;

use crate::error::{AppError, AppResult};

/// Service owning `stock_balances` and `inventory_transactions`
#[derive(Clone)]
pub struct StockLedgerService {
    db: PgPool,
}

/// Input for recording a ledger transaction
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordTransactionInput {
    pub item_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "Location must be 1-100 characters"))]
    pub location: String,
    pub transaction_type: TransactionType,
    /// Positive magnitude; the sign is derived from the type
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub currency: Option<String>,
    pub reference_number: Option<String>,
    pub reference_type: Option<String>,
    pub batch_number: Option<String>,
    pub lot_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Input for a direct balance correction
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpsertBalanceInput {
    pub item_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "Location must be 1-100 characters"))]
    pub location: String,
    pub quantity_on_hand: Option<Decimal>,
    pub quantity_reserved: Option<Decimal>,
    pub average_cost: Option<Decimal>,
}

/// One row of the enhanced stock status report
#[derive(Debug, Clone, Serialize)]
pub struct EnhancedStockStatus {
    pub item_id: Uuid,
    pub item_code: String,
    pub item_name: String,
    pub location: String,
    pub quantity_on_hand: Decimal,
    pub quantity_reserved: Decimal,
    pub quantity_available: Decimal,
    pub average_cost: Money,
    pub total_value: Money,
    pub reorder_point: Decimal,
    pub minimum_quantity: Decimal,
    pub maximum_quantity: Option<Decimal>,
    pub health: StockHealth,
    /// Annualized turnover from trailing-90-day consumption, approximate
    pub estimated_turnover: Option<f64>,
    pub last_movement_date: Option<DateTime<Utc>>,
    pub last_count_date: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct BalanceRow {
    id: Uuid,
    item_id: Uuid,
    location: String,
    quantity_on_hand: Decimal,
    quantity_reserved: Decimal,
    quantity_available: Decimal,
    average_cost: Decimal,
    currency: String,
    last_movement_date: Option<DateTime<Utc>>,
    last_count_date: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl BalanceRow {
    fn into_model(self) -> StockBalance {
        StockBalance {
            id: self.id,
            item_id: self.item_id,
            location: self.location,
            quantity_on_hand: self.quantity_on_hand,
            quantity_reserved: self.quantity_reserved,
            quantity_available: self.quantity_available,
            average_cost: Money::new(self.average_cost, self.currency),
            last_movement_date: self.last_movement_date,
            last_count_date: self.last_count_date,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    transaction_number: String,
    item_id: Uuid,
    location: String,
    transaction_type: String,
    quantity: Decimal,
    unit_cost: Decimal,
    currency: String,
    balance_after: Decimal,
    reference_number: Option<String>,
    reference_type: Option<String>,
    batch_number: Option<String>,
    lot_number: Option<String>,
    expiry_date: Option<NaiveDate>,
    notes: Option<String>,
    performed_by: String,
    transaction_date: DateTime<Utc>,
}

impl TransactionRow {
    fn into_model(self) -> AppResult<InventoryTransaction> {
        Ok(InventoryTransaction {
            id: self.id,
            transaction_number: self.transaction_number,
            item_id: self.item_id,
            location: self.location,
            transaction_type: TransactionType::from_str(&self.transaction_type)?,
            quantity: self.quantity,
            unit_cost: Money::new(self.unit_cost, self.currency),
            balance_after: self.balance_after,
            reference_number: self.reference_number,
            reference_type: self.reference_type,
            batch_number: self.batch_number,
            lot_number: self.lot_number,
            expiry_date: self.expiry_date,
            notes: self.notes,
            performed_by: self.performed_by,
            transaction_date: self.transaction_date,
        })
    }
}

const BALANCE_COLUMNS: &str = "id, item_id, location, quantity_on_hand, quantity_reserved, \
     quantity_available, average_cost, currency, last_movement_date, last_count_date, updated_at";

const TRANSACTION_COLUMNS: &str = "id, transaction_number, item_id, location, transaction_type, \
     quantity, unit_cost, currency, balance_after, reference_number, reference_type, \
     batch_number, lot_number, expiry_date, notes, performed_by, transaction_date";

impl StockLedgerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record one ledger transaction and return it with the new balance.
    pub async fn record_transaction(
        &self,
        actor: &str,
        input: RecordTransactionInput,
    ) -> AppResult<(InventoryTransaction, StockBalance)> {
        validate_transaction_input(&input)?;

        let currency = input
            .currency
            .clone()
            .unwrap_or_else(|| "USD".to_string());

        let mut tx = self.db.begin().await?;
        self.ensure_item_exists(&mut tx, input.item_id).await?;

        let (transaction, balance) = self
            .apply_locked(&mut tx, actor, &input, &currency)
            .await?;

        tx.commit().await?;

        tracing::info!(
            transaction_number = %transaction.transaction_number,
            item_id = %input.item_id,
            location = %input.location,
            transaction_type = input.transaction_type.as_str(),
            quantity = %transaction.quantity,
            balance_after = %transaction.balance_after,
            "ledger transaction recorded"
        );

        Ok((transaction, balance))
    }

    /// Record a transaction inside an already-open database transaction.
    ///
    /// Used by the movement and count services to pair entries without
    /// taking a fresh pool connection per entry.
    pub(crate) async fn apply_locked(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        actor: &str,
        input: &RecordTransactionInput,
        currency: &str,
    ) -> AppResult<(InventoryTransaction, StockBalance)> {
        let row = match self
            .lock_balance(tx, input.item_id, &input.location)
            .await?
        {
            Some(row) => row,
            None => {
                // First movement for this key: create the zero row, then
                // lock it, so concurrent first movements serialize on the
                // same row instead of both applying against an absent one.
                sqlx::query(
                    "INSERT INTO stock_balances (item_id, location, quantity_on_hand, \
                     quantity_reserved, quantity_available, average_cost, currency, updated_at) \
                     VALUES ($1, $2, 0, 0, 0, 0, $3, NOW()) \
                     ON CONFLICT (item_id, location) DO NOTHING",
                )
                .bind(input.item_id)
                .bind(&input.location)
                .bind(currency)
                .execute(&mut **tx)
                .await?;

                self.lock_balance(tx, input.item_id, &input.location)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal(anyhow::anyhow!(
                            "stock balance row missing after insert for item {} at {}",
                            input.item_id,
                            input.location
                        ))
                    })?
            }
        };

        let state = BalanceState {
            quantity_on_hand: row.quantity_on_hand,
            quantity_reserved: row.quantity_reserved,
            average_cost: row.average_cost,
        };

        let applied = apply_transaction(state, input.transaction_type, input.quantity, input.unit_cost)?;
        let new_available = applied.new_on_hand - applied.new_reserved;

        let balance_row = sqlx::query_as::<_, BalanceRow>(&format!(
            r#"
            UPDATE stock_balances SET
                quantity_on_hand = $3,
                quantity_reserved = $4,
                quantity_available = $5,
                average_cost = $6,
                last_movement_date = NOW(),
                updated_at = NOW()
            WHERE item_id = $1 AND location = $2
            RETURNING {BALANCE_COLUMNS}
            "#
        ))
        .bind(input.item_id)
        .bind(&input.location)
        .bind(applied.new_on_hand)
        .bind(applied.new_reserved)
        .bind(new_available)
        .bind(applied.new_average_cost)
        .fetch_one(&mut **tx)
        .await?;

        let transaction_number = generate_number("MOV");
        let transaction_row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            INSERT INTO inventory_transactions (
                transaction_number, item_id, location, transaction_type, quantity,
                unit_cost, currency, balance_after, reference_number, reference_type,
                batch_number, lot_number, expiry_date, notes, performed_by, transaction_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, NOW())
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(&transaction_number)
        .bind(input.item_id)
        .bind(&input.location)
        .bind(input.transaction_type.as_str())
        .bind(applied.signed_quantity)
        .bind(input.unit_cost)
        .bind(currency)
        .bind(applied.new_on_hand)
        .bind(&input.reference_number)
        .bind(&input.reference_type)
        .bind(&input.batch_number)
        .bind(&input.lot_number)
        .bind(input.expiry_date)
        .bind(&input.notes)
        .bind(actor)
        .fetch_one(&mut **tx)
        .await?;

        Ok((transaction_row.into_model()?, balance_row.into_model()))
    }

    /// Get the balance for an item at a location.
    pub async fn get_balance(&self, item_id: Uuid, location: &str) -> AppResult<StockBalance> {
        let row = sqlx::query_as::<_, BalanceRow>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM stock_balances WHERE item_id = $1 AND location = $2"
        ))
        .bind(item_id)
        .bind(location)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock balance".to_string()))?;

        Ok(row.into_model())
    }

    /// List balances for an item across all locations.
    pub async fn list_balances(&self, item_id: Uuid) -> AppResult<Vec<StockBalance>> {
        let rows = sqlx::query_as::<_, BalanceRow>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM stock_balances WHERE item_id = $1 ORDER BY location"
        ))
        .bind(item_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(BalanceRow::into_model).collect())
    }

    /// Direct balance correction preserving the non-negativity invariant.
    ///
    /// Fields left unset keep their current value. Used by the reservation
    /// path and by manual corrections.
    pub async fn upsert_balance(
        &self,
        input: UpsertBalanceInput,
        currency: &str,
    ) -> AppResult<StockBalance> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let existing = self.lock_balance(&mut tx, input.item_id, &input.location).await?;

        let (current_on_hand, current_reserved, current_cost) = match &existing {
            Some(row) => (row.quantity_on_hand, row.quantity_reserved, row.average_cost),
            None => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        };

        let on_hand = input.quantity_on_hand.unwrap_or(current_on_hand);
        let reserved = input.quantity_reserved.unwrap_or(current_reserved);
        let average_cost = input.average_cost.unwrap_or(current_cost);

        if on_hand < Decimal::ZERO || reserved < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Balance quantities cannot be negative".to_string(),
            });
        }
        let available = on_hand - reserved;
        if available < Decimal::ZERO {
            return Err(AppError::InsufficientStock {
                requested: reserved,
                available: on_hand,
            });
        }
        if average_cost < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "average_cost".to_string(),
                message: "Average cost cannot be negative".to_string(),
            });
        }

        let row = sqlx::query_as::<_, BalanceRow>(&format!(
            r#"
            INSERT INTO stock_balances (
                item_id, location, quantity_on_hand, quantity_reserved, quantity_available,
                average_cost, currency, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (item_id, location) DO UPDATE SET
                quantity_on_hand = EXCLUDED.quantity_on_hand,
                quantity_reserved = EXCLUDED.quantity_reserved,
                quantity_available = EXCLUDED.quantity_available,
                average_cost = EXCLUDED.average_cost,
                updated_at = NOW()
            RETURNING {BALANCE_COLUMNS}
            "#
        ))
        .bind(input.item_id)
        .bind(&input.location)
        .bind(on_hand)
        .bind(reserved)
        .bind(available)
        .bind(average_cost)
        .bind(currency)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into_model())
    }

    /// Ledger listing for an item, newest first, optionally filtered by
    /// location and date range.
    pub async fn get_transactions(
        &self,
        item_id: Uuid,
        location: Option<&str>,
        range: Option<DateRange>,
    ) -> AppResult<Vec<InventoryTransaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM inventory_transactions
            WHERE item_id = $1
              AND ($2::text IS NULL OR location = $2)
              AND ($3::date IS NULL OR transaction_date::date >= $3)
              AND ($4::date IS NULL OR transaction_date::date <= $4)
            ORDER BY transaction_date DESC, id DESC
            "#
        ))
        .bind(item_id)
        .bind(location)
        .bind(range.map(|r| r.start))
        .bind(range.map(|r| r.end))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(TransactionRow::into_model).collect()
    }

    /// Enhanced stock status across items, joining balances with item
    /// thresholds and trailing-consumption turnover.
    pub async fn enhanced_stock_status(
        &self,
        location: Option<&str>,
    ) -> AppResult<Vec<EnhancedStockStatus>> {
        #[derive(Debug, FromRow)]
        struct StatusRow {
            item_id: Uuid,
            item_code: String,
            item_name: String,
            location: String,
            quantity_on_hand: Decimal,
            quantity_reserved: Decimal,
            quantity_available: Decimal,
            average_cost: Decimal,
            currency: String,
            reorder_point: Decimal,
            minimum_quantity: Decimal,
            maximum_quantity: Option<Decimal>,
            last_movement_date: Option<DateTime<Utc>>,
            last_count_date: Option<DateTime<Utc>>,
            consumption_90d: Decimal,
        }

        let rows = sqlx::query_as::<_, StatusRow>(
            r#"
            SELECT b.item_id, i.item_code, i.item_name, b.location,
                   b.quantity_on_hand, b.quantity_reserved, b.quantity_available,
                   b.average_cost, b.currency,
                   i.reorder_point, i.minimum_quantity, i.maximum_quantity,
                   b.last_movement_date, b.last_count_date,
                   COALESCE((
                       SELECT SUM(ABS(t.quantity))
                       FROM inventory_transactions t
                       WHERE t.item_id = b.item_id
                         AND t.location = b.location
                         AND t.transaction_type IN ('ISSUE', 'TRANSFER_OUT', 'WASTE')
                         AND t.transaction_date >= NOW() - INTERVAL '90 days'
                   ), 0) AS consumption_90d
            FROM stock_balances b
            JOIN inventory_items i ON i.id = b.item_id
            WHERE i.is_active = true
              AND ($1::text IS NULL OR b.location = $1)
            ORDER BY i.item_code, b.location
            "#,
        )
        .bind(location)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let health = StockHealth::classify(
                    r.quantity_on_hand,
                    r.minimum_quantity,
                    r.reorder_point,
                    r.maximum_quantity,
                );
                let estimated_turnover = annualized_turnover(r.consumption_90d, r.quantity_on_hand);
                EnhancedStockStatus {
                    item_id: r.item_id,
                    item_code: r.item_code,
                    item_name: r.item_name,
                    location: r.location,
                    quantity_on_hand: r.quantity_on_hand,
                    quantity_reserved: r.quantity_reserved,
                    quantity_available: r.quantity_available,
                    average_cost: Money::new(r.average_cost, r.currency.clone()),
                    total_value: Money::new(r.quantity_on_hand * r.average_cost, r.currency),
                    reorder_point: r.reorder_point,
                    minimum_quantity: r.minimum_quantity,
                    maximum_quantity: r.maximum_quantity,
                    health,
                    estimated_turnover,
                    last_movement_date: r.last_movement_date,
                    last_count_date: r.last_count_date,
                }
            })
            .collect())
    }

    /// Lock and fetch a balance row within an open database transaction.
    async fn lock_balance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: Uuid,
        location: &str,
    ) -> AppResult<Option<BalanceRow>> {
        let row = sqlx::query_as::<_, BalanceRow>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM stock_balances \
             WHERE item_id = $1 AND location = $2 FOR UPDATE"
        ))
        .bind(item_id)
        .bind(location)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row)
    }

    async fn ensure_item_exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: Uuid,
    ) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM inventory_items WHERE id = $1)",
        )
        .bind(item_id)
        .fetch_one(&mut **tx)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Inventory item".to_string()));
        }
        Ok(())
    }
}

fn validate_transaction_input(input: &RecordTransactionInput) -> AppResult<()> {
    input.validate()?;
    validation::validate_positive_quantity(input.quantity).map_err(|message| {
        AppError::Validation {
            field: "quantity".to_string(),
            message: message.to_string(),
        }
    })?;
    validation::validate_unit_cost(input.unit_cost).map_err(|message| AppError::Validation {
        field: "unit_cost".to_string(),
        message: message.to_string(),
    })?;
    if let Some(currency) = &input.currency {
        validation::validate_currency(currency).map_err(|message| AppError::Validation {
            field: "currency".to_string(),
            message: message.to_string(),
        })?;
    }
    Ok(())
}

/// Annualized turnover: 90-day consumption scaled to a year over the
/// current on-hand quantity. `None` when the balance is empty.
fn annualized_turnover(consumption_90d: Decimal, on_hand: Decimal) -> Option<f64> {
    if on_hand <= Decimal::ZERO {
        return None;
    }
    let annualized = consumption_90d * Decimal::from(365) / Decimal::from(90);
    (annualized / on_hand).to_f64()
}

/// Document numbers: `{prefix}-YYYYMMDD-xxxxxx`.
pub(crate) fn generate_number(prefix: &str) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, date, &suffix[..6])
}
