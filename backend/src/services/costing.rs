//! Costing engine: unit cost per item under a selectable method, plus
//! valuation aggregation across locations and categories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use shared::calculations::costing::{unit_cost_by_method, ReceiptLayer};
use shared::models::CostingMethod;
use shared::types::Money;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct CostingService {
    db: PgPool,
}

/// Valuation request
#[derive(Debug, Clone, Deserialize)]
pub struct ValuationInput {
    /// Restrict to these locations; empty means all
    #[serde(default)]
    pub locations: Vec<String>,
    /// Restrict to these categories; empty means all
    #[serde(default)]
    pub categories: Vec<String>,
    /// Costing method token; defaults to each item's configured method
    pub method: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub include_zero_stock: bool,
    pub as_of_date: Option<DateTime<Utc>>,
}

/// Per-item line of a valuation report
#[derive(Debug, Clone, Serialize)]
pub struct ValuationLine {
    pub item_id: Uuid,
    pub item_code: String,
    pub item_name: String,
    pub category: Option<String>,
    pub method: CostingMethod,
    pub quantity_on_hand: Decimal,
    pub unit_cost: Money,
    pub total_value: Money,
}

/// Valuation report with per-item breakdown and summary
#[derive(Debug, Clone, Serialize)]
pub struct ValuationReport {
    pub as_of_date: DateTime<Utc>,
    pub currency: String,
    pub total_value: Decimal,
    pub item_count: usize,
    pub lines: Vec<ValuationLine>,
}

#[derive(Debug, FromRow)]
struct ItemStockRow {
    item_id: Uuid,
    item_code: String,
    item_name: String,
    category: Option<String>,
    costing_method: String,
    standard_cost: Decimal,
    quantity_on_hand: Decimal,
}

#[derive(Debug, FromRow)]
struct ReceiptRow {
    quantity: Decimal,
    unit_cost: Decimal,
    transaction_date: DateTime<Utc>,
}

impl CostingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Unit cost for one item under `method` as of `as_of_date`.
    pub async fn cost_by_method(
        &self,
        item_id: Uuid,
        method: CostingMethod,
        as_of_date: Option<DateTime<Utc>>,
    ) -> AppResult<Money> {
        let (standard_cost, currency) = self.item_standard_cost(item_id).await?;
        let as_of = as_of_date.unwrap_or_else(Utc::now);

        let (receipts, total_issued) = self.receipt_history(item_id, as_of).await?;
        let unit_cost = unit_cost_by_method(method, &receipts, total_issued, standard_cost);

        Ok(Money::new(unit_cost, currency))
    }

    /// Valuation across selected locations/categories: `quantity ×
    /// unitCost` per item, excluding inactive and zero-stock items unless
    /// asked to include them.
    pub async fn calculate_valuation(
        &self,
        input: ValuationInput,
        reporting_currency: &str,
    ) -> AppResult<ValuationReport> {
        let method_override = input
            .method
            .as_deref()
            .map(CostingMethod::from_str)
            .transpose()?;
        let as_of = input.as_of_date.unwrap_or_else(Utc::now);

        let rows = sqlx::query_as::<_, ItemStockRow>(
            r#"
            SELECT i.id AS item_id, i.item_code, i.item_name, i.category,
                   i.costing_method, i.standard_cost,
                   COALESCE(SUM(b.quantity_on_hand), 0) AS quantity_on_hand
            FROM inventory_items i
            LEFT JOIN stock_balances b ON b.item_id = i.id
                AND (cardinality($1::text[]) = 0 OR b.location = ANY($1))
            WHERE ($2 OR i.is_active = true)
              AND (cardinality($3::text[]) = 0 OR i.category = ANY($3))
            GROUP BY i.id, i.item_code, i.item_name, i.category, i.costing_method, i.standard_cost
            ORDER BY i.item_code
            "#,
        )
        .bind(&input.locations)
        .bind(input.include_inactive)
        .bind(&input.categories)
        .fetch_all(&self.db)
        .await?;

        let mut lines = Vec::new();
        let mut total_value = Decimal::ZERO;

        for row in rows {
            if !input.include_zero_stock && row.quantity_on_hand <= Decimal::ZERO {
                continue;
            }
            let method = match method_override {
                Some(m) => m,
                None => CostingMethod::from_str(&row.costing_method)?,
            };

            let (receipts, total_issued) = self.receipt_history(row.item_id, as_of).await?;
            let unit_cost = unit_cost_by_method(method, &receipts, total_issued, row.standard_cost);
            let line_value = row.quantity_on_hand * unit_cost;
            total_value += line_value;

            lines.push(ValuationLine {
                item_id: row.item_id,
                item_code: row.item_code,
                item_name: row.item_name,
                category: row.category,
                method,
                quantity_on_hand: row.quantity_on_hand,
                unit_cost: Money::new(unit_cost, reporting_currency),
                total_value: Money::new(line_value, reporting_currency),
            });
        }

        Ok(ValuationReport {
            as_of_date: as_of,
            currency: reporting_currency.to_string(),
            total_value,
            item_count: lines.len(),
            lines,
        })
    }

    /// Receipt layers (oldest first) and cumulative issued magnitude for
    /// an item up to `as_of`, across all locations.
    async fn receipt_history(
        &self,
        item_id: Uuid,
        as_of: DateTime<Utc>,
    ) -> AppResult<(Vec<ReceiptLayer>, Decimal)> {
        let receipt_rows = sqlx::query_as::<_, ReceiptRow>(
            r#"
            SELECT quantity, unit_cost, transaction_date
            FROM inventory_transactions
            WHERE item_id = $1
              AND transaction_type = 'RECEIVE'
              AND transaction_date <= $2
            ORDER BY transaction_date ASC, id ASC
            "#,
        )
        .bind(item_id)
        .bind(as_of)
        .fetch_all(&self.db)
        .await?;

        let total_issued = sqlx::query_scalar::<_, Option<Decimal>>(
            r#"
            SELECT SUM(ABS(quantity))
            FROM inventory_transactions
            WHERE item_id = $1
              AND transaction_type IN ('ISSUE', 'TRANSFER_OUT', 'WASTE', 'ADJUST_DOWN')
              AND transaction_date <= $2
            "#,
        )
        .bind(item_id)
        .bind(as_of)
        .fetch_one(&self.db)
        .await?
        .unwrap_or(Decimal::ZERO);

        let receipts = receipt_rows
            .into_iter()
            .map(|r| ReceiptLayer {
                quantity: r.quantity.abs(),
                unit_cost: r.unit_cost,
                received_at: r.transaction_date,
            })
            .collect();

        Ok((receipts, total_issued))
    }

    async fn item_standard_cost(&self, item_id: Uuid) -> AppResult<(Decimal, String)> {
        sqlx::query_as::<_, (Decimal, String)>(
            "SELECT standard_cost, currency FROM inventory_items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))
    }
}
