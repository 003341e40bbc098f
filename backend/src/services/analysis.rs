//! Classification & reorder engine: ABC analysis over trailing annual
//! consumption and ranked replenishment suggestions.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::calculations::classification::{
    build_suggestion, classify_abc, rank_suggestions, AbcResult, ReorderInput, ReorderSuggestion,
    UsageRecord,
};

use crate::error::AppResult;

#[derive(Clone)]
pub struct AnalysisService {
    db: PgPool,
}

/// ABC analysis output with per-class totals
#[derive(Debug, Clone, Serialize)]
pub struct AbcAnalysisReport {
    pub items: Vec<AbcResultLine>,
    pub class_a_count: usize,
    pub class_b_count: usize,
    pub class_c_count: usize,
    pub total_annual_value: Decimal,
}

/// One row of the ABC report, enriched with item identity
#[derive(Debug, Clone, Serialize)]
pub struct AbcResultLine {
    pub item_code: String,
    pub item_name: String,
    #[serde(flatten)]
    pub result: AbcResult,
}

#[derive(Debug, FromRow)]
struct AnnualUsageRow {
    item_id: Uuid,
    item_code: String,
    item_name: String,
    annual_usage: Decimal,
    avg_transaction_cost: Decimal,
}

#[derive(Debug, FromRow)]
struct ReorderCandidateRow {
    item_id: Uuid,
    current_stock: Decimal,
    usage_90d: Decimal,
    lead_time_days: i32,
    reorder_quantity: Decimal,
}

impl AnalysisService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// ABC classification over the trailing 12 months of consumption.
    ///
    /// Persists the assigned class back onto the item master so other
    /// reports can read it without recomputing.
    pub async fn perform_abc_analysis(&self) -> AppResult<AbcAnalysisReport> {
        let rows = sqlx::query_as::<_, AnnualUsageRow>(
            r#"
            SELECT i.id AS item_id, i.item_code, i.item_name,
                   COALESCE(SUM(ABS(t.quantity)), 0) AS annual_usage,
                   COALESCE(AVG(t.unit_cost), i.standard_cost) AS avg_transaction_cost
            FROM inventory_items i
            LEFT JOIN inventory_transactions t ON t.item_id = i.id
                AND t.transaction_type IN ('ISSUE', 'TRANSFER_OUT', 'WASTE')
                AND t.transaction_date >= NOW() - INTERVAL '12 months'
            WHERE i.is_active = true
            GROUP BY i.id, i.item_code, i.item_name, i.standard_cost
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut identities = std::collections::HashMap::new();
        let records: Vec<UsageRecord> = rows
            .into_iter()
            .map(|r| {
                identities.insert(r.item_id, (r.item_code, r.item_name));
                UsageRecord {
                    item_id: r.item_id,
                    annual_usage: r.annual_usage,
                    annual_value: r.annual_usage * r.avg_transaction_cost,
                }
            })
            .collect();

        let total_annual_value: Decimal = records.iter().map(|r| r.annual_value).sum();
        let results = classify_abc(records);

        let mut class_a_count = 0;
        let mut class_b_count = 0;
        let mut class_c_count = 0;
        let mut items = Vec::with_capacity(results.len());

        for result in results {
            match result.class {
                shared::models::AbcClass::A => class_a_count += 1,
                shared::models::AbcClass::B => class_b_count += 1,
                shared::models::AbcClass::C => class_c_count += 1,
            }

            sqlx::query("UPDATE inventory_items SET abc_class = $1, updated_at = NOW() WHERE id = $2")
                .bind(result.class.as_str())
                .bind(result.item_id)
                .execute(&self.db)
                .await?;

            let (item_code, item_name) = identities
                .remove(&result.item_id)
                .unwrap_or_else(|| (String::new(), String::new()));
            items.push(AbcResultLine {
                item_code,
                item_name,
                result,
            });
        }

        tracing::info!(
            class_a = class_a_count,
            class_b = class_b_count,
            class_c = class_c_count,
            "ABC classification refreshed"
        );

        Ok(AbcAnalysisReport {
            items,
            class_a_count,
            class_b_count,
            class_c_count,
            total_annual_value,
        })
    }

    /// Ranked reorder suggestions for items at or below their reorder
    /// point, from trailing-90-day average daily usage.
    pub async fn generate_reorder_suggestions(&self) -> AppResult<Vec<ReorderSuggestion>> {
        let rows = sqlx::query_as::<_, ReorderCandidateRow>(
            r#"
            SELECT i.id AS item_id,
                   COALESCE(SUM(b.quantity_on_hand), 0) AS current_stock,
                   COALESCE((
                       SELECT SUM(ABS(t.quantity))
                       FROM inventory_transactions t
                       WHERE t.item_id = i.id
                         AND t.transaction_type IN ('ISSUE', 'TRANSFER_OUT', 'WASTE')
                         AND t.transaction_date >= NOW() - INTERVAL '90 days'
                   ), 0) AS usage_90d,
                   i.lead_time_days, i.reorder_quantity
            FROM inventory_items i
            LEFT JOIN stock_balances b ON b.item_id = i.id
            WHERE i.is_active = true
            GROUP BY i.id, i.lead_time_days, i.reorder_point, i.reorder_quantity
            HAVING COALESCE(SUM(b.quantity_on_hand), 0) <= i.reorder_point
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let today = Utc::now().date_naive();
        let mut suggestions: Vec<ReorderSuggestion> = rows
            .into_iter()
            .map(|r| {
                let input = ReorderInput {
                    item_id: r.item_id,
                    current_stock: r.current_stock,
                    avg_daily_usage: r.usage_90d / Decimal::from(90),
                    lead_time_days: r.lead_time_days,
                    reorder_quantity: r.reorder_quantity,
                };
                build_suggestion(&input, today)
            })
            .collect();

        rank_suggestions(&mut suggestions);
        Ok(suggestions)
    }
}
