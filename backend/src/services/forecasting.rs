//! Forecasting engine: demand projection from ledger history plus dead
//! and slow-moving stock assessment.

use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::calculations::dead_stock::{self, DeadStockAssessment, DeadStockInput};
use shared::calculations::forecasting::{
    assess_risk, demand_variability, project, safety_stock, ForecastMethod, RiskLevel,
};

use crate::error::{AppError, AppResult};

/// Days of ledger history consumed by the forecast series
const HISTORY_DAYS: i64 = 365;

#[derive(Clone)]
pub struct ForecastingService {
    db: PgPool,
}

/// Forecast for one item over a horizon
#[derive(Debug, Clone, Serialize)]
pub struct InventoryForecast {
    pub item_id: Uuid,
    pub item_code: String,
    pub item_name: String,
    pub method: ForecastMethod,
    pub horizon_days: u32,
    pub current_stock: Decimal,
    pub projected_demand: f64,
    /// Floored at zero; a projected stockout inflates `risk` instead
    pub projected_ending_stock: f64,
    pub recommended_purchase_quantity: f64,
    pub forecast_accuracy: f64,
    pub confidence_level: f64,
    pub seasonality_factor: f64,
    pub trend_factor: f64,
    pub demand_variability: f64,
    pub safety_stock: f64,
    pub risk: RiskLevel,
}

#[derive(Debug, FromRow)]
struct ForecastItemRow {
    item_id: Uuid,
    item_code: String,
    item_name: String,
    current_stock: Decimal,
}

#[derive(Debug, FromRow)]
struct ConsumptionRow {
    day: chrono::NaiveDate,
    consumed: Decimal,
}

#[derive(Debug, FromRow)]
struct DeadStockRow {
    item_id: Uuid,
    current_stock: Decimal,
    stock_value: Decimal,
    last_movement_date: Option<chrono::NaiveDate>,
    usage_12m: Decimal,
}

impl ForecastingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Forecast demand for the given items (or all active items) over
    /// `horizon_days` using `method`.
    pub async fn generate_forecast(
        &self,
        item_ids: Option<&[Uuid]>,
        horizon_days: u32,
        method: ForecastMethod,
    ) -> AppResult<Vec<InventoryForecast>> {
        shared::validation::validate_horizon_days(horizon_days).map_err(|message| {
            AppError::Validation {
                field: "horizon_days".to_string(),
                message: message.to_string(),
            }
        })?;

        let items = sqlx::query_as::<_, ForecastItemRow>(
            r#"
            SELECT i.id AS item_id, i.item_code, i.item_name,
                   COALESCE(SUM(b.quantity_on_hand), 0) AS current_stock
            FROM inventory_items i
            LEFT JOIN stock_balances b ON b.item_id = i.id
            WHERE ($1::uuid[] IS NULL AND i.is_active = true)
               OR i.id = ANY($1)
            GROUP BY i.id, i.item_code, i.item_name
            ORDER BY i.item_code
            "#,
        )
        .bind(item_ids)
        .fetch_all(&self.db)
        .await?;

        let mut forecasts = Vec::with_capacity(items.len());
        for item in items {
            let series = self.consumption_series(item.item_id).await?;
            let projection = project(method, &series, horizon_days as usize);

            let variability = demand_variability(&series);
            let current = item.current_stock.to_f64().unwrap_or(0.0);
            let raw_ending = current - projection.projected_demand;
            let safety = safety_stock(projection.projected_demand, variability);

            forecasts.push(InventoryForecast {
                item_id: item.item_id,
                item_code: item.item_code,
                item_name: item.item_name,
                method,
                horizon_days,
                current_stock: item.current_stock,
                projected_demand: projection.projected_demand,
                projected_ending_stock: raw_ending.max(0.0),
                recommended_purchase_quantity: (projection.projected_demand + safety - current)
                    .max(0.0),
                forecast_accuracy: projection.accuracy,
                confidence_level: projection.accuracy * 100.0,
                seasonality_factor: projection.seasonality_factor,
                trend_factor: projection.trend_factor,
                demand_variability: variability,
                safety_stock: safety,
                risk: assess_risk(projection.accuracy, variability, raw_ending),
            });
        }

        Ok(forecasts)
    }

    /// Dead/slow-moving stock assessment from real movement history.
    pub async fn analyze_dead_stock(
        &self,
        threshold_days: u32,
    ) -> AppResult<Vec<DeadStockAssessment>> {
        let rows = sqlx::query_as::<_, DeadStockRow>(
            r#"
            SELECT i.id AS item_id,
                   COALESCE(SUM(b.quantity_on_hand), 0) AS current_stock,
                   COALESCE(SUM(b.quantity_on_hand * b.average_cost), 0) AS stock_value,
                   MAX(b.last_movement_date)::date AS last_movement_date,
                   COALESCE((
                       SELECT SUM(ABS(t.quantity))
                       FROM inventory_transactions t
                       WHERE t.item_id = i.id
                         AND t.transaction_type IN ('ISSUE', 'TRANSFER_OUT', 'WASTE')
                         AND t.transaction_date >= NOW() - INTERVAL '12 months'
                   ), 0) AS usage_12m
            FROM inventory_items i
            LEFT JOIN stock_balances b ON b.item_id = i.id
            WHERE i.is_active = true
            GROUP BY i.id
            HAVING COALESCE(SUM(b.quantity_on_hand), 0) > 0
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let today = Utc::now().date_naive();
        let threshold = i64::from(threshold_days);

        let assessments = rows
            .into_iter()
            .filter(|r| {
                r.last_movement_date
                    .map_or(true, |d| (today - d).num_days() >= threshold)
            })
            .map(|r| {
                dead_stock::assess(
                    &DeadStockInput {
                        item_id: r.item_id,
                        current_stock: r.current_stock,
                        stock_value: r.stock_value,
                        last_movement_date: r.last_movement_date,
                        avg_monthly_usage: r.usage_12m / Decimal::from(12),
                    },
                    today,
                )
            })
            .collect();

        Ok(assessments)
    }

    /// Per-day consumption over the trailing year, zero-filled, oldest
    /// first.
    async fn consumption_series(&self, item_id: Uuid) -> AppResult<Vec<f64>> {
        let start = Utc::now().date_naive() - Duration::days(HISTORY_DAYS - 1);

        let rows = sqlx::query_as::<_, ConsumptionRow>(
            r#"
            SELECT transaction_date::date AS day, SUM(ABS(quantity)) AS consumed
            FROM inventory_transactions
            WHERE item_id = $1
              AND transaction_type IN ('ISSUE', 'TRANSFER_OUT', 'WASTE')
              AND transaction_date::date >= $2
            GROUP BY transaction_date::date
            ORDER BY day ASC
            "#,
        )
        .bind(item_id)
        .bind(start)
        .fetch_all(&self.db)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut series = vec![0.0; HISTORY_DAYS as usize];
        for row in rows {
            let offset = (row.day - start).num_days();
            if (0..HISTORY_DAYS).contains(&offset) {
                series[offset as usize] = row.consumed.to_f64().unwrap_or(0.0);
            }
        }
        Ok(series)
    }
}
