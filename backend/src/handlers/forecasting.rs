//! HTTP handlers for demand forecasting and dead stock analysis

use std::time::Instant;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::calculations::dead_stock::DeadStockAssessment;
use shared::calculations::forecasting::ForecastMethod;
use shared::types::{OperationMetadata, OperationResult};

use crate::error::AppResult;
use crate::handlers::elapsed_ms;
use crate::middleware::CurrentUser;
use crate::services::forecasting::{ForecastingService, InventoryForecast};
use crate::AppState;

fn default_horizon() -> u32 {
    30
}

#[derive(Debug, Deserialize)]
pub struct ForecastRequest {
    pub item_ids: Option<Vec<Uuid>>,
    #[serde(default = "default_horizon")]
    pub horizon_days: u32,
    pub method: Option<ForecastMethod>,
}

#[derive(Debug, Deserialize)]
pub struct DeadStockQuery {
    pub threshold_days: Option<u32>,
}

/// Forecast demand per item over the requested horizon
pub async fn generate_forecast(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(request): Json<ForecastRequest>,
) -> AppResult<Json<OperationResult<Vec<InventoryForecast>>>> {
    let started = Instant::now();
    let method = request.method.unwrap_or(ForecastMethod::MovingAverage);
    let service = ForecastingService::new(state.db);
    let forecasts = service
        .generate_forecast(request.item_ids.as_deref(), request.horizon_days, method)
        .await?;
    Ok(Json(
        OperationResult::ok(forecasts)
            .with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}

/// Items with no recent movement, graded by obsolescence risk
pub async fn analyze_dead_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<DeadStockQuery>,
) -> AppResult<Json<OperationResult<Vec<DeadStockAssessment>>>> {
    let started = Instant::now();
    let threshold = query
        .threshold_days
        .unwrap_or(state.config.inventory.dead_stock_threshold_days);
    let service = ForecastingService::new(state.db);
    let assessments = service.analyze_dead_stock(threshold).await?;
    Ok(Json(
        OperationResult::ok(assessments)
            .with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}
