//! HTTP handlers for costing and valuation endpoints

use std::str::FromStr;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use shared::models::CostingMethod;
use shared::types::{Money, OperationMetadata, OperationResult};

use crate::error::AppResult;
use crate::handlers::elapsed_ms;
use crate::middleware::CurrentUser;
use crate::services::costing::{CostingService, ValuationInput, ValuationReport};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ItemCostQuery {
    pub method: Option<String>,
    pub as_of_date: Option<DateTime<Utc>>,
}

/// Unit cost of an item under a costing method
pub async fn get_item_cost(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Query(query): Query<ItemCostQuery>,
) -> AppResult<Json<OperationResult<Money>>> {
    let started = Instant::now();
    let method = match query.method.as_deref() {
        Some(token) => CostingMethod::from_str(token)?,
        None => CostingMethod::WeightedAverage,
    };
    let service = CostingService::new(state.db);
    let cost = service
        .cost_by_method(item_id, method, query.as_of_date)
        .await?;
    Ok(Json(
        OperationResult::ok(cost).with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}

/// Inventory valuation across locations and categories
pub async fn calculate_valuation(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<ValuationInput>,
) -> AppResult<Json<OperationResult<ValuationReport>>> {
    let started = Instant::now();
    let inventory = &state.config.inventory;
    let input = ValuationInput {
        include_inactive: input.include_inactive || inventory.valuation_include_inactive,
        include_zero_stock: input.include_zero_stock || inventory.valuation_include_zero_stock,
        ..input
    };
    let currency = state.config.inventory.reporting_currency.clone();
    let service = CostingService::new(state.db);
    let report = service.calculate_valuation(input, &currency).await?;
    Ok(Json(
        OperationResult::ok(report).with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}
