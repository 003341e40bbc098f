//! HTTP handlers for physical counts and spot checks

use std::time::Instant;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use shared::models::{PhysicalCount, PhysicalCountItem};
use shared::types::{OperationMetadata, OperationResult};

use crate::error::{AppError, AppResult};
use crate::handlers::elapsed_ms;
use crate::middleware::CurrentUser;
use crate::services::counts::{
    CountWithItems, CreateCountInput, FinalizationResult, FinalizeCountInput,
    PhysicalCountService, SpotCheckInput, UpdateCountItemInput,
};
use crate::AppState;

/// An updated count line together with the refreshed session header
#[derive(Debug, Serialize)]
pub struct CountItemOutcome {
    pub item: PhysicalCountItem,
    pub count: PhysicalCount,
}

/// Create a count session over the stocked items at a location
pub async fn create_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateCountInput>,
) -> AppResult<Json<OperationResult<CountWithItems>>> {
    let started = Instant::now();
    let currency = state.config.inventory.reporting_currency.clone();
    let service = PhysicalCountService::new(state.db);
    let count = service
        .create_count(&current_user.0.actor_name, &currency, input)
        .await?;
    Ok(Json(
        OperationResult::ok(count).with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}

/// Record a counted quantity for one count line
pub async fn update_count_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(count_item_id): Path<Uuid>,
    Json(input): Json<UpdateCountItemInput>,
) -> AppResult<Json<OperationResult<CountItemOutcome>>> {
    let started = Instant::now();
    let service = PhysicalCountService::new(state.db);
    let (item, count, warnings) = service
        .update_count_item(&current_user.0.actor_name, count_item_id, input)
        .await?;
    Ok(Json(
        OperationResult::ok_with_warnings(CountItemOutcome { item, count }, warnings)
            .with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}

/// Finalize a count session, optionally raising a stock adjustment.
/// Requires the adjust permission.
pub async fn finalize_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(count_id): Path<Uuid>,
    Json(input): Json<FinalizeCountInput>,
) -> AppResult<Json<OperationResult<FinalizationResult>>> {
    let started = Instant::now();
    if !current_user.0.has_permission("inventory", "adjust") {
        return Err(AppError::InsufficientPermissions);
    }
    let service = PhysicalCountService::new(state.db);
    let result = service
        .finalize_count(&current_user.0.actor_name, count_id, input)
        .await?;
    Ok(Json(
        OperationResult::ok(result).with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}

/// Create an ad-hoc spot check with sampled items
pub async fn create_spot_check(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SpotCheckInput>,
) -> AppResult<Json<OperationResult<CountWithItems>>> {
    let started = Instant::now();
    let currency = state.config.inventory.reporting_currency.clone();
    let service = PhysicalCountService::new(state.db);
    let count = service
        .create_spot_check(&current_user.0.actor_name, &currency, input)
        .await?;
    Ok(Json(
        OperationResult::ok(count).with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}
