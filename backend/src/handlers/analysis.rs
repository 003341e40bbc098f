//! HTTP handlers for ABC analysis and reorder suggestions

use std::time::Instant;

use axum::{extract::State, Json};

use shared::calculations::classification::ReorderSuggestion;
use shared::types::{OperationMetadata, OperationResult};

use crate::error::AppResult;
use crate::handlers::elapsed_ms;
use crate::middleware::CurrentUser;
use crate::services::analysis::{AbcAnalysisReport, AnalysisService};
use crate::AppState;

/// Run an ABC classification over annual usage and persist the classes
pub async fn perform_abc_analysis(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<OperationResult<AbcAnalysisReport>>> {
    let started = Instant::now();
    let service = AnalysisService::new(state.db);
    let report = service.perform_abc_analysis().await?;
    Ok(Json(
        OperationResult::ok(report).with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}

/// Reorder suggestions for items at or below their reorder point
pub async fn get_reorder_suggestions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<OperationResult<Vec<ReorderSuggestion>>>> {
    let started = Instant::now();
    let service = AnalysisService::new(state.db);
    let suggestions = service.generate_reorder_suggestions().await?;
    Ok(Json(
        OperationResult::ok(suggestions)
            .with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}
