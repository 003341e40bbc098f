//! HTTP handlers for transfers and reservations

use std::time::Instant;

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use shared::models::{StockReservation, TransferSummary};
use shared::types::{OperationMetadata, OperationResult};

use crate::error::AppResult;
use crate::handlers::elapsed_ms;
use crate::middleware::CurrentUser;
use crate::services::movement::{
    BatchTransferInput, BatchTransferResult, CreateReservationInput, MovementService,
    ReleaseReservationInput, TransferInput,
};
use crate::AppState;

/// Transfer stock between locations as paired ledger entries
pub async fn execute_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<TransferInput>,
) -> AppResult<Json<OperationResult<TransferSummary>>> {
    let started = Instant::now();
    let service = MovementService::new(state.db);
    let (summary, warnings) = service
        .execute_transfer(&current_user.0.actor_name, input)
        .await?;
    Ok(Json(
        OperationResult::ok_with_warnings(summary, warnings)
            .with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}

/// Run a bulk transfer in concurrent chunks
pub async fn execute_batch_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<BatchTransferInput>,
) -> AppResult<Json<OperationResult<BatchTransferResult>>> {
    let started = Instant::now();
    let service = MovementService::new(state.db);
    let result = service
        .execute_batch_transfer(&current_user.0.actor_name, input)
        .await?;
    Ok(Json(
        OperationResult::ok(result).with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}

/// Reserve available stock for a purpose
pub async fn create_reservation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateReservationInput>,
) -> AppResult<Json<OperationResult<StockReservation>>> {
    let started = Instant::now();
    let service = MovementService::new(state.db);
    let reservation = service
        .create_reservation(&current_user.0.actor_name, input)
        .await?;
    Ok(Json(
        OperationResult::ok(reservation)
            .with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}

/// Release a reservation, partially or fully
pub async fn release_reservation(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(reservation_id): Path<Uuid>,
    Json(input): Json<ReleaseReservationInput>,
) -> AppResult<Json<OperationResult<StockReservation>>> {
    let started = Instant::now();
    let service = MovementService::new(state.db);
    let reservation = service.release_reservation(reservation_id, input).await?;
    Ok(Json(
        OperationResult::ok(reservation)
            .with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}
