//! HTTP handlers for ledger and balance endpoints

use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use shared::models::{InventoryTransaction, StockBalance};
use shared::types::{DateRange, OperationMetadata, OperationResult};

use crate::error::{AppError, AppResult};
use crate::handlers::elapsed_ms;
use crate::middleware::CurrentUser;
use crate::services::ledger::{
    EnhancedStockStatus, RecordTransactionInput, StockLedgerService, UpsertBalanceInput,
};
use crate::AppState;

/// A recorded transaction together with the balance it produced
#[derive(Debug, serde::Serialize)]
pub struct TransactionOutcome {
    pub transaction: InventoryTransaction,
    pub balance: StockBalance,
}

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub location: Option<String>,
}

/// Record an inventory transaction against the stock ledger
pub async fn record_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordTransactionInput>,
) -> AppResult<Json<OperationResult<TransactionOutcome>>> {
    let started = Instant::now();
    let service = StockLedgerService::new(state.db);
    let (transaction, balance) = service
        .record_transaction(&current_user.0.actor_name, input)
        .await?;
    Ok(Json(
        OperationResult::ok(TransactionOutcome { transaction, balance })
            .with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}

/// Get the stock balance for an item at one location
pub async fn get_stock_balance(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path((item_id, location)): Path<(Uuid, String)>,
) -> AppResult<Json<OperationResult<StockBalance>>> {
    let started = Instant::now();
    let service = StockLedgerService::new(state.db);
    let balance = service.get_balance(item_id, &location).await?;
    Ok(Json(
        OperationResult::ok(balance).with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}

/// List an item's balances across all locations
pub async fn list_stock_balances(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<OperationResult<Vec<StockBalance>>>> {
    let started = Instant::now();
    let service = StockLedgerService::new(state.db);
    let balances = service.list_balances(item_id).await?;
    Ok(Json(
        OperationResult::ok(balances).with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}

/// Directly correct a stock balance. Requires the adjust permission.
pub async fn upsert_stock_balance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<UpsertBalanceInput>,
) -> AppResult<Json<OperationResult<StockBalance>>> {
    let started = Instant::now();
    if !current_user.0.has_permission("inventory", "adjust") {
        return Err(AppError::InsufficientPermissions);
    }
    let currency = state.config.inventory.reporting_currency.clone();
    let service = StockLedgerService::new(state.db);
    let balance = service.upsert_balance(input, &currency).await?;
    Ok(Json(
        OperationResult::ok(balance).with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}

/// Get an item's transaction history, optionally filtered
pub async fn get_transactions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<OperationResult<Vec<InventoryTransaction>>>> {
    let started = Instant::now();
    let range = match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => Some(DateRange { start, end }),
        _ => None,
    };
    let service = StockLedgerService::new(state.db);
    let transactions = service
        .get_transactions(item_id, query.location.as_deref(), range)
        .await?;
    Ok(Json(
        OperationResult::ok(transactions)
            .with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}

/// Enhanced stock status report across items
pub async fn get_stock_status(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<OperationResult<Vec<EnhancedStockStatus>>>> {
    let started = Instant::now();
    let service = StockLedgerService::new(state.db);
    let status = service
        .enhanced_stock_status(query.location.as_deref())
        .await?;
    Ok(Json(
        OperationResult::ok(status).with_metadata(OperationMetadata::timed(elapsed_ms(started))),
    ))
}
