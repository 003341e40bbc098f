//! Error handling for the inventory engine.
//!
//! Service errors surface to HTTP callers through the uniform result
//! envelope; `IntoResponse` covers the paths that fail before a handler
//! can build one (auth middleware, extractor failures).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use shared::types::{OperationError, OperationResult};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authorization errors (token failures answer from the middleware)
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Unsupported costing method: {0}")]
    UnsupportedCostingMethod(String),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("Reservation rollback: {0}")]
    ReservationRollback(String),

    #[error("Count not finalizable: {0}")]
    CountNotFinalizable(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code carried in envelopes and responses.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::UnsupportedCostingMethod(_) => "UNSUPPORTED_COSTING_METHOD",
            AppError::ReservationNotFound(_) => "RESERVATION_NOT_FOUND",
            AppError::ReservationRollback(_) => "RESERVATION_ROLLBACK",
            AppError::CountNotFinalizable(_) => "COUNT_NOT_FINALIZABLE",
            AppError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::ReservationNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientStock { .. }
            | AppError::UnsupportedCostingMethod(_)
            | AppError::CountNotFinalizable(_)
            | AppError::InvalidStateTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ReservationRollback(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert into the envelope error carried on failure results.
    pub fn to_operation_error(&self) -> OperationError {
        let message = match self {
            // Internal details stay in the logs, not in responses.
            AppError::Database(_) => "A database error occurred".to_string(),
            AppError::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };
        let error = OperationError::new(self.code(), message);
        if let AppError::Validation { field, .. } = self {
            error.with_field(field.clone())
        } else {
            error
        }
    }

}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Surface the first field error; the rest repeat on retry.
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, field_errors)| {
                let message = field_errors
                    .first()
                    .and_then(|e| e.message.clone())
                    .map(|m| m.into_owned())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("input".to_string(), "Invalid input".to_string()));
        AppError::Validation { field, message }
    }
}

impl From<shared::models::UnsupportedCostingMethod> for AppError {
    fn from(err: shared::models::UnsupportedCostingMethod) -> Self {
        AppError::UnsupportedCostingMethod(err.0)
    }
}

impl From<shared::models::UnknownEnumValue> for AppError {
    fn from(err: shared::models::UnknownEnumValue) -> Self {
        AppError::Validation {
            field: err.kind.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<shared::calculations::ledger::LedgerError> for AppError {
    fn from(err: shared::calculations::ledger::LedgerError) -> Self {
        use shared::calculations::ledger::LedgerError;
        match err {
            LedgerError::InsufficientStock {
                requested,
                available,
            } => AppError::InsufficientStock {
                requested,
                available,
            },
            LedgerError::NonPositiveQuantity(_) => AppError::Validation {
                field: "quantity".to_string(),
                message: err.to_string(),
            },
            LedgerError::NegativeUnitCost(_) => AppError::Validation {
                field: "unit_cost".to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!(error = %self, code = self.code(), "request failed");
        let body: OperationResult<serde_json::Value> =
            OperationResult::fail(self.to_operation_error());
        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers and services
pub type AppResult<T> = Result<T, AppError>;
