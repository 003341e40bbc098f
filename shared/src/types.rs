//! Common types used across the inventory engine

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount with its currency code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Money {
    pub amount: Decimal,
    pub currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency)
    }
}

/// Uniform result envelope returned by every façade operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<OperationMetadata>,
}

impl<T> OperationResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            warnings: None,
            metadata: None,
        }
    }

    pub fn ok_with_warnings(data: T, warnings: Vec<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            warnings: if warnings.is_empty() {
                None
            } else {
                Some(warnings)
            },
            metadata: None,
        }
    }

    pub fn fail(error: OperationError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            warnings: None,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: OperationMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Machine-readable error carried inside a failure envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl OperationError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Envelope metadata: timing plus optional pagination
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OperationMetadata {
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

impl OperationMetadata {
    pub fn timed(processing_time_ms: u64) -> Self {
        Self {
            processing_time_ms,
            pagination: None,
        }
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

/// Date range for ledger and analytics queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DateRange {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}
