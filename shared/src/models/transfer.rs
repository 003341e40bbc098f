//! Transfer and batch-transfer models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Items processed concurrently within one batch-transfer chunk.
pub const BATCH_CHUNK_SIZE: usize = 10;

/// One item line in a transfer request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferItem {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub batch_number: Option<String>,
    pub notes: Option<String>,
}

/// Result line for one item of an executed transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferItemResult {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub transferred: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Summary of an executed multi-item transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSummary {
    pub from_location: String,
    pub to_location: String,
    pub items: Vec<TransferItemResult>,
    pub transferred_count: usize,
    pub failed_count: usize,
}

/// A grouped bulk-transfer operation processed in chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTransferOperation {
    pub id: Uuid,
    pub batch_number: String,
    pub from_location: String,
    pub to_location: String,
    pub status: BatchOperationStatus,
    pub total_items: u32,
    pub completed_items: u32,
    pub failed_items: u32,
    pub completion_percentage: f64,
    pub requested_by: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One item line of a batch-transfer operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTransferItem {
    pub id: Uuid,
    pub operation_id: Uuid,
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub status: BatchItemStatus,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchOperationStatus {
    Pending,
    InProgress,
    Completed,
    PartialCompleted,
    Failed,
}

impl BatchOperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchOperationStatus::Pending => "pending",
            BatchOperationStatus::InProgress => "in_progress",
            BatchOperationStatus::Completed => "completed",
            BatchOperationStatus::PartialCompleted => "partial_completed",
            BatchOperationStatus::Failed => "failed",
        }
    }

    /// Terminal status once every item line has resolved.
    pub fn from_counts(completed: u32, total: u32) -> Self {
        if total > 0 && completed == total {
            BatchOperationStatus::Completed
        } else if completed > 0 {
            BatchOperationStatus::PartialCompleted
        } else {
            BatchOperationStatus::Failed
        }
    }
}

impl FromStr for BatchOperationStatus {
    type Err = super::UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BatchOperationStatus::Pending),
            "in_progress" => Ok(BatchOperationStatus::InProgress),
            "completed" => Ok(BatchOperationStatus::Completed),
            "partial_completed" => Ok(BatchOperationStatus::PartialCompleted),
            "failed" => Ok(BatchOperationStatus::Failed),
            other => Err(super::UnknownEnumValue::new("batch_operation_status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchItemStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl BatchItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchItemStatus::Pending => "pending",
            BatchItemStatus::InProgress => "in_progress",
            BatchItemStatus::Completed => "completed",
            BatchItemStatus::Failed => "failed",
        }
    }
}

impl FromStr for BatchItemStatus {
    type Err = super::UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BatchItemStatus::Pending),
            "in_progress" => Ok(BatchItemStatus::InProgress),
            "completed" => Ok(BatchItemStatus::Completed),
            "failed" => Ok(BatchItemStatus::Failed),
            other => Err(super::UnknownEnumValue::new("batch_item_status", other)),
        }
    }
}

/// Running completion percentage for a batch operation.
pub fn completion_percentage(resolved: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(resolved) / f64::from(total) * 100.0
    }
}
