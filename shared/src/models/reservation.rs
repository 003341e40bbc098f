//! Stock reservation models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A soft hold on available stock for a future need.
///
/// Creating a reservation increments `quantity_reserved` on the backing
/// balance; releasing decrements it. `remaining_quantity` tracks how much
/// of the original hold is still outstanding across partial releases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReservation {
    pub id: Uuid,
    pub item_id: Uuid,
    pub location: String,
    pub quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub purpose: ReservationPurpose,
    pub priority: ReservationPriority,
    pub status: ReservationStatus,
    pub reference_number: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub reserved_by: String,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

/// What the hold is for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReservationPurpose {
    Order,
    Production,
    Transfer,
    Allocation,
}

impl ReservationPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationPurpose::Order => "order",
            ReservationPurpose::Production => "production",
            ReservationPurpose::Transfer => "transfer",
            ReservationPurpose::Allocation => "allocation",
        }
    }
}

impl FromStr for ReservationPurpose {
    type Err = super::UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" => Ok(ReservationPurpose::Order),
            "production" => Ok(ReservationPurpose::Production),
            "transfer" => Ok(ReservationPurpose::Transfer),
            "allocation" => Ok(ReservationPurpose::Allocation),
            other => Err(super::UnknownEnumValue::new("reservation_purpose", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ReservationPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl ReservationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationPriority::Low => "low",
            ReservationPriority::Normal => "normal",
            ReservationPriority::High => "high",
            ReservationPriority::Urgent => "urgent",
        }
    }
}

impl FromStr for ReservationPriority {
    type Err = super::UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(ReservationPriority::Low),
            "normal" => Ok(ReservationPriority::Normal),
            "high" => Ok(ReservationPriority::High),
            "urgent" => Ok(ReservationPriority::Urgent),
            other => Err(super::UnknownEnumValue::new("reservation_priority", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Active,
    PartialFulfilled,
    Fulfilled,
    Cancelled,
    Expired,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Active => "active",
            ReservationStatus::PartialFulfilled => "partial_fulfilled",
            ReservationStatus::Fulfilled => "fulfilled",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Expired => "expired",
        }
    }

    /// Terminal statuses accept no further releases.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Fulfilled
                | ReservationStatus::Cancelled
                | ReservationStatus::Expired
        )
    }
}

impl FromStr for ReservationStatus {
    type Err = super::UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ReservationStatus::Active),
            "partial_fulfilled" => Ok(ReservationStatus::PartialFulfilled),
            "fulfilled" => Ok(ReservationStatus::Fulfilled),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            "expired" => Ok(ReservationStatus::Expired),
            other => Err(super::UnknownEnumValue::new("reservation_status", other)),
        }
    }
}

/// Outcome of applying a release to a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Some quantity was released; carries the quantity actually freed.
    Released { fully_released: bool },
    /// The reservation was already terminal; nothing changed.
    AlreadyTerminal,
}

impl StockReservation {
    /// Apply a release of up to `quantity` against the remaining hold.
    ///
    /// Releasing more than remains frees only the remainder; a release
    /// against a terminal reservation is a no-op. Returns the quantity
    /// actually freed together with the outcome.
    pub fn release(&mut self, quantity: Decimal, now: DateTime<Utc>) -> (Decimal, ReleaseOutcome) {
        if self.status.is_terminal() {
            return (Decimal::ZERO, ReleaseOutcome::AlreadyTerminal);
        }
        let freed = quantity.min(self.remaining_quantity).max(Decimal::ZERO);
        self.remaining_quantity -= freed;
        if self.remaining_quantity <= Decimal::ZERO {
            self.remaining_quantity = Decimal::ZERO;
            self.status = ReservationStatus::Fulfilled;
            self.released_at = Some(now);
            (freed, ReleaseOutcome::Released {
                fully_released: true,
            })
        } else {
            self.status = ReservationStatus::PartialFulfilled;
            (freed, ReleaseOutcome::Released {
                fully_released: false,
            })
        }
    }
}
