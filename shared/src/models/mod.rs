//! Domain models for the procurement inventory engine

mod balance;
mod count;
mod item;
mod reservation;
mod transaction;
mod transfer;

pub use balance::*;
pub use count::*;
pub use item::*;
pub use reservation::*;
pub use transaction::*;
pub use transfer::*;

/// Parse failure for a TEXT-backed enum column or API token
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownEnumValue {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownEnumValue {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
