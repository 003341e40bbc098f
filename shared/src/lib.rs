//! Shared types and calculation core for the procurement inventory engine
//!
//! This crate contains the domain models, common types, validation
//! helpers, and the pure inventory algorithms (ledger arithmetic,
//! costing, ABC classification, forecasting, variance analysis) shared
//! between the backend service and its tests.

pub mod calculations;
pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
