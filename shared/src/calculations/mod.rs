//! Pure calculation core: ledger arithmetic, costing, classification,
//! forecasting, dead stock, and count variance.

pub mod classification;
pub mod costing;
pub mod dead_stock;
pub mod forecasting;
pub mod ledger;
pub mod variance;
