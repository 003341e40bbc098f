//! HTTP handlers for the Procurement Inventory Engine

pub mod analysis;
pub mod costing;
pub mod counts;
pub mod forecasting;
pub mod health;
pub mod ledger;
pub mod movement;

pub use analysis::*;
pub use costing::*;
pub use counts::*;
pub use forecasting::*;
pub use health::*;
pub use ledger::*;
pub use movement::*;

use std::time::Instant;

/// Elapsed wall time for the envelope's `processing_time_ms`.
pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
