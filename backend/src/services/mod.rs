//! Business logic services for the Procurement Inventory Engine

pub mod analysis;
pub mod costing;
pub mod counts;
pub mod forecasting;
pub mod ledger;
pub mod movement;

pub use analysis::AnalysisService;
pub use costing::CostingService;
pub use counts::PhysicalCountService;
pub use forecasting::ForecastingService;
pub use ledger::StockLedgerService;
pub use movement::MovementService;
