//! Route definitions for the Procurement Inventory Engine

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - inventory engine
        .nest("/inventory", inventory_routes())
}

/// Inventory routes (protected)
fn inventory_routes() -> Router<AppState> {
    Router::new()
        // Ledger
        .route("/transactions", post(handlers::record_transaction))
        .route("/items/:item_id/transactions", get(handlers::get_transactions))
        .route("/items/:item_id/balances", get(handlers::list_stock_balances))
        .route(
            "/items/:item_id/balances/:location",
            get(handlers::get_stock_balance),
        )
        .route("/balances", put(handlers::upsert_stock_balance))
        .route("/status", get(handlers::get_stock_status))
        // Costing and valuation
        .route("/items/:item_id/cost", get(handlers::get_item_cost))
        .route("/valuation", post(handlers::calculate_valuation))
        // Analytics
        .route("/analysis/abc", post(handlers::perform_abc_analysis))
        .route(
            "/analysis/reorder-suggestions",
            get(handlers::get_reorder_suggestions),
        )
        .route("/forecast", post(handlers::generate_forecast))
        .route("/dead-stock", get(handlers::analyze_dead_stock))
        // Movements
        .route("/transfers", post(handlers::execute_transfer))
        .route("/transfers/batch", post(handlers::execute_batch_transfer))
        .route("/reservations", post(handlers::create_reservation))
        .route(
            "/reservations/:reservation_id/release",
            post(handlers::release_reservation),
        )
        // Physical counts
        .route("/counts", post(handlers::create_count))
        .route("/counts/items/:count_item_id", put(handlers::update_count_item))
        .route("/counts/:count_id/finalize", post(handlers::finalize_count))
        .route("/spot-checks", post(handlers::create_spot_check))
        .route_layer(middleware::from_fn(auth_middleware))
}
