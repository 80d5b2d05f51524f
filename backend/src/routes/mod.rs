//! Route definitions for the Warehouse Management Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - catalog
        .nest("/products", product_routes())
        .nest("/suppliers", supplier_routes())
        // Protected routes - alert ledger
        .nest("/alerts", alert_routes())
        // Protected routes - replenishment planner
        .nest("/purchase-order-drafts", draft_routes())
        // Protected routes - bill reconciliation
        .nest("/bills", bill_routes())
}

/// Catalog routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products))
        .route("/low-stock", get(handlers::list_below_threshold))
        .route("/:product_id", get(handlers::get_product))
        .route("/:product_id/adjust-stock", post(handlers::adjust_stock))
        .route("/:product_id/movements", get(handlers::list_stock_movements))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Supplier routes (protected)
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Alert ledger routes (protected)
fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_alerts).post(handlers::create_alert))
        .route("/sweep", post(handlers::trigger_sweep))
        .route("/:alert_id", get(handlers::get_alert))
        .route("/:alert_id/acknowledge", post(handlers::acknowledge_alert))
        .route("/:alert_id/resolve", post(handlers::resolve_alert))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Purchase-order draft routes (protected)
fn draft_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_drafts).post(handlers::create_draft))
        .route("/:draft_id", get(handlers::get_draft))
        .route("/:draft_id/submit", post(handlers::submit_draft))
        .route("/:draft_id/sync", post(handlers::sync_draft))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Bill reconciliation routes (protected)
fn bill_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_bills))
        .route("/scan", post(handlers::scan_bill))
        .route("/reconcile", post(handlers::reconcile_bill))
        .route("/:bill_id", get(handlers::get_bill))
        .route_layer(middleware::from_fn(auth_middleware))
}
