//! Route definitions for the Hospital Waste Tracking API

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - read-only catalogs
        .nest("/catalogs", catalog_routes())
        // Protected routes - label lots
        .nest("/lots", lot_routes())
        // Protected routes - label lookup
        .nest("/labels", label_routes())
        // Protected routes - open ledger + settlement
        .nest("/registro", registro_routes())
        // Protected routes - reports
        .nest("/reports", report_routes())
}

/// Catalog routes (protected, read-only)
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/areas", get(handlers::list_areas))
        .route("/bags", get(handlers::list_bags))
        .route("/categories", get(handlers::list_categories))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Label lot routes (protected)
fn lot_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_lots).post(handlers::issue_lot))
        .route(
            "/:lot_id",
            get(handlers::get_lot).delete(handlers::delete_lot),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Label lookup routes (protected)
fn label_routes() -> Router<AppState> {
    Router::new()
        .route("/:code", get(handlers::get_label))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Registro routes (protected)
fn registro_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_registros))
        .route("/current", get(handlers::current_registro))
        .route("/lineas", post(handlers::append_line))
        .route("/lineas/:linea_id", delete(handlers::remove_line))
        .route("/:registro_id", get(handlers::get_registro))
        .route("/:registro_id/close", post(handlers::close_registro))
        .route(
            "/:registro_id/document",
            get(handlers::get_settlement_document),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Report routes (protected)
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/registro/:registro_id", get(handlers::report_by_registro))
        .route(
            "/registro/:registro_id/csv",
            get(handlers::report_by_registro_csv),
        )
        .route("/daily", get(handlers::report_by_day))
        .route_layer(middleware::from_fn(auth_middleware))
}
