//! Route definitions for the warehouse inventory API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - batch ledger
        .nest("/batches", batch_routes(state.clone()))
        // Protected routes - movements
        .nest("/movements", movement_routes(state.clone()))
        // Protected routes - transfers and validation
        .nest("/transfers", transfer_routes(state))
}

/// Batch ledger routes (protected, read-only; quantities change only
/// through movements and transfers)
fn batch_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_batches))
        .route("/:batch_id", get(handlers::get_batch))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Movement routes (protected)
fn movement_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_movements).post(handlers::create_movement))
        .route("/:movement_id", get(handlers::get_movement))
        .route("/:movement_id/execute", post(handlers::execute_movement))
        .route("/:movement_id/cancel", post(handlers::cancel_movement))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Transfer and validation routes (protected)
fn transfer_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_transfers).post(handlers::create_transfer))
        .route("/:transfer_id", get(handlers::get_transfer))
        .route("/:transfer_id/execute", post(handlers::execute_transfer))
        .route("/:transfer_id/cancel", post(handlers::cancel_transfer))
        .route("/:transfer_id/validation/start", post(handlers::start_validation))
        .route("/:transfer_id/validation/scan", post(handlers::scan))
        .route("/:transfer_id/validation/complete", post(handlers::complete_validation))
        .route("/:transfer_id/discrepancies", get(handlers::get_discrepancies))
        .route("/:transfer_id/validation-log", get(handlers::list_validation_log))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
