//! Route definitions for the clinic operations API

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
        // Protected routes - supply catalogue
        .nest("/supplies", supply_routes(state.clone()))
        // Protected routes - stock movements and approval
        .nest("/transactions", transaction_routes(state.clone()))
        // Protected routes - stock reports
        .nest("/stock", stock_routes(state.clone()))
        // Protected routes - appointments
        .nest("/appointments", appointment_routes(state.clone()))
        // Protected routes - patients
        .nest("/patients", patient_routes(state.clone()))
        // Protected routes - in-app notifications
        .nest("/notifications", notification_routes(state))
}

/// Supply catalogue routes (protected)
fn supply_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_supplies).post(handlers::create_supply),
        )
        .route(
            "/:supply_id",
            get(handlers::get_supply)
                .put(handlers::update_supply)
                .delete(handlers::deactivate_supply),
        )
        .route("/:supply_id/stock", get(handlers::get_supply_stock))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Supply transaction routes (protected)
fn transaction_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_transactions).post(handlers::record_transaction),
        )
        .route("/:transaction_id", get(handlers::get_transaction))
        .route(
            "/:transaction_id/approve",
            post(handlers::approve_transaction),
        )
        .route("/:transaction_id/reject", post(handlers::reject_transaction))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Stock report routes (protected)
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/low", get(handlers::get_low_stock))
        .route("/expiring", get(handlers::get_expiring_stock))
        .route("/expired", get(handlers::get_expired_stock))
        .route("/refresh-expiry", post(handlers::refresh_expiry))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Appointment routes (protected)
fn appointment_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_appointments))
        .route(
            "/pending",
            get(handlers::list_pending_appointments).post(handlers::request_appointment),
        )
        .route(
            "/pending/:request_id/approve",
            post(handlers::approve_appointment),
        )
        .route(
            "/pending/:request_id/decline",
            post(handlers::decline_appointment),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Patient routes (protected)
fn patient_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route(
            "/fix-missing-fields",
            post(handlers::fix_missing_patient_fields),
        )
        .route("/:patient_id", get(handlers::get_patient))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Notification routes (protected)
fn notification_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_notifications))
        .route(
            "/:notification_id/read",
            post(handlers::mark_notification_read),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
