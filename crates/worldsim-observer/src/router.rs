//! Axum router construction.
//!
//! Assembles the clock, unit and operation routes plus the notification
//! `WebSocket` into a single [`Router`], with CORS open for dashboard
//! development and request tracing on every route.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{clock, operations, units, ws};

/// Build the complete router for the observer server.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::ws_notifications))
        // Clock
        .route("/api/clock", get(clock::get_clock))
        .route("/api/clock/pause", post(clock::pause))
        .route("/api/clock/resume", post(clock::resume))
        .route("/api/clock/speed", post(clock::set_speed))
        // Units
        .route("/api/countries/{code}/units", get(units::list_units))
        .route("/api/countries/{code}/units/{id}", get(units::get_unit))
        .route("/api/countries/{code}/units/{id}/deploy", post(units::deploy))
        .route("/api/countries/{code}/units/{id}/return", post(units::return_to_base))
        .route("/api/countries/{code}/units/{id}/transfer", post(units::transfer))
        .route("/api/countries/{code}/units/{id}/resupply", post(units::resupply))
        .route("/api/countries/{code}/units/{id}/repair", post(units::repair))
        // Operations
        .route(
            "/api/countries/{code}/operations",
            get(operations::list_operations).post(operations::create),
        )
        .route("/api/countries/{code}/operations/plan", post(operations::plan))
        .route("/api/countries/{code}/operations/process", post(operations::process))
        .route("/api/countries/{code}/operations/{id}/start", post(operations::start))
        .route("/api/countries/{code}/operations/{id}/cancel", post(operations::cancel))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
