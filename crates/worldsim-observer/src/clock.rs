//! Clock control endpoints.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/clock` | Current clock state |
//! | `POST` | `/api/clock/pause` | Stop advancing days |
//! | `POST` | `/api/clock/resume` | Resume advancing days |
//! | `POST` | `/api/clock/speed` | Set days per second (1, 2, 5 or 10) |
//!
//! Every change is broadcast as a `clock` notification.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use worldsim_core::ClockState;
use worldsim_types::NotificationKind;

use crate::error::ObserverError;
use crate::state::AppState;

/// Speeds a client may select.
pub const ALLOWED_SPEEDS: [f64; 4] = [1.0, 2.0, 5.0, 10.0];

/// Request body for `POST /api/clock/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// Simulated days per real second.
    pub speed: f64,
}

/// Current clock state.
pub async fn get_clock(State(state): State<Arc<AppState>>) -> Json<ClockState> {
    Json(state.clock.state())
}

/// Pause the simulation clock.
pub async fn pause(State(state): State<Arc<AppState>>) -> Json<ClockState> {
    let clock = state.clock.pause();
    announce(&state, &clock);
    Json(clock)
}

/// Resume the simulation clock.
pub async fn resume(State(state): State<Arc<AppState>>) -> Json<ClockState> {
    let clock = state.clock.resume();
    announce(&state, &clock);
    Json(clock)
}

/// Change the clock speed.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<Json<ClockState>, ObserverError> {
    if !ALLOWED_SPEEDS
        .iter()
        .any(|allowed| (allowed - body.speed).abs() < f64::EPSILON)
    {
        return Err(ObserverError::BadRequest(format!(
            "speed must be one of 1, 2, 5, 10 (got {})",
            body.speed
        )));
    }
    let clock = state.clock.set_speed(body.speed);
    announce(&state, &clock);
    Ok(Json(clock))
}

fn announce(state: &AppState, clock: &ClockState) {
    state.notify(NotificationKind::Clock, None, clock, state.now());
}
