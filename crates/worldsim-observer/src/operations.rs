//! Operation endpoints.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/countries/{code}/operations` | Operations plus status counts |
//! | `POST` | `/api/countries/{code}/operations/plan` | Validate and estimate, no mutation |
//! | `POST` | `/api/countries/{code}/operations` | Create in `planning` |
//! | `POST` | `/api/countries/{code}/operations/{id}/start` | Dispatch the units |
//! | `POST` | `/api/countries/{code}/operations/{id}/cancel` | Cancel and recall |
//! | `POST` | `/api/countries/{code}/operations/process` | Settle movements and operations now |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use worldsim_military::{
    Arrival, OperationError, OperationLifecycle, OperationRequest, OperationSummary,
    OperationUpdate, PlanReport,
};
use worldsim_types::{
    ActiveOperation, Coordinates, CountryCode, ForceRoster, NotificationKind, OperationId, UnitId,
};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `plan`.
#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    /// Operation type name, e.g. `air_strike`.
    pub operation_type: String,
    /// Target location.
    pub target_location: Coordinates,
    /// Units to commit.
    pub unit_ids: Vec<UnitId>,
}

/// Response for the operation listing.
#[derive(Debug, Serialize)]
pub struct OperationsResponse {
    /// Every operation, live and historical.
    pub operations: Vec<ActiveOperation>,
    /// Counts by status.
    pub summary: OperationSummary,
}

/// Response for on-demand processing.
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    /// Units whose movement completed.
    pub arrivals: Vec<Arrival>,
    /// Operations that changed.
    pub updates: Vec<OperationUpdate>,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// List a country's operations.
pub async fn list_operations(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<OperationsResponse>, ObserverError> {
    let code = CountryCode::normalized(&code);
    let response = state.sessions.read(&code, |country| OperationsResponse {
        operations: country.forces.operations.clone(),
        summary: OperationLifecycle::operation_summary(&country.forces),
    })?;
    Ok(Json(response))
}

/// Validate a prospective operation without touching the snapshot.
///
/// Always answers 200 for a known country; a rejected plan carries
/// `valid: false` and the reason.
pub async fn plan(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(body): Json<PlanRequest>,
) -> Result<Json<PlanReport>, ObserverError> {
    let code = CountryCode::normalized(&code);
    let target = validated(body.target_location)?;
    let lifecycle = state.lifecycle(&code);
    let report = state.sessions.read(&code, |country| {
        PlanReport::from(lifecycle.plan(
            &country.forces,
            &body.operation_type,
            target,
            &body.unit_ids,
        ))
    })?;
    Ok(Json(report))
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Create an operation in `planning`.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(mut body): Json<OperationRequest>,
) -> Result<(StatusCode, Json<ActiveOperation>), ObserverError> {
    let code = CountryCode::normalized(&code);
    body.target_location = validated(body.target_location)?;
    let now = state.now();
    let lifecycle = state.lifecycle(&code);
    let op = state.sessions.transact(&code, |country| {
        lifecycle
            .create(&mut country.forces, &body, now)
            .map_err(ObserverError::from)
    })?;
    state.notify(NotificationKind::OperationUpdated, Some(&code), &op, now);
    Ok((StatusCode::CREATED, Json(op)))
}

/// Dispatch an operation's units toward the target.
pub async fn start(
    State(state): State<Arc<AppState>>,
    Path((code, id)): Path<(String, String)>,
) -> Result<Json<ActiveOperation>, ObserverError> {
    transition(&state, &code, &OperationId::from(id), OperationLifecycle::start)
}

/// Cancel a live operation and recall its units.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path((code, id)): Path<(String, String)>,
) -> Result<Json<ActiveOperation>, ObserverError> {
    transition(&state, &code, &OperationId::from(id), OperationLifecycle::cancel)
}

/// Settle due movements and advance live operations at the current
/// simulated instant, outside the daily tick.
pub async fn process(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<ProcessResponse>, ObserverError> {
    let code = CountryCode::normalized(&code);
    let now = state.now();
    let lifecycle = state.lifecycle(&code);
    let response = state.sessions.transact(&code, |country| {
        let arrivals = lifecycle.motion().process_movements(&mut country.forces, now);
        let updates = state
            .with_rng(|rng| lifecycle.process_operations(&mut country.forces, now, rng));
        Ok::<_, ObserverError>(ProcessResponse { arrivals, updates })
    })?;

    for arrival in &response.arrivals {
        state.notify(NotificationKind::UnitArrived, Some(&code), arrival, now);
    }
    for update in &response.updates {
        let kind = if update.is_terminal() {
            NotificationKind::OperationCompleted
        } else {
            NotificationKind::OperationUpdated
        };
        state.notify(kind, Some(&code), update, now);
    }
    Ok(Json(response))
}

/// A lifecycle method moving one operation to its next status.
type Transition = fn(
    &OperationLifecycle,
    &mut ForceRoster,
    &OperationId,
    DateTime<Utc>,
) -> Result<ActiveOperation, OperationError>;

fn transition(
    state: &AppState,
    code: &str,
    operation_id: &OperationId,
    apply: Transition,
) -> Result<Json<ActiveOperation>, ObserverError> {
    let code = CountryCode::normalized(code);
    let now = state.now();
    let lifecycle = state.lifecycle(&code);
    let op = state.sessions.transact(&code, |country| {
        apply(&lifecycle, &mut country.forces, operation_id, now).map_err(ObserverError::from)
    })?;
    state.notify(NotificationKind::OperationUpdated, Some(&code), &op, now);
    Ok(Json(op))
}

fn validated(target: Coordinates) -> Result<Coordinates, ObserverError> {
    Ok(Coordinates::new(target.lat, target.lng)?)
}
