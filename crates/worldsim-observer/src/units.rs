//! Unit endpoints.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/countries/{code}/units` | Roster plus force summary |
//! | `GET` | `/api/countries/{code}/units/{id}` | One unit and whether it can move |
//! | `POST` | `/api/countries/{code}/units/{id}/deploy` | Send a unit to coordinates |
//! | `POST` | `/api/countries/{code}/units/{id}/return` | Send a unit home |
//! | `POST` | `/api/countries/{code}/units/{id}/transfer` | Rebase a unit |
//! | `POST` | `/api/countries/{code}/units/{id}/resupply` | Refuel and rearm at base |
//! | `POST` | `/api/countries/{code}/units/{id}/repair` | Repair at a capable base |
//!
//! Mutations run inside the country's session, are saved only when they
//! succeed, and are broadcast as `unit_updated` afterwards.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use worldsim_military::{ForceSummary, MovementError, MovementReport, UnitMotionEngine, can_move};
use worldsim_types::{
    BaseId, Coordinates, CountryCode, ForceRoster, MilitaryUnit, NotificationKind, UnitId,
};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `deploy`.
#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    /// Destination latitude.
    pub lat: f64,
    /// Destination longitude.
    pub lng: f64,
    /// Arrive immediately instead of travelling.
    #[serde(default)]
    pub instant: bool,
}

/// Request body for `return`.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnRequest {
    /// Arrive immediately instead of travelling.
    #[serde(default)]
    pub instant: bool,
}

/// Request body for `transfer`.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    /// The new home base.
    pub base_id: BaseId,
    /// Arrive immediately instead of travelling.
    #[serde(default)]
    pub instant: bool,
}

/// Request body for `repair`.
#[derive(Debug, Default, Deserialize)]
pub struct RepairRequest {
    /// Health points to restore; 20 when absent.
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Response for the roster listing.
#[derive(Debug, Serialize)]
pub struct UnitsResponse {
    /// Every unit in the roster.
    pub units: Vec<MilitaryUnit>,
    /// Aggregate counts.
    pub summary: ForceSummary,
}

/// Response for a single unit.
#[derive(Debug, Serialize)]
pub struct UnitDetail {
    /// The unit.
    pub unit: MilitaryUnit,
    /// Whether a movement order would pass the movement gate.
    pub can_move: bool,
    /// Why it cannot move, when it cannot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// List a country's units.
pub async fn list_units(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<UnitsResponse>, ObserverError> {
    let code = CountryCode::normalized(&code);
    let response = state.sessions.read(&code, |country| UnitsResponse {
        units: country.forces.units.clone(),
        summary: UnitMotionEngine::force_summary(&country.forces),
    })?;
    Ok(Json(response))
}

/// One unit with its movement gate.
pub async fn get_unit(
    State(state): State<Arc<AppState>>,
    Path((code, id)): Path<(String, String)>,
) -> Result<Json<UnitDetail>, ObserverError> {
    let code = CountryCode::normalized(&code);
    let unit_id = UnitId::from(id);
    let unit = state
        .sessions
        .read(&code, |country| country.forces.unit(&unit_id).cloned())?
        .ok_or_else(|| MovementError::UnitNotFound {
            unit_id: unit_id.clone(),
        })?;
    let reason = can_move(&unit).err().map(|why| why.to_string());
    Ok(Json(UnitDetail {
        can_move: reason.is_none(),
        reason,
        unit,
    }))
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

/// Send a unit to a point.
pub async fn deploy(
    State(state): State<Arc<AppState>>,
    Path((code, id)): Path<(String, String)>,
    Json(body): Json<DeployRequest>,
) -> Result<Json<MovementReport>, ObserverError> {
    let destination = Coordinates::new(body.lat, body.lng)?;
    let unit_id = UnitId::from(id);
    let now = state.now();
    unit_action(&state, &code, now, |motion, forces| {
        motion.deploy(forces, &unit_id, destination, body.instant, now)
    })
}

/// Send a unit back to its home base.
pub async fn return_to_base(
    State(state): State<Arc<AppState>>,
    Path((code, id)): Path<(String, String)>,
    Json(body): Json<ReturnRequest>,
) -> Result<Json<MovementReport>, ObserverError> {
    let unit_id = UnitId::from(id);
    let now = state.now();
    unit_action(&state, &code, now, |motion, forces| {
        motion.return_to_base(forces, &unit_id, body.instant, now)
    })
}

/// Move a unit to another base.
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    Path((code, id)): Path<(String, String)>,
    Json(body): Json<TransferRequest>,
) -> Result<Json<MovementReport>, ObserverError> {
    let unit_id = UnitId::from(id);
    let now = state.now();
    unit_action(&state, &code, now, |motion, forces| {
        motion.transfer_to_base(forces, &unit_id, &body.base_id, body.instant, now)
    })
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

/// Refuel and rearm a unit at its base.
pub async fn resupply(
    State(state): State<Arc<AppState>>,
    Path((code, id)): Path<(String, String)>,
) -> Result<Json<MilitaryUnit>, ObserverError> {
    let unit_id = UnitId::from(id);
    let now = state.now();
    unit_action(&state, &code, now, |motion, forces| motion.resupply(forces, &unit_id))
}

/// Repair a unit at a base with repair capability.
pub async fn repair(
    State(state): State<Arc<AppState>>,
    Path((code, id)): Path<(String, String)>,
    Json(body): Json<RepairRequest>,
) -> Result<Json<MilitaryUnit>, ObserverError> {
    let unit_id = UnitId::from(id);
    let now = state.now();
    unit_action(&state, &code, now, |motion, forces| {
        motion.repair(forces, &unit_id, body.amount)
    })
}

/// Run one unit action in the country's session and broadcast the result.
///
/// `now` must be read from the clock before calling, never inside the
/// session.
fn unit_action<T: Serialize>(
    state: &AppState,
    code: &str,
    now: DateTime<Utc>,
    action: impl FnOnce(&UnitMotionEngine, &mut ForceRoster) -> Result<T, MovementError>,
) -> Result<Json<T>, ObserverError> {
    let code = CountryCode::normalized(code);
    let motion = UnitMotionEngine::new(code.clone());
    let outcome = state.sessions.transact(&code, |country| {
        action(&motion, &mut country.forces).map_err(ObserverError::from)
    })?;
    state.notify(NotificationKind::UnitUpdated, Some(&code), &outcome, now);
    Ok(Json(outcome))
}
