//! Unit motion engine.
//!
//! Moves units between coordinates in simulated time. A movement is either
//! applied at once (`instant`) or recorded on the unit as a
//! [`UnitMovement`] that [`UnitMotionEngine::process_movements`] resolves
//! once its ETA has passed. Fuel for a timed movement is charged when it
//! resolves, from the hours actually spent travelling.
//!
//! # Invariants
//!
//! - `movement` is `Some` iff the unit is `InTransit` or `Returning`.
//! - `current_base_id` is `None` while the unit is travelling or deployed.
//! - A failed request leaves the unit untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;
use worldsim_types::{
    BaseId, Coordinates, CountryCode, ForceRoster, MilitaryUnit, MovementIntent, UnitCategory,
    UnitId, UnitMovement, UnitStatus,
};

use crate::doctrine::{effective_speed, fuel_rate_per_hour};
use crate::error::MovementError;
use crate::feasibility::{can_deploy, can_move};
use crate::span;

/// Default health restored by one repair action.
pub const DEFAULT_REPAIR_AMOUNT: f64 = 20.0;

/// Health at which a unit in maintenance returns to service.
pub const MAINTENANCE_RELEASE_HEALTH: f64 = 80.0;

/// Outcome of a successful movement request.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MovementReport {
    /// The unit moved.
    pub unit_id: UnitId,
    /// Status after the request.
    pub status: UnitStatus,
    /// Where the movement started.
    pub origin: Coordinates,
    /// Where it ends.
    pub destination: Coordinates,
    /// Great-circle distance.
    pub distance_km: f64,
    /// Travel time at the unit's speed.
    pub travel_hours: f64,
    /// Fuel the trip burns.
    pub fuel_needed: f64,
    /// Arrival instant for timed movements.
    pub eta: Option<DateTime<Utc>>,
}

/// A movement resolved by [`UnitMotionEngine::process_movements`].
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Arrival {
    /// The unit.
    pub unit_id: UnitId,
    /// Display name.
    pub name: String,
    /// Status it landed in.
    pub status: UnitStatus,
    /// Final position.
    pub location: Coordinates,
    /// Fuel charged for the trip.
    pub fuel_used: f64,
    /// What the movement was for.
    pub intent: MovementIntent,
}

/// Signed adjustments applied by [`UnitMotionEngine::update_status`].
///
/// Every resulting value is clamped to `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UnitAdjustment {
    /// Status to force, if any. Travel statuses are rejected.
    pub status: Option<UnitStatus>,
    /// Health change.
    pub health_delta: f64,
    /// Readiness change.
    pub readiness_delta: f64,
    /// Fuel change.
    pub fuel_delta: f64,
    /// Ammunition change.
    pub ammo_delta: f64,
    /// Morale change.
    pub morale_delta: i16,
    /// Experience change.
    pub experience_delta: i16,
}

/// Aggregate view of a country's forces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForceSummary {
    /// Units in the roster.
    pub total_units: usize,
    /// Units that pass the deployability gate.
    pub available_units: usize,
    /// Count per category.
    pub by_category: BTreeMap<UnitCategory, u32>,
    /// Count per status.
    pub by_status: BTreeMap<UnitStatus, u32>,
    /// Sum of effective strengths.
    pub total_strength: f64,
}

/// Whether the movement gate applies to a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// Player or operation orders: every check applies.
    Checked,
    /// Recalls after an operation ends: the unit goes home regardless.
    Forced,
}

/// Start position and fuel of a unit, accounting for any movement it is
/// part way through.
struct Position {
    location: Coordinates,
    fuel: f64,
}

/// Computed trip from a position to a destination.
struct Trip {
    origin: Coordinates,
    fuel_before: f64,
    distance_km: f64,
    speed_kmh: f64,
    travel_hours: f64,
    fuel_needed: f64,
}

/// Per-country unit motion engine.
#[derive(Debug, Clone)]
pub struct UnitMotionEngine {
    country: CountryCode,
}

impl UnitMotionEngine {
    /// Create an engine for `country`.
    pub const fn new(country: CountryCode) -> Self {
        Self { country }
    }

    /// Country this engine acts for.
    pub const fn country(&self) -> &CountryCode {
        &self.country
    }

    // -----------------------------------------------------------------------
    // Player orders
    // -----------------------------------------------------------------------

    /// Move a unit to `destination`.
    ///
    /// Checks, in order: the movement gate, that the unit can travel at
    /// all, fuel sufficiency, then round-trip range. Instant moves land the
    /// unit `Deployed` with fuel charged at once; timed moves leave it
    /// `InTransit` until [`process_movements`](Self::process_movements).
    pub fn deploy(
        &self,
        forces: &mut ForceRoster,
        unit_id: &UnitId,
        destination: Coordinates,
        instant: bool,
        now: DateTime<Utc>,
    ) -> Result<MovementReport, MovementError> {
        ensure_free(forces, unit_id)?;
        self.dispatch(
            forces,
            unit_id,
            destination,
            MovementIntent::Deploy,
            instant,
            now,
            Dispatch::Checked,
        )
    }

    /// Send a unit back to its home base.
    pub fn return_to_base(
        &self,
        forces: &mut ForceRoster,
        unit_id: &UnitId,
        instant: bool,
        now: DateTime<Utc>,
    ) -> Result<MovementReport, MovementError> {
        ensure_free(forces, unit_id)?;
        let home = home_location(forces, unit_id)?;
        self.dispatch(
            forces,
            unit_id,
            home,
            MovementIntent::ReturnHome,
            instant,
            now,
            Dispatch::Checked,
        )
    }

    /// Relocate a unit to another base, where it lands `Idle`.
    pub fn transfer_to_base(
        &self,
        forces: &mut ForceRoster,
        unit_id: &UnitId,
        base_id: &BaseId,
        instant: bool,
        now: DateTime<Utc>,
    ) -> Result<MovementReport, MovementError> {
        ensure_free(forces, unit_id)?;
        let target = forces
            .base(base_id)
            .map(|b| b.location)
            .ok_or_else(|| MovementError::BaseNotFound {
                base_id: base_id.clone(),
            })?;
        self.dispatch(
            forces,
            unit_id,
            target,
            MovementIntent::Transfer {
                base_id: base_id.clone(),
            },
            instant,
            now,
            Dispatch::Checked,
        )
    }

    /// Refill fuel and ammunition. The unit must be at a base.
    pub fn resupply(
        &self,
        forces: &mut ForceRoster,
        unit_id: &UnitId,
    ) -> Result<MilitaryUnit, MovementError> {
        let unit = find_unit(forces, unit_id)?;
        if unit.current_base_id.is_none() {
            return Err(MovementError::NotAtBase {
                unit_id: unit_id.clone(),
            });
        }
        unit.fuel_percent = 100.0;
        unit.ammo_percent = 100.0;
        info!(country = %self.country, unit_id = %unit_id, "Unit resupplied");
        Ok(unit.clone())
    }

    /// Restore `amount` health (default [`DEFAULT_REPAIR_AMOUNT`]) at a base
    /// with repair capability. A unit in maintenance returns to `Idle` once
    /// its health reaches [`MAINTENANCE_RELEASE_HEALTH`].
    pub fn repair(
        &self,
        forces: &mut ForceRoster,
        unit_id: &UnitId,
        amount: Option<f64>,
    ) -> Result<MilitaryUnit, MovementError> {
        let base_id = forces
            .unit(unit_id)
            .ok_or_else(|| MovementError::UnitNotFound {
                unit_id: unit_id.clone(),
            })?
            .current_base_id
            .clone()
            .ok_or_else(|| MovementError::NotAtBase {
                unit_id: unit_id.clone(),
            })?;
        let base = forces
            .base(&base_id)
            .ok_or_else(|| MovementError::BaseNotFound {
                base_id: base_id.clone(),
            })?;
        if !base.capabilities.repair_capability {
            return Err(MovementError::NoRepairCapability { base_id });
        }

        let amount = amount
            .filter(|a| a.is_finite() && *a > 0.0)
            .unwrap_or(DEFAULT_REPAIR_AMOUNT);
        let unit = find_unit(forces, unit_id)?;
        unit.health_percent = (unit.health_percent + amount).min(100.0);
        if unit.status == UnitStatus::Maintenance && unit.health_percent >= MAINTENANCE_RELEASE_HEALTH
        {
            unit.status = UnitStatus::Idle;
        }
        info!(
            country = %self.country,
            unit_id = %unit_id,
            health = unit.health_percent,
            "Unit repaired"
        );
        Ok(unit.clone())
    }

    /// Apply signed adjustments to a unit's condition.
    ///
    /// Health at or below zero destroys the unit and cancels any movement.
    /// Forcing a stationary status on a travelling unit settles it at its
    /// interpolated position.
    pub fn update_status(
        &self,
        forces: &mut ForceRoster,
        unit_id: &UnitId,
        adjustment: &UnitAdjustment,
        now: DateTime<Utc>,
    ) -> Result<MilitaryUnit, MovementError> {
        if let Some(status) = adjustment.status.filter(|s| s.is_moving()) {
            return Err(MovementError::InvalidStatusOverride { status });
        }
        let unit = find_unit(forces, unit_id)?;

        if let Some(status) = adjustment.status {
            if unit.movement.is_some() {
                let here = current_position(unit, now);
                unit.location = here.location;
                unit.fuel_percent = here.fuel;
                unit.movement = None;
            }
            unit.status = status;
        }
        unit.health_percent = clamp_percent(unit.health_percent + adjustment.health_delta);
        unit.readiness_percent = clamp_percent(unit.readiness_percent + adjustment.readiness_delta);
        unit.fuel_percent = clamp_percent(unit.fuel_percent + adjustment.fuel_delta);
        unit.ammo_percent = clamp_percent(unit.ammo_percent + adjustment.ammo_delta);
        unit.morale = adjust_score(unit.morale, adjustment.morale_delta);
        unit.experience_level = adjust_score(unit.experience_level, adjustment.experience_delta);

        if unit.health_percent <= 0.0 && unit.status != UnitStatus::Destroyed {
            unit.status = UnitStatus::Destroyed;
            unit.movement = None;
            info!(country = %self.country, unit_id = %unit_id, "Unit destroyed");
        }
        Ok(unit.clone())
    }

    // -----------------------------------------------------------------------
    // Tick processing
    // -----------------------------------------------------------------------

    /// Resolve every movement whose ETA is at or before `now`.
    ///
    /// Fuel is charged for the full `eta - started_at` span at the
    /// category rate. Returning units land `Idle` at home with their
    /// assignment cleared, transfers land `Idle` at the target base, and
    /// everything else lands `Deployed`.
    pub fn process_movements(&self, forces: &mut ForceRoster, now: DateTime<Utc>) -> Vec<Arrival> {
        let mut arrivals = Vec::new();
        for unit in &mut forces.units {
            let due = unit
                .movement
                .as_ref()
                .is_some_and(|m| unit.status.is_moving() && m.eta <= now);
            if !due {
                continue;
            }
            let Some(movement) = unit.movement.take() else {
                continue;
            };
            let hours = span::elapsed_hours(movement.started_at, movement.eta);
            let fuel_used = fuel_rate_per_hour(unit.category) * hours;
            let fuel_before = unit.fuel_percent;
            land(unit, movement.destination, &movement.intent, fuel_before, fuel_used);
            info!(
                country = %self.country,
                unit_id = %unit.id,
                status = unit.status.as_str(),
                fuel_used,
                "Unit arrived"
            );
            arrivals.push(Arrival {
                unit_id: unit.id.clone(),
                name: unit.name.clone(),
                status: unit.status,
                location: unit.location,
                fuel_used,
                intent: movement.intent,
            });
        }
        arrivals
    }

    /// Counts and total strength of the roster.
    pub fn force_summary(forces: &ForceRoster) -> ForceSummary {
        let mut summary = ForceSummary {
            total_units: forces.units.len(),
            ..ForceSummary::default()
        };
        for unit in &forces.units {
            let by_cat = summary.by_category.entry(unit.category).or_insert(0);
            *by_cat = by_cat.saturating_add(1);
            let by_status = summary.by_status.entry(unit.status).or_insert(0);
            *by_status = by_status.saturating_add(1);
            if can_deploy(unit).is_ok() {
                summary.available_units = summary.available_units.saturating_add(1);
            }
            summary.total_strength += unit.effective_strength();
        }
        summary
    }

    // -----------------------------------------------------------------------
    // Shared with the operation lifecycle
    // -----------------------------------------------------------------------

    /// Dispatch a unit without the live-assignment check.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn dispatch(
        &self,
        forces: &mut ForceRoster,
        unit_id: &UnitId,
        destination: Coordinates,
        intent: MovementIntent,
        instant: bool,
        now: DateTime<Utc>,
        mode: Dispatch,
    ) -> Result<MovementReport, MovementError> {
        let unit = find_unit(forces, unit_id)?;
        let trip = match mode {
            Dispatch::Checked => check_trip(unit, destination, now)?,
            Dispatch::Forced => plan_trip(unit, destination, now),
        };
        // Forced recalls of units that cannot travel (or are already
        // there) land on the spot.
        let instant = instant || trip.speed_kmh <= 0.0 || trip.distance_km < 1e-6;

        let report = if instant {
            land(unit, destination, &intent, trip.fuel_before, trip.fuel_needed);
            MovementReport {
                unit_id: unit_id.clone(),
                status: unit.status,
                origin: trip.origin,
                destination,
                distance_km: trip.distance_km,
                travel_hours: trip.travel_hours,
                fuel_needed: trip.fuel_needed,
                eta: None,
            }
        } else {
            let eta = span::after(now, trip.travel_hours);
            unit.location = trip.origin;
            unit.fuel_percent = trip.fuel_before;
            unit.current_base_id = None;
            unit.status = match intent {
                MovementIntent::ReturnHome => UnitStatus::Returning,
                MovementIntent::Deploy | MovementIntent::Transfer { .. } => UnitStatus::InTransit,
            };
            unit.movement = Some(UnitMovement {
                origin: trip.origin,
                destination,
                started_at: now,
                eta,
                speed_kmh: trip.speed_kmh,
                intent,
            });
            MovementReport {
                unit_id: unit_id.clone(),
                status: unit.status,
                origin: trip.origin,
                destination,
                distance_km: trip.distance_km,
                travel_hours: trip.travel_hours,
                fuel_needed: trip.fuel_needed,
                eta: Some(eta),
            }
        };
        debug!(
            country = %self.country,
            unit_id = %unit_id,
            status = report.status.as_str(),
            distance_km = report.distance_km,
            "Unit dispatched"
        );
        Ok(report)
    }

    /// Send a unit home regardless of its condition. Units without a home
    /// base stay where they are and only lose their assignment.
    pub(crate) fn recall(&self, forces: &mut ForceRoster, unit_id: &UnitId, now: DateTime<Utc>) {
        match home_location(forces, unit_id) {
            Ok(home) => {
                if let Err(err) = self.dispatch(
                    forces,
                    unit_id,
                    home,
                    MovementIntent::ReturnHome,
                    false,
                    now,
                    Dispatch::Forced,
                ) {
                    debug!(country = %self.country, unit_id = %unit_id, error = %err, "Recall skipped");
                }
            }
            Err(err) => {
                debug!(country = %self.country, unit_id = %unit_id, error = %err, "Recall skipped");
                if let Some(unit) = forces.unit_mut(unit_id) {
                    unit.assigned_operation_id = None;
                }
            }
        }
    }

    /// Validate a dispatch without applying it.
    pub(crate) fn preflight(
        forces: &ForceRoster,
        unit_id: &UnitId,
        destination: Coordinates,
        now: DateTime<Utc>,
    ) -> Result<f64, MovementError> {
        let unit = forces
            .unit(unit_id)
            .ok_or_else(|| MovementError::UnitNotFound {
                unit_id: unit_id.clone(),
            })?;
        check_trip(unit, destination, now).map(|t| t.travel_hours)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn find_unit<'a>(
    forces: &'a mut ForceRoster,
    unit_id: &UnitId,
) -> Result<&'a mut MilitaryUnit, MovementError> {
    forces
        .unit_mut(unit_id)
        .ok_or_else(|| MovementError::UnitNotFound {
            unit_id: unit_id.clone(),
        })
}

/// Reject direct orders to units held by a live operation.
fn ensure_free(forces: &ForceRoster, unit_id: &UnitId) -> Result<(), MovementError> {
    let unit = forces
        .unit(unit_id)
        .ok_or_else(|| MovementError::UnitNotFound {
            unit_id: unit_id.clone(),
        })?;
    match &unit.assigned_operation_id {
        Some(op_id) if forces.operation(op_id).is_some_and(|op| op.status.is_live()) => {
            Err(MovementError::UnitAssigned {
                unit_id: unit_id.clone(),
                operation_id: op_id.clone(),
            })
        }
        _ => Ok(()),
    }
}

fn home_location(forces: &ForceRoster, unit_id: &UnitId) -> Result<Coordinates, MovementError> {
    let unit = forces
        .unit(unit_id)
        .ok_or_else(|| MovementError::UnitNotFound {
            unit_id: unit_id.clone(),
        })?;
    let home_id = unit
        .home_base_id
        .as_ref()
        .ok_or_else(|| MovementError::NoHomeBase {
            unit_id: unit_id.clone(),
        })?;
    forces
        .base(home_id)
        .map(|b| b.location)
        .ok_or_else(|| MovementError::BaseNotFound {
            base_id: home_id.clone(),
        })
}

/// Where the unit is now. A unit part way through a movement is placed at
/// its interpolated position with the elapsed hours already charged.
fn current_position(unit: &MilitaryUnit, now: DateTime<Utc>) -> Position {
    let Some(movement) = unit.movement.as_ref() else {
        return Position {
            location: unit.location,
            fuel: unit.fuel_percent,
        };
    };
    let total = span::elapsed_hours(movement.started_at, movement.eta);
    let done = span::elapsed_hours(movement.started_at, now).min(total);
    let fraction = if total > 0.0 { done / total } else { 1.0 };
    let burned = fuel_rate_per_hour(unit.category) * done;
    Position {
        location: movement.origin.interpolate(&movement.destination, fraction),
        fuel: (unit.fuel_percent - burned).max(0.0),
    }
}

fn plan_trip(unit: &MilitaryUnit, destination: Coordinates, now: DateTime<Utc>) -> Trip {
    let here = current_position(unit, now);
    let distance_km = here.location.distance_km(&destination);
    let speed_kmh = effective_speed(unit);
    let travel_hours = if speed_kmh > 0.0 {
        distance_km / speed_kmh
    } else {
        0.0
    };
    Trip {
        origin: here.location,
        fuel_before: here.fuel,
        distance_km,
        speed_kmh,
        travel_hours,
        fuel_needed: fuel_rate_per_hour(unit.category) * travel_hours,
    }
}

fn check_trip(
    unit: &MilitaryUnit,
    destination: Coordinates,
    now: DateTime<Utc>,
) -> Result<Trip, MovementError> {
    can_move(unit).map_err(|reason| MovementError::UnitCannotMove {
        unit_id: unit.id.clone(),
        reason,
    })?;
    let trip = plan_trip(unit, destination, now);
    if trip.speed_kmh <= 0.0 {
        return Err(MovementError::Stationary {
            unit_id: unit.id.clone(),
        });
    }
    if trip.fuel_needed > trip.fuel_before {
        return Err(MovementError::InsufficientFuel {
            needed: trip.fuel_needed,
            available: trip.fuel_before,
        });
    }
    if let Some(radius) = unit.finite_combat_radius() {
        let max_range_km = radius * 2.0;
        if trip.distance_km > max_range_km {
            return Err(MovementError::OutOfRange {
                distance_km: trip.distance_km,
                max_range_km,
            });
        }
    }
    Ok(trip)
}

/// Put a unit at the end of a movement.
fn land(
    unit: &mut MilitaryUnit,
    destination: Coordinates,
    intent: &MovementIntent,
    fuel_before: f64,
    fuel_used: f64,
) {
    unit.location = destination;
    unit.movement = None;
    unit.fuel_percent = (fuel_before - fuel_used).max(0.0);
    match intent {
        MovementIntent::Deploy => {
            unit.status = UnitStatus::Deployed;
            unit.current_base_id = None;
        }
        MovementIntent::ReturnHome => {
            unit.status = UnitStatus::Idle;
            unit.current_base_id.clone_from(&unit.home_base_id);
            unit.assigned_operation_id = None;
        }
        MovementIntent::Transfer { base_id } => {
            unit.status = UnitStatus::Idle;
            unit.current_base_id = Some(base_id.clone());
        }
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 100.0) }
}

fn adjust_score(value: u8, delta: i16) -> u8 {
    let adjusted = i16::from(value).saturating_add(delta).clamp(0, 100);
    u8::try_from(adjusted).unwrap_or(100)
}
