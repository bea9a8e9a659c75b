//! Operation lifecycle.
//!
//! An operation moves through
//! `Planning -> Deploying -> Active -> {Completed, Failed}`, with an
//! explicit `cancel` out of Planning or Deploying.
//!
//! - [`OperationLifecycle::plan`] validates and estimates without touching
//!   the roster.
//! - [`OperationLifecycle::create`] records the operation and commits its
//!   units.
//! - [`OperationLifecycle::start`] dispatches the units toward the target.
//! - [`OperationLifecycle::process_operations`] runs once per tick: it
//!   activates operations whose units have arrived, advances progress,
//!   and resolves those that reach 100%.
//!
//! Resolution draws from an injected [`RandomSource`]: one roll for the
//! objective, then an independent loss roll per unit.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;
use worldsim_types::{
    ActiveOperation, Coordinates, CountryCode, ForceRoster, MilitaryUnit, MovementIntent,
    OperationId, OperationPhase, OperationResult, OperationStatus, OperationType, UnitId,
    UnitStatus,
};

use crate::doctrine::{self, OperationDoctrine, effective_speed, planning_speed};
use crate::error::OperationError;
use crate::feasibility::can_deploy;
use crate::motion::{Dispatch, UnitAdjustment, UnitMotionEngine};
use crate::random::RandomSource;
use crate::span;

/// Distance from the target within which a unit counts as arrived.
pub const DEFAULT_ARRIVAL_TOLERANCE_KM: f64 = 25.0;

/// Damage above which a hit counts as a lost platform.
const EQUIPMENT_LOSS_DAMAGE: f64 = 30.0;

/// Fuel and ammunition charged at resolution when an operation type has no
/// doctrine entry.
const FALLBACK_CONSUMPTION: f64 = 20.0;

// ---------------------------------------------------------------------------
// Requests and reports
// ---------------------------------------------------------------------------

/// A request to plan or create an operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OperationRequest {
    /// Operation type name, e.g. `air_strike`.
    pub operation_type: String,
    /// Player-facing name.
    #[serde(default)]
    pub name: String,
    /// Target location.
    pub target_location: Coordinates,
    /// Units to commit.
    pub unit_ids: Vec<UnitId>,
    /// Optional target name.
    #[serde(default)]
    pub target_name: Option<String>,
    /// Country on the receiving end, if any.
    #[serde(default)]
    pub target_country_code: Option<CountryCode>,
    /// Engagement duration override, in hours.
    #[serde(default)]
    pub duration_hours: Option<f64>,
    /// Covert operations are not announced.
    #[serde(default)]
    pub is_covert: bool,
}

/// A unit as seen by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlannedUnit {
    /// The unit.
    pub unit_id: UnitId,
    /// Equipment type.
    pub unit_type: String,
    /// Effective strength, 0-1.
    pub strength: f64,
}

/// Estimates for a valid operation.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OperationPlan {
    /// Operation kind.
    pub operation_type: OperationType,
    /// Location of the lead unit.
    pub origin_location: Coordinates,
    /// Target location.
    pub target_location: Coordinates,
    /// Committed units.
    pub units: Vec<PlannedUnit>,
    /// Distance from the lead unit to the target, 1 decimal.
    pub distance_km: f64,
    /// One-way travel time at the slowest unit's speed.
    pub travel_hours: f64,
    /// Engagement duration plus the round trip, 1 decimal.
    pub estimated_duration_hours: f64,
    /// Objective success chance in percent, 1 decimal.
    pub estimated_success_rate: f64,
    /// Per-unit loss chance in percent, 1 decimal.
    pub estimated_loss_rate: f64,
    /// Domestic political cost.
    pub political_cost: f64,
    /// Relations change applied to the target country.
    pub relations_penalty: f64,
    /// Fuel spent per unit taking losses.
    pub fuel_consumption: f64,
    /// Ammunition spent per unit taking losses.
    pub ammo_consumption: f64,
    /// Estimated cost in millions.
    #[ts(as = "String")]
    pub estimated_cost_millions: Decimal,
}

impl OperationPlan {
    /// Success probability as a fraction.
    pub fn success_probability(&self) -> f64 {
        self.estimated_success_rate / 100.0
    }

    /// Loss probability as a fraction.
    pub fn loss_probability(&self) -> f64 {
        self.estimated_loss_rate / 100.0
    }
}

/// Wire form of a plan attempt: either estimates or the rejection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReport {
    /// Whether the operation could be created as requested.
    pub valid: bool,
    /// Rejection message when invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Rejection code when invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    /// Estimates when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<OperationPlan>,
    /// Types that can be planned, listed when the type was unknown.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_types: Vec<OperationType>,
}

impl From<Result<OperationPlan, OperationError>> for PlanReport {
    fn from(result: Result<OperationPlan, OperationError>) -> Self {
        match result {
            Ok(plan) => Self {
                valid: true,
                error: None,
                code: None,
                plan: Some(plan),
                available_types: Vec::new(),
            },
            Err(err) => Self {
                valid: false,
                code: Some(err.code()),
                available_types: match err {
                    OperationError::UnknownOperationType { .. } => {
                        doctrine::plannable_types().collect()
                    }
                    _ => Vec::new(),
                },
                error: Some(err.to_string()),
                plan: None,
            },
        }
    }
}

/// What happened to an operation during processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OperationEvent {
    /// All units reached the target; the operation is now Active.
    UnitsArrived,
    /// Progress advanced.
    Progress,
    /// Resolved successfully.
    Completed,
    /// Resolved unsuccessfully.
    Failed,
}

/// A change produced by [`OperationLifecycle::process_operations`].
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OperationUpdate {
    /// The operation.
    pub operation_id: OperationId,
    /// What happened.
    pub event: OperationEvent,
    /// Status after the change.
    pub status: OperationStatus,
    /// Progress after the change.
    pub progress_percent: f64,
    /// Present when the operation resolved.
    pub result: Option<OperationResult>,
}

impl OperationUpdate {
    /// Whether the operation reached a terminal status.
    pub const fn is_terminal(&self) -> bool {
        matches!(self.event, OperationEvent::Completed | OperationEvent::Failed)
    }
}

/// Counts of a country's operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationSummary {
    /// All operations ever created.
    pub total: usize,
    /// Planning, Deploying or Active.
    pub live: usize,
    /// Count per status.
    pub by_status: BTreeMap<OperationStatus, u32>,
    /// Count per type.
    pub by_type: BTreeMap<OperationType, u32>,
}

/// Arrival state of a deploying operation.
enum Arrival {
    Pending,
    Arrived,
    NoForces,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Per-country operation state machine.
#[derive(Debug, Clone)]
pub struct OperationLifecycle {
    country: CountryCode,
    motion: UnitMotionEngine,
    arrival_tolerance_km: f64,
}

impl OperationLifecycle {
    /// Create a lifecycle for `country`.
    pub fn new(country: CountryCode, arrival_tolerance_km: f64) -> Self {
        let arrival_tolerance_km = if arrival_tolerance_km.is_finite() && arrival_tolerance_km >= 0.0 {
            arrival_tolerance_km
        } else {
            DEFAULT_ARRIVAL_TOLERANCE_KM
        };
        Self {
            motion: UnitMotionEngine::new(country.clone()),
            country,
            arrival_tolerance_km,
        }
    }

    /// The motion engine used to dispatch and recall units.
    pub const fn motion(&self) -> &UnitMotionEngine {
        &self.motion
    }

    /// Validate a prospective operation and estimate its outcome.
    ///
    /// Never mutates `forces` and draws no randomness, so equal inputs give
    /// equal plans.
    pub fn plan(
        &self,
        forces: &ForceRoster,
        operation_type: &str,
        target: Coordinates,
        unit_ids: &[UnitId],
    ) -> Result<OperationPlan, OperationError> {
        let doctrine = OperationType::from_name(operation_type)
            .and_then(doctrine::doctrine)
            .ok_or_else(|| OperationError::UnknownOperationType {
                name: operation_type.to_owned(),
            })?;
        if let Some(unit_id) = first_duplicate(unit_ids) {
            return Err(OperationError::DuplicateUnit {
                unit_id: unit_id.clone(),
            });
        }
        if unit_ids.len() < doctrine.min_units {
            return Err(OperationError::NotEnoughUnits {
                operation_type: doctrine.operation_type,
                required: doctrine.min_units,
                provided: unit_ids.len(),
            });
        }

        let units = validate_units(forces, doctrine, unit_ids)?;
        let Some(lead) = units.first() else {
            return Err(OperationError::NotEnoughUnits {
                operation_type: doctrine.operation_type,
                required: doctrine.min_units.max(1),
                provided: 0,
            });
        };
        let origin = lead.location;
        let distance_km = origin.distance_km(&target);

        for unit in &units {
            if let Some(radius) = unit.finite_combat_radius() {
                let max_range_km = radius * 2.0;
                if distance_km > max_range_km {
                    return Err(OperationError::OutOfRange {
                        unit_id: unit.id.clone(),
                        distance_km,
                        max_range_km,
                    });
                }
            }
        }

        let success = success_rate(doctrine, &units, distance_km);
        let slowest = units
            .iter()
            .map(|u| planning_speed(u))
            .fold(f64::INFINITY, f64::min);
        let travel_hours = if slowest.is_finite() && slowest > 0.0 {
            distance_km / slowest
        } else {
            0.0
        };
        let round_trip = travel_hours * 2.0;

        let plan = OperationPlan {
            operation_type: doctrine.operation_type,
            origin_location: origin,
            target_location: target,
            units: units
                .iter()
                .map(|u| PlannedUnit {
                    unit_id: u.id.clone(),
                    unit_type: u.unit_type.clone(),
                    strength: u.effective_strength(),
                })
                .collect(),
            distance_km: round_to(distance_km, 1),
            travel_hours,
            estimated_duration_hours: round_to(doctrine.duration_hours + round_trip, 1),
            estimated_success_rate: round_to(success * 100.0, 1),
            estimated_loss_rate: round_to(doctrine.base_loss_rate * 100.0, 1),
            political_cost: doctrine.political_cost,
            relations_penalty: doctrine.relations_penalty,
            fuel_consumption: doctrine.fuel_consumption,
            ammo_consumption: doctrine.ammo_consumption,
            estimated_cost_millions: estimate_cost(doctrine, &units),
        };
        debug!(
            country = %self.country,
            operation_type = %doctrine.operation_type,
            success_rate = plan.estimated_success_rate,
            "Operation planned"
        );
        Ok(plan)
    }

    /// Record a new operation in Planning and commit its units.
    ///
    /// Runs the same validation as [`plan`](Self::plan); a rejected
    /// request assigns nothing.
    pub fn create(
        &self,
        forces: &mut ForceRoster,
        request: &OperationRequest,
        now: DateTime<Utc>,
    ) -> Result<ActiveOperation, OperationError> {
        let plan = self.plan(
            forces,
            &request.operation_type,
            request.target_location,
            &request.unit_ids,
        )?;
        let doctrine_duration = doctrine::doctrine(plan.operation_type)
            .map_or(0.0, |d| d.duration_hours);
        let duration_hours = request
            .duration_hours
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or(doctrine_duration);

        let id = OperationId::generate();
        let name = if request.name.trim().is_empty() {
            format!("Operation {id}")
        } else {
            request.name.trim().to_owned()
        };

        let operation = ActiveOperation {
            id: id.clone(),
            name,
            country_code: self.country.clone(),
            operation_type: plan.operation_type,
            status: OperationStatus::Planning,
            phase: OperationPhase::Preparation,
            created_at: now,
            started_at: None,
            estimated_completion: None,
            completed_at: None,
            origin_location: plan.origin_location,
            target_location: plan.target_location,
            target_name: request.target_name.clone(),
            target_country_code: request.target_country_code.clone(),
            assigned_unit_ids: request.unit_ids.clone(),
            progress_percent: 0.0,
            duration_hours,
            success_probability: plan.success_probability(),
            loss_probability: plan.loss_probability(),
            political_cost: plan.political_cost,
            relations_penalty: plan.relations_penalty,
            estimated_cost_millions: plan.estimated_cost_millions,
            is_covert: request.is_covert,
            result: None,
        };

        for unit_id in &request.unit_ids {
            if let Some(unit) = forces.unit_mut(unit_id) {
                unit.assigned_operation_id = Some(id.clone());
            }
        }
        forces.operations.push(operation.clone());

        info!(
            country = %self.country,
            operation_id = %id,
            operation_type = %operation.operation_type,
            units = operation.assigned_unit_ids.len(),
            "Operation created"
        );
        Ok(operation)
    }

    /// Dispatch a Planning operation's units toward the target.
    ///
    /// Every moving unit is checked before any is dispatched, so a failure
    /// leaves the roster untouched. Stationary units (missile batteries)
    /// engage from where they stand.
    pub fn start(
        &self,
        forces: &mut ForceRoster,
        operation_id: &OperationId,
        now: DateTime<Utc>,
    ) -> Result<ActiveOperation, OperationError> {
        let op = find_operation(forces, operation_id)?;
        if op.status != OperationStatus::Planning {
            return Err(OperationError::InvalidTransition {
                action: "start",
                status: op.status,
            });
        }
        let target = op.target_location;
        let duration_hours = op.duration_hours;
        let movers: Vec<UnitId> = op
            .assigned_unit_ids
            .iter()
            .filter(|id| {
                forces.unit(id).is_some_and(|u| {
                    u.status != UnitStatus::Destroyed && effective_speed(u) > 0.0
                })
            })
            .cloned()
            .collect();

        let mut max_travel_hours: f64 = 0.0;
        for unit_id in &movers {
            let hours = UnitMotionEngine::preflight(forces, unit_id, target, now).map_err(
                |source| OperationError::Deploy {
                    unit_id: unit_id.clone(),
                    source,
                },
            )?;
            max_travel_hours = max_travel_hours.max(hours);
        }
        for unit_id in &movers {
            self.motion
                .dispatch(
                    forces,
                    unit_id,
                    target,
                    MovementIntent::Deploy,
                    false,
                    now,
                    Dispatch::Checked,
                )
                .map_err(|source| OperationError::Deploy {
                    unit_id: unit_id.clone(),
                    source,
                })?;
        }

        let op = find_operation_mut(forces, operation_id)?;
        op.status = OperationStatus::Deploying;
        op.phase = OperationPhase::Deployment;
        op.started_at = Some(now);
        op.estimated_completion = Some(span::after(now, max_travel_hours + duration_hours));
        info!(
            country = %self.country,
            operation_id = %operation_id,
            units = movers.len(),
            max_travel_hours,
            "Operation started"
        );
        Ok(op.clone())
    }

    /// Advance every Deploying and Active operation to `now`.
    pub fn process_operations(
        &self,
        forces: &mut ForceRoster,
        now: DateTime<Utc>,
        rng: &mut dyn RandomSource,
    ) -> Vec<OperationUpdate> {
        let ids: Vec<OperationId> = forces
            .operations
            .iter()
            .filter(|o| matches!(o.status, OperationStatus::Deploying | OperationStatus::Active))
            .map(|o| o.id.clone())
            .collect();

        ids.iter()
            .filter_map(|id| self.process_single(forces, id, now, rng))
            .collect()
    }

    fn process_single(
        &self,
        forces: &mut ForceRoster,
        operation_id: &OperationId,
        now: DateTime<Utc>,
        rng: &mut dyn RandomSource,
    ) -> Option<OperationUpdate> {
        let op = forces.operation(operation_id)?;
        match op.status {
            OperationStatus::Deploying => match self.arrival(forces, op) {
                Arrival::Pending => None,
                Arrival::NoForces => self.resolve_completion(forces, operation_id, now, rng).ok(),
                Arrival::Arrived => {
                    let op = forces.operation_mut(operation_id)?;
                    op.status = OperationStatus::Active;
                    op.phase = OperationPhase::Engagement;
                    info!(
                        country = %self.country,
                        operation_id = %operation_id,
                        "Operation units arrived, engaging"
                    );
                    Some(OperationUpdate {
                        operation_id: operation_id.clone(),
                        event: OperationEvent::UnitsArrived,
                        status: op.status,
                        progress_percent: op.progress_percent,
                        result: None,
                    })
                }
            },
            OperationStatus::Active => {
                let started_at = op.started_at?;
                let elapsed = span::elapsed_hours(started_at, now);
                let progress = if op.duration_hours > 0.0 {
                    (elapsed / op.duration_hours * 100.0).min(100.0)
                } else {
                    100.0
                };
                let progress = progress.max(op.progress_percent);
                if progress >= 100.0 {
                    return self.resolve_completion(forces, operation_id, now, rng).ok();
                }
                let op = forces.operation_mut(operation_id)?;
                op.progress_percent = progress;
                Some(OperationUpdate {
                    operation_id: operation_id.clone(),
                    event: OperationEvent::Progress,
                    status: op.status,
                    progress_percent: progress,
                    result: None,
                })
            }
            OperationStatus::Planning
            | OperationStatus::Completed
            | OperationStatus::Failed
            | OperationStatus::Cancelled
            | OperationStatus::Aborted => None,
        }
    }

    fn arrival(&self, forces: &ForceRoster, op: &ActiveOperation) -> Arrival {
        let live: Vec<&MilitaryUnit> = op
            .assigned_unit_ids
            .iter()
            .filter_map(|id| forces.unit(id))
            .filter(|u| u.status != UnitStatus::Destroyed)
            .collect();
        if live.is_empty() {
            return Arrival::NoForces;
        }
        let arrived = live.iter().all(|u| {
            let stationary = effective_speed(u) <= 0.0;
            let on_target =
                u.location.distance_km(&op.target_location) <= self.arrival_tolerance_km;
            !u.status.is_moving() && (stationary || on_target)
        });
        if arrived {
            Arrival::Arrived
        } else {
            Arrival::Pending
        }
    }

    /// Roll the outcome of a live operation and send its units home.
    ///
    /// One roll against `success_probability` decides the objective. Each
    /// surviving unit then rolls independently against
    /// `loss_probability` (x1.5 on failure); a hit deals 10-40 damage
    /// (x1.5 on failure) and charges full fuel and ammunition, a miss
    /// charges half. An operation with no surviving units fails without
    /// rolling.
    pub fn resolve_completion(
        &self,
        forces: &mut ForceRoster,
        operation_id: &OperationId,
        now: DateTime<Utc>,
        rng: &mut dyn RandomSource,
    ) -> Result<OperationUpdate, OperationError> {
        let op = find_operation(forces, operation_id)?;
        if !op.status.is_live() {
            return Err(OperationError::InvalidTransition {
                action: "resolve",
                status: op.status,
            });
        }
        let doctrine = doctrine::doctrine(op.operation_type);
        let fuel_cost = doctrine.map_or(FALLBACK_CONSUMPTION, |d| d.fuel_consumption);
        let ammo_cost = doctrine.map_or(FALLBACK_CONSUMPTION, |d| d.ammo_consumption);
        let relations_penalty = doctrine.map_or(0.0, |d| d.relations_penalty);
        let success_probability = op.success_probability;
        let loss_probability = op.loss_probability;
        let target_country = op.target_country_code.clone();
        let op_label = format!("{} {}", op.operation_type, op.name);
        let cost_millions = op.estimated_cost_millions;
        let assigned = op.assigned_unit_ids.clone();
        let survivors: Vec<UnitId> = assigned
            .iter()
            .filter(|id| forces.unit(id).is_some_and(|u| u.status != UnitStatus::Destroyed))
            .cloned()
            .collect();

        let success = !survivors.is_empty() && rng.next_f64() < success_probability;
        let (loss_rate, damage_factor) = if success {
            (loss_probability, 1.0)
        } else {
            (loss_probability * 1.5, 1.5)
        };

        let mut equipment_lost: BTreeMap<String, u32> = BTreeMap::new();
        let mut damage_received: BTreeMap<UnitId, f64> = BTreeMap::new();
        for unit_id in &survivors {
            let adjustment = if rng.next_f64() < loss_rate {
                let damage = rng.uniform(10.0, 40.0) * damage_factor;
                damage_received.insert(unit_id.clone(), damage);
                if let Some(unit) = forces
                    .unit_mut(unit_id)
                    .filter(|_| damage > EQUIPMENT_LOSS_DAMAGE)
                {
                    unit.losses = unit.losses.saturating_add(1);
                    let tally = equipment_lost.entry(unit.unit_type.clone()).or_insert(0);
                    *tally = tally.saturating_add(1);
                }
                UnitAdjustment {
                    health_delta: -damage,
                    fuel_delta: -fuel_cost,
                    ammo_delta: -ammo_cost,
                    experience_delta: if success { 5 } else { 2 },
                    morale_delta: if success { 10 } else { -10 },
                    ..UnitAdjustment::default()
                }
            } else {
                UnitAdjustment {
                    fuel_delta: -fuel_cost * 0.5,
                    ammo_delta: -ammo_cost * 0.5,
                    experience_delta: if success { 3 } else { 1 },
                    ..UnitAdjustment::default()
                }
            };
            if let Err(err) = self.motion.update_status(forces, unit_id, &adjustment, now) {
                debug!(country = %self.country, unit_id = %unit_id, error = %err, "Combat adjustment skipped");
            }
        }

        let (enemy_casualties, enemy_equipment_destroyed) = if success {
            (rng.int_range(10, 100), rng.int_range(1, 10))
        } else {
            (0, 0)
        };
        let friendly_casualties = equipment_lost
            .values()
            .fold(0_u32, |acc, n| acc.saturating_add(*n));
        let diplomatic_impact: BTreeMap<CountryCode, f64> = target_country
            .map(|code| BTreeMap::from([(code, relations_penalty)]))
            .unwrap_or_default();
        let summary = if survivors.is_empty() {
            format!("{op_label}: no units remained to carry out the operation")
        } else if success {
            format!("{op_label}: objective achieved, {friendly_casualties} platforms lost")
        } else {
            format!("{op_label}: objective not achieved, {friendly_casualties} platforms lost")
        };

        let result = OperationResult {
            success,
            objectives_achieved: u32::from(success),
            objectives_total: 1,
            enemy_casualties,
            enemy_equipment_destroyed,
            friendly_casualties,
            friendly_equipment_lost: equipment_lost,
            damage_received,
            cost_millions,
            diplomatic_impact,
            summary,
        };

        let op = find_operation_mut(forces, operation_id)?;
        op.status = if success {
            OperationStatus::Completed
        } else {
            OperationStatus::Failed
        };
        op.phase = OperationPhase::Withdrawal;
        op.progress_percent = 100.0;
        op.completed_at = Some(now);
        op.result = Some(result.clone());
        let status = op.status;

        for unit_id in &assigned {
            self.release_unit(forces, unit_id, now);
        }

        info!(
            country = %self.country,
            operation_id = %operation_id,
            status = status.as_str(),
            enemy_casualties,
            friendly_casualties,
            "Operation resolved"
        );
        Ok(OperationUpdate {
            operation_id: operation_id.clone(),
            event: if success {
                OperationEvent::Completed
            } else {
                OperationEvent::Failed
            },
            status,
            progress_percent: 100.0,
            result: Some(result),
        })
    }

    /// Call off a Planning or Deploying operation.
    ///
    /// Every unit loses its assignment. Units in transit or deployed are
    /// sent home; units already returning, destroyed or in maintenance are
    /// left as they are; the rest go Idle.
    pub fn cancel(
        &self,
        forces: &mut ForceRoster,
        operation_id: &OperationId,
        now: DateTime<Utc>,
    ) -> Result<ActiveOperation, OperationError> {
        let op = find_operation(forces, operation_id)?;
        if !op.status.can_cancel() {
            return Err(OperationError::InvalidTransition {
                action: "cancel",
                status: op.status,
            });
        }
        let assigned = op.assigned_unit_ids.clone();

        for unit_id in &assigned {
            let Some(unit) = forces.unit_mut(unit_id) else {
                continue;
            };
            unit.assigned_operation_id = None;
            match unit.status {
                UnitStatus::InTransit | UnitStatus::Deployed => {
                    self.motion.recall(forces, unit_id, now);
                }
                UnitStatus::Returning | UnitStatus::Destroyed | UnitStatus::Maintenance => {}
                UnitStatus::Idle | UnitStatus::InCombat | UnitStatus::Damaged => {
                    unit.status = UnitStatus::Idle;
                }
            }
        }

        let op = find_operation_mut(forces, operation_id)?;
        op.status = OperationStatus::Cancelled;
        op.phase = OperationPhase::Withdrawal;
        op.completed_at = Some(now);
        info!(country = %self.country, operation_id = %operation_id, "Operation cancelled");
        Ok(op.clone())
    }

    /// Counts of operations by status and type.
    pub fn operation_summary(forces: &ForceRoster) -> OperationSummary {
        let mut summary = OperationSummary {
            total: forces.operations.len(),
            live: forces.live_operations().count(),
            ..OperationSummary::default()
        };
        for op in &forces.operations {
            let by_status = summary.by_status.entry(op.status).or_insert(0);
            *by_status = by_status.saturating_add(1);
            let by_type = summary.by_type.entry(op.operation_type).or_insert(0);
            *by_type = by_type.saturating_add(1);
        }
        summary
    }

    /// Send a unit home after its operation ends. Destroyed units only
    /// lose their assignment.
    fn release_unit(&self, forces: &mut ForceRoster, unit_id: &UnitId, now: DateTime<Utc>) {
        let Some(unit) = forces.unit_mut(unit_id) else {
            return;
        };
        if unit.status == UnitStatus::Destroyed {
            unit.assigned_operation_id = None;
            return;
        }
        self.motion.recall(forces, unit_id, now);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn find_operation<'a>(
    forces: &'a ForceRoster,
    operation_id: &OperationId,
) -> Result<&'a ActiveOperation, OperationError> {
    forces
        .operation(operation_id)
        .ok_or_else(|| OperationError::OperationNotFound {
            operation_id: operation_id.clone(),
        })
}

fn find_operation_mut<'a>(
    forces: &'a mut ForceRoster,
    operation_id: &OperationId,
) -> Result<&'a mut ActiveOperation, OperationError> {
    forces
        .operation_mut(operation_id)
        .ok_or_else(|| OperationError::OperationNotFound {
            operation_id: operation_id.clone(),
        })
}

/// Look up and gate every requested unit, stopping at the first problem.
fn validate_units<'a>(
    forces: &'a ForceRoster,
    doctrine: &OperationDoctrine,
    unit_ids: &[UnitId],
) -> Result<Vec<&'a MilitaryUnit>, OperationError> {
    let mut units = Vec::with_capacity(unit_ids.len());
    for unit_id in unit_ids {
        let unit = forces
            .unit(unit_id)
            .ok_or_else(|| OperationError::UnitNotFound {
                unit_id: unit_id.clone(),
            })?;
        if !doctrine.allowed_categories.contains(&unit.category) {
            return Err(OperationError::WrongCategory {
                unit_id: unit_id.clone(),
                category: unit.category,
                operation_type: doctrine.operation_type,
            });
        }
        if let Some(op_id) = unit
            .assigned_operation_id
            .as_ref()
            .filter(|op_id| forces.operation(op_id).is_some_and(|op| op.status.is_live()))
        {
            return Err(OperationError::UnitAssigned {
                unit_id: unit_id.clone(),
                operation_id: op_id.clone(),
            });
        }
        can_deploy(unit).map_err(|reason| OperationError::UnitCannotDeploy {
            unit_id: unit_id.clone(),
            reason,
        })?;
        units.push(unit);
    }
    Ok(units)
}

/// `base * (0.7 + 0.3 * avg_strength) * distance penalties * size bonus`,
/// clamped to `[0.10, 0.95]`.
fn success_rate(doctrine: &OperationDoctrine, units: &[&MilitaryUnit], distance_km: f64) -> f64 {
    let count = count_f64(units.len());
    let avg_strength = if count > 0.0 {
        units.iter().map(|u| u.effective_strength()).sum::<f64>() / count
    } else {
        0.0
    };
    let mut rate = doctrine.base_success_rate * 0.3_f64.mul_add(avg_strength, 0.7);

    for unit in units {
        if let Some(radius) = unit.finite_combat_radius() {
            if distance_km > radius {
                rate *= 0.5;
            } else if distance_km > radius * 0.8 {
                rate *= 0.9;
            }
        }
    }

    let size_bonus = 0.05_f64.mul_add(count - 1.0, 1.0).min(1.2);
    (rate * size_bonus).clamp(0.10, 0.95)
}

/// Per-unit sortie cost plus munitions at 0.01M per ammunition point.
fn estimate_cost(doctrine: &OperationDoctrine, units: &[&MilitaryUnit]) -> Decimal {
    let sorties = units.iter().fold(Decimal::ZERO, |acc, u| {
        acc.checked_add(doctrine::unit_cost_millions(u.category))
            .unwrap_or(Decimal::MAX)
    });
    let munitions = Decimal::try_from(doctrine.ammo_consumption / 100.0).unwrap_or(Decimal::ZERO);
    sorties
        .checked_add(munitions)
        .unwrap_or(Decimal::MAX)
        .round_dp(2)
}

/// The first id that appears earlier in the list too.
fn first_duplicate(unit_ids: &[UnitId]) -> Option<&UnitId> {
    let mut seen = BTreeSet::new();
    unit_ids.iter().find(|id| !seen.insert(*id))
}

fn count_f64(n: usize) -> f64 {
    u32::try_from(n).map_or(f64::from(u32::MAX), f64::from)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use worldsim_types::{BaseId, BaseType, MilitaryBase, UnitCategory};

    use super::*;
    use crate::random::FixedRandom;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn hours_after(h: f64) -> DateTime<Utc> {
        span::after(t0(), h)
    }

    fn point(lat: f64, lng: f64) -> Coordinates {
        Coordinates::new(lat, lng).unwrap()
    }

    fn target() -> Coordinates {
        point(32.0, 34.5)
    }

    fn id(s: &str) -> UnitId {
        UnitId::from(s)
    }

    fn roster() -> ForceRoster {
        let home = MilitaryBase::new("nevatim", "Nevatim", point(31.0, 35.0), BaseType::AirBase);
        let mut units = Vec::new();
        for n in 1..=2 {
            let mut jet = MilitaryUnit::new(
                format!("f16_{n}"),
                format!("Squadron {n}"),
                "F-16I",
                UnitCategory::Aircraft,
                home.location,
            )
            .stationed_at(&home);
            jet.combat_radius_km = Some(1000.0);
            units.push(jet);
        }
        units.push(
            MilitaryUnit::new("armor_1", "7th Brigade", "Merkava", UnitCategory::Ground, home.location)
                .stationed_at(&home),
        );
        units.push(
            MilitaryUnit::new("jericho_1", "Battery A", "Jericho", UnitCategory::Missile, home.location)
                .stationed_at(&home),
        );
        ForceRoster {
            units,
            bases: vec![home],
            operations: Vec::new(),
        }
    }

    fn lifecycle() -> OperationLifecycle {
        OperationLifecycle::new(CountryCode::from("ISR"), DEFAULT_ARRIVAL_TOLERANCE_KM)
    }

    fn strike_request() -> OperationRequest {
        OperationRequest {
            operation_type: "air_strike".to_owned(),
            name: "Opera".to_owned(),
            target_location: target(),
            unit_ids: vec![id("f16_1"), id("f16_2")],
            target_name: Some("Depot".to_owned()),
            target_country_code: Some(CountryCode::from("SYR")),
            duration_hours: None,
            is_covert: false,
        }
    }

    #[test]
    fn two_aircraft_air_strike_plan_is_valid() {
        let forces = roster();
        let plan = lifecycle()
            .plan(&forces, "air_strike", target(), &[id("f16_1"), id("f16_2")])
            .unwrap();
        assert!(plan.estimated_success_rate >= 10.0 && plan.estimated_success_rate <= 95.0);
        // 0.75 * (0.7 + 0.3 * 0.6) * 1.05
        assert!((plan.estimated_success_rate - 69.3).abs() < 1e-9);
        assert!((plan.estimated_loss_rate - 5.0).abs() < 1e-9);
        assert!((plan.distance_km - 120.9).abs() < 0.2);
        assert_eq!(plan.estimated_cost_millions, Decimal::new(15, 1));

        let report = PlanReport::from(Ok(plan));
        assert!(report.valid);
    }

    #[test]
    fn plan_is_side_effect_free() {
        let forces = roster();
        let before = forces.clone();
        let engine = lifecycle();
        let a = engine.plan(&forces, "air_strike", target(), &[id("f16_1")]).unwrap();
        let b = engine.plan(&forces, "air_strike", target(), &[id("f16_1")]).unwrap();
        assert_eq!(a, b);
        assert_eq!(forces, before);
    }

    #[test]
    fn ground_assault_needs_two_units() {
        let forces = roster();
        let err = lifecycle()
            .plan(&forces, "ground_assault", target(), &[id("armor_1")])
            .unwrap_err();
        let report = PlanReport::from(Err(err));
        assert!(!report.valid);
        assert!(report.error.unwrap().contains("at least 2 units"));
    }

    #[test]
    fn unknown_and_unconfigured_types_rejected() {
        let forces = roster();
        let engine = lifecycle();
        let err = engine.plan(&forces, "orbital_strike", target(), &[id("f16_1")]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown operation type: orbital_strike");
        let err = engine.plan(&forces, "cyber_attack", target(), &[id("f16_1")]).unwrap_err();
        assert_eq!(err.code(), "unknown_operation_type");
        let report = PlanReport::from(Err(err));
        assert_eq!(report.available_types.len(), 9);
    }

    #[test]
    fn wrong_category_and_range() {
        let mut forces = roster();
        let engine = lifecycle();
        let err = engine.plan(&forces, "air_strike", target(), &[id("armor_1")]).unwrap_err();
        assert_eq!(err.code(), "wrong_category");

        forces.unit_mut(&id("f16_1")).unwrap().combat_radius_km = Some(50.0);
        let err = engine.plan(&forces, "air_strike", target(), &[id("f16_1")]).unwrap_err();
        assert_eq!(err.code(), "out_of_range");
    }

    #[test]
    fn edge_of_radius_is_penalised() {
        let mut forces = roster();
        let engine = lifecycle();
        let full = engine.plan(&forces, "air_strike", target(), &[id("f16_1")]).unwrap();
        // 121 km is beyond 80% of a 140 km radius but inside it.
        forces.unit_mut(&id("f16_1")).unwrap().combat_radius_km = Some(140.0);
        let edge = engine.plan(&forces, "air_strike", target(), &[id("f16_1")]).unwrap();
        assert!((edge.estimated_success_rate - full.estimated_success_rate * 0.9).abs() < 0.1);
    }

    #[test]
    fn repeated_unit_ids_are_rejected() {
        let mut forces = roster();
        let engine = lifecycle();

        let err = engine
            .plan(&forces, "air_patrol", target(), &[id("f16_1"), id("f16_1")])
            .unwrap_err();
        assert_eq!(
            err,
            OperationError::DuplicateUnit {
                unit_id: id("f16_1")
            }
        );
        assert_eq!(err.code(), "duplicate_unit");
        assert!(err.is_validation());

        let mut request = strike_request();
        request.unit_ids = vec![id("f16_1"), id("f16_2"), id("f16_1")];
        let err = engine.create(&mut forces, &request, t0()).unwrap_err();
        assert_eq!(err.code(), "duplicate_unit");
        assert!(forces.operations.is_empty());
        assert!(forces.units.iter().all(|u| u.assigned_operation_id.is_none()));
    }

    #[test]
    fn failed_create_assigns_nothing() {
        let mut forces = roster();
        let mut request = strike_request();
        request.unit_ids = vec![id("f16_1"), id("ghost")];
        let err = lifecycle().create(&mut forces, &request, t0()).unwrap_err();
        assert_eq!(err.code(), "unit_not_found");
        assert!(forces.units.iter().all(|u| u.assigned_operation_id.is_none()));
        assert!(forces.operations.is_empty());
    }

    #[test]
    fn create_commits_units_once() {
        let mut forces = roster();
        let engine = lifecycle();
        let op = engine.create(&mut forces, &strike_request(), t0()).unwrap();
        assert_eq!(op.status, OperationStatus::Planning);
        assert!(op.id.as_str().starts_with("op_"));
        assert!((op.duration_hours - 2.0).abs() < 1e-9);
        assert!((op.success_probability - 0.693).abs() < 1e-9);
        for unit_id in ["f16_1", "f16_2"] {
            assert_eq!(forces.unit(&id(unit_id)).unwrap().assigned_operation_id, Some(op.id.clone()));
        }

        let err = engine.create(&mut forces, &strike_request(), t0()).unwrap_err();
        assert_eq!(err.code(), "unit_assigned");

        // Committed units cannot be moved directly.
        let err = engine
            .motion()
            .deploy(&mut forces, &id("f16_1"), target(), true, t0())
            .unwrap_err();
        assert_eq!(err.code(), "unit_assigned");
    }

    #[test]
    fn start_dispatches_units() {
        let mut forces = roster();
        let engine = lifecycle();
        let op = engine.create(&mut forces, &strike_request(), t0()).unwrap();
        let started = engine.start(&mut forces, &op.id, t0()).unwrap();
        assert_eq!(started.status, OperationStatus::Deploying);
        assert_eq!(started.phase, OperationPhase::Deployment);
        assert_eq!(started.started_at, Some(t0()));
        assert!(started.estimated_completion.unwrap() > hours_after(2.0));
        assert!(forces.units.iter().take(2).all(|u| u.status == UnitStatus::InTransit));

        let err = engine.start(&mut forces, &op.id, t0()).unwrap_err();
        assert_eq!(err.to_string(), "Cannot start operation in status: deploying");
    }

    #[test]
    fn full_lifecycle_with_certain_success() {
        let mut forces = roster();
        let engine = lifecycle();
        let mut rng = FixedRandom::new(0.0);
        let op = engine.create(&mut forces, &strike_request(), t0()).unwrap();
        engine.start(&mut forces, &op.id, t0()).unwrap();

        // Still travelling: nothing to report.
        assert!(engine.process_operations(&mut forces, t0(), &mut rng).is_empty());

        let arrive = hours_after(0.5);
        assert_eq!(engine.motion().process_movements(&mut forces, arrive).len(), 2);
        let updates = engine.process_operations(&mut forces, arrive, &mut rng);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates.first().unwrap().event, OperationEvent::UnitsArrived);
        assert_eq!(forces.operation(&op.id).unwrap().status, OperationStatus::Active);

        let midway = hours_after(1.0);
        let updates = engine.process_operations(&mut forces, midway, &mut rng);
        assert_eq!(updates.first().unwrap().event, OperationEvent::Progress);
        assert!((forces.operation(&op.id).unwrap().progress_percent - 50.0).abs() < 1e-6);

        let done = hours_after(3.0);
        let updates = engine.process_operations(&mut forces, done, &mut rng);
        let update = updates.first().unwrap();
        assert_eq!(update.event, OperationEvent::Completed);

        let op = forces.operation(&op.id).unwrap();
        assert_eq!(op.status, OperationStatus::Completed);
        assert!((op.progress_percent - 100.0).abs() < f64::EPSILON);
        let result = op.result.as_ref().unwrap();
        assert!(result.success);
        assert!(result.enemy_casualties > 0);
        assert_eq!(result.diplomatic_impact.get(&CountryCode::from("SYR")), Some(&-15.0));
        // A loss roll of zero always hits; damage 10 is below the equipment
        // loss threshold.
        assert_eq!(result.damage_received.len(), 2);
        assert_eq!(result.friendly_casualties, 0);

        let jet = forces.unit(&id("f16_1")).unwrap();
        assert!((jet.health_percent - 90.0).abs() < 1e-9);
        assert_eq!(jet.experience_level, 55);
        assert_eq!(jet.morale, 90);
        assert_eq!(jet.status, UnitStatus::Returning);

        // Home again, assignment released.
        engine.motion().process_movements(&mut forces, hours_after(6.0));
        let jet = forces.unit(&id("f16_1")).unwrap();
        assert_eq!(jet.status, UnitStatus::Idle);
        assert_eq!(jet.current_base_id, Some(BaseId::from("nevatim")));
        assert!(jet.assigned_operation_id.is_none());
    }

    #[test]
    fn failed_roll_marks_failed() {
        let mut forces = roster();
        let engine = lifecycle();
        let op = engine.create(&mut forces, &strike_request(), t0()).unwrap();
        engine.start(&mut forces, &op.id, t0()).unwrap();
        let mut rng = FixedRandom::new(0.99);
        let update = engine
            .resolve_completion(&mut forces, &op.id, hours_after(3.0), &mut rng)
            .unwrap();
        assert_eq!(update.status, OperationStatus::Failed);
        let result = update.result.unwrap();
        assert!(!result.success);
        assert_eq!(result.enemy_casualties, 0);
        assert!(result.damage_received.is_empty());
        // Terminal operations cannot be resolved again.
        assert!(engine.resolve_completion(&mut forces, &op.id, hours_after(4.0), &mut rng).is_err());
    }

    #[test]
    fn arrival_requires_proximity() {
        let mut forces = roster();
        let engine = lifecycle();
        let mut rng = FixedRandom::new(0.0);
        let op = engine.create(&mut forces, &strike_request(), t0()).unwrap();
        engine.start(&mut forces, &op.id, t0()).unwrap();

        // One jet's transit is cut short far from the target.
        let jet = forces.unit_mut(&id("f16_2")).unwrap();
        jet.movement = None;
        jet.status = UnitStatus::Deployed;
        jet.location = point(31.0, 35.0);
        engine.motion().process_movements(&mut forces, hours_after(0.5));

        assert!(engine.process_operations(&mut forces, hours_after(0.5), &mut rng).is_empty());
        assert_eq!(forces.operation(&op.id).unwrap().status, OperationStatus::Deploying);
    }

    #[test]
    fn missile_strike_engages_from_position() {
        let mut forces = roster();
        let engine = lifecycle();
        let mut rng = FixedRandom::new(0.0);
        let request = OperationRequest {
            operation_type: "missile_strike".to_owned(),
            unit_ids: vec![id("jericho_1")],
            ..strike_request()
        };
        let op = engine.create(&mut forces, &request, t0()).unwrap();
        engine.start(&mut forces, &op.id, t0()).unwrap();
        assert_eq!(forces.unit(&id("jericho_1")).unwrap().status, UnitStatus::Idle);

        let updates = engine.process_operations(&mut forces, t0(), &mut rng);
        assert_eq!(updates.first().unwrap().event, OperationEvent::UnitsArrived);
    }

    #[test]
    fn deploying_with_no_survivors_fails() {
        let mut forces = roster();
        let engine = lifecycle();
        let mut rng = FixedRandom::new(0.0);
        let op = engine.create(&mut forces, &strike_request(), t0()).unwrap();
        engine.start(&mut forces, &op.id, t0()).unwrap();
        for unit in forces.units.iter_mut().take(2) {
            unit.status = UnitStatus::Destroyed;
            unit.movement = None;
        }
        let updates = engine.process_operations(&mut forces, hours_after(0.5), &mut rng);
        assert_eq!(updates.first().unwrap().event, OperationEvent::Failed);
        assert!(forces.units.iter().take(2).all(|u| u.assigned_operation_id.is_none()));
    }

    #[test]
    fn cancel_rules() {
        let mut forces = roster();
        let engine = lifecycle();
        let op = engine.create(&mut forces, &strike_request(), t0()).unwrap();
        let cancelled = engine.cancel(&mut forces, &op.id, t0()).unwrap();
        assert_eq!(cancelled.status, OperationStatus::Cancelled);
        assert!(cancelled.completed_at.is_some());
        assert!(forces.units.iter().all(|u| u.assigned_operation_id.is_none()));
        assert!(forces.units.iter().all(|u| u.status == UnitStatus::Idle));

        let err = engine.cancel(&mut forces, &op.id, t0()).unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn cancel_completed_is_rejected() {
        let mut forces = roster();
        let engine = lifecycle();
        let mut rng = FixedRandom::new(0.0);
        let op = engine.create(&mut forces, &strike_request(), t0()).unwrap();
        engine.start(&mut forces, &op.id, t0()).unwrap();
        engine.resolve_completion(&mut forces, &op.id, hours_after(3.0), &mut rng).unwrap();
        let err = engine.cancel(&mut forces, &op.id, hours_after(3.0)).unwrap_err();
        assert_eq!(err.to_string(), "Cannot cancel operation in status: completed");
    }

    #[test]
    fn cancel_while_deploying_recalls_units() {
        let mut forces = roster();
        let engine = lifecycle();
        let op = engine.create(&mut forces, &strike_request(), t0()).unwrap();
        engine.start(&mut forces, &op.id, t0()).unwrap();
        engine.cancel(&mut forces, &op.id, hours_after(0.05)).unwrap();
        let jet = forces.unit(&id("f16_1")).unwrap();
        assert_eq!(jet.status, UnitStatus::Returning);
        assert!(jet.assigned_operation_id.is_none());
        assert!(jet.movement.is_some());
    }

    #[test]
    fn summary_counts() {
        let mut forces = roster();
        let engine = lifecycle();
        let op = engine.create(&mut forces, &strike_request(), t0()).unwrap();
        engine.cancel(&mut forces, &op.id, t0()).unwrap();
        let summary = OperationLifecycle::operation_summary(&forces);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.live, 0);
        assert_eq!(summary.by_status.get(&OperationStatus::Cancelled), Some(&1));
    }
}
