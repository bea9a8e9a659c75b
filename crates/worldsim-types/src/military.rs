//! Military records: units, bases, operations and the per-country roster.
//!
//! These are plain data. The state machines that mutate them live in
//! `worldsim-military`; the only behaviour here is derived values such as
//! [`MilitaryUnit::effective_strength`] and roster lookups.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BaseStatus, BaseType, OperationStatus, OperationType, UnitCategory, UnitStatus};
use crate::geo::Coordinates;
use crate::ids::{BaseId, CountryCode, OperationId, UnitId};

/// Default experience level for freshly raised units.
pub const DEFAULT_EXPERIENCE: u8 = 50;

/// Default morale for freshly raised units.
pub const DEFAULT_MORALE: u8 = 80;

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// What a movement is for. Decides the status the unit lands in on arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MovementIntent {
    /// Move to a point and take station there (lands `Deployed`).
    Deploy,
    /// Go back to the home base (lands `Idle` at home).
    ReturnHome,
    /// Relocate to another base (lands `Idle` at that base).
    Transfer {
        /// Base the unit will be stationed at on arrival.
        base_id: BaseId,
    },
}

/// An in-flight movement between two points in simulated time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UnitMovement {
    /// Where the movement started.
    pub origin: Coordinates,
    /// Where the movement ends.
    pub destination: Coordinates,
    /// Simulated instant the movement began.
    pub started_at: DateTime<Utc>,
    /// Simulated instant of arrival.
    pub eta: DateTime<Utc>,
    /// Travel speed used for the ETA.
    pub speed_kmh: f64,
    /// Purpose of the movement.
    pub intent: MovementIntent,
}

/// A military unit in a country's order of battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MilitaryUnit {
    /// Unique id within the country.
    pub id: UnitId,
    /// Display name.
    pub name: String,
    /// Equipment type (e.g. `"F-35A"`).
    pub unit_type: String,
    /// Broad category.
    pub category: UnitCategory,
    /// Number of platforms in the formation.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Current position.
    pub location: Coordinates,
    /// Base the unit returns to.
    #[serde(default)]
    pub home_base_id: Option<BaseId>,
    /// Base the unit is stationed at; `None` while away from any base.
    #[serde(default)]
    pub current_base_id: Option<BaseId>,
    /// Lifecycle status.
    pub status: UnitStatus,
    /// Structural health, 0-100.
    pub health_percent: f64,
    /// Training/readiness, 0-100.
    pub readiness_percent: f64,
    /// Fuel remaining, 0-100.
    pub fuel_percent: f64,
    /// Ammunition remaining, 0-100.
    pub ammo_percent: f64,
    /// Present only while travelling.
    #[serde(default)]
    pub movement: Option<UnitMovement>,
    /// Live operation this unit is committed to.
    #[serde(default)]
    pub assigned_operation_id: Option<OperationId>,
    /// Combat experience, 0-100.
    #[serde(default = "default_experience")]
    pub experience_level: u8,
    /// Morale, 0-100.
    #[serde(default = "default_morale")]
    pub morale: u8,
    /// Confirmed kills.
    #[serde(default)]
    pub kills: u32,
    /// Platforms lost.
    #[serde(default)]
    pub losses: u32,
    /// One-way operational radius; round trip is twice this.
    #[serde(default)]
    pub combat_radius_km: Option<f64>,
    /// Ferry range.
    #[serde(default)]
    pub range_km: Option<f64>,
    /// Platform speed, overriding the category default when positive.
    #[serde(default)]
    pub speed_kmh: Option<f64>,
}

const fn default_quantity() -> u32 {
    1
}

const fn default_experience() -> u8 {
    DEFAULT_EXPERIENCE
}

const fn default_morale() -> u8 {
    DEFAULT_MORALE
}

impl MilitaryUnit {
    /// Create a fully supplied idle unit with default experience and morale.
    pub fn new(
        id: impl Into<UnitId>,
        name: impl Into<String>,
        unit_type: impl Into<String>,
        category: UnitCategory,
        location: Coordinates,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_type: unit_type.into(),
            category,
            quantity: 1,
            location,
            home_base_id: None,
            current_base_id: None,
            status: UnitStatus::Idle,
            health_percent: 100.0,
            readiness_percent: 100.0,
            fuel_percent: 100.0,
            ammo_percent: 100.0,
            movement: None,
            assigned_operation_id: None,
            experience_level: DEFAULT_EXPERIENCE,
            morale: DEFAULT_MORALE,
            kills: 0,
            losses: 0,
            combat_radius_km: None,
            range_km: None,
            speed_kmh: None,
        }
    }

    /// Station the unit at `base`, making it both home and current base.
    #[must_use]
    pub fn stationed_at(mut self, base: &MilitaryBase) -> Self {
        self.home_base_id = Some(base.id.clone());
        self.current_base_id = Some(base.id.clone());
        self.location = base.location;
        self
    }

    /// Composite combat value in `[0, 1]`.
    ///
    /// `health * readiness * min(fuel, ammo) * morale * (0.5 + experience / 200)`,
    /// each term taken as a fraction.
    pub fn effective_strength(&self) -> f64 {
        let health = self.health_percent / 100.0;
        let readiness = self.readiness_percent / 100.0;
        let supply = self.fuel_percent.min(self.ammo_percent) / 100.0;
        let morale = f64::from(self.morale) / 100.0;
        let experience = 0.5 + f64::from(self.experience_level) / 200.0;
        (health * readiness * supply * morale * experience).clamp(0.0, 1.0)
    }

    /// Combat radius if the unit has a finite, positive one.
    pub fn finite_combat_radius(&self) -> Option<f64> {
        self.combat_radius_km.filter(|r| r.is_finite() && *r > 0.0)
    }
}

// ---------------------------------------------------------------------------
// Bases
// ---------------------------------------------------------------------------

/// Services a base can provide to stationed units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BaseCapabilities {
    /// Whether damaged units can be repaired here.
    #[serde(default)]
    pub repair_capability: bool,
    /// Aircraft the base can host; informational only.
    #[serde(default)]
    pub aircraft_capacity: u32,
    /// Whether the base has a deep-water port.
    #[serde(default)]
    pub naval_port: bool,
}

/// A military installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MilitaryBase {
    /// Unique id within the country.
    pub id: BaseId,
    /// Display name.
    pub name: String,
    /// Position.
    pub location: Coordinates,
    /// Installation kind.
    pub base_type: BaseType,
    /// Operational status.
    pub status: BaseStatus,
    /// Services offered.
    #[serde(default)]
    pub capabilities: BaseCapabilities,
}

impl MilitaryBase {
    /// Create an operational base with no special capabilities.
    pub fn new(
        id: impl Into<BaseId>,
        name: impl Into<String>,
        location: Coordinates,
        base_type: BaseType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location,
            base_type,
            status: BaseStatus::Operational,
            capabilities: BaseCapabilities::default(),
        }
    }

    /// Enable repairs at this base.
    #[must_use]
    pub const fn with_repair(mut self) -> Self {
        self.capabilities.repair_capability = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Engine-advanced phase label of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OperationPhase {
    /// Units assigned, awaiting start.
    Preparation,
    /// Units travelling to the target.
    Deployment,
    /// Units on target.
    Engagement,
    /// Resolved or called off; units heading home.
    Withdrawal,
}

/// Outcome recorded when an operation resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OperationResult {
    /// Whether the objective was achieved.
    pub success: bool,
    /// Objectives achieved.
    pub objectives_achieved: u32,
    /// Objectives attempted.
    pub objectives_total: u32,
    /// Enemy personnel casualties.
    pub enemy_casualties: u32,
    /// Enemy equipment destroyed.
    pub enemy_equipment_destroyed: u32,
    /// Friendly platforms lost.
    pub friendly_casualties: u32,
    /// Friendly platforms lost, by unit type.
    pub friendly_equipment_lost: BTreeMap<String, u32>,
    /// Health damage taken, by unit.
    pub damage_received: BTreeMap<UnitId, f64>,
    /// Cost of the operation in millions.
    #[ts(as = "String")]
    pub cost_millions: Decimal,
    /// Relations change per affected country.
    pub diplomatic_impact: BTreeMap<CountryCode, f64>,
    /// One-line human summary.
    pub summary: String,
}

/// A player-initiated multi-tick military action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActiveOperation {
    /// Unique id (`op_xxxxxxxx`).
    pub id: OperationId,
    /// Player-facing name.
    pub name: String,
    /// Owning country.
    pub country_code: CountryCode,
    /// Operation kind.
    pub operation_type: OperationType,
    /// Lifecycle status.
    pub status: OperationStatus,
    /// Engine-advanced phase label.
    pub phase: OperationPhase,
    /// Simulated creation instant.
    pub created_at: DateTime<Utc>,
    /// Simulated instant units were dispatched.
    pub started_at: Option<DateTime<Utc>>,
    /// Expected resolution instant.
    pub estimated_completion: Option<DateTime<Utc>>,
    /// Instant the operation reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Location of the lead unit at creation.
    pub origin_location: Coordinates,
    /// Target location.
    pub target_location: Coordinates,
    /// Optional target name.
    pub target_name: Option<String>,
    /// Country on the receiving end, if any.
    pub target_country_code: Option<CountryCode>,
    /// Units committed to the operation.
    pub assigned_unit_ids: Vec<UnitId>,
    /// Progress, 0-100, non-decreasing while active.
    pub progress_percent: f64,
    /// Engagement duration in hours.
    pub duration_hours: f64,
    /// Probability the objective is achieved, 0-1.
    pub success_probability: f64,
    /// Per-unit loss probability, 0-1.
    pub loss_probability: f64,
    /// Domestic political cost.
    pub political_cost: f64,
    /// Relations change applied to the target country.
    pub relations_penalty: f64,
    /// Estimated cost in millions.
    #[ts(as = "String")]
    pub estimated_cost_millions: Decimal,
    /// Covert operations are not announced.
    pub is_covert: bool,
    /// Present only once Completed or Failed.
    pub result: Option<OperationResult>,
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// A country's units, bases and operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ForceRoster {
    /// Order of battle.
    #[serde(default)]
    pub units: Vec<MilitaryUnit>,
    /// Installations.
    #[serde(default)]
    pub bases: Vec<MilitaryBase>,
    /// Live and historical operations.
    #[serde(default)]
    pub operations: Vec<ActiveOperation>,
}

impl ForceRoster {
    /// Look up a unit by id.
    pub fn unit(&self, id: &UnitId) -> Option<&MilitaryUnit> {
        self.units.iter().find(|u| &u.id == id)
    }

    /// Look up a unit by id for mutation.
    pub fn unit_mut(&mut self, id: &UnitId) -> Option<&mut MilitaryUnit> {
        self.units.iter_mut().find(|u| &u.id == id)
    }

    /// Look up a base by id.
    pub fn base(&self, id: &BaseId) -> Option<&MilitaryBase> {
        self.bases.iter().find(|b| &b.id == id)
    }

    /// Look up an operation by id.
    pub fn operation(&self, id: &OperationId) -> Option<&ActiveOperation> {
        self.operations.iter().find(|o| &o.id == id)
    }

    /// Look up an operation by id for mutation.
    pub fn operation_mut(&mut self, id: &OperationId) -> Option<&mut ActiveOperation> {
        self.operations.iter_mut().find(|o| &o.id == id)
    }

    /// Operations that are still Planning, Deploying or Active.
    pub fn live_operations(&self) -> impl Iterator<Item = &ActiveOperation> {
        self.operations.iter().filter(|o| o.status.is_live())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn unit() -> MilitaryUnit {
        MilitaryUnit::new(
            "u1",
            "1st Fighter Wing",
            "F-16C",
            UnitCategory::Aircraft,
            Coordinates::new(31.0, 35.0).unwrap(),
        )
    }

    #[test]
    fn fresh_unit_strength() {
        // 1 * 1 * 1 * 0.8 * (0.5 + 0.25) = 0.6
        let u = unit();
        assert!((u.effective_strength() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn strength_uses_scarcer_supply() {
        let mut u = unit();
        u.fuel_percent = 50.0;
        u.ammo_percent = 25.0;
        assert!((u.effective_strength() - 0.15).abs() < 1e-9);
    }

    #[test]
    fn roster_lookup() {
        let mut roster = ForceRoster::default();
        roster.units.push(unit());
        assert!(roster.unit(&UnitId::from("u1")).is_some());
        assert!(roster.unit(&UnitId::from("u2")).is_none());
        roster.unit_mut(&UnitId::from("u1")).unwrap().kills = 3;
        assert_eq!(roster.units.first().unwrap().kills, 3);
    }

    #[test]
    fn unit_deserializes_with_defaults() {
        let json = r#"{
            "id": "tank_1", "name": "1st Armored", "unit_type": "M1A2",
            "category": "ground", "location": {"lat": 10.0, "lng": 20.0},
            "status": "idle", "health_percent": 90.0, "readiness_percent": 80.0,
            "fuel_percent": 70.0, "ammo_percent": 60.0
        }"#;
        let u: MilitaryUnit = serde_json::from_str(json).unwrap();
        assert_eq!(u.experience_level, DEFAULT_EXPERIENCE);
        assert_eq!(u.morale, DEFAULT_MORALE);
        assert_eq!(u.quantity, 1);
        assert!(u.movement.is_none());
    }
}
