//! Typed per-country snapshot tree.
//!
//! One [`CountryState`] document is loaded, mutated and saved whole by
//! every tick category and every player action. The tree is
//! shallow: numeric fields that catalogs may address are reachable through
//! [`StatePath`](crate::path::StatePath).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::UnitCategory;
use crate::ids::{BaseId, CountryCode, EventId, ProjectId, UnitId};
use crate::military::ForceRoster;
use crate::path::StatePath;

// ---------------------------------------------------------------------------
// Change tracking
// ---------------------------------------------------------------------------

/// Labelled deltas produced by one processor run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChangeSummary {
    /// Delta per label (usually a [`StatePath`] string).
    pub changes: BTreeMap<String, f64>,
}

impl ChangeSummary {
    /// Accumulate `delta` under `label`.
    pub fn record(&mut self, label: impl Into<String>, delta: f64) {
        let entry = self.changes.entry(label.into()).or_insert(0.0);
        *entry += delta;
    }

    /// Fold another summary into this one.
    pub fn merge(&mut self, other: Self) {
        for (label, delta) in other.changes {
            self.record(label, delta);
        }
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// When a processor category last ran and what it changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProcessorStamp {
    /// Simulated date of the run.
    pub date: NaiveDate,
    /// Changes made.
    pub changes: ChangeSummary,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Bookkeeping for the snapshot itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CountryMeta {
    /// Country code.
    pub code: CountryCode,
    /// Display name.
    pub name: String,
    /// Simulated date stamped by the daily tick.
    pub current_date: Option<NaiveDate>,
    /// Simulated days elapsed, stamped by the daily tick.
    #[serde(default)]
    pub total_game_days_elapsed: u64,
    /// Last monthly economic run.
    #[serde(default)]
    pub last_economic_update: Option<ProcessorStamp>,
    /// Last monthly event run.
    #[serde(default)]
    pub last_event_update: Option<ProcessorStamp>,
    /// Last quarterly sector run.
    #[serde(default)]
    pub last_sector_update: Option<ProcessorStamp>,
    /// Last yearly demographic run.
    #[serde(default)]
    pub last_demographic_update: Option<ProcessorStamp>,
}

/// Macro-economic indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Economy {
    /// Nominal GDP in billions of USD.
    pub gdp_billions_usd: f64,
    /// Annual real growth, percent.
    pub gdp_growth_rate: f64,
    /// Annual inflation, percent.
    pub inflation_rate: f64,
    /// Unemployment, percent of workforce.
    pub unemployment_rate: f64,
    /// Public debt as percent of GDP.
    pub debt_to_gdp_percent: f64,
    /// Unrealised trade opportunity index.
    pub trade_potential: f64,
}

impl Default for Economy {
    fn default() -> Self {
        Self {
            gdp_billions_usd: 1000.0,
            gdp_growth_rate: 2.0,
            inflation_rate: 2.5,
            unemployment_rate: 5.0,
            debt_to_gdp_percent: 60.0,
            trade_potential: 0.0,
        }
    }
}

/// Population figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Demographics {
    /// Head count.
    pub population: u64,
    /// Annual growth, percent.
    pub growth_rate_percent: f64,
}

impl Default for Demographics {
    fn default() -> Self {
        Self {
            population: 10_000_000,
            growth_rate_percent: 0.5,
        }
    }
}

/// Societal indices, 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Indices {
    /// Public happiness.
    pub happiness: f64,
    /// Political stability.
    pub stability: f64,
    /// Trust in government.
    pub public_trust: f64,
    /// International standing.
    pub international_standing: f64,
    /// Innovation capacity.
    pub innovation: f64,
}

impl Default for Indices {
    fn default() -> Self {
        Self {
            happiness: 50.0,
            stability: 50.0,
            public_trust: 50.0,
            international_standing: 50.0,
            innovation: 50.0,
        }
    }
}

/// Aggregate military posture (distinct from the unit roster).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MilitaryPosture {
    /// Overall readiness, 0-100.
    pub readiness_overall: f64,
}

impl Default for MilitaryPosture {
    fn default() -> Self {
        Self {
            readiness_overall: 50.0,
        }
    }
}

/// Sector development levels, 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Sectors {
    /// Technology sector level.
    pub technology_level: f64,
    /// Industry sector level.
    pub industry_level: f64,
}

impl Default for Sectors {
    fn default() -> Self {
        Self {
            technology_level: 50.0,
            industry_level: 50.0,
        }
    }
}

/// Physical infrastructure stock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Infrastructure {
    /// Accumulated damage index.
    pub damage: f64,
    /// Generating capacity.
    pub energy_capacity_gw: f64,
    /// Share of renewable generation.
    pub renewable_percent: f64,
    /// Highway network length.
    pub highway_km: f64,
    /// Number of hospitals.
    pub hospitals: f64,
    /// Hospital beds per thousand people.
    pub beds_per_1000: f64,
}

// ---------------------------------------------------------------------------
// Events, projects, deliveries
// ---------------------------------------------------------------------------

/// A single numeric effect of an event or project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Effect {
    /// Field affected.
    pub path: StatePath,
    /// Amount added.
    pub delta: f64,
}

/// An event currently affecting the country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActiveEvent {
    /// Instance id (`<event_type>_<year>_<month>`).
    pub id: EventId,
    /// Catalog key.
    pub event_type: String,
    /// Display name.
    pub name: String,
    /// Effects applied when the event triggered.
    pub effects: Vec<Effect>,
    /// Total duration.
    pub duration_months: u32,
    /// Months left before the event expires.
    pub months_remaining: u32,
    /// Simulated date the event triggered.
    pub triggered_on: NaiveDate,
}

/// Progress state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ProjectStatus {
    /// Accruing quarters.
    InProgress,
    /// Finished; effects applied.
    Completed,
    /// Abandoned; no effects.
    Cancelled,
}

/// A multi-quarter sector or infrastructure project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Project {
    /// Project id.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Quarters left until completion.
    pub quarters_remaining: u32,
    /// Progress state.
    pub status: ProjectStatus,
    /// Effects applied on completion.
    pub effects: Vec<Effect>,
}

/// A procurement order awaiting fulfilment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PendingDelivery {
    /// Order reference.
    pub order_id: String,
    /// Equipment type delivered.
    pub unit_type: String,
    /// Category of the resulting unit.
    pub category: UnitCategory,
    /// Platforms in the order.
    pub quantity: u32,
    /// Year the order is fulfilled.
    pub delivery_year: i32,
    /// Base the new unit is stationed at.
    pub base_id: BaseId,
}

/// A fulfilled procurement order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DeliveryRecord {
    /// Order reference.
    pub order_id: String,
    /// Unit created from the order.
    pub unit_id: UnitId,
    /// Simulated delivery date.
    pub delivered_on: NaiveDate,
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

/// Complete mutable state of one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CountryState {
    /// Snapshot bookkeeping.
    pub meta: CountryMeta,
    /// Economy.
    #[serde(default)]
    pub economy: Economy,
    /// Population.
    #[serde(default)]
    pub demographics: Demographics,
    /// Societal indices.
    #[serde(default)]
    pub indices: Indices,
    /// Aggregate military posture.
    #[serde(default)]
    pub military: MilitaryPosture,
    /// Sector levels.
    #[serde(default)]
    pub sectors: Sectors,
    /// Infrastructure stock.
    #[serde(default)]
    pub infrastructure: Infrastructure,
    /// Relations score per foreign country.
    #[serde(default)]
    pub relations: BTreeMap<CountryCode, f64>,
    /// Units, bases and operations.
    #[serde(default)]
    pub forces: ForceRoster,
    /// Events currently in effect.
    #[serde(default)]
    pub active_events: Vec<ActiveEvent>,
    /// Projects in progress.
    #[serde(default)]
    pub projects: Vec<Project>,
    /// Projects that have finished.
    #[serde(default)]
    pub completed_projects: Vec<Project>,
    /// Procurement orders awaiting delivery.
    #[serde(default)]
    pub pending_deliveries: Vec<PendingDelivery>,
    /// Orders delivered by the last yearly run.
    #[serde(default)]
    pub recent_deliveries: Vec<DeliveryRecord>,
}

impl CountryState {
    /// Create a snapshot with default indicators and an empty roster.
    pub fn new(code: CountryCode, name: impl Into<String>) -> Self {
        Self {
            meta: CountryMeta {
                code,
                name: name.into(),
                current_date: None,
                total_game_days_elapsed: 0,
                last_economic_update: None,
                last_event_update: None,
                last_sector_update: None,
                last_demographic_update: None,
            },
            economy: Economy::default(),
            demographics: Demographics::default(),
            indices: Indices::default(),
            military: MilitaryPosture::default(),
            sectors: Sectors::default(),
            infrastructure: Infrastructure::default(),
            relations: BTreeMap::new(),
            forces: ForceRoster::default(),
            active_events: Vec::new(),
            projects: Vec::new(),
            completed_projects: Vec::new(),
            pending_deliveries: Vec::new(),
            recent_deliveries: Vec::new(),
        }
    }

    /// Country code of this snapshot.
    pub const fn code(&self) -> &CountryCode {
        &self.meta.code
    }

    /// Apply a list of effects, recording each delta.
    pub fn apply_effects(&mut self, effects: &[Effect], summary: &mut ChangeSummary) {
        for effect in effects {
            effect.path.add(self, effect.delta);
            summary.record(effect.path.as_str(), effect.delta);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document_fills_defaults() {
        let json = r#"{"meta": {"code": "FRA", "name": "France", "current_date": null}}"#;
        let state: CountryState = serde_json::from_str(json).unwrap();
        assert_eq!(state.code().as_str(), "FRA");
        assert!(state.forces.units.is_empty());
        assert!((state.indices.happiness - 50.0).abs() < 1e-9);
    }

    #[test]
    fn apply_effects_records_changes() {
        let mut state = CountryState::new(CountryCode::from("USA"), "United States");
        let mut summary = ChangeSummary::default();
        let effects = [
            Effect {
                path: StatePath::Stability,
                delta: -15.0,
            },
            Effect {
                path: StatePath::Stability,
                delta: 5.0,
            },
        ];
        state.apply_effects(&effects, &mut summary);
        assert!((state.indices.stability - 40.0).abs() < 1e-9);
        assert!((summary.changes.get("indices.stability").unwrap() + 10.0).abs() < 1e-9);
    }
}
