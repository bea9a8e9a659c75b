//! Catalog-driven random events.
//!
//! An [`EventCatalog`] lists event definitions keyed by event type. Every
//! monthly pass rolls once per eligible definition against its monthly
//! probability. Conditions and effects address the snapshot through
//! [`StatePath`], so a catalog naming an unknown field fails to load instead
//! of failing mid-tick.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use serde::Deserialize;
use tracing::{debug, info};
use worldsim_military::RandomSource;
use worldsim_types::{ActiveEvent, ChangeSummary, CountryState, Effect, EventId, StatePath};

use crate::clock::TickContext;
use crate::processors::{EventProcessor, ProcessorError};

/// The catalog shipped with the engine.
const BUILTIN_CATALOG: &str = include_str!("../data/events.yaml");

/// Months per year, for spreading annual probabilities.
const MONTHS_PER_YEAR: f64 = 12.0;

/// Errors raised while loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read event catalog {}: {source}", path.display())]
    Io {
        /// Catalog file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The catalog is not valid YAML or names an unknown path.
    #[error("failed to parse event catalog: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A definition parsed but is unusable.
    #[error("invalid event `{event_type}`: {reason}")]
    Invalid {
        /// Offending catalog key.
        event_type: String,
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for CatalogError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// How a condition compares the current value with its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Comparison {
    /// Strictly greater.
    #[serde(rename = ">")]
    Greater,
    /// Strictly less.
    #[serde(rename = "<")]
    Less,
    /// Greater or equal.
    #[serde(rename = ">=")]
    AtLeast,
    /// Less or equal.
    #[serde(rename = "<=")]
    AtMost,
}

impl Comparison {
    /// Evaluate `current <op> threshold`.
    pub fn holds(self, current: f64, threshold: f64) -> bool {
        match self {
            Self::Greater => current > threshold,
            Self::Less => current < threshold,
            Self::AtLeast => current >= threshold,
            Self::AtMost => current <= threshold,
        }
    }
}

/// A probability modifier gated on one snapshot value.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Condition {
    /// Field read.
    pub path: StatePath,
    /// Comparison applied.
    pub op: Comparison,
    /// Threshold compared against.
    pub value: f64,
    /// Annual probability added (triggers) or removed (prevention).
    #[serde(alias = "add", alias = "subtract")]
    pub adjust: f64,
}

impl Condition {
    /// Whether the condition holds for `state`.
    pub fn matches(&self, state: &CountryState) -> bool {
        self.op.holds(self.path.get(state), self.value)
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventDefinition {
    /// Display name.
    pub name: String,
    /// Annual probability before modifiers.
    pub base_probability_annual: f64,
    /// Conditions that raise the probability.
    #[serde(default)]
    pub triggers: Vec<Condition>,
    /// Conditions that lower the probability.
    #[serde(default)]
    pub prevention: Vec<Condition>,
    /// Deltas applied once when the event triggers.
    #[serde(default)]
    pub effects: BTreeMap<StatePath, f64>,
    /// Months the event stays active; zero means instantaneous.
    #[serde(default = "default_duration_months")]
    pub duration_months: u32,
}

const fn default_duration_months() -> u32 {
    1
}

impl EventDefinition {
    /// Probability of triggering in one monthly pass.
    pub fn monthly_probability(&self, state: &CountryState) -> f64 {
        let raised: f64 = self
            .triggers
            .iter()
            .filter(|c| c.matches(state))
            .map(|c| c.adjust)
            .sum();
        let lowered: f64 = self
            .prevention
            .iter()
            .filter(|c| c.matches(state))
            .map(|c| c.adjust)
            .sum();
        ((self.base_probability_annual + raised - lowered) / MONTHS_PER_YEAR).clamp(0.0, 1.0)
    }

    /// Effects as a list, in path order.
    pub fn effect_list(&self) -> Vec<Effect> {
        self.effects
            .iter()
            .map(|(path, delta)| Effect {
                path: *path,
                delta: *delta,
            })
            .collect()
    }

    fn validate(&self, event_type: &str) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::Invalid {
            event_type: event_type.to_owned(),
            reason,
        };
        if !(0.0..=1.0).contains(&self.base_probability_annual) {
            return Err(invalid(format!(
                "base_probability_annual {} outside [0, 1]",
                self.base_probability_annual
            )));
        }
        let mut conditions = self.triggers.iter().chain(&self.prevention);
        if let Some(c) = conditions.find(|c| !c.value.is_finite() || !c.adjust.is_finite())
        {
            return Err(invalid(format!("non-finite condition on {}", c.path)));
        }
        if let Some((path, _)) = self.effects.iter().find(|(_, d)| !d.is_finite()) {
            return Err(invalid(format!("non-finite effect on {path}")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Event definitions keyed by event type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCatalog {
    events: BTreeMap<String, EventDefinition>,
}

impl EventCatalog {
    /// Parse and validate a YAML catalog.
    pub fn parse(yaml: &str) -> Result<Self, CatalogError> {
        let events: BTreeMap<String, EventDefinition> = serde_yml::from_str(yaml)?;
        for (event_type, def) in &events {
            def.validate(event_type)?;
        }
        Ok(Self { events })
    }

    /// Load a catalog file.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// The catalog shipped with the engine.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::parse(BUILTIN_CATALOG)
    }

    /// Look up a definition.
    pub fn get(&self, event_type: &str) -> Option<&EventDefinition> {
        self.events.get(event_type)
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Definitions in event-type order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EventDefinition)> {
        self.events.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Rolls catalog events with an injected random source.
pub struct CatalogEventProcessor {
    catalog: EventCatalog,
    rng: Box<dyn RandomSource>,
}

impl core::fmt::Debug for CatalogEventProcessor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CatalogEventProcessor")
            .field("events", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

impl CatalogEventProcessor {
    /// Create a processor over `catalog`.
    pub fn new(catalog: EventCatalog, rng: Box<dyn RandomSource>) -> Self {
        Self { catalog, rng }
    }
}

impl EventProcessor for CatalogEventProcessor {
    fn check_triggers(
        &mut self,
        state: &mut CountryState,
        ctx: &TickContext,
    ) -> Result<ChangeSummary, ProcessorError> {
        let mut summary = ChangeSummary::default();
        for (event_type, def) in &self.catalog.events {
            if state
                .active_events
                .iter()
                .any(|e| e.event_type == *event_type)
            {
                continue;
            }
            let probability = def.monthly_probability(state);
            if self.rng.next_f64() >= probability {
                continue;
            }

            let effects = def.effect_list();
            state.apply_effects(&effects, &mut summary);
            summary.record(format!("events.triggered.{event_type}"), 1.0);
            info!(
                country = %state.code(),
                event_type = %event_type,
                probability,
                duration_months = def.duration_months,
                "Event triggered"
            );

            if def.duration_months > 0 {
                state.active_events.push(ActiveEvent {
                    id: EventId::from(format!(
                        "{event_type}_{}_{}",
                        ctx.date.year(),
                        ctx.date.month()
                    )),
                    event_type: event_type.clone(),
                    name: def.name.clone(),
                    effects,
                    duration_months: def.duration_months,
                    months_remaining: def.duration_months,
                    triggered_on: ctx.date,
                });
            }
        }
        Ok(summary)
    }

    fn decrement_active(
        &mut self,
        state: &mut CountryState,
        ctx: &TickContext,
    ) -> Result<ChangeSummary, ProcessorError> {
        Ok(decrement_active_events(state, ctx))
    }
}

/// Count down every event that was active before this pass and drop those
/// that reach zero. Events triggered on `ctx.date` are left untouched.
pub fn decrement_active_events(state: &mut CountryState, ctx: &TickContext) -> ChangeSummary {
    let mut summary = ChangeSummary::default();
    for event in &mut state.active_events {
        if event.triggered_on != ctx.date {
            event.months_remaining = event.months_remaining.saturating_sub(1);
        }
    }
    let code = state.meta.code.clone();
    state.active_events.retain(|event| {
        if event.months_remaining > 0 {
            return true;
        }
        debug!(country = %code, event_id = %event.id, "Event expired");
        summary.record(format!("events.expired.{}", event.event_type), 1.0);
        false
    });
    summary
}
