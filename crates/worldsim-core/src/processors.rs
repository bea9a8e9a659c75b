//! Domain processor seams invoked by the tick coordinator.
//!
//! Each processor mutates a loaded country snapshot in place and returns a
//! [`ChangeSummary`] of what it touched. The formulas here are
//! simple; richer models plug in behind the same traits.
//!
//! # Ordering
//!
//! - Monthly: economy, then event trigger check, then event decrement.
//! - Quarterly: sector projects.
//! - Yearly: demographics, then deliveries.

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use worldsim_military::RandomSource;
use worldsim_types::{ChangeSummary, CountryState, StatePath};

use crate::clock::TickContext;
use crate::deliveries::DeliveryProcessor;
use crate::events::{CatalogEventProcessor, EventCatalog};
use crate::projects::ProjectProcessor;

/// Months per year, for spreading annual rates.
const MONTHS_PER_YEAR: f64 = 12.0;

/// A processor failed while mutating a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{processor} processor failed: {message}")]
pub struct ProcessorError {
    /// Processor name.
    pub processor: String,
    /// Failure description.
    pub message: String,
}

impl ProcessorError {
    /// Create an error for `processor`.
    pub fn new(processor: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            processor: processor.into(),
            message: message.into(),
        }
    }
}

/// A periodic state transformation.
pub trait DomainProcessor: Send {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Mutate `state` for the tick described by `ctx`.
    fn process(
        &mut self,
        state: &mut CountryState,
        ctx: &TickContext,
    ) -> Result<ChangeSummary, ProcessorError>;
}

/// The monthly event pass.
pub trait EventProcessor: Send {
    /// Roll for new events and apply the effects of any that trigger.
    fn check_triggers(
        &mut self,
        state: &mut CountryState,
        ctx: &TickContext,
    ) -> Result<ChangeSummary, ProcessorError>;

    /// Count down events that were already active and expire finished ones.
    fn decrement_active(
        &mut self,
        state: &mut CountryState,
        ctx: &TickContext,
    ) -> Result<ChangeSummary, ProcessorError>;
}

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

/// Compounds GDP by one twelfth of the annual growth rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EconomyProcessor;

impl DomainProcessor for EconomyProcessor {
    fn name(&self) -> &'static str {
        "economy"
    }

    fn process(
        &mut self,
        state: &mut CountryState,
        _ctx: &TickContext,
    ) -> Result<ChangeSummary, ProcessorError> {
        let gdp = state.economy.gdp_billions_usd;
        let monthly_rate = state.economy.gdp_growth_rate / 100.0 / MONTHS_PER_YEAR;
        let delta = gdp * monthly_rate;
        if !delta.is_finite() {
            return Err(ProcessorError::new(
                self.name(),
                format!("non-finite GDP change from gdp={gdp} rate={monthly_rate}"),
            ));
        }
        StatePath::GdpBillionsUsd.add(state, delta);

        let mut summary = ChangeSummary::default();
        summary.record(StatePath::GdpBillionsUsd.as_str(), delta);
        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Demographics
// ---------------------------------------------------------------------------

/// Grows the population by its annual growth rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemographicsProcessor;

impl DemographicsProcessor {
    fn fail(self, message: &str) -> ProcessorError {
        ProcessorError::new(self.name(), message)
    }
}

impl DomainProcessor for DemographicsProcessor {
    fn name(&self) -> &'static str {
        "demographics"
    }

    fn process(
        &mut self,
        state: &mut CountryState,
        _ctx: &TickContext,
    ) -> Result<ChangeSummary, ProcessorError> {
        let population = Decimal::from(state.demographics.population);
        let rate = Decimal::from_f64(state.demographics.growth_rate_percent)
            .ok_or_else(|| self.fail("growth rate is not a finite number"))?;
        let growth = population
            .checked_mul(rate)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(|| self.fail("population growth overflow"))?
            .round();
        let next = population
            .checked_add(growth)
            .ok_or_else(|| self.fail("population overflow"))?
            .max(Decimal::ZERO)
            .to_u64()
            .ok_or_else(|| self.fail("population out of range"))?;

        let delta = growth.to_f64().unwrap_or_default();
        state.demographics.population = next;

        let mut summary = ChangeSummary::default();
        summary.record("demographics.population", delta);
        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Events without a catalog
// ---------------------------------------------------------------------------

/// Never triggers anything; still expires active events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvents;

impl EventProcessor for NoEvents {
    fn check_triggers(
        &mut self,
        _state: &mut CountryState,
        _ctx: &TickContext,
    ) -> Result<ChangeSummary, ProcessorError> {
        Ok(ChangeSummary::default())
    }

    fn decrement_active(
        &mut self,
        state: &mut CountryState,
        ctx: &TickContext,
    ) -> Result<ChangeSummary, ProcessorError> {
        Ok(crate::events::decrement_active_events(state, ctx))
    }
}

// ---------------------------------------------------------------------------
// Processor set
// ---------------------------------------------------------------------------

/// Everything the coordinator runs besides the military engines.
pub struct ProcessorSet {
    /// Monthly economic processor.
    pub economy: Box<dyn DomainProcessor>,
    /// Monthly event processor.
    pub events: Box<dyn EventProcessor>,
    /// Quarterly sector/infrastructure processor.
    pub sectors: Box<dyn DomainProcessor>,
    /// Yearly demographic processor.
    pub demographics: Box<dyn DomainProcessor>,
    /// Yearly delivery processor.
    pub deliveries: Box<dyn DomainProcessor>,
    /// Weekly extension point; nothing runs when empty.
    pub weekly: Option<Box<dyn DomainProcessor>>,
}

impl core::fmt::Debug for ProcessorSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProcessorSet")
            .field("economy", &self.economy.name())
            .field("sectors", &self.sectors.name())
            .field("demographics", &self.demographics.name())
            .field("deliveries", &self.deliveries.name())
            .field("weekly", &self.weekly.as_ref().map(|p| p.name()))
            .finish_non_exhaustive()
    }
}

impl ProcessorSet {
    /// The standard processors with catalog-driven events.
    pub fn standard(catalog: EventCatalog, rng: Box<dyn RandomSource>) -> Self {
        Self {
            events: Box::new(CatalogEventProcessor::new(catalog, rng)),
            ..Self::default()
        }
    }
}

impl Default for ProcessorSet {
    /// Standard processors with no random events.
    fn default() -> Self {
        Self {
            economy: Box::new(EconomyProcessor),
            events: Box::new(NoEvents),
            sectors: Box::new(ProjectProcessor),
            demographics: Box::new(DemographicsProcessor),
            deliveries: Box::new(DeliveryProcessor),
            weekly: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use worldsim_types::{CountryCode, TickKind};

    use super::*;

    fn ctx(kind: TickKind) -> TickContext {
        TickContext {
            kind,
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            day_count: 31,
        }
    }

    fn state() -> CountryState {
        CountryState::new(CountryCode::from("USA"), "United States")
    }

    #[test]
    fn economy_compounds_monthly() {
        let mut s = state();
        s.economy.gdp_billions_usd = 1200.0;
        s.economy.gdp_growth_rate = 12.0;
        let summary = EconomyProcessor.process(&mut s, &ctx(TickKind::Monthly)).unwrap();
        assert!((s.economy.gdp_billions_usd - 1212.0).abs() < 1e-9);
        assert!((summary.changes["economy.gdp_billions_usd"] - 12.0).abs() < 1e-9);
    }

    #[test]
    fn economy_rejects_non_finite_rate() {
        let mut s = state();
        s.economy.gdp_growth_rate = f64::INFINITY;
        let err = EconomyProcessor.process(&mut s, &ctx(TickKind::Monthly)).unwrap_err();
        assert_eq!(err.processor, "economy");
    }

    #[test]
    fn population_grows_yearly() {
        let mut s = state();
        s.demographics.population = 10_000_000;
        s.demographics.growth_rate_percent = 0.5;
        DemographicsProcessor.process(&mut s, &ctx(TickKind::Yearly)).unwrap();
        assert_eq!(s.demographics.population, 10_050_000);
    }

    #[test]
    fn population_never_negative() {
        let mut s = state();
        s.demographics.population = 100;
        s.demographics.growth_rate_percent = -250.0;
        DemographicsProcessor.process(&mut s, &ctx(TickKind::Yearly)).unwrap();
        assert_eq!(s.demographics.population, 0);
    }
}
