//! Per-country tick coordination.
//!
//! A [`TickCoordinator`] owns everything one country needs on a tick: the
//! processor set, the operation lifecycle and a random source. It registers
//! one handler per tick category with the clock. Each firing runs as a
//! single session pass, so a category's changes are persisted together or
//! not at all.
//!
//! # Per-category work
//!
//! - **Daily** -- stamp the date, settle unit movements, then advance
//!   operations. Movements always settle first so that operation arrival
//!   checks see this tick's arrivals.
//! - **Weekly** -- the optional weekly processor.
//! - **Monthly** -- economy, then event triggers, then event countdown.
//! - **Quarterly** -- sector and infrastructure projects.
//! - **Yearly** -- demographics, then weapon deliveries.
//!
//! Notifications are published only after the pass is saved.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;
use tracing::{debug, info, warn};
use worldsim_military::{Arrival, OperationLifecycle, OperationUpdate, RandomSource};
use worldsim_types::{
    ChangeSummary, CountryCode, CountryState, NotificationKind, ProcessorStamp, TickKind,
};

use crate::broadcast::{BroadcastSink, Notification};
use crate::clock::{HandlerError, HandlerId, TickContext};
use crate::handle::ClockHandle;
use crate::processors::{ProcessorError, ProcessorSet};
use crate::session::CountrySessions;
use crate::store::StoreError;

/// Errors that abort one category for one country.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// Loading or saving the snapshot failed.
    #[error("snapshot store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// A domain processor failed.
    #[error("{source}")]
    Processor {
        /// The underlying processor error.
        #[from]
        source: ProcessorError,
    },
}

/// What the daily pass changed.
#[derive(Debug, Clone, Default)]
pub struct DailyOutcome {
    /// Units whose movement completed.
    pub arrivals: Vec<Arrival>,
    /// Operations that changed.
    pub operations: Vec<OperationUpdate>,
}

/// Drives one country's snapshot from clock ticks.
pub struct TickCoordinator {
    country: CountryCode,
    sessions: Arc<CountrySessions>,
    sink: Arc<dyn BroadcastSink>,
    processors: ProcessorSet,
    lifecycle: OperationLifecycle,
    rng: Box<dyn RandomSource>,
}

impl core::fmt::Debug for TickCoordinator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TickCoordinator")
            .field("country", &self.country)
            .field("processors", &self.processors)
            .finish_non_exhaustive()
    }
}

impl TickCoordinator {
    /// Create a coordinator for `country`.
    pub fn new(
        country: CountryCode,
        sessions: Arc<CountrySessions>,
        sink: Arc<dyn BroadcastSink>,
        processors: ProcessorSet,
        lifecycle: OperationLifecycle,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self {
            country,
            sessions,
            sink,
            processors,
            lifecycle,
            rng,
        }
    }

    /// Country this coordinator drives.
    pub const fn country(&self) -> &CountryCode {
        &self.country
    }

    /// Register one handler per tick category with the clock.
    ///
    /// The coordinator moves behind a mutex shared by the five handlers.
    pub fn register(self, clock: &ClockHandle) -> Vec<HandlerId> {
        let country = self.country.clone();
        let shared = Arc::new(Mutex::new(self));
        TickKind::ALL
            .into_iter()
            .map(|kind| {
                let coordinator = Arc::clone(&shared);
                clock.register(
                    kind,
                    format!("{country}:{}", kind.as_str()),
                    Box::new(move |ctx: &TickContext| {
                        coordinator
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .handle(ctx)
                            .map_err(HandlerError::new)
                    }),
                )
            })
            .collect()
    }

    /// Run the work for one fired category.
    pub fn handle(&mut self, ctx: &TickContext) -> Result<(), TickError> {
        let result = match ctx.kind {
            TickKind::Daily => self.daily(ctx).map(|_| ()),
            TickKind::Weekly => self.weekly(ctx),
            TickKind::Monthly => self.monthly(ctx),
            TickKind::Quarterly => self.quarterly(ctx),
            TickKind::Yearly => self.yearly(ctx),
        };
        if let Err(err) = &result {
            warn!(
                country = %self.country,
                tick = ctx.kind.as_str(),
                error = %err,
                "Tick category aborted; snapshot left unchanged"
            );
        }
        result
    }

    // -----------------------------------------------------------------------
    // Categories
    // -----------------------------------------------------------------------

    /// Stamp the date, settle movements and advance operations.
    pub fn daily(&mut self, ctx: &TickContext) -> Result<DailyOutcome, TickError> {
        let now = ctx.now();
        let lifecycle = &self.lifecycle;
        let rng = &mut self.rng;
        let outcome = self.sessions.transact(&self.country, |state| {
            state.meta.current_date = Some(ctx.date);
            state.meta.total_game_days_elapsed = ctx.day_count;
            let arrivals = lifecycle.motion().process_movements(&mut state.forces, now);
            let operations = lifecycle.process_operations(&mut state.forces, now, rng.as_mut());
            Ok::<_, TickError>(DailyOutcome {
                arrivals,
                operations,
            })
        })?;

        debug!(
            country = %self.country,
            date = %ctx.date,
            arrivals = outcome.arrivals.len(),
            operation_updates = outcome.operations.len(),
            "Daily tick processed"
        );

        self.publish(
            NotificationKind::Tick,
            &json!({ "date": ctx.date, "day_count": ctx.day_count }),
            ctx,
        );
        for arrival in &outcome.arrivals {
            self.publish(NotificationKind::UnitArrived, arrival, ctx);
        }
        for update in &outcome.operations {
            let kind = if update.is_terminal() {
                NotificationKind::OperationCompleted
            } else {
                NotificationKind::OperationUpdated
            };
            self.publish(kind, update, ctx);
        }
        Ok(outcome)
    }

    fn weekly(&mut self, ctx: &TickContext) -> Result<(), TickError> {
        let Some(processor) = self.processors.weekly.as_mut() else {
            return Ok(());
        };
        self.sessions.transact(&self.country, |state| {
            processor.process(state, ctx)?;
            Ok::<_, TickError>(())
        })
    }

    fn monthly(&mut self, ctx: &TickContext) -> Result<(), TickError> {
        let processors = &mut self.processors;
        let events = self.sessions.transact(&self.country, |state| {
            let economy = processors.economy.process(state, ctx)?;
            stamp(&mut state.meta.last_economic_update, ctx, economy);

            let mut events = processors.events.check_triggers(state, ctx)?;
            events.merge(processors.events.decrement_active(state, ctx)?);
            stamp(&mut state.meta.last_event_update, ctx, events.clone());
            Ok::<_, TickError>(events)
        })?;

        info!(country = %self.country, date = %ctx.date, "Monthly processing complete");
        if !events.is_empty() {
            self.publish(NotificationKind::EventTriggered, &events, ctx);
        }
        Ok(())
    }

    fn quarterly(&mut self, ctx: &TickContext) -> Result<(), TickError> {
        let processors = &mut self.processors;
        self.sessions.transact(&self.country, |state| {
            let sectors = processors.sectors.process(state, ctx)?;
            stamp(&mut state.meta.last_sector_update, ctx, sectors);
            Ok::<_, TickError>(())
        })?;
        info!(country = %self.country, date = %ctx.date, "Quarterly processing complete");
        Ok(())
    }

    fn yearly(&mut self, ctx: &TickContext) -> Result<(), TickError> {
        let processors = &mut self.processors;
        let delivered = self.sessions.transact(&self.country, |state| {
            let demographics = processors.demographics.process(state, ctx)?;
            stamp(&mut state.meta.last_demographic_update, ctx, demographics);
            processors.deliveries.process(state, ctx)?;
            Ok::<_, TickError>(state.recent_deliveries.clone())
        })?;

        info!(
            country = %self.country,
            date = %ctx.date,
            deliveries = delivered.len(),
            "Yearly processing complete"
        );
        if !delivered.is_empty() {
            self.publish(NotificationKind::UnitUpdated, &delivered, ctx);
        }
        Ok(())
    }

    fn publish(&self, kind: NotificationKind, payload: &impl serde::Serialize, ctx: &TickContext) {
        self.sink.publish(Notification::new(
            kind,
            Some(self.country.clone()),
            payload,
            ctx.now(),
        ));
    }
}

fn stamp(slot: &mut Option<ProcessorStamp>, ctx: &TickContext, changes: ChangeSummary) {
    *slot = Some(ProcessorStamp {
        date: ctx.date,
        changes,
    });
}

/// Read-only view used by tests and diagnostics.
pub fn snapshot(
    sessions: &CountrySessions,
    country: &CountryCode,
) -> Result<CountryState, StoreError> {
    sessions.read(country, Clone::clone)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use worldsim_military::{DEFAULT_ARRIVAL_TOLERANCE_KM, FixedRandom, OperationRequest};
    use worldsim_types::{
        BaseType, Coordinates, MilitaryBase, MilitaryUnit, OperationStatus, UnitCategory, UnitId,
        UnitStatus,
    };

    use super::*;
    use crate::broadcast::RecordingSink;
    use crate::clock::SimClock;
    use crate::processors::DomainProcessor;
    use crate::store::MemoryStore;

    fn isr() -> CountryCode {
        CountryCode::from("ISR")
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ctx(kind: TickKind, date: NaiveDate, day_count: u64) -> TickContext {
        TickContext {
            kind,
            date,
            day_count,
        }
    }

    fn country() -> CountryState {
        let mut state = CountryState::new(isr(), "Israel");
        let home = MilitaryBase::new(
            "nevatim",
            "Nevatim",
            Coordinates::new(31.0, 35.0).unwrap(),
            BaseType::AirBase,
        );
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
            state.forces.units.push(jet);
        }
        state.forces.bases.push(home);
        state
    }

    fn lifecycle() -> OperationLifecycle {
        OperationLifecycle::new(isr(), DEFAULT_ARRIVAL_TOLERANCE_KM)
    }

    fn setup(processors: ProcessorSet) -> (TickCoordinator, Arc<CountrySessions>, Arc<RecordingSink>) {
        let sessions = Arc::new(CountrySessions::new(Arc::new(MemoryStore::with_states([
            country(),
        ]))));
        let sink = RecordingSink::new();
        let coordinator = TickCoordinator::new(
            isr(),
            Arc::clone(&sessions),
            Arc::clone(&sink) as Arc<dyn BroadcastSink>,
            processors,
            lifecycle(),
            Box::new(FixedRandom::new(0.0)),
        );
        (coordinator, sessions, sink)
    }

    /// Create and start an air strike at midnight on 2024-01-01.
    fn start_strike(sessions: &CountrySessions) {
        let engine = lifecycle();
        let now = ctx(TickKind::Daily, ymd(2024, 1, 1), 0).now();
        sessions
            .transact(&isr(), |state| {
                let request = OperationRequest {
                    operation_type: String::from("air_strike"),
                    name: String::from("Opera"),
                    target_location: Coordinates::new(32.0, 34.5).unwrap(),
                    unit_ids: vec![UnitId::from("f16_1"), UnitId::from("f16_2")],
                    target_name: None,
                    target_country_code: None,
                    duration_hours: None,
                    is_covert: false,
                };
                let op = engine.create(&mut state.forces, &request, now).unwrap();
                engine.start(&mut state.forces, &op.id, now).unwrap();
                Ok::<_, StoreError>(())
            })
            .unwrap();
    }

    struct Failing;

    impl DomainProcessor for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn process(
            &mut self,
            _state: &mut CountryState,
            _ctx: &TickContext,
        ) -> Result<ChangeSummary, ProcessorError> {
            Err(ProcessorError::new("failing", "boom"))
        }
    }

    struct Logged {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl DomainProcessor for Logged {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process(
            &mut self,
            _state: &mut CountryState,
            _ctx: &TickContext,
        ) -> Result<ChangeSummary, ProcessorError> {
            self.log.lock().unwrap().push(self.name);
            Ok(ChangeSummary::default())
        }
    }

    #[test]
    fn daily_stamps_date_and_persists() {
        let (mut coordinator, sessions, sink) = setup(ProcessorSet::default());
        coordinator.handle(&ctx(TickKind::Daily, ymd(2024, 1, 6), 5)).unwrap();

        let state = snapshot(&sessions, &isr()).unwrap();
        assert_eq!(state.meta.current_date, Some(ymd(2024, 1, 6)));
        assert_eq!(state.meta.total_game_days_elapsed, 5);
        assert_eq!(sink.kinds(), vec![NotificationKind::Tick]);
    }

    #[test]
    fn movements_settle_before_operations() {
        let (mut coordinator, sessions, sink) = setup(ProcessorSet::default());
        start_strike(&sessions);

        // Day 1: both jets land on target and the operation engages.
        let outcome = coordinator.daily(&ctx(TickKind::Daily, ymd(2024, 1, 2), 1)).unwrap();
        assert_eq!(outcome.arrivals.len(), 2);
        assert_eq!(outcome.operations.len(), 1);
        let state = snapshot(&sessions, &isr()).unwrap();
        assert_eq!(state.forces.operations.first().unwrap().status, OperationStatus::Active);

        // Day 2: the two-hour strike is long over and resolves.
        let outcome = coordinator.daily(&ctx(TickKind::Daily, ymd(2024, 1, 3), 2)).unwrap();
        assert!(outcome.operations.first().unwrap().is_terminal());
        let state = snapshot(&sessions, &isr()).unwrap();
        let op = state.forces.operations.first().unwrap();
        assert_eq!(op.status, OperationStatus::Completed);
        assert!(state.forces.units.iter().all(|u| u.status == UnitStatus::Returning));

        // Day 3: the jets are home.
        coordinator.daily(&ctx(TickKind::Daily, ymd(2024, 1, 4), 3)).unwrap();
        let state = snapshot(&sessions, &isr()).unwrap();
        assert!(state.forces.units.iter().all(|u| u.status == UnitStatus::Idle));
        assert!(state.forces.units.iter().all(|u| u.assigned_operation_id.is_none()));

        let kinds = sink.kinds();
        assert_eq!(
            kinds.iter().filter(|k| **k == NotificationKind::UnitArrived).count(),
            4
        );
        assert!(kinds.contains(&NotificationKind::OperationUpdated));
        assert!(kinds.contains(&NotificationKind::OperationCompleted));
    }

    #[test]
    fn monthly_runs_economy_and_stamps() {
        let (mut coordinator, sessions, _) = setup(ProcessorSet::default());
        coordinator.handle(&ctx(TickKind::Monthly, ymd(2024, 2, 1), 31)).unwrap();

        let state = snapshot(&sessions, &isr()).unwrap();
        let stamp = state.meta.last_economic_update.unwrap();
        assert_eq!(stamp.date, ymd(2024, 2, 1));
        assert!(stamp.changes.changes.contains_key("economy.gdp_billions_usd"));
        assert!(state.meta.last_event_update.is_some());
    }

    #[test]
    fn failing_processor_discards_its_category_only() {
        let processors = ProcessorSet {
            sectors: Box::new(Failing),
            ..ProcessorSet::default()
        };
        let (mut coordinator, sessions, _) = setup(processors);
        let day = ymd(2024, 4, 1);

        coordinator.handle(&ctx(TickKind::Daily, day, 91)).unwrap();
        coordinator.handle(&ctx(TickKind::Monthly, day, 91)).unwrap();
        let err = coordinator.handle(&ctx(TickKind::Quarterly, day, 91)).unwrap_err();
        assert!(matches!(err, TickError::Processor { .. }));

        let state = snapshot(&sessions, &isr()).unwrap();
        assert_eq!(state.meta.current_date, Some(day));
        assert!(state.meta.last_economic_update.is_some());
        assert!(state.meta.last_sector_update.is_none());
    }

    #[test]
    fn yearly_runs_demographics_before_deliveries() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let processors = ProcessorSet {
            demographics: Box::new(Logged {
                name: "demographics",
                log: Arc::clone(&log),
            }),
            deliveries: Box::new(Logged {
                name: "deliveries",
                log: Arc::clone(&log),
            }),
            ..ProcessorSet::default()
        };
        let (mut coordinator, _, _) = setup(processors);
        coordinator.handle(&ctx(TickKind::Yearly, ymd(2025, 1, 1), 366)).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["demographics", "deliveries"]);
    }

    #[test]
    fn registered_handlers_fire_from_the_clock() {
        let (coordinator, sessions, _) = setup(ProcessorSet::default());
        let clock = ClockHandle::new(SimClock::new(ymd(2024, 12, 31), 1.0));
        let ids = coordinator.register(&clock);
        assert_eq!(ids.len(), 5);

        let report = clock.advance().unwrap();
        assert!(report.failures.is_empty());
        let state = snapshot(&sessions, &isr()).unwrap();
        assert_eq!(state.meta.current_date, Some(ymd(2025, 1, 1)));
        assert!(state.meta.last_economic_update.is_some());
        assert!(state.meta.last_sector_update.is_some());
        assert!(state.meta.last_demographic_update.is_some());
    }

    #[test]
    fn missing_country_surfaces_as_handler_failure() {
        let sessions = Arc::new(CountrySessions::new(Arc::new(MemoryStore::new())));
        let coordinator = TickCoordinator::new(
            isr(),
            sessions,
            Arc::new(crate::broadcast::NullSink),
            ProcessorSet::default(),
            lifecycle(),
            Box::new(FixedRandom::new(0.0)),
        );
        let clock = ClockHandle::new(SimClock::new(ymd(2024, 3, 10), 1.0));
        coordinator.register(&clock);
        let report = clock.advance().unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures.first().unwrap().label, "ISR:daily");
    }
}
