//! Simulation clock and calendar-aware tick bucketing.
//!
//! The clock owns the simulated calendar. Each call to
//! [`SimClock::advance_day`] moves it forward exactly one day, classifies
//! that day into tick categories and synchronously drains the handlers
//! registered for each category that fired.
//!
//! # Design Principles
//!
//! - `current_date == start_date + day_count` always holds; the date is
//!   derived from the counter, never stored independently.
//! - Categories fire in a fixed order: Daily, Weekly, Monthly, Quarterly,
//!   Yearly. Each list is fully drained before the next one starts.
//! - A failing handler is logged and recorded in the [`TickReport`]; it
//!   never stops its siblings or later categories.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use worldsim_types::TickKind;

/// Slowest allowed speed multiplier.
pub const MIN_SPEED: f64 = 0.1;

/// Fastest allowed speed multiplier.
pub const MAX_SPEED: f64 = 100.0;

/// Days between weekly ticks.
const DAYS_PER_WEEK: u64 = 7;

/// Errors that can occur while advancing the clock.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// The clock is paused.
    #[error("clock is paused")]
    Paused,

    /// The calendar would leave the representable date range.
    #[error("simulated date out of range")]
    DateOverflow,

    /// The day counter would overflow.
    #[error("day counter overflow: cannot advance beyond u64::MAX")]
    CounterOverflow,
}

/// A tick handler's failure, as reported to the clock.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    /// Human-readable cause.
    pub message: String,
}

impl HandlerError {
    /// Wrap any displayable error.
    pub fn new(cause: impl core::fmt::Display) -> Self {
        Self {
            message: cause.to_string(),
        }
    }
}

/// What a handler is told about the day being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickContext {
    /// Category being drained.
    pub kind: TickKind,
    /// The simulated date just reached.
    pub date: NaiveDate,
    /// Days advanced since the clock started.
    pub day_count: u64,
}

impl TickContext {
    /// The simulated instant of this tick (midnight UTC).
    pub fn now(&self) -> DateTime<Utc> {
        midnight(self.date)
    }
}

/// A registered tick callback.
pub type TickHandler = Box<dyn FnMut(&TickContext) -> Result<(), HandlerError> + Send>;

/// Opaque handle returned by [`SimClock::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct HandlerId(u64);

struct Registration {
    id: HandlerId,
    label: String,
    handler: TickHandler,
}

/// Which categories fired for a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FiredTicks {
    /// Always true for an advanced day.
    pub daily: bool,
    /// Every seventh day counted from the start.
    pub weekly: bool,
    /// First day of a month.
    pub monthly: bool,
    /// First day of January, April, July or October.
    pub quarterly: bool,
    /// First day of January.
    pub yearly: bool,
}

impl FiredTicks {
    /// Whether `kind` fired.
    pub const fn contains(self, kind: TickKind) -> bool {
        match kind {
            TickKind::Daily => self.daily,
            TickKind::Weekly => self.weekly,
            TickKind::Monthly => self.monthly,
            TickKind::Quarterly => self.quarterly,
            TickKind::Yearly => self.yearly,
        }
    }

    /// Fired categories in firing order.
    pub fn kinds(self) -> impl Iterator<Item = TickKind> {
        TickKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

/// Classify an advanced day into tick categories.
///
/// Weekly fires when `day_count` is a multiple of seven. Monthly fires on
/// the first of the month; Quarterly and Yearly only ever fire together
/// with Monthly.
pub fn classify(date: NaiveDate, day_count: u64) -> FiredTicks {
    let monthly = date.day() == 1;
    FiredTicks {
        daily: true,
        weekly: day_count.checked_rem(DAYS_PER_WEEK) == Some(0),
        monthly,
        quarterly: monthly && matches!(date.month(), 1 | 4 | 7 | 10),
        yearly: monthly && date.month() == 1,
    }
}

/// A handler failure recorded during one advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerFailure {
    /// Category the handler was registered for.
    pub kind: TickKind,
    /// Handler label given at registration.
    pub label: String,
    /// Failure message.
    pub message: String,
}

/// Outcome of one [`SimClock::advance_day`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// The date reached.
    pub date: NaiveDate,
    /// Day counter after the advance.
    pub day_count: u64,
    /// Categories that fired.
    #[serde(flatten)]
    pub fired: FiredTicks,
    /// Handlers that returned an error.
    pub failures: Vec<HandlerFailure>,
}

/// JSON view of the clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClockState {
    /// Current simulated date.
    pub date: NaiveDate,
    /// Days advanced since start.
    pub day_count: u64,
    /// Whether the run loop is held.
    pub paused: bool,
    /// Simulated days per wall-clock second.
    pub speed: f64,
}

impl ClockState {
    /// Simulated instant (midnight UTC of [`date`](Self::date)).
    pub fn now(&self) -> DateTime<Utc> {
        midnight(self.date)
    }

    /// Wall-clock time between advances at this speed.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.speed).unwrap_or(Duration::from_secs(1))
    }
}

/// The simulation clock.
pub struct SimClock {
    start_date: NaiveDate,
    day_count: u64,
    paused: bool,
    speed: f64,
    handlers: BTreeMap<TickKind, Vec<Registration>>,
    next_handler: u64,
}

impl core::fmt::Debug for SimClock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let handlers: BTreeMap<TickKind, usize> =
            self.handlers.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("SimClock")
            .field("start_date", &self.start_date)
            .field("day_count", &self.day_count)
            .field("paused", &self.paused)
            .field("speed", &self.speed)
            .field("handlers", &handlers)
            .finish()
    }
}

impl SimClock {
    /// Create a running clock at day zero.
    pub fn new(start_date: NaiveDate, speed: f64) -> Self {
        Self {
            start_date,
            day_count: 0,
            paused: false,
            speed: clamp_speed(speed).unwrap_or(1.0),
            handlers: BTreeMap::new(),
            next_handler: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Calendar
    // -----------------------------------------------------------------------

    /// Current simulated date.
    pub fn date(&self) -> NaiveDate {
        self.start_date
            .checked_add_days(Days::new(self.day_count))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Current simulated instant (midnight UTC of [`date`](Self::date)).
    pub fn now(&self) -> DateTime<Utc> {
        midnight(self.date())
    }

    /// Days advanced since start.
    pub const fn day_count(&self) -> u64 {
        self.day_count
    }

    /// Re-anchor the calendar so that the current date becomes `date`.
    ///
    /// The day counter is kept; the start date moves instead.
    pub fn set_date(&mut self, date: NaiveDate) -> Result<(), ClockError> {
        self.start_date = date
            .checked_sub_days(Days::new(self.day_count))
            .ok_or(ClockError::DateOverflow)?;
        info!(date = %date, day_count = self.day_count, "Clock date set");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Controls
    // -----------------------------------------------------------------------

    /// Whether the clock is paused.
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pause the clock.
    pub fn pause(&mut self) {
        self.paused = true;
        info!(day_count = self.day_count, "Clock paused");
    }

    /// Resume the clock.
    pub fn resume(&mut self) {
        self.paused = false;
        info!(day_count = self.day_count, "Clock resumed");
    }

    /// Current speed multiplier.
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    /// Set the speed multiplier, clamped to `[MIN_SPEED, MAX_SPEED]`.
    ///
    /// Non-finite input is ignored. Returns the speed now in effect.
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        if let Some(clamped) = clamp_speed(speed) {
            self.speed = clamped;
            info!(speed = clamped, "Clock speed changed");
        }
        self.speed
    }

    /// Wall-clock time between advances at the current speed.
    pub fn interval(&self) -> Duration {
        self.state().interval()
    }

    /// Snapshot of the clock for display.
    pub fn state(&self) -> ClockState {
        ClockState {
            date: self.date(),
            day_count: self.day_count,
            paused: self.paused,
            speed: self.speed,
        }
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    /// Register a handler for `kind`. Handlers fire in registration order.
    pub fn register(
        &mut self,
        kind: TickKind,
        label: impl Into<String>,
        handler: TickHandler,
    ) -> HandlerId {
        let id = HandlerId(self.next_handler);
        self.next_handler = self.next_handler.saturating_add(1);
        self.handlers.entry(kind).or_default().push(Registration {
            id,
            label: label.into(),
            handler,
        });
        id
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn unregister(&mut self, kind: TickKind, id: HandlerId) -> bool {
        let Some(list) = self.handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|r| r.id != id);
        list.len() != before
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: TickKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    // -----------------------------------------------------------------------
    // Advance
    // -----------------------------------------------------------------------

    /// Advance one simulated day and fire the handlers for every category
    /// the new day falls into.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Paused`] when paused, or an overflow error if
    /// the calendar cannot advance. Handler failures are not errors; they
    /// are logged and listed in the report.
    pub fn advance_day(&mut self) -> Result<TickReport, ClockError> {
        if self.paused {
            return Err(ClockError::Paused);
        }
        let day_count = self
            .day_count
            .checked_add(1)
            .ok_or(ClockError::CounterOverflow)?;
        let date = self
            .start_date
            .checked_add_days(Days::new(day_count))
            .ok_or(ClockError::DateOverflow)?;
        self.day_count = day_count;

        let fired = classify(date, day_count);
        debug!(date = %date, day_count, "Day advanced");

        let mut failures = Vec::new();
        for kind in fired.kinds() {
            let Some(list) = self.handlers.get_mut(&kind) else {
                continue;
            };
            debug!(tick = kind.as_str(), handlers = list.len(), "Tick fired");
            let ctx = TickContext {
                kind,
                date,
                day_count,
            };
            for registration in list.iter_mut() {
                if let Err(err) = (registration.handler)(&ctx) {
                    warn!(
                        tick = kind.as_str(),
                        handler = %registration.label,
                        error = %err,
                        "Tick handler failed"
                    );
                    failures.push(HandlerFailure {
                        kind,
                        label: registration.label.clone(),
                        message: err.message,
                    });
                }
            }
        }

        Ok(TickReport {
            date,
            day_count,
            fired,
            failures,
        })
    }
}

fn clamp_speed(speed: f64) -> Option<f64> {
    speed.is_finite().then(|| speed.clamp(MIN_SPEED, MAX_SPEED))
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Register a handler that appends `(kind, day_count)` to a shared log.
    fn record(clock: &mut SimClock, kind: TickKind, log: &Arc<Mutex<Vec<(TickKind, u64)>>>) {
        let log = Arc::clone(log);
        clock.register(
            kind,
            kind.as_str(),
            Box::new(move |ctx| {
                log.lock().unwrap().push((ctx.kind, ctx.day_count));
                Ok(())
            }),
        );
    }

    #[test]
    fn date_tracks_day_count() {
        let mut clock = SimClock::new(ymd(2024, 1, 1), 1.0);
        for _ in 0..45 {
            clock.advance_day().unwrap();
        }
        assert_eq!(clock.day_count(), 45);
        assert_eq!(clock.date(), ymd(2024, 2, 15));
    }

    #[test]
    fn seven_days_fire_one_weekly() {
        let mut clock = SimClock::new(ymd(2024, 3, 1), 1.0);
        let log = Arc::new(Mutex::new(Vec::new()));
        record(&mut clock, TickKind::Daily, &log);
        record(&mut clock, TickKind::Weekly, &log);
        for _ in 0..7 {
            clock.advance_day().unwrap();
        }
        let log = log.lock().unwrap();
        let daily = log.iter().filter(|(k, _)| *k == TickKind::Daily).count();
        let weekly: Vec<u64> = log
            .iter()
            .filter(|(k, _)| *k == TickKind::Weekly)
            .map(|(_, d)| *d)
            .collect();
        assert_eq!(daily, 7);
        assert_eq!(weekly, vec![7]);
    }

    #[test]
    fn april_first_is_quarterly_not_yearly() {
        let fired = classify(ymd(2024, 4, 1), 91);
        assert!(fired.monthly);
        assert!(fired.quarterly);
        assert!(!fired.yearly);
    }

    #[test]
    fn new_year_fires_everything_monthly_and_up() {
        let mut clock = SimClock::new(ymd(2024, 12, 31), 1.0);
        let report = clock.advance_day().unwrap();
        assert_eq!(report.date, ymd(2025, 1, 1));
        assert!(report.fired.monthly && report.fired.quarterly && report.fired.yearly);
    }

    #[test]
    fn mid_month_is_daily_only() {
        let fired = classify(ymd(2024, 5, 17), 3);
        assert_eq!(fired.kinds().collect::<Vec<_>>(), vec![TickKind::Daily]);
    }

    #[test]
    fn categories_fire_in_order() {
        let mut clock = SimClock::new(ymd(2024, 12, 25), 1.0);
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in [TickKind::Yearly, TickKind::Monthly, TickKind::Daily, TickKind::Quarterly] {
            record(&mut clock, kind, &log);
        }
        // Day 7 lands on 2025-01-01: every category fires.
        for _ in 0..7 {
            clock.advance_day().unwrap();
        }
        let log = log.lock().unwrap();
        let last_day: Vec<TickKind> = log
            .iter()
            .filter(|(_, d)| *d == 7)
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(
            last_day,
            vec![TickKind::Daily, TickKind::Monthly, TickKind::Quarterly, TickKind::Yearly]
        );
    }

    #[test]
    fn failing_handler_does_not_block_siblings() {
        let mut clock = SimClock::new(ymd(2024, 1, 31), 1.0);
        let log = Arc::new(Mutex::new(Vec::new()));
        clock.register(
            TickKind::Daily,
            "broken",
            Box::new(|_| Err(HandlerError::new("boom"))),
        );
        record(&mut clock, TickKind::Daily, &log);
        record(&mut clock, TickKind::Monthly, &log);

        let report = clock.advance_day().unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures.first().unwrap().label, "broken");
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn paused_clock_refuses_to_advance() {
        let mut clock = SimClock::new(ymd(2024, 1, 1), 1.0);
        clock.pause();
        assert_eq!(clock.advance_day(), Err(ClockError::Paused));
        assert_eq!(clock.day_count(), 0);
        clock.resume();
        assert!(clock.advance_day().is_ok());
    }

    #[test]
    fn speed_is_clamped() {
        let mut clock = SimClock::new(ymd(2024, 1, 1), 1.0);
        assert!((clock.set_speed(500.0) - MAX_SPEED).abs() < f64::EPSILON);
        assert!((clock.set_speed(0.0) - MIN_SPEED).abs() < f64::EPSILON);
        assert!((clock.set_speed(f64::NAN) - MIN_SPEED).abs() < f64::EPSILON);
        clock.set_speed(4.0);
        assert_eq!(clock.interval(), Duration::from_millis(250));
    }

    #[test]
    fn set_date_keeps_counter() {
        let mut clock = SimClock::new(ymd(2024, 1, 1), 1.0);
        for _ in 0..10 {
            clock.advance_day().unwrap();
        }
        clock.set_date(ymd(2030, 6, 15)).unwrap();
        assert_eq!(clock.day_count(), 10);
        assert_eq!(clock.date(), ymd(2030, 6, 15));
        clock.advance_day().unwrap();
        assert_eq!(clock.date(), ymd(2030, 6, 16));
    }

    #[test]
    fn unregister_removes_handler() {
        let mut clock = SimClock::new(ymd(2024, 1, 1), 1.0);
        let id = clock.register(TickKind::Daily, "x", Box::new(|_| Ok(())));
        assert_eq!(clock.handler_count(TickKind::Daily), 1);
        assert!(clock.unregister(TickKind::Daily, id));
        assert!(!clock.unregister(TickKind::Daily, id));
        assert_eq!(clock.handler_count(TickKind::Daily), 0);
    }

    #[test]
    fn now_is_midnight() {
        let clock = SimClock::new(ymd(2024, 1, 1), 1.0);
        assert_eq!(clock.now().to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }
}
