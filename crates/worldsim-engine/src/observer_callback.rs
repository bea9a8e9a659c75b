//! Day callback that feeds the observer's notification channel.
//!
//! Country coordinators publish their own per-country events. This
//! callback adds one world-level `tick` notification per advanced day,
//! carrying the fired categories and any handler failures, so dashboards
//! can follow the calendar without subscribing to a country.

use std::sync::Arc;

use tracing::{debug, warn};
use worldsim_core::{DayCallback, TickReport};
use worldsim_observer::AppState;
use worldsim_types::NotificationKind;

/// Callback that bridges the clock loop to the observer.
pub struct ObserverCallback {
    state: Arc<AppState>,
}

impl ObserverCallback {
    /// Create a new observer callback backed by the given app state.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl DayCallback for ObserverCallback {
    fn on_day(&mut self, report: &TickReport) {
        if !report.failures.is_empty() {
            warn!(
                date = %report.date,
                failed_handlers = report.failures.len(),
                "Day advanced with failed tick handlers"
            );
        }

        let receivers = self.state.notify(
            NotificationKind::Tick,
            None,
            report,
            self.state.now(),
        );
        debug!(
            date = %report.date,
            day_count = report.day_count,
            receivers,
            "Day broadcast sent"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::NaiveDate;
    use worldsim_core::{ClockHandle, CountrySessions, MemoryStore, SimClock};
    use worldsim_military::FixedRandom;

    use super::*;

    #[test]
    fn each_day_is_broadcast_without_a_country() {
        let clock = SimClock::new(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(), 1.0);
        let state = Arc::new(AppState::new(
            Arc::new(ClockHandle::new(clock)),
            Arc::new(CountrySessions::new(Arc::new(MemoryStore::new()))),
            Box::new(FixedRandom::new(0.5)),
        ));
        let mut rx = state.subscribe();
        let mut callback = ObserverCallback::new(Arc::clone(&state));

        let report = state.clock.advance().unwrap();
        callback.on_day(&report);

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.kind, NotificationKind::Tick);
        assert!(notification.country.is_none());
        assert_eq!(notification.payload["date"], "2024-02-01");
        assert_eq!(notification.payload["monthly"], true);
    }
}
