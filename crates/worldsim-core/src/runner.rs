//! Clock run loop.
//!
//! [`run_clock`] is the single background driver of the simulation. Each
//! wake advances exactly one simulated day; missed wakes are never caught
//! up. Handler failures are reported by the clock and never end the loop.
//! The loop exits only on a stop request, the optional day limit, or a
//! calendar overflow.
//!
//! Ticks run on tokio's blocking pool: handlers load and save snapshots
//! synchronously and must not hold up the runtime's workers.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::clock::{ClockError, TickReport};
use crate::handle::ClockHandle;

/// Why the run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEndReason {
    /// A stop was requested through the handle.
    Stopped,
    /// The configured day limit was reached.
    DayLimitReached,
    /// The calendar or day counter cannot advance any further.
    ClockExhausted,
}

/// Result of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Why the loop returned.
    pub end_reason: RunEndReason,
    /// Days advanced by this run.
    pub days_advanced: u64,
    /// Report of the last advanced day, if any.
    pub last_report: Option<TickReport>,
}

/// Called after every advanced day.
pub trait DayCallback: Send {
    /// Called with the report of the day just advanced.
    fn on_day(&mut self, report: &TickReport);
}

/// A callback that does nothing.
pub struct NoOpCallback;

impl DayCallback for NoOpCallback {
    fn on_day(&mut self, _report: &TickReport) {}
}

/// Drive the clock until stopped.
///
/// `max_days` of zero means unbounded.
pub async fn run_clock(
    handle: &Arc<ClockHandle>,
    max_days: u64,
    callback: &mut dyn DayCallback,
) -> RunSummary {
    let mut days_advanced: u64 = 0;
    let mut last_report: Option<TickReport> = None;

    info!(
        max_days,
        interval_ms = handle.interval().as_millis(),
        paused = handle.is_paused(),
        "Clock run loop starting"
    );

    loop {
        // --- Check stop ---
        if handle.is_stop_requested() {
            info!("Stop requested");
            return RunSummary {
                end_reason: RunEndReason::Stopped,
                days_advanced,
                last_report,
            };
        }

        // --- Check pause ---
        if handle.is_paused() {
            info!("Clock paused, waiting for resume...");
            handle.wait_if_paused().await;
            info!("Clock run loop resumed");
            continue;
        }

        // --- Advance ---
        let ticking = Arc::clone(handle);
        let advanced = match tokio::task::spawn_blocking(move || ticking.advance()).await {
            Ok(advanced) => advanced,
            Err(join) => match join.try_into_panic() {
                Ok(payload) => std::panic::resume_unwind(payload),
                Err(join) => {
                    warn!(error = %join, "Tick task cancelled, stopping");
                    return RunSummary {
                        end_reason: RunEndReason::Stopped,
                        days_advanced,
                        last_report,
                    };
                }
            },
        };
        let report = match advanced {
            Ok(report) => report,
            // Paused between the check and the advance.
            Err(ClockError::Paused) => continue,
            Err(err) => {
                error!(error = %err, "Clock cannot advance");
                return RunSummary {
                    end_reason: RunEndReason::ClockExhausted,
                    days_advanced,
                    last_report,
                };
            }
        };
        days_advanced = days_advanced.saturating_add(1);
        callback.on_day(&report);

        if max_days > 0 && days_advanced >= max_days {
            info!(days_advanced, max_days, "Day limit reached");
            return RunSummary {
                end_reason: RunEndReason::DayLimitReached,
                days_advanced,
                last_report: Some(report),
            };
        }
        last_report = Some(report);

        // --- Sleep, waking early on stop ---
        let interval = handle.interval();
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = handle.stopped() => {}
        }
    }
}

/// Log the end of a run.
pub fn log_run_end(summary: &RunSummary) {
    info!(
        reason = ?summary.end_reason,
        days_advanced = summary.days_advanced,
        final_date = ?summary.last_report.as_ref().map(|r| r.date),
        "Clock run ended"
    );
    if summary.last_report.is_none() {
        warn!("Clock run ended with no days advanced");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::clock::SimClock;

    fn handle() -> Arc<ClockHandle> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Arc::new(ClockHandle::new(SimClock::new(start, 100.0)))
    }

    struct Counter(u64);

    impl DayCallback for Counter {
        fn on_day(&mut self, _report: &TickReport) {
            self.0 = self.0.saturating_add(1);
        }
    }

    #[tokio::test]
    async fn stops_at_day_limit() {
        let h = handle();
        let mut counter = Counter(0);
        let summary = run_clock(&h, 5, &mut counter).await;
        assert_eq!(summary.end_reason, RunEndReason::DayLimitReached);
        assert_eq!(summary.days_advanced, 5);
        assert_eq!(counter.0, 5);
        assert_eq!(
            summary.last_report.unwrap().date,
            NaiveDate::from_ymd_opt(2024, 1, 6).unwrap()
        );
    }

    #[tokio::test]
    async fn stop_before_first_day() {
        let h = handle();
        h.request_stop();
        let summary = run_clock(&h, 0, &mut NoOpCallback).await;
        assert_eq!(summary.end_reason, RunEndReason::Stopped);
        assert_eq!(summary.days_advanced, 0);
    }

    #[tokio::test]
    async fn paused_loop_stops_without_advancing() {
        let h = handle();
        h.pause();
        let runner = {
            let h = Arc::clone(&h);
            tokio::spawn(async move { run_clock(&h, 0, &mut NoOpCallback).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        h.request_stop();
        let summary = runner.await.unwrap();
        assert_eq!(summary.end_reason, RunEndReason::Stopped);
        assert_eq!(summary.days_advanced, 0);
        assert_eq!(h.state().day_count, 0);
    }

    #[tokio::test]
    async fn clock_is_readable_while_a_day_is_processed() {
        let h = handle();
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        h.register(
            worldsim_types::TickKind::Daily,
            "slow",
            Box::new(move |_| {
                entered_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                Ok(())
            }),
        );
        let runner = {
            let h = Arc::clone(&h);
            tokio::spawn(async move { run_clock(&h, 1, &mut NoOpCallback).await })
        };

        let entered = tokio::task::spawn_blocking(move || {
            entered_rx.recv_timeout(std::time::Duration::from_secs(5))
        });
        entered.await.unwrap().unwrap();
        assert_eq!(h.state().day_count, 0);

        release_tx.send(()).unwrap();
        let summary = tokio::time::timeout(std::time::Duration::from_secs(5), runner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.days_advanced, 1);
        assert_eq!(h.state().day_count, 1);
    }

    #[tokio::test]
    async fn handler_failures_do_not_end_the_loop() {
        let h = handle();
        h.register(
            worldsim_types::TickKind::Daily,
            "broken",
            Box::new(|_| Err(crate::clock::HandlerError::new("boom"))),
        );
        let summary = run_clock(&h, 3, &mut NoOpCallback).await;
        assert_eq!(summary.end_reason, RunEndReason::DayLimitReached);
        assert_eq!(summary.last_report.unwrap().failures.len(), 1);
    }
}
