//! Shared clock handle for the run loop and the HTTP surface.
//!
//! The [`SimClock`] sits behind a mutex so that exactly one
//! [`advance_day`](SimClock::advance_day) is ever in flight. Pause state is
//! mirrored into an atomic so the run loop can wait on a [`Notify`] instead
//! of polling the lock.
//!
//! Every change to the clock is published into a separate [`ClockState`]
//! snapshot. Reads ([`state`](ClockHandle::state),
//! [`now`](ClockHandle::now), [`interval`](ClockHandle::interval)) only
//! touch that snapshot, so they never wait for a tick in progress. While
//! a day is being processed they see the previous day; the new date is
//! published once every handler has returned.
//!
//! # Lock order
//!
//! Tick handlers run while the clock lock is held and take country session
//! locks inside it. Control calls that need both must therefore finish with
//! the clock before entering a country session. The snapshot lock is only
//! ever taken last.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Notify;
use worldsim_types::TickKind;

use crate::clock::{ClockError, ClockState, HandlerId, SimClock, TickHandler, TickReport};

/// Clock plus the control signals the run loop waits on.
#[derive(Debug)]
pub struct ClockHandle {
    /// The clock itself.
    clock: Mutex<SimClock>,

    /// Last published state of the clock.
    snapshot: RwLock<ClockState>,

    /// Mirror of the clock's pause flag, readable without the lock.
    paused: AtomicBool,

    /// Wakes the run loop on resume or stop.
    wake: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,
}

impl ClockHandle {
    /// Wrap a clock.
    pub fn new(clock: SimClock) -> Self {
        let paused = clock.is_paused();
        let snapshot = clock.state();
        Self {
            clock: Mutex::new(clock),
            snapshot: RwLock::new(snapshot),
            paused: AtomicBool::new(paused),
            wake: Notify::new(),
            stop_requested: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the clock's current state. Called with the clock lock held.
    fn publish(&self, clock: &SimClock) -> ClockState {
        let state = clock.state();
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = state;
        state
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Snapshot of the clock.
    pub fn state(&self) -> ClockState {
        *self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current simulated instant.
    pub fn now(&self) -> DateTime<Utc> {
        self.state().now()
    }

    /// Wall-clock interval between advances.
    pub fn interval(&self) -> Duration {
        self.state().interval()
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether the clock is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the clock. The run loop sleeps until resumed.
    pub fn pause(&self) -> ClockState {
        let mut clock = self.lock();
        clock.pause();
        self.paused.store(true, Ordering::Release);
        self.publish(&clock)
    }

    /// Resume the clock and wake the run loop.
    pub fn resume(&self) -> ClockState {
        let state = {
            let mut clock = self.lock();
            clock.resume();
            self.paused.store(false, Ordering::Release);
            self.publish(&clock)
        };
        self.wake.notify_one();
        state
    }

    /// Wait until the clock is no longer paused or a stop is requested.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() {
            self.wake.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Speed / Date
    // -----------------------------------------------------------------------

    /// Set the speed multiplier; returns the resulting state.
    pub fn set_speed(&self, speed: f64) -> ClockState {
        let mut clock = self.lock();
        clock.set_speed(speed);
        self.publish(&clock)
    }

    /// Re-anchor the calendar on `date`.
    pub fn set_date(&self, date: NaiveDate) -> Result<ClockState, ClockError> {
        let mut clock = self.lock();
        clock.set_date(date)?;
        Ok(self.publish(&clock))
    }

    // -----------------------------------------------------------------------
    // Handlers and advancing
    // -----------------------------------------------------------------------

    /// Register a tick handler.
    pub fn register(
        &self,
        kind: TickKind,
        label: impl Into<String>,
        handler: TickHandler,
    ) -> HandlerId {
        self.lock().register(kind, label, handler)
    }

    /// Advance one day, running handlers under the clock lock.
    ///
    /// Handlers do blocking work; async callers should run this on a
    /// blocking thread (see [`run_clock`](crate::run_clock)).
    pub fn advance(&self) -> Result<TickReport, ClockError> {
        let mut clock = self.lock();
        let report = clock.advance_day()?;
        self.publish(&clock);
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop of the run loop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&self) {
        while !self.is_stop_requested() {
            self.wake.notified().await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, mpsc};
    use std::thread;

    use super::*;

    fn handle() -> ClockHandle {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ClockHandle::new(SimClock::new(start, 1.0))
    }

    #[test]
    fn pause_and_resume() {
        let h = handle();
        assert!(!h.is_paused());
        assert!(h.pause().paused);
        assert!(h.is_paused());
        assert!(h.advance().is_err());
        assert!(!h.resume().paused);
        assert_eq!(h.advance().unwrap().day_count, 1);
    }

    #[test]
    fn speed_round_trip() {
        let h = handle();
        assert!((h.set_speed(10.0).speed - 10.0).abs() < f64::EPSILON);
        assert_eq!(h.interval(), Duration::from_millis(100));
    }

    #[test]
    fn reads_do_not_wait_for_a_tick_in_progress() {
        let h = Arc::new(handle());
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        h.register(
            TickKind::Daily,
            "slow",
            Box::new(move |_| {
                entered_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                Ok(())
            }),
        );

        let ticking = {
            let h = Arc::clone(&h);
            thread::spawn(move || h.advance())
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // The handler is still blocked inside the clock lock.
        let (read_tx, read_rx) = mpsc::channel();
        {
            let h = Arc::clone(&h);
            thread::spawn(move || read_tx.send((h.state(), h.now())).unwrap());
        }
        let (state, now) = read_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(state.day_count, 0);
        assert_eq!(now.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        release_tx.send(()).unwrap();
        assert_eq!(ticking.join().unwrap().unwrap().day_count, 1);
        assert_eq!(h.state().day_count, 1);
        assert_eq!(h.now().date_naive(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn control_changes_are_published() {
        let h = handle();
        h.set_date(NaiveDate::from_ymd_opt(2030, 6, 1).unwrap()).unwrap();
        h.pause();
        let state = h.state();
        assert_eq!(state.date, NaiveDate::from_ymd_opt(2030, 6, 1).unwrap());
        assert!(state.paused);
    }

    #[tokio::test]
    async fn resume_wakes_waiter() {
        let h = Arc::new(handle());
        h.pause();
        let waiter = {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.wait_if_paused().await })
        };
        h.resume();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn stop_releases_paused_waiter() {
        let h = Arc::new(handle());
        h.pause();
        let waiter = {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.wait_if_paused().await })
        };
        h.request_stop();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(h.is_stop_requested());
    }
}
