//! Shared application state for the observer server.
//!
//! [`AppState`] holds the clock handle, the per-country sessions and the
//! broadcast channel feeding `WebSocket` clients. Handlers never keep the
//! clock locked while they are inside a country session: they read the
//! simulated instant first and only then enter the session.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use worldsim_core::{BroadcastSink, ClockHandle, CountrySessions, Notification};
use worldsim_military::{DEFAULT_ARRIVAL_TOLERANCE_KM, OperationLifecycle, RandomSource};
use worldsim_types::{CountryCode, NotificationKind};

/// Capacity of the notification channel.
///
/// A subscriber that falls further behind receives
/// [`broadcast::error::RecvError::Lagged`] and skips ahead.
const BROADCAST_CAPACITY: usize = 256;

/// Shared state for the Axum application.
pub struct AppState {
    /// The simulation clock.
    pub clock: Arc<ClockHandle>,
    /// Single-writer access to country snapshots.
    pub sessions: Arc<CountrySessions>,
    /// Sender side of the notification channel.
    pub tx: broadcast::Sender<Notification>,
    /// Distance within which deployed units count as on target.
    pub arrival_tolerance_km: f64,
    rng: Mutex<Box<dyn RandomSource>>,
}

impl core::fmt::Debug for AppState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppState")
            .field("arrival_tolerance_km", &self.arrival_tolerance_km)
            .field("subscribers", &self.tx.receiver_count())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create application state around an existing clock and sessions.
    ///
    /// `rng` resolves operations that complete through the on-demand
    /// processing endpoint.
    pub fn new(
        clock: Arc<ClockHandle>,
        sessions: Arc<CountrySessions>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            clock,
            sessions,
            tx,
            arrival_tolerance_km: DEFAULT_ARRIVAL_TOLERANCE_KM,
            rng: Mutex::new(rng),
        }
    }

    /// Override the arrival tolerance.
    #[must_use]
    pub const fn with_arrival_tolerance(mut self, km: f64) -> Self {
        self.arrival_tolerance_km = km;
        self
    }

    /// Operation engine for one country.
    pub fn lifecycle(&self, code: &CountryCode) -> OperationLifecycle {
        OperationLifecycle::new(code.clone(), self.arrival_tolerance_km)
    }

    /// Run `f` with the shared random source.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut dyn RandomSource) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(rng.as_mut())
    }

    /// Current simulated instant. Takes and releases the clock lock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Subscribe to the notification stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Publish a notification to every connected client.
    ///
    /// Returns the number of receivers reached; zero is not an error.
    pub fn notify(
        &self,
        kind: NotificationKind,
        country: Option<&CountryCode>,
        payload: &impl Serialize,
        at: DateTime<Utc>,
    ) -> usize {
        let notification = Notification::new(kind, country.cloned(), payload, at);
        self.tx.send(notification).unwrap_or(0)
    }

    /// A [`BroadcastSink`] feeding this state's channel, for tick
    /// coordinators.
    pub fn sink(&self) -> Arc<dyn BroadcastSink> {
        Arc::new(ChannelSink {
            tx: self.tx.clone(),
        })
    }
}

/// [`BroadcastSink`] over a `tokio` broadcast channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastSink for ChannelSink {
    fn publish(&self, notification: Notification) {
        // Err only means nobody is listening.
        let _ = self.tx.send(notification);
    }
}
