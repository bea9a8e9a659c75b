//! Outbound notifications.
//!
//! The simulation publishes a [`Notification`] after every persisted unit,
//! operation or clock change. Delivery is best effort: a sink never
//! reports failure back to the simulation.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use worldsim_types::{CountryCode, NotificationKind};

/// One pushed message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// Message type.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Country concerned, if any.
    pub country: Option<CountryCode>,
    /// Message body.
    pub payload: serde_json::Value,
    /// Simulated instant the change happened at.
    pub at: DateTime<Utc>,
}

impl Notification {
    /// Build a notification, serializing `payload`.
    ///
    /// A payload that fails to serialize is replaced by `null`.
    pub fn new(
        kind: NotificationKind,
        country: Option<CountryCode>,
        payload: &impl Serialize,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            country,
            payload: serde_json::to_value(payload).unwrap_or_default(),
            at,
        }
    }
}

/// Fire-and-forget notification channel.
pub trait BroadcastSink: Send + Sync {
    /// Publish a notification. Must not block.
    fn publish(&self, notification: Notification);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl BroadcastSink for NullSink {
    fn publish(&self, _notification: Notification) {}
}

/// Keeps every notification; for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingSink {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Everything published so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Kinds published so far, in order.
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|n| n.kind)
            .collect()
    }
}

impl BroadcastSink for RecordingSink {
    fn publish(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn notification_serializes_type_field() {
        let n = Notification::new(
            NotificationKind::Tick,
            Some(CountryCode::from("USA")),
            &serde_json::json!({"day_count": 3}),
            DateTime::<Utc>::UNIX_EPOCH,
        );
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "tick");
        assert_eq!(json["country"], "USA");
        assert_eq!(json["payload"]["day_count"], 3);
    }

    #[test]
    fn recorder_keeps_order() {
        let sink = RecordingSink::new();
        for kind in [NotificationKind::UnitArrived, NotificationKind::OperationUpdated] {
            sink.publish(Notification::new(kind, None, &(), DateTime::<Utc>::UNIX_EPOCH));
        }
        assert_eq!(
            sink.kinds(),
            vec![NotificationKind::UnitArrived, NotificationKind::OperationUpdated]
        );
    }
}
