//! Enumeration types for the worldsim simulation.
//!
//! Wire names are `snake_case` so that JSON payloads and roster files read
//! `"air_strike"` and `"in_transit"` rather than Rust variant names.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Cadence at which a tick handler fires.
///
/// Ordering follows firing order within a single advanced day: daily
/// handlers drain first, yearly handlers last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TickKind {
    /// Every advanced day.
    Daily,
    /// Every seventh day counted from the clock start.
    Weekly,
    /// The first day of every month.
    Monthly,
    /// The first day of January, April, July and October.
    Quarterly,
    /// The first day of January.
    Yearly,
}

impl TickKind {
    /// All tick kinds in firing order.
    pub const ALL: [Self; 5] = [
        Self::Daily,
        Self::Weekly,
        Self::Monthly,
        Self::Quarterly,
        Self::Yearly,
    ];

    /// Stable lower-case label used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Broad category of a military unit. Drives speed, fuel and doctrine tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum UnitCategory {
    /// Fixed-wing aircraft.
    Aircraft,
    /// Rotary-wing aircraft.
    Helicopter,
    /// Armour, infantry and artillery formations.
    Ground,
    /// Surface ships and submarines.
    Naval,
    /// Surface-to-air batteries.
    AirDefense,
    /// Missile batteries. Stationary: they strike from position.
    Missile,
    /// Special operations teams.
    SpecialOps,
}

impl UnitCategory {
    /// Stable lower-case label used in messages and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aircraft => "aircraft",
            Self::Helicopter => "helicopter",
            Self::Ground => "ground",
            Self::Naval => "naval",
            Self::AirDefense => "air_defense",
            Self::Missile => "missile",
            Self::SpecialOps => "special_ops",
        }
    }
}

/// Lifecycle status of a military unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum UnitStatus {
    /// At a base, available for tasking.
    Idle,
    /// On station away from a base.
    Deployed,
    /// Moving towards a deployment or transfer destination.
    InTransit,
    /// Engaged in combat.
    InCombat,
    /// Moving back to its home base.
    Returning,
    /// Under repair; unavailable until health recovers.
    Maintenance,
    /// Degraded but still operable.
    Damaged,
    /// Terminal: the unit no longer exists as a fighting force.
    Destroyed,
}

impl UnitStatus {
    /// Stable lower-case label used in messages and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Deployed => "deployed",
            Self::InTransit => "in_transit",
            Self::InCombat => "in_combat",
            Self::Returning => "returning",
            Self::Maintenance => "maintenance",
            Self::Damaged => "damaged",
            Self::Destroyed => "destroyed",
        }
    }

    /// Whether the unit is currently travelling (carries a movement).
    pub const fn is_moving(self) -> bool {
        matches!(self, Self::InTransit | Self::Returning)
    }
}

// ---------------------------------------------------------------------------
// Bases
// ---------------------------------------------------------------------------

/// Kind of military installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BaseType {
    /// Air base.
    AirBase,
    /// Naval port.
    NavalBase,
    /// Army garrison.
    ArmyBase,
    /// Missile or air-defense site.
    MissileSite,
    /// Mixed-use installation.
    Joint,
}

/// Operational status of a base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BaseStatus {
    /// Fully operational.
    Operational,
    /// Operating with reduced capacity.
    Degraded,
    /// Closed or destroyed.
    Inactive,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Kind of military operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OperationType {
    /// Strike a ground target from the air.
    AirStrike,
    /// Intercept hostile aircraft.
    AirIntercept,
    /// Combat air patrol.
    AirPatrol,
    /// Offensive ground push.
    GroundAssault,
    /// Hold ground against attack.
    GroundDefense,
    /// Ground presence patrol.
    GroundPatrol,
    /// Maritime patrol.
    NavalPatrol,
    /// Deny sea access to a port or region.
    NavalBlockade,
    /// Ship-launched strike.
    NavalStrike,
    /// Offensive cyber operation.
    CyberAttack,
    /// Special forces raid.
    SpecialOps,
    /// Intelligence gathering flight.
    Reconnaissance,
    /// Indirect fire barrage.
    ArtilleryBarrage,
    /// Ballistic or cruise missile strike.
    MissileStrike,
}

impl OperationType {
    /// Every operation type, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::AirStrike,
        Self::AirIntercept,
        Self::AirPatrol,
        Self::GroundAssault,
        Self::GroundDefense,
        Self::GroundPatrol,
        Self::NavalPatrol,
        Self::NavalBlockade,
        Self::NavalStrike,
        Self::CyberAttack,
        Self::SpecialOps,
        Self::Reconnaissance,
        Self::ArtilleryBarrage,
        Self::MissileStrike,
    ];

    /// Wire name of the operation type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AirStrike => "air_strike",
            Self::AirIntercept => "air_intercept",
            Self::AirPatrol => "air_patrol",
            Self::GroundAssault => "ground_assault",
            Self::GroundDefense => "ground_defense",
            Self::GroundPatrol => "ground_patrol",
            Self::NavalPatrol => "naval_patrol",
            Self::NavalBlockade => "naval_blockade",
            Self::NavalStrike => "naval_strike",
            Self::CyberAttack => "cyber_attack",
            Self::SpecialOps => "special_ops",
            Self::Reconnaissance => "reconnaissance",
            Self::ArtilleryBarrage => "artillery_barrage",
            Self::MissileStrike => "missile_strike",
        }
    }

    /// Look up an operation type by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl core::fmt::Display for OperationType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OperationStatus {
    /// Created, units assigned, not yet dispatched.
    Planning,
    /// Units dispatched and travelling to the target.
    Deploying,
    /// Units on target; progress accrues until resolution.
    Active,
    /// Resolved with the objective achieved.
    Completed,
    /// Resolved without achieving the objective.
    Failed,
    /// Called off before engagement.
    Cancelled,
    /// Reserved for mid-engagement abort.
    Aborted,
}

impl OperationStatus {
    /// Stable lower-case label used in messages and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Deploying => "deploying",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Aborted => "aborted",
        }
    }

    /// Planning, Deploying and Active operations are live.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Planning | Self::Deploying | Self::Active)
    }

    /// Only operations that have not engaged yet may be cancelled.
    pub const fn can_cancel(self) -> bool {
        matches!(self, Self::Planning | Self::Deploying)
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Kind of push notification emitted after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum NotificationKind {
    /// A simulated day was advanced for a country.
    Tick,
    /// Clock state changed (pause, resume, speed).
    Clock,
    /// A unit reached the end of its movement.
    UnitArrived,
    /// A unit changed through a player action.
    UnitUpdated,
    /// An operation changed status or progress.
    OperationUpdated,
    /// An operation resolved to a terminal status.
    OperationCompleted,
    /// An event triggered or expired.
    EventTriggered,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_type_names_round_trip() {
        for kind in OperationType::ALL {
            assert_eq!(OperationType::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(OperationType::from_name("orbital_strike"), None);
    }

    #[test]
    fn wire_names_match_labels() {
        let json = serde_json::to_string(&OperationType::MissileStrike).ok();
        assert_eq!(json.as_deref(), Some("\"missile_strike\""));
        let json = serde_json::to_string(&UnitStatus::InTransit).ok();
        assert_eq!(json.as_deref(), Some("\"in_transit\""));
    }

    #[test]
    fn live_and_cancellable_statuses() {
        assert!(OperationStatus::Active.is_live());
        assert!(!OperationStatus::Active.can_cancel());
        assert!(OperationStatus::Deploying.can_cancel());
        assert!(!OperationStatus::Completed.is_live());
    }

    #[test]
    fn tick_kinds_are_ordered_by_firing() {
        let mut sorted = TickKind::ALL;
        sorted.sort();
        assert_eq!(sorted, TickKind::ALL);
    }
}
