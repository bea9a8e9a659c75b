//! Shared type definitions for the worldsim country simulation.
//!
//! This crate is the single source of truth for the records exchanged
//! between the clock, the military engines, persistence and the HTTP
//! surface. Wire types flow to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- String-backed identifier newtypes
//! - [`enums`] -- Tick kinds, unit and operation status enums
//! - [`geo`] -- Coordinates and haversine distance
//! - [`military`] -- Units, bases, operations and the force roster
//! - [`country`] -- The typed per-country snapshot tree
//! - [`path`] -- [`StatePath`], the addressable numeric fields of a snapshot

pub mod country;
pub mod enums;
pub mod geo;
pub mod ids;
pub mod military;
pub mod path;

// Re-export all public types at crate root for convenience.
pub use country::{
    ActiveEvent, ChangeSummary, CountryMeta, CountryState, DeliveryRecord, Demographics, Economy,
    Effect, Indices, Infrastructure, MilitaryPosture, PendingDelivery, ProcessorStamp, Project,
    ProjectStatus, Sectors,
};
pub use enums::{
    BaseStatus, BaseType, NotificationKind, OperationStatus, OperationType, TickKind, UnitCategory,
    UnitStatus,
};
pub use geo::{CoordinateError, Coordinates, EARTH_RADIUS_KM};
pub use ids::{BaseId, CountryCode, EventId, OperationId, ProjectId, UnitId};
pub use military::{
    ActiveOperation, BaseCapabilities, ForceRoster, MilitaryBase, MilitaryUnit, MovementIntent,
    OperationPhase, OperationResult, UnitMovement,
};
pub use path::StatePath;

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes bindings for #[ts(export)] types when exported
        // explicitly. Files land in `bindings/` relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::UnitId::export_all();
        let _ = crate::ids::OperationId::export_all();
        let _ = crate::enums::TickKind::export_all();
        let _ = crate::enums::NotificationKind::export_all();
        let _ = crate::geo::Coordinates::export_all();
        let _ = crate::military::MilitaryUnit::export_all();
        let _ = crate::military::ActiveOperation::export_all();
        let _ = crate::military::ForceRoster::export_all();
        let _ = crate::country::CountryState::export_all();
        let _ = crate::path::StatePath::export_all();
    }
}
