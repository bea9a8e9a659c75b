//! Error types for unit movement and operations.
//!
//! Every precondition failure is a typed variant with a stable
//! machine-readable [`code`](MovementError::code); nothing in this crate
//! panics on bad input.

use worldsim_types::{BaseId, OperationId, OperationStatus, OperationType, UnitCategory, UnitId};

use crate::feasibility::{Immobility, Undeployable};

/// A rejected unit movement or maintenance action.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MovementError {
    /// No unit with this id exists in the roster.
    #[error("unit {unit_id} not found")]
    UnitNotFound {
        /// The requested unit.
        unit_id: UnitId,
    },

    /// The unit failed the movement gate.
    #[error("unit {unit_id} cannot move: {reason}")]
    UnitCannotMove {
        /// The unit.
        unit_id: UnitId,
        /// Why it cannot move.
        reason: Immobility,
    },

    /// The destination lies beyond twice the combat radius.
    #[error("distance {distance_km:.0}km exceeds round-trip range {max_range_km:.0}km")]
    OutOfRange {
        /// Great-circle distance to the destination.
        distance_km: f64,
        /// Twice the unit's combat radius.
        max_range_km: f64,
    },

    /// The trip needs more fuel than the unit carries.
    #[error("insufficient fuel: need {needed:.1}%, have {available:.1}%")]
    InsufficientFuel {
        /// Fuel the trip would burn.
        needed: f64,
        /// Fuel on board.
        available: f64,
    },

    /// No base with this id exists in the roster.
    #[error("base {base_id} not found")]
    BaseNotFound {
        /// The requested base.
        base_id: BaseId,
    },

    /// The unit has no home base to return to.
    #[error("unit {unit_id} has no home base")]
    NoHomeBase {
        /// The unit.
        unit_id: UnitId,
    },

    /// Resupply and repair require the unit to be at a base.
    #[error("unit {unit_id} is not at a base")]
    NotAtBase {
        /// The unit.
        unit_id: UnitId,
    },

    /// The unit's base cannot repair.
    #[error("base {base_id} has no repair capability")]
    NoRepairCapability {
        /// The base the unit is at.
        base_id: BaseId,
    },

    /// The unit is committed to a live operation.
    #[error("unit {unit_id} is assigned to live operation {operation_id}")]
    UnitAssigned {
        /// The unit.
        unit_id: UnitId,
        /// The operation holding it.
        operation_id: OperationId,
    },

    /// The unit has no travel speed (e.g. fixed missile batteries).
    #[error("unit {unit_id} is stationary")]
    Stationary {
        /// The unit.
        unit_id: UnitId,
    },

    /// Travel statuses can only be entered by dispatching a movement.
    #[error("status {} cannot be set directly", .status.as_str())]
    InvalidStatusOverride {
        /// The rejected status.
        status: worldsim_types::UnitStatus,
    },
}

impl MovementError {
    /// Stable machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnitNotFound { .. } => "unit_not_found",
            Self::UnitCannotMove { .. } => "unit_cannot_move",
            Self::OutOfRange { .. } => "out_of_range",
            Self::InsufficientFuel { .. } => "insufficient_fuel",
            Self::BaseNotFound { .. } => "base_not_found",
            Self::NoHomeBase { .. } => "no_home_base",
            Self::NotAtBase { .. } => "not_at_base",
            Self::NoRepairCapability { .. } => "no_repair_capability",
            Self::UnitAssigned { .. } => "unit_assigned",
            Self::Stationary { .. } => "stationary",
            Self::InvalidStatusOverride { .. } => "invalid_status_override",
        }
    }

    /// Whether the error names an entity that does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnitNotFound { .. } | Self::BaseNotFound { .. }
        )
    }
}

/// A rejected operation request or transition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    /// The type name is unknown or has no doctrine.
    #[error("Unknown operation type: {name}")]
    UnknownOperationType {
        /// The requested type name.
        name: String,
    },

    /// Fewer units than the doctrine minimum.
    #[error("Need at least {required} units for {operation_type}")]
    NotEnoughUnits {
        /// The requested type.
        operation_type: OperationType,
        /// Doctrine minimum.
        required: usize,
        /// Units given.
        provided: usize,
    },

    /// A referenced unit does not exist.
    #[error("Unit {unit_id} not found")]
    UnitNotFound {
        /// The unit.
        unit_id: UnitId,
    },

    /// The same unit was listed more than once.
    #[error("Unit {unit_id} listed more than once")]
    DuplicateUnit {
        /// The repeated unit.
        unit_id: UnitId,
    },

    /// A unit's category is not allowed for this type.
    #[error("Unit {unit_id} ({}) cannot perform {operation_type}", .category.as_str())]
    WrongCategory {
        /// The unit.
        unit_id: UnitId,
        /// Its category.
        category: UnitCategory,
        /// The requested type.
        operation_type: OperationType,
    },

    /// A unit failed the deployability gate.
    #[error("Unit {unit_id} cannot deploy ({reason})")]
    UnitCannotDeploy {
        /// The unit.
        unit_id: UnitId,
        /// Why.
        reason: Undeployable,
    },

    /// A unit is already committed to another live operation.
    #[error("Unit {unit_id} is already assigned to {operation_id}")]
    UnitAssigned {
        /// The unit.
        unit_id: UnitId,
        /// The operation holding it.
        operation_id: OperationId,
    },

    /// The target is beyond a unit's round-trip range.
    #[error("Unit {unit_id} out of range ({distance_km:.0}km > {max_range_km:.0}km)")]
    OutOfRange {
        /// The unit.
        unit_id: UnitId,
        /// Distance to the target.
        distance_km: f64,
        /// Twice the unit's combat radius.
        max_range_km: f64,
    },

    /// No operation with this id exists.
    #[error("Operation {operation_id} not found")]
    OperationNotFound {
        /// The requested operation.
        operation_id: OperationId,
    },

    /// The requested transition is not allowed from the current status.
    #[error("Cannot {action} operation in status: {}", .status.as_str())]
    InvalidTransition {
        /// The attempted transition (`start`, `cancel`).
        action: &'static str,
        /// Current status.
        status: OperationStatus,
    },

    /// A unit could not be dispatched when the operation started.
    #[error("Unit {unit_id} could not deploy: {source}")]
    Deploy {
        /// The unit.
        unit_id: UnitId,
        /// The movement failure.
        source: MovementError,
    },
}

impl OperationError {
    /// Stable machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownOperationType { .. } => "unknown_operation_type",
            Self::NotEnoughUnits { .. } => "not_enough_units",
            Self::UnitNotFound { .. } => "unit_not_found",
            Self::DuplicateUnit { .. } => "duplicate_unit",
            Self::WrongCategory { .. } => "wrong_category",
            Self::UnitCannotDeploy { .. } => "unit_cannot_deploy",
            Self::UnitAssigned { .. } => "unit_assigned",
            Self::OutOfRange { .. } => "out_of_range",
            Self::OperationNotFound { .. } => "operation_not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Deploy { .. } => "deploy_failed",
        }
    }

    /// Whether the request itself was malformed rather than premature.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownOperationType { .. }
                | Self::NotEnoughUnits { .. }
                | Self::DuplicateUnit { .. }
                | Self::WrongCategory { .. }
        )
    }

    /// Whether the error names an operation that does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::OperationNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = OperationError::NotEnoughUnits {
            operation_type: OperationType::GroundAssault,
            required: 2,
            provided: 1,
        };
        assert_eq!(err.to_string(), "Need at least 2 units for ground_assault");
        assert_eq!(err.code(), "not_enough_units");

        let err = OperationError::InvalidTransition {
            action: "cancel",
            status: OperationStatus::Completed,
        };
        assert_eq!(err.to_string(), "Cannot cancel operation in status: completed");

        let err = OperationError::WrongCategory {
            unit_id: UnitId::from("tank_1"),
            category: UnitCategory::Ground,
            operation_type: OperationType::AirStrike,
        };
        assert_eq!(err.to_string(), "Unit tank_1 (ground) cannot perform air_strike");
    }

    #[test]
    fn movement_codes() {
        let err = MovementError::InsufficientFuel {
            needed: 12.0,
            available: 5.0,
        };
        assert_eq!(err.code(), "insufficient_fuel");
        assert!(err.to_string().contains("need 12.0%"));
        assert!(MovementError::UnitNotFound { unit_id: UnitId::from("x") }.is_not_found());
    }
}
