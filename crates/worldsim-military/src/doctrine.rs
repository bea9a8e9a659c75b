//! Static doctrine tables: platform speeds, fuel burn, and the per-type
//! operation configuration used by planning and resolution.

use rust_decimal::Decimal;
use worldsim_types::{MilitaryUnit, OperationType, UnitCategory};

/// Travel speed for units without their own `speed_kmh`, in km/h.
///
/// Missiles are fired from position and never travel.
pub const fn default_speed_kmh(category: UnitCategory) -> f64 {
    match category {
        UnitCategory::Aircraft => 800.0,
        UnitCategory::Helicopter => 250.0,
        UnitCategory::Ground => 50.0,
        UnitCategory::Naval => 45.0,
        UnitCategory::AirDefense => 30.0,
        UnitCategory::Missile => 0.0,
        UnitCategory::SpecialOps => 40.0,
    }
}

/// Fuel burned per hour of travel, in percentage points.
pub const fn fuel_rate_per_hour(category: UnitCategory) -> f64 {
    match category {
        UnitCategory::Aircraft => 5.0,
        UnitCategory::Helicopter => 4.0,
        UnitCategory::Ground => 2.0,
        UnitCategory::Naval => 1.5,
        UnitCategory::AirDefense | UnitCategory::SpecialOps => 1.0,
        UnitCategory::Missile => 0.0,
    }
}

/// Speed the unit actually travels at: its own speed when set and
/// positive, otherwise the category default.
pub fn effective_speed(unit: &MilitaryUnit) -> f64 {
    unit.speed_kmh
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or_else(|| default_speed_kmh(unit.category))
}

/// Speed used when estimating operation travel time. Units without an
/// explicit speed are assumed to make 100 km/h.
pub fn planning_speed(unit: &MilitaryUnit) -> f64 {
    unit.speed_kmh
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(100.0)
}

/// Per-sortie cost of committing one unit, in millions.
pub const fn unit_cost_millions(category: UnitCategory) -> Decimal {
    match category {
        UnitCategory::Aircraft => Decimal::from_parts(5, 0, 0, false, 1),
        UnitCategory::Naval => Decimal::from_parts(2, 0, 0, false, 1),
        UnitCategory::Ground => Decimal::from_parts(1, 0, 0, false, 1),
        UnitCategory::Helicopter
        | UnitCategory::AirDefense
        | UnitCategory::Missile
        | UnitCategory::SpecialOps => Decimal::ZERO,
    }
}

/// Configuration of one operation type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperationDoctrine {
    /// Type this entry configures.
    pub operation_type: OperationType,
    /// Unit categories allowed to take part.
    pub allowed_categories: &'static [UnitCategory],
    /// Fewest units the operation may be launched with.
    pub min_units: usize,
    /// Success probability before strength, distance and size modifiers.
    pub base_success_rate: f64,
    /// Per-unit loss probability.
    pub base_loss_rate: f64,
    /// Engagement duration in hours.
    pub duration_hours: f64,
    /// Domestic political cost.
    pub political_cost: f64,
    /// Relations change applied to the target country.
    pub relations_penalty: f64,
    /// Fuel spent by a unit that takes losses, in percentage points.
    pub fuel_consumption: f64,
    /// Ammunition spent by a unit that takes losses, in percentage points.
    pub ammo_consumption: f64,
}

static DOCTRINES: [OperationDoctrine; 9] = [
    OperationDoctrine {
        operation_type: OperationType::AirStrike,
        allowed_categories: &[UnitCategory::Aircraft],
        min_units: 1,
        base_success_rate: 0.75,
        base_loss_rate: 0.05,
        duration_hours: 2.0,
        political_cost: 10.0,
        relations_penalty: -15.0,
        fuel_consumption: 30.0,
        ammo_consumption: 50.0,
    },
    OperationDoctrine {
        operation_type: OperationType::AirPatrol,
        allowed_categories: &[UnitCategory::Aircraft],
        min_units: 2,
        base_success_rate: 0.95,
        base_loss_rate: 0.01,
        duration_hours: 8.0,
        political_cost: 1.0,
        relations_penalty: 0.0,
        fuel_consumption: 40.0,
        ammo_consumption: 0.0,
    },
    OperationDoctrine {
        operation_type: OperationType::GroundAssault,
        allowed_categories: &[UnitCategory::Ground],
        min_units: 2,
        base_success_rate: 0.60,
        base_loss_rate: 0.15,
        duration_hours: 24.0,
        political_cost: 20.0,
        relations_penalty: -25.0,
        fuel_consumption: 50.0,
        ammo_consumption: 60.0,
    },
    OperationDoctrine {
        operation_type: OperationType::GroundPatrol,
        allowed_categories: &[UnitCategory::Ground],
        min_units: 1,
        base_success_rate: 0.90,
        base_loss_rate: 0.02,
        duration_hours: 12.0,
        political_cost: 2.0,
        relations_penalty: 0.0,
        fuel_consumption: 20.0,
        ammo_consumption: 5.0,
    },
    OperationDoctrine {
        operation_type: OperationType::NavalPatrol,
        allowed_categories: &[UnitCategory::Naval],
        min_units: 2,
        base_success_rate: 0.95,
        base_loss_rate: 0.01,
        duration_hours: 48.0,
        political_cost: 1.0,
        relations_penalty: 0.0,
        fuel_consumption: 25.0,
        ammo_consumption: 0.0,
    },
    OperationDoctrine {
        operation_type: OperationType::NavalBlockade,
        allowed_categories: &[UnitCategory::Naval],
        min_units: 3,
        base_success_rate: 0.70,
        base_loss_rate: 0.03,
        duration_hours: 168.0,
        political_cost: 15.0,
        relations_penalty: -20.0,
        fuel_consumption: 40.0,
        ammo_consumption: 10.0,
    },
    OperationDoctrine {
        operation_type: OperationType::Reconnaissance,
        allowed_categories: &[UnitCategory::Aircraft],
        min_units: 1,
        base_success_rate: 0.90,
        base_loss_rate: 0.05,
        duration_hours: 4.0,
        political_cost: 2.0,
        relations_penalty: -3.0,
        fuel_consumption: 20.0,
        ammo_consumption: 0.0,
    },
    OperationDoctrine {
        operation_type: OperationType::MissileStrike,
        allowed_categories: &[UnitCategory::Missile, UnitCategory::AirDefense],
        min_units: 1,
        base_success_rate: 0.85,
        base_loss_rate: 0.0,
        duration_hours: 1.0,
        political_cost: 15.0,
        relations_penalty: -20.0,
        fuel_consumption: 0.0,
        ammo_consumption: 100.0,
    },
    OperationDoctrine {
        operation_type: OperationType::SpecialOps,
        allowed_categories: &[UnitCategory::SpecialOps, UnitCategory::Helicopter],
        min_units: 1,
        base_success_rate: 0.55,
        base_loss_rate: 0.10,
        duration_hours: 6.0,
        political_cost: 8.0,
        relations_penalty: -12.0,
        fuel_consumption: 30.0,
        ammo_consumption: 30.0,
    },
];

/// Doctrine for `operation_type`, or `None` for types without one
/// (those cannot be planned).
pub fn doctrine(operation_type: OperationType) -> Option<&'static OperationDoctrine> {
    DOCTRINES
        .iter()
        .find(|d| d.operation_type == operation_type)
}

/// Operation types that can currently be planned.
pub fn plannable_types() -> impl Iterator<Item = OperationType> {
    DOCTRINES.iter().map(|d| d.operation_type)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn nine_types_configured() {
        assert_eq!(plannable_types().count(), 9);
        assert!(doctrine(OperationType::CyberAttack).is_none());
        assert!(doctrine(OperationType::ArtilleryBarrage).is_none());
        let strike = doctrine(OperationType::AirStrike).unwrap();
        assert_eq!(strike.min_units, 1);
        assert_eq!(doctrine(OperationType::GroundAssault).unwrap().min_units, 2);
    }

    #[test]
    fn missiles_are_stationary() {
        assert!(default_speed_kmh(UnitCategory::Missile).abs() < f64::EPSILON);
        assert!(fuel_rate_per_hour(UnitCategory::Missile).abs() < f64::EPSILON);
    }

    #[test]
    fn unit_cost_table() {
        assert_eq!(unit_cost_millions(UnitCategory::Aircraft).to_string(), "0.5");
        assert_eq!(unit_cost_millions(UnitCategory::Ground).to_string(), "0.1");
        assert_eq!(unit_cost_millions(UnitCategory::Naval).to_string(), "0.2");
        for category in [
            UnitCategory::Helicopter,
            UnitCategory::AirDefense,
            UnitCategory::Missile,
            UnitCategory::SpecialOps,
        ] {
            assert_eq!(unit_cost_millions(category), Decimal::ZERO);
        }
    }
}
