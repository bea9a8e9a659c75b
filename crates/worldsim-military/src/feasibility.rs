//! Movement and deployability gates.
//!
//! [`can_move`] decides whether a unit may start any movement at all.
//! [`can_deploy`] is the stricter gate an operation applies to every unit
//! it is given.

use worldsim_types::{MilitaryUnit, UnitStatus};

/// Below this health a unit cannot move.
pub const MIN_MOVE_HEALTH: f64 = 20.0;

/// Below this fuel level a unit cannot move.
pub const MIN_MOVE_FUEL: f64 = 10.0;

/// Minimum health, readiness, fuel and ammunition to join an operation.
pub const MIN_DEPLOY_HEALTH: f64 = 50.0;
/// See [`MIN_DEPLOY_HEALTH`].
pub const MIN_DEPLOY_READINESS: f64 = 50.0;
/// See [`MIN_DEPLOY_HEALTH`].
pub const MIN_DEPLOY_FUEL: f64 = 20.0;
/// See [`MIN_DEPLOY_HEALTH`].
pub const MIN_DEPLOY_AMMO: f64 = 20.0;

/// Why a unit cannot move.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Immobility {
    /// The unit's status forbids movement.
    #[error("unit status is {}", .status.as_str())]
    Status {
        /// Current status.
        status: UnitStatus,
    },

    /// Health below [`MIN_MOVE_HEALTH`].
    #[error("health too low ({health:.0}%)")]
    LowHealth {
        /// Current health.
        health: f64,
    },

    /// Fuel below [`MIN_MOVE_FUEL`].
    #[error("fuel too low ({fuel:.0}%)")]
    LowFuel {
        /// Current fuel.
        fuel: f64,
    },
}

/// Why a unit cannot be committed to an operation.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Undeployable {
    /// Only Idle and Deployed units can be committed.
    #[error("status: {}", .status.as_str())]
    Status {
        /// Current status.
        status: UnitStatus,
    },

    /// Health below [`MIN_DEPLOY_HEALTH`].
    #[error("health {health:.0}% below 50%")]
    LowHealth {
        /// Current health.
        health: f64,
    },

    /// Readiness below [`MIN_DEPLOY_READINESS`].
    #[error("readiness {readiness:.0}% below 50%")]
    LowReadiness {
        /// Current readiness.
        readiness: f64,
    },

    /// Fuel below [`MIN_DEPLOY_FUEL`].
    #[error("fuel {fuel:.0}% below 20%")]
    LowFuel {
        /// Current fuel.
        fuel: f64,
    },

    /// Ammunition below [`MIN_DEPLOY_AMMO`].
    #[error("ammo {ammo:.0}% below 20%")]
    LowAmmo {
        /// Current ammunition.
        ammo: f64,
    },
}

/// Whether `unit` may start a movement. Pure.
pub const fn can_move(unit: &MilitaryUnit) -> Result<(), Immobility> {
    match unit.status {
        UnitStatus::Destroyed
        | UnitStatus::InCombat
        | UnitStatus::InTransit
        | UnitStatus::Maintenance => {
            return Err(Immobility::Status {
                status: unit.status,
            });
        }
        UnitStatus::Idle | UnitStatus::Deployed | UnitStatus::Returning | UnitStatus::Damaged => {}
    }
    if unit.health_percent < MIN_MOVE_HEALTH {
        return Err(Immobility::LowHealth {
            health: unit.health_percent,
        });
    }
    if unit.fuel_percent < MIN_MOVE_FUEL {
        return Err(Immobility::LowFuel {
            fuel: unit.fuel_percent,
        });
    }
    Ok(())
}

/// Whether `unit` may be committed to an operation. Pure.
pub const fn can_deploy(unit: &MilitaryUnit) -> Result<(), Undeployable> {
    if !matches!(unit.status, UnitStatus::Idle | UnitStatus::Deployed) {
        return Err(Undeployable::Status {
            status: unit.status,
        });
    }
    if unit.health_percent < MIN_DEPLOY_HEALTH {
        return Err(Undeployable::LowHealth {
            health: unit.health_percent,
        });
    }
    if unit.readiness_percent < MIN_DEPLOY_READINESS {
        return Err(Undeployable::LowReadiness {
            readiness: unit.readiness_percent,
        });
    }
    if unit.fuel_percent < MIN_DEPLOY_FUEL {
        return Err(Undeployable::LowFuel {
            fuel: unit.fuel_percent,
        });
    }
    if unit.ammo_percent < MIN_DEPLOY_AMMO {
        return Err(Undeployable::LowAmmo {
            ammo: unit.ammo_percent,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use worldsim_types::{Coordinates, UnitCategory};

    use super::*;

    fn unit() -> MilitaryUnit {
        MilitaryUnit::new(
            "armor_1",
            "1st Armored",
            "M1A2",
            UnitCategory::Ground,
            Coordinates::new(0.0, 0.0).unwrap(),
        )
    }

    #[test]
    fn healthy_idle_unit_moves() {
        assert!(can_move(&unit()).is_ok());
        assert!(can_deploy(&unit()).is_ok());
    }

    #[test]
    fn blocked_statuses() {
        for status in [
            UnitStatus::Destroyed,
            UnitStatus::InCombat,
            UnitStatus::InTransit,
            UnitStatus::Maintenance,
        ] {
            let mut u = unit();
            u.status = status;
            assert_eq!(can_move(&u), Err(Immobility::Status { status }));
        }
    }

    #[test]
    fn thresholds() {
        let mut u = unit();
        u.health_percent = 19.0;
        assert!(matches!(can_move(&u), Err(Immobility::LowHealth { .. })));

        let mut u = unit();
        u.fuel_percent = 9.5;
        assert!(matches!(can_move(&u), Err(Immobility::LowFuel { .. })));

        // Movable, but not fit for an operation.
        let mut u = unit();
        u.ammo_percent = 10.0;
        assert!(can_move(&u).is_ok());
        assert!(matches!(can_deploy(&u), Err(Undeployable::LowAmmo { .. })));
    }

    #[test]
    fn reason_text() {
        let mut u = unit();
        u.status = UnitStatus::Maintenance;
        assert_eq!(can_move(&u).unwrap_err().to_string(), "unit status is maintenance");
        assert_eq!(can_deploy(&u).unwrap_err().to_string(), "status: maintenance");
    }
}
