//! Starter snapshots for configured countries that have none on disk.
//!
//! A fresh data directory would otherwise leave every coordinator failing
//! its first daily tick. For each configured country without a snapshot,
//! the seeder writes a starter state: default indicators, and for the
//! countries listed in [`STARTERS`] one air base with two fighter
//! squadrons and a ground brigade. Unknown codes get an empty roster.
//!
//! Existing snapshots are never touched.

use tracing::{info, warn};
use worldsim_core::SnapshotStore;
use worldsim_types::{
    BaseType, Coordinates, CountryCode, CountryState, MilitaryBase, MilitaryUnit, UnitCategory,
};

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Starter table
// -----------------------------------------------------------------------

/// A country the seeder knows how to equip.
struct Starter {
    code: &'static str,
    name: &'static str,
    base: &'static str,
    lat: f64,
    lng: f64,
    fighter: &'static str,
}

const STARTERS: &[Starter] = &[
    Starter {
        code: "USA",
        name: "United States",
        base: "Joint Base Andrews",
        lat: 38.81,
        lng: -76.87,
        fighter: "F-35A",
    },
    Starter {
        code: "ISR",
        name: "Israel",
        base: "Nevatim Airbase",
        lat: 31.21,
        lng: 35.01,
        fighter: "F-16I",
    },
    Starter {
        code: "GBR",
        name: "United Kingdom",
        base: "RAF Coningsby",
        lat: 53.09,
        lng: -0.17,
        fighter: "Typhoon FGR4",
    },
    Starter {
        code: "FRA",
        name: "France",
        base: "BA 113 Saint-Dizier",
        lat: 48.64,
        lng: 4.90,
        fighter: "Rafale B",
    },
    Starter {
        code: "IND",
        name: "India",
        base: "Ambala Air Force Station",
        lat: 30.37,
        lng: 76.82,
        fighter: "Rafale EH",
    },
];

/// One-way combat radius given to seeded fighter squadrons.
const FIGHTER_COMBAT_RADIUS_KM: f64 = 1_100.0;

// -----------------------------------------------------------------------
// Seeding
// -----------------------------------------------------------------------

/// Write a starter snapshot for every country in `countries` that the
/// store does not hold yet.
///
/// Returns the codes that were seeded.
pub fn seed_missing(
    store: &dyn SnapshotStore,
    countries: &[CountryCode],
) -> Result<Vec<CountryCode>, EngineError> {
    let mut seeded = Vec::new();
    for code in countries {
        if store.exists(code)? {
            continue;
        }
        let state = starter_state(code)?;
        info!(
            country = %code,
            units = state.forces.units.len(),
            bases = state.forces.bases.len(),
            "Seeding starter snapshot"
        );
        store.save(&state)?;
        seeded.push(code.clone());
    }
    Ok(seeded)
}

/// Build the starter snapshot for one country.
pub fn starter_state(code: &CountryCode) -> Result<CountryState, EngineError> {
    let Some(starter) = STARTERS.iter().find(|s| s.code == code.as_str()) else {
        warn!(country = %code, "No starter roster for country, seeding an empty one");
        return Ok(CountryState::new(code.clone(), code.as_str()));
    };

    let mut state = CountryState::new(code.clone(), starter.name);
    let location = Coordinates::new(starter.lat, starter.lng).map_err(|e| EngineError::Seed {
        message: format!("{}: {e}", starter.code),
    })?;
    let prefix = starter.code.to_lowercase();

    let base = MilitaryBase::new(
        format!("{prefix}_main_air_base"),
        starter.base,
        location,
        BaseType::AirBase,
    )
    .with_repair();

    for n in 1..=2_u8 {
        let mut squadron = MilitaryUnit::new(
            format!("{prefix}_fighter_{n}"),
            format!("Fighter Squadron {n}"),
            starter.fighter,
            UnitCategory::Aircraft,
            location,
        )
        .stationed_at(&base);
        squadron.quantity = 12;
        squadron.combat_radius_km = Some(FIGHTER_COMBAT_RADIUS_KM);
        state.forces.units.push(squadron);
    }

    let mut brigade = MilitaryUnit::new(
        format!("{prefix}_brigade_1"),
        "1st Armoured Brigade",
        "Main battle tank",
        UnitCategory::Ground,
        location,
    )
    .stationed_at(&base);
    brigade.quantity = 90;
    state.forces.units.push(brigade);

    state.forces.bases.push(base);
    Ok(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use worldsim_core::MemoryStore;
    use worldsim_types::UnitStatus;

    use super::*;

    #[test]
    fn known_country_gets_a_roster() {
        let state = starter_state(&CountryCode::from("ISR")).unwrap();
        assert_eq!(state.meta.name, "Israel");
        assert_eq!(state.forces.bases.len(), 1);
        assert_eq!(state.forces.units.len(), 3);

        let base = &state.forces.bases[0];
        assert!(base.capabilities.repair_capability);
        for unit in &state.forces.units {
            assert_eq!(unit.status, UnitStatus::Idle);
            assert_eq!(unit.home_base_id.as_ref(), Some(&base.id));
            assert_eq!(unit.current_base_id.as_ref(), Some(&base.id));
        }
    }

    #[test]
    fn unknown_country_gets_an_empty_roster() {
        let state = starter_state(&CountryCode::from("XYZ")).unwrap();
        assert_eq!(state.meta.name, "XYZ");
        assert!(state.forces.units.is_empty());
        assert!(state.forces.bases.is_empty());
    }

    #[test]
    fn existing_snapshots_are_left_alone() {
        let mut existing = CountryState::new(CountryCode::from("USA"), "Custom");
        existing.meta.total_game_days_elapsed = 400;
        let store = MemoryStore::with_states([existing]);

        let seeded = seed_missing(
            &store,
            &[CountryCode::from("USA"), CountryCode::from("GBR")],
        )
        .unwrap();

        assert_eq!(seeded, vec![CountryCode::from("GBR")]);
        let usa = store.load(&CountryCode::from("USA")).unwrap();
        assert_eq!(usa.meta.name, "Custom");
        assert_eq!(usa.meta.total_game_days_elapsed, 400);
        assert!(store.exists(&CountryCode::from("GBR")).unwrap());
    }

    #[test]
    fn seeds_a_fresh_data_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = worldsim_db::JsonFileStore::open(dir.path()).unwrap();

        let seeded = seed_missing(&store, &[CountryCode::from("FRA")]).unwrap();
        assert_eq!(seeded.len(), 1);
        assert!(store.path_for(&CountryCode::from("FRA")).is_file());

        let again = seed_missing(&store, &[CountryCode::from("FRA")]).unwrap();
        assert!(again.is_empty());
    }
}
