//! Engine binary for the worldsim simulation.
//!
//! This is the main entry point that wires together the simulation
//! clock, the snapshot store, one tick coordinator per configured
//! country and the observer API. It loads configuration, initializes all
//! subsystems, and drives the clock until it is stopped or reaches its
//! day limit.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `worldsim-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Open the snapshot store and seed missing countries
//! 4. Create the simulation clock
//! 5. Load the event catalog
//! 6. Create country sessions and observer state
//! 7. Register a tick coordinator per country
//! 8. Start the observer API server
//! 9. Install the Ctrl-C handler
//! 10. Run the clock loop
//! 11. Log the result

mod error;
mod observer_callback;
mod seed;

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use worldsim_core::{
    ClockHandle, CountrySessions, EventCatalog, ProcessorSet, SimClock, SimulationConfig,
    SnapshotStore, TickCoordinator, log_run_end, run_clock,
};
use worldsim_db::JsonFileStore;
use worldsim_military::{OperationLifecycle, SeededRandom};
use worldsim_observer::{AppState, ServerConfig};

use crate::error::EngineError;
use crate::observer_callback::ObserverCallback;

/// Path of the configuration file, relative to the working directory.
const CONFIG_PATH: &str = "worldsim-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so the fallback is
    //    reported once the subscriber exists.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("worldsim-engine starting");
    if !from_file {
        info!(path = CONFIG_PATH, "Config file not found, using defaults");
    }
    let countries = config.countries();
    info!(
        start_date = %config.clock.start_date,
        speed = config.clock.speed,
        start_paused = config.clock.start_paused,
        max_days = config.clock.max_days,
        seed = config.world.seed,
        countries = ?countries,
        "Configuration loaded"
    );

    // 3. Open the snapshot store and seed missing countries.
    let store: Arc<dyn SnapshotStore> =
        Arc::new(JsonFileStore::open(&config.storage.data_dir).map_err(EngineError::from)?);
    let seeded = seed::seed_missing(store.as_ref(), &countries)?;
    info!(
        data_dir = %config.storage.data_dir.display(),
        seeded = seeded.len(),
        "Snapshot store ready"
    );

    // 4. Create the simulation clock.
    let mut sim_clock = SimClock::new(config.clock.start_date, config.clock.speed);
    if config.clock.start_paused {
        sim_clock.pause();
    }
    let clock = Arc::new(ClockHandle::new(sim_clock));
    info!(paused = clock.is_paused(), "Simulation clock initialized");

    // 5. Load the event catalog.
    let catalog = load_catalog(&config)?;
    info!(event_types = catalog.len(), "Event catalog loaded");

    // 6. Create country sessions and observer state.
    let sessions = Arc::new(CountrySessions::new(store));
    let app_state = Arc::new(
        AppState::new(
            Arc::clone(&clock),
            Arc::clone(&sessions),
            Box::new(SeededRandom::new(config.world.seed)),
        )
        .with_arrival_tolerance(config.military.arrival_tolerance_km),
    );

    // 7. Register a tick coordinator per country. Each country draws from
    //    its own seeded streams so adding a country does not reshuffle
    //    another's rolls.
    for (code, offset) in countries.iter().zip(1_u64..) {
        let stream = config.world.seed.wrapping_mul(1_000).wrapping_add(offset);
        let coordinator = TickCoordinator::new(
            code.clone(),
            Arc::clone(&sessions),
            app_state.sink(),
            ProcessorSet::standard(catalog.clone(), Box::new(SeededRandom::new(stream))),
            OperationLifecycle::new(code.clone(), config.military.arrival_tolerance_km),
            Box::new(SeededRandom::new(stream.wrapping_add(500))),
        );
        let handlers = coordinator.register(&clock);
        info!(country = %code, handlers = handlers.len(), "Tick coordinator registered");
    }

    // 8. Start the observer API server.
    let server_config = ServerConfig {
        host: config.observer.host.clone(),
        port: config.observer.port,
    };
    let _observer_handle = worldsim_observer::spawn_observer(server_config, Arc::clone(&app_state))
        .map_err(EngineError::from)?;

    // 9. Install the Ctrl-C handler.
    {
        let clock = Arc::clone(&clock);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, stopping clock");
                    clock.request_stop();
                }
                Err(e) => {
                    warn!(error = %e, "Failed to listen for Ctrl-C, stop the process externally");
                }
            }
        });
    }

    // 10. Run the clock loop.
    let mut callback = ObserverCallback::new(app_state);
    let summary = run_clock(&clock, config.clock.max_days, &mut callback).await;

    // 11. Log the result.
    log_run_end(&summary);
    info!(
        end_reason = ?summary.end_reason,
        days_advanced = summary.days_advanced,
        "worldsim-engine shutdown complete"
    );

    Ok(())
}

/// Load the simulation configuration from `worldsim-config.yaml`.
///
/// Looks for the config file relative to the current working directory.
/// Returns whether the file was found alongside the configuration.
fn load_config() -> Result<(SimulationConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok((SimulationConfig::from_file(config_path)?, true))
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides();
        Ok((config, false))
    }
}

/// Load the configured event catalog, or the built-in one.
fn load_catalog(config: &SimulationConfig) -> Result<EventCatalog, EngineError> {
    let catalog = match &config.events.catalog {
        Some(path) => EventCatalog::from_file(path)?,
        None => EventCatalog::builtin()?,
    };
    Ok(catalog)
}
