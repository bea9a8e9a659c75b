//! Configuration loading and typed config structures for the worldsim
//! simulation.
//!
//! The canonical configuration lives in `worldsim-config.yaml` at the
//! project root. Every section and field has a default, so an empty file
//! (or no file at all) yields a runnable configuration.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use worldsim_types::CountryCode;

use crate::clock::{MAX_SPEED, MIN_SPEED};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `worldsim-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Calendar and pacing.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Seed and the set of simulated countries.
    #[serde(default)]
    pub world: WorldConfig,

    /// Snapshot persistence.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP / WebSocket server.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Military engine tuning.
    #[serde(default)]
    pub military: MilitaryConfig,

    /// Event catalog location.
    #[serde(default)]
    pub events: EventsConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `WORLDSIM_DATA_DIR` overrides `storage.data_dir`
    /// - `WORLDSIM_OBSERVER_PORT` overrides `observer.port`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, apply environment overrides
    /// and validate the result.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty map.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override selected values with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("WORLDSIM_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(val);
        }
        if let Some(port) = std::env::var("WORLDSIM_OBSERVER_PORT")
            .ok()
            .and_then(|val| val.parse::<u16>().ok())
        {
            self.observer.port = port;
        }
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.clock.speed.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&self.clock.speed) {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "clock.speed must be within [{MIN_SPEED}, {MAX_SPEED}], got {}",
                    self.clock.speed
                ),
            });
        }
        if self.world.countries.is_empty() {
            return Err(ConfigError::Invalid {
                reason: String::from("world.countries must list at least one country"),
            });
        }
        if !self.military.arrival_tolerance_km.is_finite()
            || self.military.arrival_tolerance_km < 0.0
        {
            return Err(ConfigError::Invalid {
                reason: String::from("military.arrival_tolerance_km must be non-negative"),
            });
        }
        Ok(())
    }

    /// Configured countries, normalised to upper case.
    pub fn countries(&self) -> Vec<CountryCode> {
        self.world
            .countries
            .iter()
            .map(|c| CountryCode::normalized(c.as_str()))
            .collect()
    }
}

/// Calendar and pacing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClockConfig {
    /// First simulated date.
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// Simulated days per wall-clock second.
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Whether the clock waits for an explicit resume.
    #[serde(default = "default_true")]
    pub start_paused: bool,

    /// Stop after this many days; zero runs until stopped.
    #[serde(default)]
    pub max_days: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            speed: default_speed(),
            start_paused: true,
            max_days: 0,
        }
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Random seed for outcome rolls and event triggers.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Countries that get a tick coordinator.
    #[serde(default = "default_countries")]
    pub countries: Vec<CountryCode>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            countries: default_countries(),
        }
    }
}

/// Snapshot persistence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Root directory for country snapshots.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// HTTP / WebSocket server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Military engine tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MilitaryConfig {
    /// How close to the target a unit must be to count as arrived.
    #[serde(default = "default_arrival_tolerance_km")]
    pub arrival_tolerance_km: f64,
}

impl Default for MilitaryConfig {
    fn default() -> Self {
        Self {
            arrival_tolerance_km: default_arrival_tolerance_km(),
        }
    }
}

/// Event catalog location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventsConfig {
    /// YAML catalog path. Without one, the built-in catalog is used.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

const fn default_speed() -> f64 {
    1.0
}

const fn default_true() -> bool {
    true
}

const fn default_seed() -> u64 {
    42
}

fn default_countries() -> Vec<CountryCode> {
    vec![CountryCode::from("USA")]
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_arrival_tolerance_km() -> f64 {
    worldsim_military::DEFAULT_ARRIVAL_TOLERANCE_KM
}
