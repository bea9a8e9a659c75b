//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: worldsim_core::ConfigError,
    },

    /// Snapshot storage failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: worldsim_core::StoreError,
    },

    /// The event catalog could not be loaded.
    #[error("event catalog error: {source}")]
    Catalog {
        /// The underlying catalog error.
        #[from]
        source: worldsim_core::CatalogError,
    },

    /// A starter snapshot could not be built.
    #[error("seed error: {message}")]
    Seed {
        /// Description of the seeding failure.
        message: String,
    },

    /// Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: worldsim_observer::StartupError,
    },
}
