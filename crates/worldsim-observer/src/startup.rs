//! Observer startup helper for embedding in the engine binary.
//!
//! [`spawn_observer`] launches the HTTP + `WebSocket` server on a
//! background task so that it runs alongside the clock loop.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors raised when spawning the observer.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server address is unusable.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the observer server on a background task.
///
/// The address is validated before spawning so that obvious
/// misconfiguration fails startup instead of a background task. Bind
/// failures surface in the log.
pub fn spawn_observer(
    config: ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let addr = config.socket_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::start_server(&config, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%addr, "Observer server spawned on background task");
    Ok(handle)
}
