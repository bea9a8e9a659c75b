//! Error types for the observer API.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. The body
//! is always `{"error": .., "status": ..}`, plus a stable `code` when the
//! failure came from the military engines.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use worldsim_core::StoreError;
use worldsim_military::{MovementError, OperationError};
use worldsim_types::CoordinateError;

/// Errors that can occur in the observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested country, unit, base or operation does not exist.
    #[error("{message}")]
    NotFound {
        /// What was missing.
        message: String,
        /// Machine-readable code, when known.
        code: Option<&'static str>,
    },

    /// The request body or parameters are malformed.
    #[error("{0}")]
    BadRequest(String),

    /// The request is well formed but names something the engine rejects.
    #[error("{message}")]
    Unprocessable {
        /// Why.
        message: String,
        /// Machine-readable code.
        code: &'static str,
    },

    /// The current state does not allow the action.
    #[error("{message}")]
    Conflict {
        /// Why.
        message: String,
        /// Machine-readable code.
        code: &'static str,
    },

    /// Snapshot storage failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl ObserverError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } | Self::Store(StoreError::NotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn code(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { code, .. } => *code,
            Self::Unprocessable { code, .. } | Self::Conflict { code, .. } => Some(code),
            Self::BadRequest(_) | Self::Store(_) => None,
        }
    }
}

impl From<MovementError> for ObserverError {
    fn from(err: MovementError) -> Self {
        let code = err.code();
        if err.is_not_found() {
            Self::NotFound {
                message: err.to_string(),
                code: Some(code),
            }
        } else if matches!(err, MovementError::InvalidStatusOverride { .. }) {
            Self::BadRequest(err.to_string())
        } else {
            Self::Conflict {
                message: err.to_string(),
                code,
            }
        }
    }
}

impl From<OperationError> for ObserverError {
    fn from(err: OperationError) -> Self {
        let code = err.code();
        if err.is_not_found() || matches!(err, OperationError::UnitNotFound { .. }) {
            Self::NotFound {
                message: err.to_string(),
                code: Some(code),
            }
        } else if err.is_validation() {
            Self::Unprocessable {
                message: err.to_string(),
                code,
            }
        } else {
            Self::Conflict {
                message: err.to_string(),
                code,
            }
        }
    }
}

impl From<CoordinateError> for ObserverError {
    fn from(err: CoordinateError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
        }

        let mut body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        if let (Some(code), Some(map)) = (self.code(), body.as_object_mut()) {
            map.insert(String::from("code"), serde_json::Value::from(code));
        }

        (status, axum::Json(body)).into_response()
    }
}
