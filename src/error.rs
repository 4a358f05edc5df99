use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Message returned when proximity matching finds no serviceable zone;
/// the dashboards show it to the buyer verbatim.
pub const NO_SERVICEABLE_ZONE_MESSAGE: &str = "this farmer does not deliver around your area; \
     pick a similar product from the products page or enter another delivery location";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("ownership mismatch: {0}")]
    OwnershipMismatch(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("state conflict: expected {expected}, found {actual}")]
    StateConflict { expected: String, actual: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{NO_SERVICEABLE_ZONE_MESSAGE}")]
    NoServiceableZone,

    #[error("no delivery zones configured for this farmer")]
    NoZonesConfigured,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn state_conflict(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        AppError::StateConflict {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Stable machine-readable kind so clients can branch without parsing
    /// the message (prompt for another location, treat as already-done, etc).
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::OwnershipMismatch(_) => "ownership_mismatch",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::StateConflict { .. } => "state_conflict",
            AppError::Conflict(_) => "conflict",
            AppError::NoServiceableZone => "no_serviceable_zone",
            AppError::NoZonesConfigured => "no_zones_configured",
            AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::OwnershipMismatch(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::StateConflict { .. } => StatusCode::CONFLICT,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NoServiceableZone => StatusCode::NOT_FOUND,
            AppError::NoZonesConfigured => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "kind": self.kind(),
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
