//! Gateway error taxonomy.
//!
//! Every failure raised by the registry, the RBAC engine or the dispatcher
//! carries a status and a human-readable message that is surfaced verbatim
//! to the caller as `{ "message": ... }`.
//!
//! | Variant              | Status |
//! |----------------------|--------|
//! | `Validation`         | 400    |
//! | `NotFound`           | 400    |
//! | `Conflict`           | 400 (403 on update paths) |
//! | `Forbidden`          | 403    |
//! | `Unauthenticated`    | 401    |
//! | `GatewayUnavailable` | 503    |
//! | `Internal`           | 500    |
//!
//! Unresolved references deliberately answer 400 rather than 404; existing
//! clients depend on it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// Unresolved reference (application, role, resource, permission).
    #[error("{0}")]
    NotFound(String),

    /// Duplicate value for a unique field.
    #[error("{0}")]
    Conflict(String),

    /// Authorization denial or protected-entity mutation.
    #[error("{0}")]
    Forbidden(String),

    /// Missing or invalid credential.
    #[error("{0}")]
    Unauthenticated(String),

    /// Backend could not be reached.
    #[error("{0}")]
    GatewayUnavailable(String),

    /// Gateway-side fault, e.g. a stored host that no longer forms a URL.
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::GatewayUnavailable(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::NotFound(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Forbidden(_) => "forbidden",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::GatewayUnavailable(_) => "gateway_unavailable",
            Self::Internal(_) => "internal",
        }
    }

    /// Update paths report rejected values (duplicates, malformed hosts) as 403.
    pub fn on_update(self) -> Self {
        match self {
            Self::Conflict(message) | Self::Validation(message) => Self::Forbidden(message),
            other => other,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatewayError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayError::not_found("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayError::conflict("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(GatewayError::unauthenticated("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GatewayError::unavailable("x").status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(GatewayError::internal("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_update_remaps_rejections_only() {
        assert_eq!(
            GatewayError::conflict("dup").on_update(),
            GatewayError::forbidden("dup")
        );
        assert_eq!(
            GatewayError::validation("bad host").on_update().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GatewayError::not_found("missing").on_update().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
