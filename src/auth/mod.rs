//! Caller authentication.
//!
//! Token issuance lives elsewhere; the gateway only resolves a bearer
//! credential to an [`Identity`]. A missing or invalid credential is a 401.

pub mod jwt;
pub mod middleware;

use axum::http::{header, HeaderMap};

use crate::error::{GatewayError, Result};

pub use jwt::{Claims, JwtAuthenticator};

/// Authenticated caller attached to request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: Option<String>,
}

/// Resolves a bearer token to an identity.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<Identity>;
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| GatewayError::unauthenticated("missing bearer token"))?
        .to_str()
        .map_err(|_| GatewayError::unauthenticated("malformed authorization header"))?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| GatewayError::unauthenticated("missing bearer token"))?;
    Ok(token)
}

/// Resolve the caller from request headers.
pub fn identify(authenticator: &dyn Authenticator, headers: &HeaderMap) -> Result<Identity> {
    authenticator.authenticate(bearer_token(headers)?)
}
