//! Admin API guard.
//!
//! Admin routes require a credential and are authorized through the RBAC
//! engine like any other resource: the resource is the matched route
//! template (e.g. `/roles/{role}/resources`) and the action the lower-cased
//! method.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::auth::identify;
use crate::error::GatewayError;
use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn admin_guard(
    State(state): State<AppState>,
    matched: MatchedPath,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, GatewayError> {
    let identity = identify(state.authenticator.as_ref(), request.headers())?;
    let resource = matched.as_str();
    let action = request.method().as_str().to_lowercase();

    if !state.rbac.is_allowed(&identity.user_id, resource, &action) {
        metrics::record_authz_decision(false);
        tracing::warn!(
            user_id = %identity.user_id,
            resource = %resource,
            action = %action,
            allowed = ?state.rbac.allowed_permissions(&identity.user_id, resource),
            "Admin request denied"
        );
        return Err(GatewayError::forbidden("insufficient permissions"));
    }
    metrics::record_authz_decision(true);

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
