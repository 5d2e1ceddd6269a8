//! Backend forwarding.
//!
//! # Responsibilities
//! - Build the target URL: host + sub-path + original query string
//! - Forward method, headers (minus hop-by-hop) and streamed body unmodified
//! - Stream the backend response back with its status and headers
//! - Collapse every transport failure into a single 503
//!
//! # Design Decisions
//! - No retries: a failed forward is surfaced once
//! - One deadline covers connect + request until response headers

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Response, Uri, Version},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::auth::Identity;
use crate::error::{GatewayError, Result};
use crate::gateway::dispatcher::Resolved;
use crate::http::request::X_REQUEST_ID;
use crate::http::response::strip_hop_by_hop;
use crate::observability::metrics;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";
pub const X_FORWARDED_PREFIX: &str = "x-forwarded-prefix";
pub const X_USER_ID: &str = "x-user-id";
pub const X_USERNAME: &str = "x-username";

/// `host + sub_path + ?query`, with the query copied verbatim.
pub fn target_uri(host: &str, sub_path: &str, query: Option<&str>) -> Result<Uri> {
    let mut target = String::with_capacity(host.len() + sub_path.len() + 1 + query.map_or(0, str::len));
    target.push_str(host);
    target.push_str(sub_path);
    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }
    target
        .parse()
        .map_err(|e| GatewayError::internal(format!("cannot build target URL '{target}': {e}")))
}

/// Per-request data attached to the forwarded request.
#[derive(Debug, Clone, Copy)]
pub struct ForwardContext<'a> {
    pub request_id: &'a str,
    pub peer: Option<SocketAddr>,
    pub resolved: &'a Resolved,
    pub identity: Option<&'a Identity>,
}

/// HTTP client wrapper that forwards requests to backends.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, timeout }
    }

    /// Forward `request` to `target` and return the backend's response.
    pub async fn forward(&self, request: Request<Body>, target: Uri, ctx: ForwardContext<'_>) -> Result<Response<Body>> {
        let (mut parts, body) = request.into_parts();
        let original_host = parts.headers.get(header::HOST).cloned();

        strip_hop_by_hop(&mut parts.headers);
        parts.headers.remove(header::HOST);
        // Identity headers are only ever set by the gateway.
        parts.headers.remove(X_USER_ID);
        parts.headers.remove(X_USERNAME);

        if let Some(peer) = ctx.peer {
            let forwarded_for = match parts.headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
                Some(existing) => format!("{existing}, {}", peer.ip()),
                None => peer.ip().to_string(),
            };
            if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
                parts.headers.insert(X_FORWARDED_FOR, value);
            }
        }
        if let Some(host) = original_host {
            parts.headers.insert(X_FORWARDED_HOST, host);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("/{}", ctx.resolved.prefix)) {
            parts.headers.insert(X_FORWARDED_PREFIX, value);
        }
        if let Ok(value) = HeaderValue::from_str(ctx.request_id) {
            parts.headers.insert(X_REQUEST_ID, value);
        }
        if let Some(identity) = ctx.identity {
            if let Ok(value) = HeaderValue::from_str(&identity.user_id) {
                parts.headers.insert(X_USER_ID, value);
            }
            if let Some(Ok(value)) = identity.username.as_deref().map(HeaderValue::from_str) {
                parts.headers.insert(X_USERNAME, value);
            }
        }

        parts.uri = target;
        parts.version = Version::HTTP_11;
        let outbound = Request::from_parts(parts, body);

        tracing::debug!(
            request_id = %ctx.request_id,
            target = %outbound.uri(),
            method = %outbound.method(),
            "Forwarding request"
        );

        let name = ctx.resolved.application.display_name();
        match tokio::time::timeout(self.timeout, self.client.request(outbound)).await {
            Ok(Ok(response)) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Ok(Response::from_parts(parts, Body::new(body)))
            }
            Ok(Err(e)) => {
                tracing::error!(request_id = %ctx.request_id, prefix = %ctx.resolved.prefix, error = %e, "Upstream error");
                metrics::record_upstream_failure(&ctx.resolved.prefix, "transport");
                Err(GatewayError::unavailable(format!("application '{name}' is unavailable")))
            }
            Err(_) => {
                tracing::error!(
                    request_id = %ctx.request_id,
                    prefix = %ctx.resolved.prefix,
                    timeout = ?self.timeout,
                    "Upstream timed out"
                );
                metrics::record_upstream_failure(&ctx.resolved.prefix, "timeout");
                Err(GatewayError::unavailable(format!("application '{name}' is unavailable")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_preserves_sub_path_and_query() {
        let uri = target_uri("http://localhost:3300", "/a/b", Some("x=1&y=%20z")).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:3300/a/b?x=1&y=%20z");

        let uri = target_uri("http://localhost:3300/base", "/route1", None).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:3300/base/route1");
    }

    #[test]
    fn test_bare_prefix_targets_host_root() {
        let uri = target_uri("http://localhost:3300", "", None).unwrap();
        assert_eq!(uri.authority().unwrap().as_str(), "localhost:3300");
        assert_eq!(uri.path(), "/");
    }

    #[test]
    fn test_unbuildable_target_is_internal_error() {
        let err = target_uri("http://bad host", "/route1", None).unwrap_err();
        assert_eq!(err.kind(), "internal");
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
