//! Application records and field validation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{GatewayError, Result};

/// A backend application reachable under a unique prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub prefix: String,
    /// Normalized base URL. `None` for a reserved prefix with no backend yet.
    pub host: Option<String>,
    pub name: Option<String>,
    /// Sub-paths that bypass authentication and authorization.
    #[serde(default)]
    pub anonymous_routes: BTreeSet<String>,
    pub time_created: DateTime<Utc>,
}

impl Application {
    /// Name shown in messages, falling back to the prefix.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.prefix)
    }

    /// Exact match against the declared anonymous sub-paths.
    pub fn is_anonymous(&self, sub_path: &str) -> bool {
        self.anonymous_routes.contains(sub_path)
    }
}

/// Fields returned after registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub prefix: String,
    pub host: Option<String>,
}

impl From<&Application> for ApplicationSummary {
    fn from(app: &Application) -> Self {
        Self {
            id: app.id,
            name: app.name.clone(),
            prefix: app.prefix.clone(),
            host: app.host.clone(),
        }
    }
}

/// Registration request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub prefix: Option<String>,
    pub host: Option<String>,
    pub name: Option<String>,
    pub anonymous_routes: Option<Vec<String>>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationUpdate {
    pub prefix: Option<String>,
    pub host: Option<String>,
    pub name: Option<String>,
    pub anonymous_routes: Option<Vec<String>>,
}

/// Check that a prefix is a single, non-empty path segment.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.trim().is_empty() {
        return Err(GatewayError::validation("prefix is required"));
    }
    if prefix.contains('/') || prefix.chars().any(char::is_whitespace) {
        return Err(GatewayError::validation(format!(
            "prefix '{prefix}' must be a single path segment"
        )));
    }
    Ok(())
}

/// Normalize a backend host.
///
/// `http://` is prepended when no scheme is present and exactly one trailing
/// `/` is stripped. The result must parse as an absolute `http` URL; the
/// forwarder has no TLS connector, so `https` backends are refused here.
pub fn normalize_host(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::validation("host is required"));
    }

    let mut host = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    if host.ends_with('/') {
        host.pop();
    }

    let url = Url::parse(&host)
        .map_err(|e| GatewayError::validation(format!("malformed host URL '{raw}': {e}")))?;
    if url.scheme() != "http" || url.host_str().is_none() {
        return Err(GatewayError::validation(format!(
            "malformed host URL '{raw}': expected an http URL"
        )));
    }

    Ok(host)
}

/// Anonymous routes are stored as given, with a leading `/` enforced.
pub fn normalize_anonymous_routes(routes: Vec<String>) -> BTreeSet<String> {
    routes
        .into_iter()
        .filter(|route| !route.is_empty())
        .map(|route| {
            if route.starts_with('/') {
                route
            } else {
                format!("/{route}")
            }
        })
        .collect()
}
