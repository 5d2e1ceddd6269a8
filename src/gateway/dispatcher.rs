//! Request dispatch state machine.
//!
//! ```text
//! Received → PrefixExtracted → AppResolved → Authorized → Forwarded
//!               │                  │             │            │
//!               ▼                  ▼             ▼            ▼
//!        400 invalid prefix  400 not found /  403 denied   503 unreachable
//!                            undefined host
//! ```
//!
//! Resolution and authorization are read-only against the shared stores.

use std::sync::Arc;

use axum::http::Method;

use crate::auth::Identity;
use crate::error::{GatewayError, Result};
use crate::observability::metrics;
use crate::rbac::RbacEngine;
use crate::registry::{Application, ApplicationRegistry};

/// Outcome of the PrefixExtracted and AppResolved steps.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub application: Application,
    /// Normalized base URL of the backend.
    pub host: String,
    pub prefix: String,
    /// Remainder of the path, including its leading `/` (may be empty).
    pub sub_path: String,
}

impl Resolved {
    /// RBAC resource for this request: prefix followed by the raw sub-path.
    pub fn resource(&self) -> String {
        format!("{}{}", self.prefix, self.sub_path)
    }

    pub fn is_anonymous(&self) -> bool {
        self.application.is_anonymous(&self.sub_path)
    }
}

/// `.` or `..`, literally or with `%2e` escapes.
fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

/// Split `/prefix/rest` into `("prefix", "/rest")`.
///
/// Dot segments are refused: the resource is matched on the raw path while
/// the backend would resolve them, so `/a/granted/../other` must never
/// reach either.
pub fn split_prefix(path: &str) -> Result<(&str, &str)> {
    let rest = path.strip_prefix('/').unwrap_or(path);
    let (prefix, sub_path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    if prefix.is_empty() || is_dot_segment(prefix) {
        return Err(GatewayError::validation("invalid prefix"));
    }
    if sub_path.split('/').any(is_dot_segment) {
        return Err(GatewayError::validation("invalid path: dot segments are not allowed"));
    }
    Ok((prefix, sub_path))
}

/// Resolves requests against the registry and the RBAC engine.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ApplicationRegistry>,
    rbac: Arc<RbacEngine>,
    mount_path: String,
}

impl Dispatcher {
    pub fn new(registry: Arc<ApplicationRegistry>, rbac: Arc<RbacEngine>, mount_path: impl Into<String>) -> Self {
        Self {
            registry,
            rbac,
            mount_path: mount_path.into(),
        }
    }

    /// Path relative to the mount point, or `None` when outside of it.
    pub fn mounted<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.mount_path == "/" {
            return Some(path);
        }
        let rest = path.strip_prefix(self.mount_path.as_str())?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }

    /// Extract the prefix and look the application up.
    pub async fn resolve(&self, path: &str) -> Result<Resolved> {
        let (prefix, sub_path) = split_prefix(path)?;

        let application = self
            .registry
            .find_by_prefix(prefix)
            .await
            .ok_or_else(|| GatewayError::validation("application not found"))?;

        let host = application.host.clone().ok_or_else(|| {
            GatewayError::validation(format!(
                "undefined host for application '{}'",
                application.display_name()
            ))
        })?;

        Ok(Resolved {
            application,
            host,
            prefix: prefix.to_string(),
            sub_path: sub_path.to_string(),
        })
    }

    /// Check `method` on the request's resource for `identity`.
    pub fn authorize(&self, resolved: &Resolved, identity: &Identity, method: &Method) -> Result<()> {
        let resource = resolved.resource();
        let action = method.as_str().to_lowercase();

        if self.rbac.is_allowed(&identity.user_id, &resource, &action) {
            metrics::record_authz_decision(true);
            return Ok(());
        }

        metrics::record_authz_decision(false);
        tracing::warn!(
            user_id = %identity.user_id,
            resource = %resource,
            action = %action,
            allowed = ?self.rbac.allowed_permissions(&identity.user_id, &resource),
            "Insufficient permissions"
        );
        Err(GatewayError::forbidden("insufficient permissions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::AllowRule;
    use crate::registry::NewApplication;

    #[test]
    fn test_split_prefix() {
        assert_eq!(split_prefix("/gleaner/route1").unwrap(), ("gleaner", "/route1"));
        assert_eq!(split_prefix("/gleaner/a/b/").unwrap(), ("gleaner", "/a/b/"));
        assert_eq!(split_prefix("/gleaner").unwrap(), ("gleaner", ""));
        assert!(split_prefix("/").is_err());
        assert!(split_prefix("//route").is_err());
        assert!(split_prefix("").is_err());
    }

    #[test]
    fn test_dot_segments_are_rejected() {
        for path in [
            "/gleaner/route1/../route2",
            "/gleaner/route1/./x",
            "/gleaner/route1/%2e%2e/route2",
            "/gleaner/route1/%2E./route2",
            "/gleaner/..",
            "/../gleaner/x",
        ] {
            assert!(
                matches!(split_prefix(path), Err(GatewayError::Validation(_))),
                "path {path}"
            );
        }
        assert_eq!(split_prefix("/gleaner/v1.2/..x").unwrap(), ("gleaner", "/v1.2/..x"));
    }

    async fn dispatcher(mount: &str) -> Dispatcher {
        let registry = Arc::new(ApplicationRegistry::new());
        registry
            .register(NewApplication {
                prefix: Some("gleaner".into()),
                host: Some("localhost:3300".into()),
                anonymous_routes: Some(vec!["/public".into()]),
                ..Default::default()
            })
            .await
            .unwrap();
        registry.reserve("pending", Some("Pending App".into())).await.unwrap();

        let rbac = Arc::new(RbacEngine::new("admin"));
        rbac.create_role(
            "gleanerUser",
            vec![AllowRule {
                resources: vec!["gleaner/route1".into()],
                permissions: vec!["get".into()],
            }],
        )
        .unwrap();
        rbac.assign_roles("alice", &["gleanerUser".to_string()]).unwrap();

        Dispatcher::new(registry, rbac, mount)
    }

    #[tokio::test]
    async fn test_resolve_states() {
        let d = dispatcher("/").await;

        let resolved = d.resolve("/gleaner/route1").await.unwrap();
        assert_eq!(resolved.host, "http://localhost:3300");
        assert_eq!(resolved.resource(), "gleaner/route1");
        assert!(!resolved.is_anonymous());
        assert!(d.resolve("/gleaner/public").await.unwrap().is_anonymous());

        assert_eq!(
            d.resolve("/unknownapp/x").await.unwrap_err(),
            GatewayError::validation("application not found")
        );
        let err = d.resolve("/pending/x").await.unwrap_err();
        assert!(err.to_string().contains("Pending App"));
        assert!(err.to_string().contains("undefined host"));
    }

    #[tokio::test]
    async fn test_authorize() {
        let d = dispatcher("/").await;
        let alice = Identity {
            user_id: "alice".into(),
            username: None,
        };

        let ok = d.resolve("/gleaner/route1").await.unwrap();
        assert!(d.authorize(&ok, &alice, &Method::GET).is_ok());
        assert!(d.authorize(&ok, &alice, &Method::POST).is_err());

        let denied = d.resolve("/gleaner/route2").await.unwrap();
        assert_eq!(
            d.authorize(&denied, &alice, &Method::GET).unwrap_err(),
            GatewayError::forbidden("insufficient permissions")
        );
    }

    #[tokio::test]
    async fn test_mount_point() {
        let d = dispatcher("/gw").await;
        assert_eq!(d.mounted("/gw/gleaner/x"), Some("/gleaner/x"));
        assert_eq!(d.mounted("/gw"), Some(""));
        assert_eq!(d.mounted("/gwx/gleaner"), None);
        assert_eq!(d.mounted("/other"), None);
    }
}
