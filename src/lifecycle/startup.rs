//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the registry, RBAC engine, authenticator and forwarder
//! - Seed the stores from the `[bootstrap]` section
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Seeding order is roles, applications, assignments, so every assignment
//!   can reference a seeded role
//! - The admin role always exists with full access to the admin API

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::admin::ADMIN_SURFACES;
use crate::auth::JwtAuthenticator;
use crate::config::{validate_config, BootstrapConfig, ConfigError, GatewayConfig};
use crate::error::GatewayError;
use crate::gateway::{Dispatcher, Forwarder};
use crate::http::server::AppState;
use crate::rbac::{AllowRule, RbacEngine, WILDCARD};
use crate::registry::{ApplicationRegistry, NewApplication};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("bootstrap failed: {0}")]
    Seed(#[from] GatewayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build and seed every shared store.
pub async fn build_state(config: &GatewayConfig) -> Result<AppState, StartupError> {
    validate_config(config).map_err(ConfigError::Validation)?;

    let registry = if config.gateway.mount_path == "/" {
        // The admin API shares the root with proxied prefixes.
        ApplicationRegistry::with_reserved_prefixes(ADMIN_SURFACES.iter().map(|s| s.trim_start_matches('/')))
    } else {
        ApplicationRegistry::new()
    };
    let registry = Arc::new(registry);
    let rbac = Arc::new(RbacEngine::new(config.gateway.admin_role.clone()));

    seed(&registry, &rbac, &config.bootstrap).await?;

    let dispatcher = Arc::new(Dispatcher::new(
        registry.clone(),
        rbac.clone(),
        config.gateway.mount_path.clone(),
    ));
    let forwarder = Arc::new(Forwarder::new(
        Duration::from_secs(config.timeouts.connect_secs),
        Duration::from_secs(config.timeouts.forward_secs),
    ));

    Ok(AppState {
        registry,
        rbac,
        dispatcher,
        forwarder,
        authenticator: Arc::new(JwtAuthenticator::new(&config.auth)),
    })
}

/// Load bootstrap records into empty stores.
pub async fn seed(
    registry: &ApplicationRegistry,
    rbac: &RbacEngine,
    bootstrap: &BootstrapConfig,
) -> Result<(), GatewayError> {
    let admin_surfaces: Vec<String> = ADMIN_SURFACES.iter().map(|s| s.to_string()).collect();
    rbac.create_role(
        rbac.admin_role(),
        vec![AllowRule {
            resources: admin_surfaces,
            permissions: vec![WILDCARD.to_string()],
        }],
    )?;

    for role in &bootstrap.roles {
        if role.name == rbac.admin_role() {
            for allow in &role.allows {
                rbac.add_resources_to_role(&role.name, &allow.resources, &allow.permissions)?;
            }
            continue;
        }
        let rules = role
            .allows
            .iter()
            .map(|allow| AllowRule {
                resources: allow.resources.clone(),
                permissions: allow.permissions.clone(),
            })
            .collect();
        rbac.create_role(&role.name, rules)?;
    }

    for app in &bootstrap.applications {
        match &app.host {
            Some(host) => {
                registry
                    .register(NewApplication {
                        prefix: Some(app.prefix.clone()),
                        host: Some(host.clone()),
                        name: app.name.clone(),
                        anonymous_routes: Some(app.anonymous_routes.clone()),
                    })
                    .await?;
            }
            None => {
                registry.reserve(&app.prefix, app.name.clone()).await?;
            }
        }
    }

    for assignment in &bootstrap.assignments {
        rbac.assign_roles(&assignment.user_id, &assignment.roles)?;
    }

    tracing::info!(
        applications = bootstrap.applications.len(),
        roles = rbac.list_roles().len(),
        assignments = bootstrap.assignments.len(),
        "Bootstrap records loaded"
    );
    Ok(())
}
