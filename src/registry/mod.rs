//! Application registry.
//!
//! # Responsibilities
//! - Map a unique prefix to a backend host
//! - Validate prefix shape, host well-formedness and uniqueness
//! - Serve exact-match prefix lookups on the request path
//! - Paginated listing for the admin API
//!
//! # Design Decisions
//! - One write lock per mutation: concurrent writers never observe a partial update
//! - Prefix index kept alongside the records so lookups stay O(1)
//! - Removing an application leaves role rules that mention its prefix untouched

pub mod application;
pub mod pagination;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{GatewayError, Result};

pub use application::{
    normalize_anonymous_routes, normalize_host, validate_prefix, Application, ApplicationSummary,
    ApplicationUpdate, NewApplication,
};
pub use pagination::{Items, Pages, Paginated};

/// Filters, sort order and page selection for [`ApplicationRegistry::list`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub name: Option<String>,
    pub prefix: Option<String>,
    pub host: Option<String>,
    /// Field name, `-` prefixed for descending (e.g. `-timeCreated`).
    pub sort: Option<String>,
    pub limit: Option<u64>,
    pub page: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortKey {
    Name,
    Prefix,
    Host,
    TimeCreated,
}

fn parse_sort(sort: Option<&str>) -> (SortKey, bool) {
    let Some(raw) = sort.map(str::trim).filter(|s| !s.is_empty()) else {
        return (SortKey::TimeCreated, false);
    };
    let (field, descending) = match raw.strip_prefix('-') {
        Some(field) => (field, true),
        None => (raw, false),
    };
    let key = match field {
        "name" => SortKey::Name,
        "prefix" => SortKey::Prefix,
        "host" => SortKey::Host,
        _ => SortKey::TimeCreated,
    };
    (key, descending)
}

fn compare(key: SortKey, a: &Application, b: &Application) -> Ordering {
    let primary = match key {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Prefix => a.prefix.cmp(&b.prefix),
        SortKey::Host => a.host.cmp(&b.host),
        SortKey::TimeCreated => a.time_created.cmp(&b.time_created),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[derive(Debug, Default)]
struct RegistryState {
    apps: HashMap<Uuid, Application>,
    by_prefix: HashMap<String, Uuid>,
}

impl RegistryState {
    fn ensure_unique(&self, prefix: Option<&str>, host: Option<&str>, except: Option<Uuid>) -> Result<()> {
        if let Some(prefix) = prefix {
            if let Some(owner) = self.by_prefix.get(prefix) {
                if Some(*owner) != except {
                    return Err(GatewayError::conflict(format!(
                        "prefix '{prefix}' is already registered"
                    )));
                }
            }
        }
        if let Some(host) = host {
            let taken = self
                .apps
                .values()
                .any(|app| app.host.as_deref() == Some(host) && Some(app.id) != except);
            if taken {
                return Err(GatewayError::conflict(format!("host '{host}' is already registered")));
            }
        }
        Ok(())
    }

    fn insert(&mut self, app: Application) {
        self.by_prefix.insert(app.prefix.clone(), app.id);
        self.apps.insert(app.id, app);
    }
}

/// Concurrent store of registered applications.
#[derive(Debug, Default)]
pub struct ApplicationRegistry {
    state: RwLock<RegistryState>,
    reserved_prefixes: HashSet<String>,
}

impl ApplicationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes that would shadow gateway-owned routes.
    pub fn with_reserved_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: RwLock::default(),
            reserved_prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    fn check_prefix(&self, prefix: &str) -> Result<()> {
        validate_prefix(prefix)?;
        if self.reserved_prefixes.contains(prefix) {
            return Err(GatewayError::validation(format!("prefix '{prefix}' is reserved")));
        }
        Ok(())
    }

    /// Register a new application under a unique prefix and host.
    pub async fn register(&self, new: NewApplication) -> Result<Application> {
        let prefix = new
            .prefix
            .ok_or_else(|| GatewayError::validation("prefix is required"))?;
        self.check_prefix(&prefix)?;
        let raw_host = new
            .host
            .ok_or_else(|| GatewayError::validation("host is required"))?;
        let host = normalize_host(&raw_host)?;

        let app = Application {
            id: Uuid::new_v4(),
            prefix,
            host: Some(host),
            name: new.name.filter(|name| !name.is_empty()),
            anonymous_routes: normalize_anonymous_routes(new.anonymous_routes.unwrap_or_default()),
            time_created: Utc::now(),
        };

        let mut state = self.state.write().await;
        state.ensure_unique(Some(&app.prefix), app.host.as_deref(), None)?;
        state.insert(app.clone());
        drop(state);

        tracing::info!(id = %app.id, prefix = %app.prefix, host = ?app.host, "Application registered");
        Ok(app)
    }

    /// Claim a prefix before its backend exists. Requests to it answer
    /// "undefined host" until a host is set through [`Self::update`].
    pub async fn reserve(&self, prefix: &str, name: Option<String>) -> Result<Application> {
        self.check_prefix(prefix)?;
        let app = Application {
            id: Uuid::new_v4(),
            prefix: prefix.to_string(),
            host: None,
            name: name.filter(|name| !name.is_empty()),
            anonymous_routes: Default::default(),
            time_created: Utc::now(),
        };

        let mut state = self.state.write().await;
        state.ensure_unique(Some(prefix), None, None)?;
        state.insert(app.clone());
        drop(state);

        tracing::info!(id = %app.id, prefix = %app.prefix, "Prefix reserved without host");
        Ok(app)
    }

    /// Exact prefix lookup.
    pub async fn find_by_prefix(&self, prefix: &str) -> Option<Application> {
        let state = self.state.read().await;
        state
            .by_prefix
            .get(prefix)
            .and_then(|id| state.apps.get(id))
            .cloned()
    }

    pub async fn get(&self, id: Uuid) -> Result<Application> {
        self.state
            .read()
            .await
            .apps
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("application not found"))
    }

    /// Apply a partial update, re-validating any changed prefix or host.
    pub async fn update(&self, id: Uuid, update: ApplicationUpdate) -> Result<Application> {
        if let Some(prefix) = &update.prefix {
            self.check_prefix(prefix)?;
        }
        let host = update.host.as_deref().map(normalize_host).transpose()?;

        let mut state = self.state.write().await;
        let current = state
            .apps
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("application not found"))?;
        state.ensure_unique(update.prefix.as_deref(), host.as_deref(), Some(id))?;

        let mut next = current.clone();
        if let Some(prefix) = update.prefix {
            next.prefix = prefix;
        }
        if host.is_some() {
            next.host = host;
        }
        if let Some(name) = update.name {
            next.name = Some(name).filter(|name| !name.is_empty());
        }
        if let Some(routes) = update.anonymous_routes {
            next.anonymous_routes = normalize_anonymous_routes(routes);
        }

        if next.prefix != current.prefix {
            state.by_prefix.remove(&current.prefix);
        }
        state.insert(next.clone());
        drop(state);

        tracing::info!(id = %id, prefix = %next.prefix, host = ?next.host, "Application updated");
        Ok(next)
    }

    /// Delete an application. Role rules naming its prefix are not touched.
    pub async fn remove(&self, id: Uuid) -> Result<Application> {
        let mut state = self.state.write().await;
        let app = state
            .apps
            .remove(&id)
            .ok_or_else(|| GatewayError::not_found("application not found"))?;
        state.by_prefix.remove(&app.prefix);
        drop(state);

        tracing::info!(id = %id, prefix = %app.prefix, "Application removed");
        Ok(app)
    }

    /// Filter, sort and paginate the registered applications.
    pub async fn list(&self, query: &ListQuery) -> Paginated<Application> {
        let (key, descending) = parse_sort(query.sort.as_deref());

        let mut matches: Vec<Application> = {
            let state = self.state.read().await;
            state
                .apps
                .values()
                .filter(|app| query.name.is_none() || app.name == query.name)
                .filter(|app| query.prefix.is_none() || query.prefix.as_deref() == Some(app.prefix.as_str()))
                .filter(|app| query.host.is_none() || app.host == query.host)
                .cloned()
                .collect()
        };

        matches.sort_by(|a, b| {
            let ordering = compare(key, a, b);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        Paginated::paginate(matches, query.page, query.limit)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.apps.len()
    }
}
