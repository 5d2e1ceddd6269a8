//! RBAC evaluation engine and role/assignment store.
//!
//! # Responsibilities
//! - Decide whether `(user, resource, action)` is permitted
//! - Manage roles, their allow-rules and per-user role assignments
//! - Produce allowed-permission snapshots for diagnostics
//!
//! # Design Decisions
//! - Allow-only model: the absence of a matching allow is the only deny
//! - Each role and each user's assignment set is updated atomically (DashMap entry)
//! - Decisions are computed fresh from current state on every call
//! - The administrative role is a named constant checked at mutation boundaries

use std::collections::{BTreeMap, BTreeSet};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{GatewayError, Result};
use crate::rbac::matcher::ancestry;
use crate::rbac::role::{AllowRule, Role};

/// Role and assignment store with the authorization algorithm on top.
#[derive(Debug)]
pub struct RbacEngine {
    roles: DashMap<String, Role>,
    assignments: DashMap<String, BTreeSet<String>>,
    admin_role: String,
}

impl RbacEngine {
    /// Create an engine whose reserved administrative role is `admin_role`.
    pub fn new(admin_role: impl Into<String>) -> Self {
        Self {
            roles: DashMap::new(),
            assignments: DashMap::new(),
            admin_role: admin_role.into(),
        }
    }

    pub fn admin_role(&self) -> &str {
        &self.admin_role
    }

    fn role_not_found(name: &str) -> GatewayError {
        GatewayError::not_found(format!("role '{name}' not found"))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Decisions
    // ─────────────────────────────────────────────────────────────────────

    /// Authorization query. Unknown users hold no roles and are denied.
    pub fn is_allowed(&self, user_id: &str, resource: &str, action: &str) -> bool {
        let held = self.roles_of(user_id);
        let allowed = held.iter().any(|name| {
            self.roles
                .get(name)
                .is_some_and(|role| role.permits(resource, action))
        });

        tracing::debug!(
            user_id = %user_id,
            resource = %resource,
            action = %action,
            roles = ?held,
            allowed,
            "Authorization decision"
        );
        allowed
    }

    /// Permissions `user_id` holds on `resource` and each of its ancestors,
    /// keyed by the matched resource pattern.
    pub fn allowed_permissions(&self, user_id: &str, resource: &str) -> BTreeMap<String, BTreeSet<String>> {
        let held = self.roles_of(user_id);
        let mut snapshot: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for name in &held {
            let Some(role) = self.roles.get(name) else {
                continue;
            };
            for level in ancestry(resource) {
                if let Some(perms) = role.permissions_on(level) {
                    snapshot
                        .entry(level.to_string())
                        .or_default()
                        .extend(perms.iter().cloned());
                }
            }
        }
        snapshot
    }

    // ─────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────

    pub fn create_role(&self, name: &str, rules: Vec<AllowRule>) -> Result<Role> {
        if name.trim().is_empty() {
            return Err(GatewayError::validation("role name is required"));
        }

        match self.roles.entry(name.to_string()) {
            Entry::Occupied(_) => Err(GatewayError::conflict(format!("role '{name}' already exists"))),
            Entry::Vacant(slot) => {
                let mut role = Role::new(name);
                for rule in rules {
                    role.grant(&rule.resources, &rule.permissions);
                }
                let created = slot.insert(role).clone();
                tracing::info!(role = %name, resources = created.resources.len(), "Role created");
                Ok(created)
            }
        }
    }

    /// Union `permissions` into each of `resources` on an existing role.
    pub fn add_resources_to_role(&self, name: &str, resources: &[String], permissions: &[String]) -> Result<Role> {
        if resources.is_empty() || permissions.is_empty() {
            return Err(GatewayError::validation("resources and permissions are required"));
        }
        let mut role = self
            .roles
            .get_mut(name)
            .ok_or_else(|| Self::role_not_found(name))?;
        role.grant(resources, permissions);
        tracing::info!(role = %name, ?resources, ?permissions, "Resources granted to role");
        Ok(role.clone())
    }

    pub fn remove_resource_from_role(&self, name: &str, resource: &str) -> Result<Role> {
        let mut role = self
            .roles
            .get_mut(name)
            .ok_or_else(|| Self::role_not_found(name))?;
        if role.resources.remove(resource).is_none() {
            return Err(GatewayError::not_found(format!(
                "resource '{resource}' not found on role '{name}'"
            )));
        }
        tracing::info!(role = %name, resource = %resource, "Resource removed from role");
        Ok(role.clone())
    }

    /// Drop one permission; a resource left with no permissions is removed.
    pub fn remove_permission_from_resource(&self, name: &str, resource: &str, permission: &str) -> Result<Role> {
        let mut role = self
            .roles
            .get_mut(name)
            .ok_or_else(|| Self::role_not_found(name))?;
        let perms = role.resources.get_mut(resource).ok_or_else(|| {
            GatewayError::not_found(format!("resource '{resource}' not found on role '{name}'"))
        })?;
        if !perms.remove(&permission.to_lowercase()) {
            return Err(GatewayError::not_found(format!(
                "permission '{permission}' not found on resource '{resource}'"
            )));
        }
        if perms.is_empty() {
            role.resources.remove(resource);
        }
        tracing::info!(role = %name, resource = %resource, permission = %permission, "Permission removed");
        Ok(role.clone())
    }

    /// Delete a role and withdraw it from every user holding it.
    pub fn delete_role(&self, name: &str) -> Result<()> {
        if name == self.admin_role {
            return Err(GatewayError::validation(format!("'{name}' is a protected role")));
        }
        if self.roles.remove(name).is_none() {
            return Err(Self::role_not_found(name));
        }
        for mut held in self.assignments.iter_mut() {
            held.remove(name);
        }
        tracing::info!(role = %name, "Role deleted");
        Ok(())
    }

    pub fn role(&self, name: &str) -> Result<Role> {
        self.roles
            .get(name)
            .map(|role| role.clone())
            .ok_or_else(|| Self::role_not_found(name))
    }

    /// All roles, ordered by name.
    pub fn list_roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.roles.iter().map(|r| r.value().clone()).collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        roles
    }

    pub fn users_with_role(&self, name: &str) -> Result<Vec<String>> {
        if !self.roles.contains_key(name) {
            return Err(Self::role_not_found(name));
        }
        let mut users: Vec<String> = self
            .assignments
            .iter()
            .filter(|entry| entry.value().contains(name))
            .map(|entry| entry.key().clone())
            .collect();
        users.sort();
        Ok(users)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Assignments
    // ─────────────────────────────────────────────────────────────────────

    fn ensure_roles_exist(&self, names: &[String]) -> Result<()> {
        let unknown: Vec<&str> = names
            .iter()
            .filter(|name| !self.roles.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::validation(format!(
                "unknown role(s): {}",
                unknown.join(", ")
            )))
        }
    }

    /// Grant roles to a user. A single unknown name rejects the whole batch.
    pub fn assign_roles(&self, user_id: &str, names: &[String]) -> Result<Vec<String>> {
        if names.is_empty() {
            return Err(GatewayError::validation("roles are required"));
        }
        self.ensure_roles_exist(names)?;

        let held = {
            let mut entry = self.assignments.entry(user_id.to_string()).or_default();
            entry.extend(names.iter().cloned());
            entry.iter().cloned().collect()
        };
        tracing::info!(user_id = %user_id, roles = ?names, "Roles assigned");
        Ok(held)
    }

    /// Withdraw a role from a user. `caller` may not drop the admin role from itself.
    pub fn unassign_role(&self, caller: &str, user_id: &str, name: &str) -> Result<Vec<String>> {
        self.ensure_roles_exist(std::slice::from_ref(&name.to_string()))?;
        if name == self.admin_role && caller == user_id {
            return Err(GatewayError::forbidden(format!(
                "cannot remove the '{name}' role from yourself"
            )));
        }

        let held = match self.assignments.get_mut(user_id) {
            Some(mut entry) => {
                entry.remove(name);
                entry.iter().cloned().collect()
            }
            None => Vec::new(),
        };
        tracing::info!(user_id = %user_id, role = %name, caller = %caller, "Role unassigned");
        Ok(held)
    }

    /// Role names held by a user, ordered by name.
    pub fn roles_of(&self, user_id: &str) -> Vec<String> {
        self.assignments
            .get(user_id)
            .map(|held| held.iter().cloned().collect())
            .unwrap_or_default()
    }
}
