//! Roles and allow-rules.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};
use crate::rbac::matcher::ancestry;

/// Permission granting every action.
pub const WILDCARD: &str = "*";

/// A named set of allow-rules, keyed by resource pattern.
///
/// Grants merge into the existing sets; nothing is ever replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub resources: BTreeMap<String, BTreeSet<String>>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: BTreeMap::new(),
        }
    }

    /// Union `permissions` into every resource in `resources`.
    pub fn grant<R, P>(&mut self, resources: R, permissions: P)
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let permissions: BTreeSet<String> = permissions
            .into_iter()
            .map(|p| p.as_ref().to_lowercase())
            .collect();
        for resource in resources {
            self.resources
                .entry(resource.as_ref().to_string())
                .or_default()
                .extend(permissions.iter().cloned());
        }
    }

    /// Permissions held on exactly this resource pattern.
    pub fn permissions_on(&self, resource: &str) -> Option<&BTreeSet<String>> {
        self.resources.get(resource)
    }

    /// True if a rule on `resource` or one of its ancestors grants `action`.
    pub fn permits(&self, resource: &str, action: &str) -> bool {
        let action = action.to_lowercase();
        ancestry(resource).any(|level| {
            self.resources
                .get(level)
                .is_some_and(|perms| perms.contains(WILDCARD) || perms.contains(&action))
        })
    }

    /// Rules grouped as `{ resources, permissions }` pairs, one per resource.
    pub fn allow_rules(&self) -> Vec<AllowRule> {
        self.resources
            .iter()
            .map(|(resource, perms)| AllowRule {
                resources: vec![resource.clone()],
                permissions: perms.iter().cloned().collect(),
            })
            .collect()
    }
}

/// A validated `(resources, permissions)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllowRule {
    pub resources: Vec<String>,
    pub permissions: Vec<String>,
}

/// A single string or a list of strings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Unvalidated allow-rule as received from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllowRuleInput {
    pub resources: Option<OneOrMany>,
    pub permissions: Option<Vec<String>>,
}

impl AllowRuleInput {
    pub fn validate(self) -> Result<AllowRule> {
        let resources: Vec<String> = self
            .resources
            .ok_or_else(|| GatewayError::validation("allow rule requires resources"))?
            .into_vec()
            .into_iter()
            .filter(|r| !r.is_empty())
            .collect();
        if resources.is_empty() {
            return Err(GatewayError::validation("allow rule requires at least one resource"));
        }

        let permissions = self
            .permissions
            .ok_or_else(|| GatewayError::validation("allow rule requires a permissions array"))?;
        if permissions.is_empty() || permissions.iter().any(|p| p.trim().is_empty()) {
            return Err(GatewayError::validation(
                "permissions must be a non-empty array of names",
            ));
        }

        Ok(AllowRule {
            resources,
            permissions,
        })
    }
}

/// Role creation request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleDefinition {
    pub name: Option<String>,
    pub allows: Option<Vec<AllowRuleInput>>,
}

impl RoleDefinition {
    pub fn validate(self) -> Result<(String, Vec<AllowRule>)> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| GatewayError::validation("role name is required"))?;
        let rules = self
            .allows
            .ok_or_else(|| GatewayError::validation("allows is required"))?
            .into_iter()
            .map(AllowRuleInput::validate)
            .collect::<Result<Vec<_>>>()?;
        Ok((name, rules))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_merges_sets() {
        let mut role = Role::new("dev");
        role.grant(["app/a"], ["GET", "post"]);
        role.grant(["app/a", "app/b"], ["get", "delete"]);

        let perms: Vec<_> = role.permissions_on("app/a").unwrap().iter().cloned().collect();
        assert_eq!(perms, vec!["delete", "get", "post"]);
        assert_eq!(role.permissions_on("app/b").unwrap().len(), 2);
    }

    #[test]
    fn test_permits_descendants_and_wildcard() {
        let mut role = Role::new("dev");
        role.grant(["app/api"], ["get"]);
        role.grant(["other"], [WILDCARD]);

        assert!(role.permits("app/api", "GET"));
        assert!(role.permits("app/api/items/7", "get"));
        assert!(!role.permits("app/apix", "get"));
        assert!(!role.permits("app", "get"));
        assert!(!role.permits("app/api", "post"));
        assert!(role.permits("other/anything", "patch"));
    }

    #[test]
    fn test_definition_validation() {
        let def: RoleDefinition = serde_json::from_value(serde_json::json!({
            "name": "gleanerUser",
            "allows": [{ "resources": "gleaner/route1", "permissions": ["get"] }]
        }))
        .unwrap();
        let (name, rules) = def.validate().unwrap();
        assert_eq!(name, "gleanerUser");
        assert_eq!(rules[0].resources, vec!["gleaner/route1"]);

        let missing_perms: RoleDefinition = serde_json::from_value(serde_json::json!({
            "name": "x",
            "allows": [{ "resources": ["a"] }]
        }))
        .unwrap();
        assert!(matches!(missing_perms.validate(), Err(GatewayError::Validation(_))));

        let missing_name = RoleDefinition {
            name: None,
            allows: Some(vec![]),
        };
        assert!(missing_name.validate().is_err());
    }
}
