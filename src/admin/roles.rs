//! `/roles` handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::applications::Message;
use crate::admin::extract::{JsonBody, QueryParams};
use crate::error::{GatewayError, Result};
use crate::http::server::AppState;
use crate::rbac::{AllowRule, AllowRuleInput, OneOrMany, Role, RoleDefinition};

/// Role as rendered by the admin API.
#[derive(Debug, Serialize)]
pub struct RoleView {
    pub name: String,
    pub allows: Vec<AllowRule>,
}

impl From<Role> for RoleView {
    fn from(role: Role) -> Self {
        Self {
            allows: role.allow_rules(),
            name: role.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub resources: Option<OneOrMany>,
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ResourceQuery {
    pub resource: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionQuery {
    pub resource: Option<String>,
    pub permission: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GatewayError::validation(format!("{field} is required")))
}

pub async fn list_roles(State(state): State<AppState>) -> Json<Vec<RoleView>> {
    Json(state.rbac.list_roles().into_iter().map(RoleView::from).collect())
}

pub async fn create_role(
    State(state): State<AppState>,
    JsonBody(definition): JsonBody<RoleDefinition>,
) -> Result<Json<RoleView>> {
    let (name, rules) = definition.validate()?;
    let role = state.rbac.create_role(&name, rules)?;
    Ok(Json(role.into()))
}

pub async fn get_role(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<RoleView>> {
    Ok(Json(state.rbac.role(&name)?.into()))
}

pub async fn delete_role(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Message>> {
    state.rbac.delete_role(&name)?;
    Ok(Message::new(format!("role '{name}' deleted")))
}

pub async fn role_users(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.rbac.users_with_role(&name)?))
}

pub async fn add_resources(
    State(state): State<AppState>,
    Path(name): Path<String>,
    JsonBody(grant): JsonBody<GrantRequest>,
) -> Result<Json<RoleView>> {
    let rule = AllowRuleInput {
        resources: grant.resources,
        permissions: grant.permissions,
    }
    .validate()?;
    let role = state
        .rbac
        .add_resources_to_role(&name, &rule.resources, &rule.permissions)?;
    Ok(Json(role.into()))
}

pub async fn remove_resource(
    State(state): State<AppState>,
    Path(name): Path<String>,
    QueryParams(query): QueryParams<ResourceQuery>,
) -> Result<Json<RoleView>> {
    let resource = required(query.resource, "resource")?;
    Ok(Json(state.rbac.remove_resource_from_role(&name, &resource)?.into()))
}

pub async fn remove_permission(
    State(state): State<AppState>,
    Path(name): Path<String>,
    QueryParams(query): QueryParams<PermissionQuery>,
) -> Result<Json<RoleView>> {
    let resource = required(query.resource, "resource")?;
    let permission = required(query.permission, "permission")?;
    let role = state
        .rbac
        .remove_permission_from_resource(&name, &resource, &permission)?;
    Ok(Json(role.into()))
}
