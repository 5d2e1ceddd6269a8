//! `/users` handlers: role assignment and permission lookup.

use std::collections::{BTreeMap, BTreeSet};

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::applications::Message;
use crate::admin::extract::{JsonBody, QueryParams};
use crate::auth::Identity;
use crate::error::{GatewayError, Result};
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoles {
    pub user_id: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionsQuery {
    pub resource: Option<String>,
}

pub async fn user_roles(State(state): State<AppState>, Path(user_id): Path<String>) -> Json<UserRoles> {
    let roles = state.rbac.roles_of(&user_id);
    Json(UserRoles { user_id, roles })
}

pub async fn assign_roles(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    JsonBody(request): JsonBody<AssignRequest>,
) -> Result<Json<Message>> {
    let roles = request
        .roles
        .ok_or_else(|| GatewayError::validation("roles must be an array of role names"))?;
    state.rbac.assign_roles(&user_id, &roles)?;
    Ok(Message::new(format!("roles assigned to '{user_id}'")))
}

pub async fn unassign_role(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path((user_id, role)): Path<(String, String)>,
) -> Result<Json<Message>> {
    state.rbac.unassign_role(&caller.user_id, &user_id, &role)?;
    Ok(Message::new(format!("role '{role}' removed from '{user_id}'")))
}

/// Permissions the user holds on `resource` and each of its ancestors.
pub async fn user_permissions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    QueryParams(query): QueryParams<PermissionsQuery>,
) -> Result<Json<BTreeMap<String, BTreeSet<String>>>> {
    let resource = query
        .resource
        .filter(|r| !r.is_empty())
        .ok_or_else(|| GatewayError::validation("resource is required"))?;
    Ok(Json(state.rbac.allowed_permissions(&user_id, &resource)))
}
