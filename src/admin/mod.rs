//! Administrative API.
//!
//! # Responsibilities
//! - Application registry CRUD under `/applications`
//! - Role, resource and permission management under `/roles`
//! - Role assignment and permission lookup under `/users`
//!
//! Every route passes through [`admin_guard`], so the admin surface is
//! authorized by the same RBAC engine that guards proxied traffic.

pub mod applications;
pub mod extract;
pub mod roles;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get},
    Router,
};

use crate::auth::middleware::admin_guard;
use crate::http::server::AppState;

/// Top-level segments owned by the admin API.
pub const ADMIN_SURFACES: [&str; 3] = ["/applications", "/roles", "/users"];

pub fn setup_admin_router(state: AppState, max_body_size: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/applications",
            get(applications::list_applications).post(applications::register_application),
        )
        .route(
            "/applications/{id}",
            get(applications::get_application)
                .put(applications::update_application)
                .delete(applications::delete_application),
        )
        .route("/roles", get(roles::list_roles).post(roles::create_role))
        .route("/roles/{role}", get(roles::get_role).delete(roles::delete_role))
        .route("/roles/{role}/users", get(roles::role_users))
        .route(
            "/roles/{role}/resources",
            delete(roles::remove_resource).post(roles::add_resources),
        )
        .route("/roles/{role}/permissions", delete(roles::remove_permission))
        .route("/users/{id}/roles", get(users::user_roles).post(users::assign_roles))
        .route("/users/{id}/roles/{role}", delete(users::unassign_role))
        .route("/users/{id}/permissions", get(users::user_permissions))
        .route_layer(middleware::from_fn_with_state(state, admin_guard))
        .layer(DefaultBodyLimit::max(max_body_size))
}
