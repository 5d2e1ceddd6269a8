//! `/applications` handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::admin::extract::{parse_id, JsonBody, QueryParams};
use crate::error::Result;
use crate::http::server::AppState;
use crate::registry::{Application, ApplicationSummary, ApplicationUpdate, ListQuery, NewApplication, Paginated};

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

pub async fn list_applications(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Json<Paginated<Application>> {
    Json(state.registry.list(&query).await)
}

pub async fn register_application(
    State(state): State<AppState>,
    JsonBody(new): JsonBody<NewApplication>,
) -> Result<Json<ApplicationSummary>> {
    let app = state.registry.register(new).await?;
    Ok(Json(ApplicationSummary::from(&app)))
}

pub async fn get_application(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Application>> {
    let id = parse_id(&id)?;
    Ok(Json(state.registry.get(id).await?))
}

/// Uniqueness and shape failures surface as 403 here, unlike registration.
pub async fn update_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<ApplicationUpdate>,
) -> Result<Json<Application>> {
    let id = parse_id(&id)?;
    let app = state
        .registry
        .update(id, update)
        .await
        .map_err(|e| e.on_update())?;
    Ok(Json(app))
}

pub async fn delete_application(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Message>> {
    let id = parse_id(&id)?;
    let app = state.registry.remove(id).await?;
    Ok(Message::new(format!("application '{}' deleted", app.display_name())))
}
