use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::Tag;
use crate::error::{AppError, AppResult};
use crate::extractors::JsonBody;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TagRequest {
    #[serde(default)]
    pub name: String,
}

impl TagRequest {
    fn name(&self) -> AppResult<&str> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Tag name is required".into()));
        }
        Ok(&self.name)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{id}", get(get_tag).put(update_tag).delete(delete_tag))
        .route("/tags/name/{name}", get(get_tag_by_name))
}

async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Vec<Tag>>> {
    Ok(Json(state.tags.list()?))
}

async fn get_tag(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Tag>> {
    Ok(Json(state.tags.get_by_id(&id)?))
}

async fn get_tag_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Tag>> {
    Ok(Json(state.tags.get_by_name(&name)?))
}

async fn create_tag(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<TagRequest>,
) -> AppResult<(StatusCode, Json<Tag>)> {
    let tag = state.tags.create(request.name()?)?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<TagRequest>,
) -> AppResult<Json<Tag>> {
    Ok(Json(state.tags.update(&id, request.name()?)?))
}

async fn delete_tag(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    state.tags.delete(&id)?;
    Ok(Json(json!({ "message": "Tag deleted successfully" })))
}
