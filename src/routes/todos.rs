use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::Todo;
use crate::error::{AppError, AppResult};
use crate::extractors::JsonBody;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateTodoRequest {
    #[serde(default)]
    pub title: String,
}

#[derive(Deserialize)]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
}

fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid ID format".into()))
}

async fn list_todos(State(state): State<AppState>) -> AppResult<Json<Vec<Todo>>> {
    Ok(Json(state.todos.list()?))
}

async fn get_todo(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Todo>> {
    Ok(Json(state.todos.get(parse_id(&id)?)?))
}

async fn create_todo(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateTodoRequest>,
) -> AppResult<(StatusCode, Json<Todo>)> {
    if request.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".into()));
    }
    let todo = state.todos.create(&request.title)?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateTodoRequest>,
) -> AppResult<Json<Todo>> {
    let id = parse_id(&id)?;
    Ok(Json(state.todos.update(id, &request.title, request.completed)?))
}

async fn delete_todo(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    state.todos.delete(parse_id(&id)?)?;
    Ok(Json(json!({ "message": "Todo deleted successfully" })))
}
