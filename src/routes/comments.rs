use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::{null_as_default, Author, Comment, CommentInput};
use crate::error::{AppError, AppResult};
use crate::extractors::JsonBody;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub post_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comment: CommentInput,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: Author,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", post(create_comment))
        .route("/comments/{id}", delete(delete_comment))
        .route("/comments/post/{post_id}", get(list_comments))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Json<Vec<Comment>>> {
    Ok(Json(state.comments.list_for_post(&post_id)?))
}

async fn create_comment(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    if request.post_id.is_empty() {
        return Err(AppError::BadRequest("Post ID is required".into()));
    }
    request.comment.validate()?;

    let comment = state
        .comments
        .create(&request.post_id, &request.comment, &request.author)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    state.comments.delete(&id)?;
    Ok(Json(json!({ "message": "Comment deleted successfully" })))
}
