use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::{null_as_default, Author, Post, PostInput};
use crate::error::AppResult;
use crate::extractors::JsonBody;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreatePostRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub post: PostInput,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: Author,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/posts/slug/{slug}", get(get_post_by_slug))
}

async fn list_posts(State(state): State<AppState>) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(state.posts.list()?))
}

async fn get_post(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Post>> {
    Ok(Json(state.posts.get_by_id(&id)?))
}

async fn get_post_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<Post>> {
    Ok(Json(state.posts.get_by_slug(&slug)?))
}

async fn create_post(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<Post>)> {
    request.post.validate()?;
    let post = state.posts.create(&request.post, &request.author)?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<PostInput>,
) -> AppResult<Json<Post>> {
    input.validate()?;
    Ok(Json(state.posts.update(&id, &input)?))
}

async fn delete_post(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    state.posts.delete(&id)?;
    Ok(Json(json!({ "message": "Post deleted successfully" })))
}
