use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub async fn welcome() -> Json<Value> {
    Json(json!({ "message": "Welcome to the inkpost API" }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "API is running properly",
    }))
}
