use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};

use crate::shared::state::AppState;

pub fn configure() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "OK" }))
}
