//! Health check handler

use axum::Json;
use serde_json::{json, Value};

/// `GET /health`: liveness only, no database required.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "ok": true }))
}
