//! # ash-api Handlers
//!
//! Thin adapters between HTTP requests and the core services. Validation,
//! rate limiting and rating recomputation all happen in `ash-core`.

pub mod accounts;
pub mod analytics;
pub mod items;
pub mod limits;
pub mod reviews;

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "message": "ok", "data": { "status": "healthy" } }))
}
