//! Liveness and readiness endpoints.

use crate::api::AppState;
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready once the database answers; reports the ingestion cursor.
pub async fn ready(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let checkpoint = state
        .repo
        .get_checkpoint()
        .await
        .map_err(|e| AppError::Internal(format!("checkpoint query failed: {}", e)))?;
    Ok(Json(json!({
        "status": "ready",
        "checkpoint": checkpoint,
    })))
}
