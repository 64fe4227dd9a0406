//! Health check and monitoring endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::json;

use crate::routes::{ErrorResponse, error_response};
use crate::server::AppState;

/// Health check endpoint handler.
///
/// Lightweight liveness probe for load balancers and orchestrators.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/ping`
/// - **Response**: `{"status":"pong"}`
pub async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "status": "pong" }))
}

/// Database health probe with pool statistics.
///
/// Runs a trivial query through the pool so a wedged database shows up as
/// a 503 here before it shows up as request failures elsewhere.
pub async fn db_health(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!("database health check failed: {e:#}");
        error_response(StatusCode::SERVICE_UNAVAILABLE, format!("database unavailable: {e}"))
    })?;

    let stats = state.db.stats();
    Ok(Json(json!({
        "status": "ok",
        "pool": stats,
    })))
}
