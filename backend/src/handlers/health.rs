//! Health check handlers

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::AppState;

/// Liveness plus a database round trip
pub async fn health_check(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "database": "connected",
    })))
}
