//! Audit log HTTP handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::audit::{AuditEntry, AuditService};
use crate::AppState;
use shared::Branch;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

/// Most recent audit entries for a branch
pub async fn recent_audit(
    State(state): State<AppState>,
    Path(branch): Path<Branch>,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<Vec<AuditEntry>>> {
    let entries = AuditService::new(state.db.clone())
        .recent(branch, query.limit.unwrap_or(100))
        .await?;
    Ok(Json(entries))
}
