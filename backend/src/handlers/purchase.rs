//! Purchase history HTTP handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::purchase::{PurchaseFilter, PurchaseRecord, PurchaseService};
use crate::AppState;
use shared::{Branch, PaginatedResponse};

/// Filtered purchase history
pub async fn list_purchases(
    State(state): State<AppState>,
    Path(branch): Path<Branch>,
    Query(filter): Query<PurchaseFilter>,
) -> AppResult<Json<PaginatedResponse<PurchaseRecord>>> {
    let page = PurchaseService::new(state.db.clone())
        .list(branch, filter)
        .await?;
    Ok(Json(page))
}

/// The purchase record mirroring one lot
pub async fn get_purchase_for_lot(
    State(state): State<AppState>,
    Path((branch, lot_id)): Path<(Branch, Uuid)>,
) -> AppResult<Json<PurchaseRecord>> {
    let record = PurchaseService::new(state.db.clone())
        .get_for_lot(lot_id)
        .await?
        .filter(|r| r.branch == branch.as_str())
        .ok_or_else(|| AppError::NotFound("Purchase record".to_string()))?;
    Ok(Json(record))
}
