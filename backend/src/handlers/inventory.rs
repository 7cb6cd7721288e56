//! Inventory aggregate HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppResult;
use crate::services::inventory::{InventoryItem, InventoryService};
use crate::AppState;
use shared::Branch;

/// List the branch's stock aggregates
pub async fn list_inventory(
    State(state): State<AppState>,
    Path(branch): Path<Branch>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let items = InventoryService::new(state.db.clone()).list(branch).await?;
    Ok(Json(items))
}

/// One medicine's aggregate
pub async fn get_inventory_item(
    State(state): State<AppState>,
    Path((branch, medicine_name)): Path<(Branch, String)>,
) -> AppResult<Json<InventoryItem>> {
    let item = InventoryService::new(state.db.clone())
        .get(branch, &medicine_name)
        .await?;
    Ok(Json(item))
}

/// Rebuild a medicine's aggregate from its approved lots
pub async fn recompute_inventory(
    State(state): State<AppState>,
    Path((branch, medicine_name)): Path<(Branch, String)>,
) -> AppResult<Json<serde_json::Value>> {
    let stock = InventoryService::new(state.db.clone())
        .recompute_for_medicine(branch, &medicine_name)
        .await?;
    Ok(Json(serde_json::json!({
        "medicine_name": medicine_name,
        "stock": stock,
    })))
}
