//! Stock lot HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::approval::{ApprovalService, ApproveOutcome};
use crate::services::stock_lot::{
    CreateLotInput, LotFilter, StockLot, StockLotService, UpdateLotInput,
};
use crate::AppState;
use shared::{Branch, PaginatedResponse};

/// Signed unit adjustment
#[derive(Debug, Deserialize)]
pub struct UnitDeltaInput {
    pub delta: i64,
}

/// Signed pack adjustment
#[derive(Debug, Deserialize)]
pub struct PackDeltaInput {
    pub delta: i32,
}

/// Loose units to add to an approved lot
#[derive(Debug, Deserialize)]
pub struct LooseUnitsInput {
    pub units: i64,
}

/// List lots, filtered and paged
pub async fn list_lots(
    State(state): State<AppState>,
    Path(branch): Path<Branch>,
    Query(filter): Query<LotFilter>,
) -> AppResult<Json<PaginatedResponse<StockLot>>> {
    let page = StockLotService::new(state.db.clone())
        .list(branch, filter)
        .await?;
    Ok(Json(page))
}

/// Add purchased stock as a pending lot
pub async fn create_lot(
    State(state): State<AppState>,
    Path(branch): Path<Branch>,
    Json(input): Json<CreateLotInput>,
) -> AppResult<(StatusCode, Json<StockLot>)> {
    let lot = StockLotService::new(state.db.clone())
        .create(branch, input)
        .await?;
    Ok((StatusCode::CREATED, Json(lot)))
}

/// Get a lot
pub async fn get_lot(
    State(state): State<AppState>,
    Path((branch, lot_id)): Path<(Branch, Uuid)>,
) -> AppResult<Json<StockLot>> {
    let lot = StockLotService::new(state.db.clone())
        .get(branch, lot_id)
        .await?;
    Ok(Json(lot))
}

/// Edit a lot
pub async fn update_lot(
    State(state): State<AppState>,
    Path((branch, lot_id)): Path<(Branch, Uuid)>,
    Json(input): Json<UpdateLotInput>,
) -> AppResult<Json<StockLot>> {
    let lot = StockLotService::new(state.db.clone())
        .update(branch, lot_id, input)
        .await?;
    Ok(Json(lot))
}

/// Delete a lot
pub async fn delete_lot(
    State(state): State<AppState>,
    Path((branch, lot_id)): Path<(Branch, Uuid)>,
) -> AppResult<StatusCode> {
    StockLotService::new(state.db.clone())
        .delete(branch, lot_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Approve a pending lot, merging on invoice match
pub async fn approve_lot(
    State(state): State<AppState>,
    Path((branch, lot_id)): Path<(Branch, Uuid)>,
) -> AppResult<Json<ApproveOutcome>> {
    let outcome = ApprovalService::new(state.db.clone())
        .approve(branch, lot_id)
        .await?;
    Ok(Json(outcome))
}

/// Reject a pending lot
pub async fn reject_lot(
    State(state): State<AppState>,
    Path((branch, lot_id)): Path<(Branch, Uuid)>,
) -> AppResult<Json<StockLot>> {
    let lot = ApprovalService::new(state.db.clone())
        .reject(branch, lot_id)
        .await?;
    Ok(Json(lot))
}

/// Adjust a lot's units by a signed delta
pub async fn adjust_units(
    State(state): State<AppState>,
    Path((branch, lot_id)): Path<(Branch, Uuid)>,
    Json(input): Json<UnitDeltaInput>,
) -> AppResult<Json<StockLot>> {
    let lot = StockLotService::new(state.db.clone())
        .adjust_units(branch, lot_id, input.delta)
        .await?;
    Ok(Json(lot))
}

/// Adjust a lot by whole packs
pub async fn adjust_packs(
    State(state): State<AppState>,
    Path((branch, lot_id)): Path<(Branch, Uuid)>,
    Json(input): Json<PackDeltaInput>,
) -> AppResult<Json<StockLot>> {
    let lot = StockLotService::new(state.db.clone())
        .adjust_packs(branch, lot_id, input.delta)
        .await?;
    Ok(Json(lot))
}

/// Add loose units to an approved lot
pub async fn add_loose_units(
    State(state): State<AppState>,
    Path((branch, lot_id)): Path<(Branch, Uuid)>,
    Json(input): Json<LooseUnitsInput>,
) -> AppResult<Json<StockLot>> {
    let lot = StockLotService::new(state.db.clone())
        .add_loose_units(branch, lot_id, input.units)
        .await?;
    Ok(Json(lot))
}
