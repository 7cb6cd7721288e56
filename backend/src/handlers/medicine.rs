//! Medicine registry HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::medicine::{CreateMedicineInput, Medicine, MedicineService};
use crate::AppState;
use shared::Branch;

/// List medicines for a branch
pub async fn list_medicines(
    State(state): State<AppState>,
    Path(branch): Path<Branch>,
) -> AppResult<Json<Vec<Medicine>>> {
    let medicines = MedicineService::new(state.db.clone()).list(branch).await?;
    Ok(Json(medicines))
}

/// Register a medicine
pub async fn create_medicine(
    State(state): State<AppState>,
    Path(branch): Path<Branch>,
    Json(input): Json<CreateMedicineInput>,
) -> AppResult<(StatusCode, Json<Medicine>)> {
    let medicine = MedicineService::new(state.db.clone())
        .create(branch, input)
        .await?;
    Ok((StatusCode::CREATED, Json(medicine)))
}

/// Get a medicine by id
pub async fn get_medicine(
    State(state): State<AppState>,
    Path((branch, medicine_id)): Path<(Branch, Uuid)>,
) -> AppResult<Json<Medicine>> {
    let medicine = MedicineService::new(state.db.clone())
        .get(branch, medicine_id)
        .await?;
    Ok(Json(medicine))
}
