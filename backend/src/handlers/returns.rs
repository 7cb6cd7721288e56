//! Returns HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::AppResult;
use crate::services::returns::{
    CustomerReturn, CustomerReturnInput, ReturnService, SupplierReturnInput,
};
use crate::services::supplier::SupplierReturnEntry;
use crate::AppState;
use shared::Branch;

/// Process a customer return against a sale line
pub async fn customer_return(
    State(state): State<AppState>,
    Path(branch): Path<Branch>,
    Json(input): Json<CustomerReturnInput>,
) -> AppResult<(StatusCode, Json<CustomerReturn>)> {
    let record = ReturnService::new(state.db.clone())
        .customer_return(branch, input)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Return stock to its supplier
pub async fn supplier_return(
    State(state): State<AppState>,
    Path(branch): Path<Branch>,
    Json(input): Json<SupplierReturnInput>,
) -> AppResult<(StatusCode, Json<SupplierReturnEntry>)> {
    let entry = ReturnService::new(state.db.clone())
        .supplier_return(branch, input)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
