//! Supplier ledger HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::supplier::{
    AddPaymentInput, CreateSupplierInput, Supplier, SupplierPayment, SupplierReturnEntry,
    SupplierService, UpdateSupplierInput,
};
use crate::AppState;
use shared::Branch;

/// List suppliers
pub async fn list_suppliers(
    State(state): State<AppState>,
    Path(branch): Path<Branch>,
) -> AppResult<Json<Vec<Supplier>>> {
    let suppliers = SupplierService::new(state.db.clone()).list(branch).await?;
    Ok(Json(suppliers))
}

/// Create a supplier
pub async fn create_supplier(
    State(state): State<AppState>,
    Path(branch): Path<Branch>,
    Json(input): Json<CreateSupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    let supplier = SupplierService::new(state.db.clone())
        .create(branch, input)
        .await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// Get a supplier
pub async fn get_supplier(
    State(state): State<AppState>,
    Path((branch, supplier_id)): Path<(Branch, Uuid)>,
) -> AppResult<Json<Supplier>> {
    let supplier = SupplierService::new(state.db.clone())
        .get(branch, supplier_id)
        .await?;
    Ok(Json(supplier))
}

/// Update supplier contact details
pub async fn update_supplier(
    State(state): State<AppState>,
    Path((branch, supplier_id)): Path<(Branch, Uuid)>,
    Json(input): Json<UpdateSupplierInput>,
) -> AppResult<Json<Supplier>> {
    let supplier = SupplierService::new(state.db.clone())
        .update(branch, supplier_id, input)
        .await?;
    Ok(Json(supplier))
}

/// Delete a supplier
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path((branch, supplier_id)): Path<(Branch, Uuid)>,
) -> AppResult<StatusCode> {
    SupplierService::new(state.db.clone())
        .delete(branch, supplier_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Recompute the supplier's financial aggregate from purchase history
pub async fn recalculate_supplier(
    State(state): State<AppState>,
    Path((branch, supplier_id)): Path<(Branch, Uuid)>,
) -> AppResult<Json<Supplier>> {
    let supplier = SupplierService::new(state.db.clone())
        .recalc_for_supplier(branch, supplier_id)
        .await?;
    Ok(Json(supplier))
}

/// Record a payment to a supplier
pub async fn add_supplier_payment(
    State(state): State<AppState>,
    Path((branch, supplier_id)): Path<(Branch, Uuid)>,
    Json(input): Json<AddPaymentInput>,
) -> AppResult<(StatusCode, Json<SupplierPayment>)> {
    let payment = SupplierService::new(state.db.clone())
        .add_payment(branch, supplier_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Payment history
pub async fn list_supplier_payments(
    State(state): State<AppState>,
    Path((branch, supplier_id)): Path<(Branch, Uuid)>,
) -> AppResult<Json<Vec<SupplierPayment>>> {
    let payments = SupplierService::new(state.db.clone())
        .list_payments(branch, supplier_id)
        .await?;
    Ok(Json(payments))
}

/// Returns history
pub async fn list_supplier_returns(
    State(state): State<AppState>,
    Path((branch, supplier_id)): Path<(Branch, Uuid)>,
) -> AppResult<Json<Vec<SupplierReturnEntry>>> {
    let returns = SupplierService::new(state.db.clone())
        .list_returns(branch, supplier_id)
        .await?;
    Ok(Json(returns))
}
