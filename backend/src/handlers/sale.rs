//! Point-of-sale HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::sale::{
    RecordSaleInput, Sale, SaleDetail, SaleFilter, SaleService, SalesSummaryRow,
};
use crate::AppState;
use shared::{Branch, PaginatedResponse};

/// Summary period selector
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default = "default_period")]
    pub period: String,
    pub limit: Option<i64>,
}

fn default_period() -> String {
    "daily".to_string()
}

/// Record a sale
pub async fn record_sale(
    State(state): State<AppState>,
    Path(branch): Path<Branch>,
    Json(input): Json<RecordSaleInput>,
) -> AppResult<(StatusCode, Json<SaleDetail>)> {
    let sale = SaleService::new(state.db.clone())
        .record_sale(branch, input)
        .await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// List sales, newest first
pub async fn list_sales(
    State(state): State<AppState>,
    Path(branch): Path<Branch>,
    Query(filter): Query<SaleFilter>,
) -> AppResult<Json<PaginatedResponse<Sale>>> {
    let page = SaleService::new(state.db.clone())
        .list_sales(branch, filter)
        .await?;
    Ok(Json(page))
}

/// Get a sale with its lines
pub async fn get_sale(
    State(state): State<AppState>,
    Path((branch, sale_id)): Path<(Branch, Uuid)>,
) -> AppResult<Json<SaleDetail>> {
    let sale = SaleService::new(state.db.clone())
        .get_sale(branch, sale_id)
        .await?;
    Ok(Json(sale))
}

/// Daily or monthly revenue summaries
pub async fn sales_summaries(
    State(state): State<AppState>,
    Path(branch): Path<Branch>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<Vec<SalesSummaryRow>>> {
    let rows = SaleService::new(state.db.clone())
        .summaries(branch, &query.period, query.limit.unwrap_or(30))
        .await?;
    Ok(Json(rows))
}
