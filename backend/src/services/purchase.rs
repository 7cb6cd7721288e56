//! Purchase history mirror
//!
//! One append-mostly record per stock lot, upserted by lot id. Financial
//! fields are recomputed live from the lot at every upsert so the two
//! collections cannot quietly disagree. Records are never deleted: when a
//! lot is removed (or merged away on approval) its record survives,
//! pointing at a dead lot id. That orphan is the purchase history.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::stock_lot::StockLot;
use shared::{total_purchase_amount, Branch, LotStatus, PaginatedResponse, Pagination, PaginationMeta};

/// Purchase history service
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

/// Immutable purchase history record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseRecord {
    pub id: Uuid,
    pub branch: String,
    pub lot_id: Uuid,
    pub medicine_id: Uuid,
    pub medicine_name: String,
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub packs: i32,
    pub units_per_pack: i32,
    pub buy_price_per_pack: Decimal,
    pub sale_price_per_pack: Decimal,
    pub total_purchase_amount: Decimal,
    pub invoice_number: String,
    pub invoice_key: String,
    pub expiry_date: Option<NaiveDate>,
    pub status: String,
    pub purchase_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for listing purchase history
#[derive(Debug, Default, Deserialize)]
pub struct PurchaseFilter {
    pub supplier_id: Option<Uuid>,
    pub medicine: Option<String>,
    pub status: Option<LotStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PurchaseFilter {
    fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or(20),
        }
    }
}

const PURCHASE_COLUMNS: &str = "id, branch, lot_id, medicine_id, medicine_name, supplier_id, \
     supplier_name, packs, units_per_pack, buy_price_per_pack, sale_price_per_pack, \
     total_purchase_amount, invoice_number, invoice_key, expiry_date, status, purchase_date, \
     created_at, updated_at";

impl PurchaseService {
    /// Create a new PurchaseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Upsert the record for a lot, recomputing the purchase amount from
    /// the lot's current pack and price fields. Status mirrors the lot at
    /// this moment.
    pub async fn upsert_for_lot(&self, lot: &StockLot) -> AppResult<PurchaseRecord> {
        let amount = total_purchase_amount(lot.buy_price_per_pack, lot.packs);

        let record = sqlx::query_as::<_, PurchaseRecord>(&format!(
            r#"
            INSERT INTO purchase_records
                (branch, lot_id, medicine_id, medicine_name, supplier_id, supplier_name,
                 packs, units_per_pack, buy_price_per_pack, sale_price_per_pack,
                 total_purchase_amount, invoice_number, invoice_key, expiry_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (lot_id) DO UPDATE
            SET medicine_id = EXCLUDED.medicine_id,
                medicine_name = EXCLUDED.medicine_name,
                supplier_id = EXCLUDED.supplier_id,
                supplier_name = EXCLUDED.supplier_name,
                packs = EXCLUDED.packs,
                units_per_pack = EXCLUDED.units_per_pack,
                buy_price_per_pack = EXCLUDED.buy_price_per_pack,
                sale_price_per_pack = EXCLUDED.sale_price_per_pack,
                total_purchase_amount = EXCLUDED.total_purchase_amount,
                invoice_number = EXCLUDED.invoice_number,
                invoice_key = EXCLUDED.invoice_key,
                expiry_date = EXCLUDED.expiry_date,
                status = EXCLUDED.status,
                updated_at = now()
            RETURNING {PURCHASE_COLUMNS}
            "#
        ))
        .bind(&lot.branch)
        .bind(lot.id)
        .bind(lot.medicine_id)
        .bind(&lot.medicine_name)
        .bind(lot.supplier_id)
        .bind(&lot.supplier_name)
        .bind(lot.packs)
        .bind(lot.units_per_pack)
        .bind(lot.buy_price_per_pack)
        .bind(lot.sale_price_per_pack)
        .bind(amount)
        .bind(&lot.invoice_number)
        .bind(&lot.invoice_key)
        .bind(lot.expiry_date)
        .bind(&lot.status)
        .fetch_one(&self.db)
        .await?;

        Ok(record)
    }

    /// Mirror a lot status change onto the record. Returns the updated
    /// record so callers can fold the amount into the supplier ledger.
    pub async fn mark_status(
        &self,
        lot_id: Uuid,
        status: LotStatus,
    ) -> AppResult<Option<PurchaseRecord>> {
        let record = sqlx::query_as::<_, PurchaseRecord>(&format!(
            r#"
            UPDATE purchase_records
            SET status = $2, updated_at = now()
            WHERE lot_id = $1
            RETURNING {PURCHASE_COLUMNS}
            "#
        ))
        .bind(lot_id)
        .bind(status.as_str())
        .fetch_optional(&self.db)
        .await?;

        Ok(record)
    }

    /// Get the record for a lot
    pub async fn get_for_lot(&self, lot_id: Uuid) -> AppResult<Option<PurchaseRecord>> {
        let record = sqlx::query_as::<_, PurchaseRecord>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchase_records WHERE lot_id = $1"
        ))
        .bind(lot_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(record)
    }

    /// Filtered purchase history, newest first
    pub async fn list(
        &self,
        branch: Branch,
        filter: PurchaseFilter,
    ) -> AppResult<PaginatedResponse<PurchaseRecord>> {
        let pagination = filter.pagination();
        let status = filter.status.map(|s| s.as_str().to_string());
        let medicine = filter
            .medicine
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let where_clause = r#"
            WHERE branch = $1
              AND ($2::uuid IS NULL OR supplier_id = $2)
              AND ($3::text IS NULL OR medicine_name ILIKE '%' || $3 || '%')
              AND ($4::text IS NULL OR status = $4)
              AND ($5::date IS NULL OR purchase_date >= $5)
              AND ($6::date IS NULL OR purchase_date < $6 + INTERVAL '1 day')
        "#;

        let total_items = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM purchase_records {where_clause}"
        ))
        .bind(branch.as_str())
        .bind(filter.supplier_id)
        .bind(&medicine)
        .bind(&status)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.db)
        .await?;

        let records = sqlx::query_as::<_, PurchaseRecord>(&format!(
            r#"
            SELECT {PURCHASE_COLUMNS} FROM purchase_records
            {where_clause}
            ORDER BY purchase_date DESC, created_at DESC
            LIMIT $7 OFFSET $8
            "#
        ))
        .bind(branch.as_str())
        .bind(filter.supplier_id)
        .bind(&medicine)
        .bind(&status)
        .bind(filter.from)
        .bind(filter.to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: records,
            pagination: PaginationMeta::new(&pagination, total_items.max(0) as u64),
        })
    }
}
