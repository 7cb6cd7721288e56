//! Per-medicine inventory aggregate (the stock count point-of-sale reads)
//!
//! The aggregate is denormalized and best-effort: intended to track the sum
//! of approved lot units for the medicine, but drift is possible because no
//! transaction spans the lot write and this projection. Two rules keep it
//! sane: every mutation is a single atomic clamped statement (stock never
//! goes negative, even under concurrent writers), and
//! `recompute_for_medicine` rebuilds the count from approved lots on demand.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{normalize_invoice, Branch};

/// Inventory projection service
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Aggregate stock row for one medicine
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryItem {
    pub id: Uuid,
    pub branch: String,
    pub medicine_name: String,
    pub stock: i64,
    pub unit_price: Option<Decimal>,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_id: Option<Uuid>,
    pub invoice_number: String,
    pub invoice_key: String,
    pub updated_at: DateTime<Utc>,
}

/// Best-effort metadata carried alongside a stock adjustment.
/// Last write wins; none of these fields are authoritative.
#[derive(Debug, Clone, Default)]
pub struct StockMetadata {
    pub unit_price: Option<Decimal>,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_id: Option<Uuid>,
    pub invoice_number: Option<String>,
}

const INVENTORY_COLUMNS: &str = "id, branch, medicine_name, stock, unit_price, expiry_date, \
     supplier_id, invoice_number, invoice_key, updated_at";

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Apply a clamped stock delta, creating the row on first reference.
    ///
    /// Lookup priority: the invoice key first (precise, survives several
    /// lots sharing one medicine name), then the medicine name. A name-only
    /// adjustment is refused when more than one lot carries the name, so a
    /// blind fallback cannot misattribute units.
    pub async fn increment_clamped(
        &self,
        branch: Branch,
        medicine_name: &str,
        invoice: Option<&str>,
        delta: i64,
        meta: &StockMetadata,
    ) -> AppResult<i64> {
        if let Some(raw) = invoice.map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(stock) = self.adjust_by_invoice(branch, raw, delta, meta).await? {
                return Ok(stock);
            }
        }

        let lot_count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM stock_lots
            WHERE branch = $1 AND medicine_name = $2 AND status = 'approved'
            "#,
        )
        .bind(branch.as_str())
        .bind(medicine_name)
        .fetch_one(&self.db)
        .await?;

        if lot_count > 1 {
            return Err(AppError::AmbiguousInventoryTarget(format!(
                "{} approved lots share the name '{}'; refusing name-only adjustment",
                lot_count, medicine_name
            )));
        }

        self.upsert_by_name(branch, medicine_name, delta, meta).await
    }

    /// Invoice-keyed adjustment. Returns `None` on miss so the caller can
    /// fall back to the name key.
    async fn adjust_by_invoice(
        &self,
        branch: Branch,
        raw_invoice: &str,
        delta: i64,
        meta: &StockMetadata,
    ) -> AppResult<Option<i64>> {
        let key = normalize_invoice(raw_invoice);

        let stock = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE inventory
            SET stock = GREATEST(0, stock + $4),
                unit_price = COALESCE($5, unit_price),
                expiry_date = COALESCE($6, expiry_date),
                supplier_id = COALESCE($7, supplier_id),
                updated_at = now()
            WHERE id = (
                SELECT id FROM inventory
                WHERE branch = $1 AND (invoice_number = $2 OR invoice_key = $3 OR invoice_number = $3)
                ORDER BY updated_at DESC
                LIMIT 1
            )
            RETURNING stock
            "#,
        )
        .bind(branch.as_str())
        .bind(raw_invoice)
        .bind(&key)
        .bind(delta)
        .bind(meta.unit_price)
        .bind(meta.expiry_date)
        .bind(meta.supplier_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(stock)
    }

    /// Name-keyed clamped upsert, lazily creating the aggregate row.
    async fn upsert_by_name(
        &self,
        branch: Branch,
        medicine_name: &str,
        delta: i64,
        meta: &StockMetadata,
    ) -> AppResult<i64> {
        let raw = meta.invoice_number.clone().unwrap_or_default();
        let key = normalize_invoice(&raw);

        let stock = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO inventory
                (branch, medicine_name, stock, unit_price, expiry_date, supplier_id,
                 invoice_number, invoice_key)
            VALUES ($1, $2, GREATEST(0, $3), $4, $5, $6, $7, $8)
            ON CONFLICT (branch, medicine_name) DO UPDATE
            SET stock = GREATEST(0, inventory.stock + $3),
                unit_price = COALESCE($4, inventory.unit_price),
                expiry_date = COALESCE($5, inventory.expiry_date),
                supplier_id = COALESCE($6, inventory.supplier_id),
                invoice_number = CASE WHEN $7 = '' THEN inventory.invoice_number ELSE $7 END,
                invoice_key = CASE WHEN $8 = '' THEN inventory.invoice_key ELSE $8 END,
                updated_at = now()
            RETURNING stock
            "#,
        )
        .bind(branch.as_str())
        .bind(medicine_name)
        .bind(delta)
        .bind(meta.unit_price)
        .bind(meta.expiry_date)
        .bind(meta.supplier_id)
        .bind(&raw)
        .bind(&key)
        .fetch_one(&self.db)
        .await?;

        Ok(stock)
    }

    /// Rebuild a medicine's aggregate from the sum of its approved lots.
    /// Idempotent; the on-demand repair for projection drift.
    pub async fn recompute_for_medicine(
        &self,
        branch: Branch,
        medicine_name: &str,
    ) -> AppResult<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(total_units), 0)::BIGINT FROM stock_lots
            WHERE branch = $1 AND medicine_name = $2 AND status = 'approved'
            "#,
        )
        .bind(branch.as_str())
        .bind(medicine_name)
        .fetch_one(&self.db)
        .await?;

        let stock = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO inventory (branch, medicine_name, stock)
            VALUES ($1, $2, $3)
            ON CONFLICT (branch, medicine_name) DO UPDATE
            SET stock = $3, updated_at = now()
            RETURNING stock
            "#,
        )
        .bind(branch.as_str())
        .bind(medicine_name)
        .bind(total.max(0))
        .fetch_one(&self.db)
        .await?;

        Ok(stock)
    }

    /// Get one medicine's aggregate
    pub async fn get(&self, branch: Branch, medicine_name: &str) -> AppResult<InventoryItem> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE branch = $1 AND medicine_name = $2"
        ))
        .bind(branch.as_str())
        .bind(medicine_name)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))
    }

    /// List the branch's aggregates
    pub async fn list(&self, branch: Branch) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE branch = $1 ORDER BY medicine_name"
        ))
        .bind(branch.as_str())
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }
}
