//! Stock lot store: purchased batches and their unit counters
//!
//! `total_units` is the authoritative remaining-unit counter. It starts as
//! `packs * units_per_pack` and from then on moves independently (sales,
//! returns, loose additions); `packs` is re-derived by floor division on
//! every unit change. Price-derived fields are recomputed only on explicit
//! edits, never by unit deltas.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditService;
use crate::services::inventory::{InventoryService, StockMetadata};
use crate::services::medicine::MedicineService;
use crate::services::purchase::PurchaseService;
use crate::services::supplier::SupplierService;
use shared::{
    normalize_invoice, profit_per_unit, unit_buy_price, unit_sale_price, Branch, LotStatus,
    PaginatedResponse, Pagination, PaginationMeta,
};

/// Stock lot service
#[derive(Clone)]
pub struct StockLotService {
    db: PgPool,
}

/// One purchased batch of a medicine
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockLot {
    pub id: Uuid,
    pub branch: String,
    pub medicine_id: Uuid,
    pub medicine_name: String,
    pub supplier_id: Uuid,
    pub supplier_name: String,
    /// Approximate pack count, re-derived as floor(total_units / units_per_pack)
    pub packs: i32,
    pub units_per_pack: i32,
    /// Authoritative remaining units, never negative
    pub total_units: i64,
    pub buy_price_per_pack: Decimal,
    pub unit_buy_price: Decimal,
    pub sale_price_per_pack: Decimal,
    pub unit_sale_price: Decimal,
    pub profit_per_unit: Decimal,
    pub invoice_number: String,
    pub invoice_key: String,
    pub expiry_date: Option<NaiveDate>,
    pub min_stock: i32,
    pub category: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockLot {
    pub fn status(&self) -> Option<LotStatus> {
        LotStatus::parse(&self.status)
    }

    /// Metadata patch for inventory sync, taken from this lot
    pub fn stock_metadata(&self) -> StockMetadata {
        StockMetadata {
            unit_price: Some(self.unit_sale_price),
            expiry_date: self.expiry_date,
            supplier_id: Some(self.supplier_id),
            invoice_number: Some(self.invoice_number.clone()),
        }
    }

    /// The raw invoice, if the lot carries one
    pub fn invoice(&self) -> Option<&str> {
        let trimmed = self.invoice_number.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Input for adding purchased stock
#[derive(Debug, Deserialize)]
pub struct CreateLotInput {
    pub medicine_name: String,
    pub category: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub packs: i32,
    pub units_per_pack: i32,
    pub buy_price_per_pack: Decimal,
    pub sale_price_per_pack: Decimal,
    pub invoice_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub min_stock: Option<i32>,
}

/// Input for editing a lot. Approved lots stay editable; price-derived
/// fields are recomputed here.
#[derive(Debug, Deserialize)]
pub struct UpdateLotInput {
    pub packs: Option<i32>,
    pub units_per_pack: Option<i32>,
    pub buy_price_per_pack: Option<Decimal>,
    pub sale_price_per_pack: Option<Decimal>,
    pub invoice_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub min_stock: Option<i32>,
    pub category: Option<String>,
}

/// Filters for listing lots
#[derive(Debug, Default, Deserialize)]
pub struct LotFilter {
    pub status: Option<LotStatus>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub(crate) const LOT_COLUMNS: &str = "id, branch, medicine_id, medicine_name, supplier_id, supplier_name, \
     packs, units_per_pack, total_units, buy_price_per_pack, unit_buy_price, \
     sale_price_per_pack, unit_sale_price, profit_per_unit, invoice_number, invoice_key, \
     expiry_date, min_stock, category, status, created_at, updated_at";

impl StockLotService {
    /// Create a new StockLotService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Add purchased stock as a pending lot.
    ///
    /// Resolves the medicine (find-or-create) and supplier (sentinel
    /// fallback), fixes the per-unit prices, and mirrors the lot into
    /// purchase history. The mirror write is best-effort: the lot is the
    /// primary record and stands even if the mirror insert fails.
    pub async fn create(&self, branch: Branch, input: CreateLotInput) -> AppResult<StockLot> {
        if input.packs <= 0 {
            return Err(AppError::Validation {
                field: "packs".to_string(),
                message: "Pack count must be positive".to_string(),
            });
        }
        if input.units_per_pack <= 0 {
            return Err(AppError::Validation {
                field: "units_per_pack".to_string(),
                message: "Units per pack must be positive".to_string(),
            });
        }
        if input.buy_price_per_pack <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "buy_price_per_pack".to_string(),
                message: "Buy price must be positive".to_string(),
            });
        }
        if input.sale_price_per_pack < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "sale_price_per_pack".to_string(),
                message: "Sale price cannot be negative".to_string(),
            });
        }

        let medicine = MedicineService::new(self.db.clone())
            .find_or_create(branch, &input.medicine_name, input.category.as_deref())
            .await?;
        let supplier = SupplierService::new(self.db.clone())
            .resolve(branch, input.supplier_id)
            .await?;

        let total_units = input.packs as i64 * input.units_per_pack as i64;
        let unit_buy = unit_buy_price(input.buy_price_per_pack, input.units_per_pack);
        let unit_sale = unit_sale_price(input.sale_price_per_pack, input.units_per_pack);
        let invoice_raw = input
            .invoice_number
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        let invoice_key = normalize_invoice(&invoice_raw);

        let lot = sqlx::query_as::<_, StockLot>(&format!(
            r#"
            INSERT INTO stock_lots
                (branch, medicine_id, medicine_name, supplier_id, supplier_name,
                 packs, units_per_pack, total_units, buy_price_per_pack, unit_buy_price,
                 sale_price_per_pack, unit_sale_price, profit_per_unit,
                 invoice_number, invoice_key, expiry_date, min_stock, category, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, 'pending')
            RETURNING {LOT_COLUMNS}
            "#
        ))
        .bind(branch.as_str())
        .bind(medicine.id)
        .bind(&medicine.name)
        .bind(supplier.id)
        .bind(&supplier.name)
        .bind(input.packs)
        .bind(input.units_per_pack)
        .bind(total_units)
        .bind(input.buy_price_per_pack)
        .bind(unit_buy)
        .bind(input.sale_price_per_pack)
        .bind(unit_sale)
        .bind(profit_per_unit(unit_sale, unit_buy))
        .bind(&invoice_raw)
        .bind(&invoice_key)
        .bind(input.expiry_date)
        .bind(input.min_stock.unwrap_or(0))
        .bind(&input.category)
        .fetch_one(&self.db)
        .await?;

        if let Err(e) = PurchaseService::new(self.db.clone()).upsert_for_lot(&lot).await {
            tracing::warn!(lot_id = %lot.id, "purchase mirror upsert failed: {}", e);
        }

        AuditService::new(self.db.clone()).log(
            branch,
            "stock_lot.created",
            "stock_lot",
            Some(lot.id),
            serde_json::json!({ "medicine": lot.medicine_name, "total_units": lot.total_units }),
        );

        Ok(lot)
    }

    /// Get a lot by id
    pub async fn get(&self, branch: Branch, lot_id: Uuid) -> AppResult<StockLot> {
        sqlx::query_as::<_, StockLot>(&format!(
            "SELECT {LOT_COLUMNS} FROM stock_lots WHERE id = $1 AND branch = $2"
        ))
        .bind(lot_id)
        .bind(branch.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock lot".to_string()))
    }

    /// Paged lot listing, filtered by status and free-text search over
    /// medicine, supplier, and invoice
    pub async fn list(
        &self,
        branch: Branch,
        filter: LotFilter,
    ) -> AppResult<PaginatedResponse<StockLot>> {
        let pagination = Pagination {
            page: filter.page.unwrap_or(1),
            per_page: filter.per_page.unwrap_or(20),
        };
        let status = filter.status.map(|s| s.as_str().to_string());
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let where_clause = r#"
            WHERE branch = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR medicine_name ILIKE '%' || $3 || '%'
                   OR supplier_name ILIKE '%' || $3 || '%'
                   OR invoice_number ILIKE '%' || $3 || '%')
        "#;

        let total_items = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM stock_lots {where_clause}"
        ))
        .bind(branch.as_str())
        .bind(&status)
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let lots = sqlx::query_as::<_, StockLot>(&format!(
            r#"
            SELECT {LOT_COLUMNS} FROM stock_lots
            {where_clause}
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(branch.as_str())
        .bind(&status)
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: lots,
            pagination: PaginationMeta::new(&pagination, total_items.max(0) as u64),
        })
    }

    /// Edit a lot. Changing packs or units_per_pack resets the unit counter
    /// to `packs * units_per_pack` (a stock correction); price edits
    /// recompute the per-unit fields. The purchase mirror is re-upserted
    /// best-effort so history follows the edit.
    pub async fn update(
        &self,
        branch: Branch,
        lot_id: Uuid,
        input: UpdateLotInput,
    ) -> AppResult<StockLot> {
        let existing = self.get(branch, lot_id).await?;

        let packs = input.packs.unwrap_or(existing.packs);
        let units_per_pack = input.units_per_pack.unwrap_or(existing.units_per_pack);
        if packs < 0 {
            return Err(AppError::Validation {
                field: "packs".to_string(),
                message: "Pack count cannot be negative".to_string(),
            });
        }
        if units_per_pack <= 0 {
            return Err(AppError::Validation {
                field: "units_per_pack".to_string(),
                message: "Units per pack must be positive".to_string(),
            });
        }

        let quantity_edited = input.packs.is_some() || input.units_per_pack.is_some();
        let total_units = if quantity_edited {
            packs as i64 * units_per_pack as i64
        } else {
            existing.total_units
        };

        let buy_price = input.buy_price_per_pack.unwrap_or(existing.buy_price_per_pack);
        let sale_price = input
            .sale_price_per_pack
            .unwrap_or(existing.sale_price_per_pack);
        if buy_price <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "buy_price_per_pack".to_string(),
                message: "Buy price must be positive".to_string(),
            });
        }

        let unit_buy = unit_buy_price(buy_price, units_per_pack);
        let unit_sale = unit_sale_price(sale_price, units_per_pack);

        let invoice_raw = match input.invoice_number.as_deref().map(str::trim) {
            Some(raw) => raw.to_string(),
            None => existing.invoice_number.clone(),
        };
        let invoice_key = normalize_invoice(&invoice_raw);

        let lot = sqlx::query_as::<_, StockLot>(&format!(
            r#"
            UPDATE stock_lots
            SET packs = $1, units_per_pack = $2, total_units = $3,
                buy_price_per_pack = $4, unit_buy_price = $5,
                sale_price_per_pack = $6, unit_sale_price = $7, profit_per_unit = $8,
                invoice_number = $9, invoice_key = $10,
                expiry_date = $11, min_stock = $12, category = $13, updated_at = now()
            WHERE id = $14
            RETURNING {LOT_COLUMNS}
            "#
        ))
        .bind(packs)
        .bind(units_per_pack)
        .bind(total_units)
        .bind(buy_price)
        .bind(unit_buy)
        .bind(sale_price)
        .bind(unit_sale)
        .bind(profit_per_unit(unit_sale, unit_buy))
        .bind(&invoice_raw)
        .bind(&invoice_key)
        .bind(input.expiry_date.or(existing.expiry_date))
        .bind(input.min_stock.unwrap_or(existing.min_stock))
        .bind(input.category.or(existing.category))
        .bind(lot_id)
        .fetch_one(&self.db)
        .await?;

        if let Err(e) = PurchaseService::new(self.db.clone()).upsert_for_lot(&lot).await {
            tracing::warn!(lot_id = %lot.id, "purchase mirror upsert failed: {}", e);
        }

        AuditService::new(self.db.clone()).log(
            branch,
            "stock_lot.updated",
            "stock_lot",
            Some(lot.id),
            serde_json::json!({ "medicine": lot.medicine_name }),
        );

        Ok(lot)
    }

    /// Delete a lot. An approved lot's remaining units are removed from the
    /// inventory aggregate (clamped, best-effort); the purchase record is
    /// deliberately left in place, orphaned, as history.
    pub async fn delete(&self, branch: Branch, lot_id: Uuid) -> AppResult<()> {
        let lot = self.get(branch, lot_id).await?;

        let result = sqlx::query("DELETE FROM stock_lots WHERE id = $1")
            .bind(lot_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Stock lot".to_string()));
        }

        if lot.status() == Some(LotStatus::Approved) && lot.total_units > 0 {
            let sync = InventoryService::new(self.db.clone())
                .increment_clamped(
                    branch,
                    &lot.medicine_name,
                    lot.invoice(),
                    -lot.total_units,
                    &lot.stock_metadata(),
                )
                .await;
            if let Err(e) = sync {
                tracing::warn!(lot_id = %lot_id, "inventory sync after lot delete failed: {}", e);
            }
        }

        AuditService::new(self.db.clone()).log(
            branch,
            "stock_lot.deleted",
            "stock_lot",
            Some(lot_id),
            serde_json::json!({ "medicine": lot.medicine_name, "units_removed": lot.total_units }),
        );

        Ok(())
    }

    /// Atomic clamped unit delta. One statement: the counter floors at zero
    /// and packs are re-derived by floor division in the same write, so
    /// concurrent callers cannot observe a negative count.
    pub async fn apply_unit_delta(
        &self,
        branch: Branch,
        lot_id: Uuid,
        delta: i64,
    ) -> AppResult<StockLot> {
        sqlx::query_as::<_, StockLot>(&format!(
            r#"
            UPDATE stock_lots
            SET total_units = GREATEST(0, total_units + $3),
                packs = (GREATEST(0, total_units + $3) / units_per_pack)::INT,
                updated_at = now()
            WHERE id = $1 AND branch = $2
            RETURNING {LOT_COLUMNS}
            "#
        ))
        .bind(lot_id)
        .bind(branch.as_str())
        .bind(delta)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock lot".to_string()))
    }

    /// Adjust a lot's units by a signed delta, syncing the aggregate for
    /// approved lots (best-effort, same requested delta; both sides clamp
    /// independently).
    pub async fn adjust_units(&self, branch: Branch, lot_id: Uuid, delta: i64) -> AppResult<StockLot> {
        if delta == 0 {
            return Err(AppError::Validation {
                field: "delta".to_string(),
                message: "Delta cannot be zero".to_string(),
            });
        }

        let lot = self.apply_unit_delta(branch, lot_id, delta).await?;
        self.sync_inventory_if_approved(branch, &lot, delta).await;

        AuditService::new(self.db.clone()).log(
            branch,
            "stock_lot.units_adjusted",
            "stock_lot",
            Some(lot.id),
            serde_json::json!({ "delta": delta, "total_units": lot.total_units }),
        );

        Ok(lot)
    }

    /// Adjust by whole packs: the delta is converted through the lot's
    /// conversion factor
    pub async fn adjust_packs(
        &self,
        branch: Branch,
        lot_id: Uuid,
        pack_delta: i32,
    ) -> AppResult<StockLot> {
        if pack_delta == 0 {
            return Err(AppError::Validation {
                field: "delta".to_string(),
                message: "Delta cannot be zero".to_string(),
            });
        }

        let existing = self.get(branch, lot_id).await?;
        let delta = pack_delta as i64 * existing.units_per_pack as i64;

        let lot = self.apply_unit_delta(branch, lot_id, delta).await?;
        self.sync_inventory_if_approved(branch, &lot, delta).await;

        AuditService::new(self.db.clone()).log(
            branch,
            "stock_lot.packs_adjusted",
            "stock_lot",
            Some(lot.id),
            serde_json::json!({ "pack_delta": pack_delta, "total_units": lot.total_units }),
        );

        Ok(lot)
    }

    /// Add loose (sub-pack) units to an approved lot
    pub async fn add_loose_units(
        &self,
        branch: Branch,
        lot_id: Uuid,
        units: i64,
    ) -> AppResult<StockLot> {
        if units <= 0 {
            return Err(AppError::Validation {
                field: "units".to_string(),
                message: "Unit count must be positive".to_string(),
            });
        }

        let existing = self.get(branch, lot_id).await?;
        if existing.status() != Some(LotStatus::Approved) {
            return Err(AppError::InvalidStateTransition(
                "Loose units can only be added to an approved lot".to_string(),
            ));
        }

        let lot = self.apply_unit_delta(branch, lot_id, units).await?;
        self.sync_inventory_if_approved(branch, &lot, units).await;

        AuditService::new(self.db.clone()).log(
            branch,
            "stock_lot.loose_units_added",
            "stock_lot",
            Some(lot.id),
            serde_json::json!({ "units": units, "total_units": lot.total_units }),
        );

        Ok(lot)
    }

    /// Best-effort inventory sync for approved lots. Failures are warnings;
    /// the lot mutation has already committed and stands.
    async fn sync_inventory_if_approved(&self, branch: Branch, lot: &StockLot, delta: i64) {
        if lot.status() != Some(LotStatus::Approved) {
            return;
        }
        let sync = InventoryService::new(self.db.clone())
            .increment_clamped(
                branch,
                &lot.medicine_name,
                lot.invoice(),
                delta,
                &lot.stock_metadata(),
            )
            .await;
        if let Err(e) = sync {
            tracing::warn!(lot_id = %lot.id, delta, "inventory sync failed: {}", e);
        }
    }
}
