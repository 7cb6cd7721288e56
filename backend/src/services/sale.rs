//! Point-of-sale recording
//!
//! A sale depletes approved lots oldest-expiry-first at each lot's fixed
//! `unit_sale_price`. The sale and its lines are the primary records; the
//! lot counters, inventory aggregate, and the daily/monthly revenue
//! summaries follow best-effort afterwards.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditService;
use crate::services::inventory::{InventoryService, StockMetadata};
use crate::services::stock_lot::StockLotService;
use shared::{Branch, PaginatedResponse, Pagination, PaginationMeta};

/// Sale recording service
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
}

/// A recorded sale
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Sale {
    pub id: Uuid,
    pub branch: String,
    pub total_amount: Decimal,
    pub sold_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One depleted line of a sale
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleLine {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub lot_id: Uuid,
    pub medicine_name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

/// A sale with its lines
#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
}

/// Requested sale line: medicine and unit quantity
#[derive(Debug, Deserialize)]
pub struct SaleLineInput {
    pub medicine_name: String,
    pub quantity: i64,
}

/// Input for recording a sale
#[derive(Debug, Deserialize)]
pub struct RecordSaleInput {
    pub lines: Vec<SaleLineInput>,
}

/// Filters for listing sales
#[derive(Debug, Default, Deserialize)]
pub struct SaleFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Lot slice an input line resolved to
struct Allocation {
    lot_id: Uuid,
    medicine_name: String,
    invoice_number: String,
    quantity: i64,
    unit_price: Decimal,
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a sale.
    ///
    /// Allocation runs against approved lots before anything is written;
    /// a line that cannot be covered fails the whole sale with
    /// `InsufficientInventory` and no mutation. After the sale rows are
    /// inserted, lot depletion, the inventory debit, and the revenue
    /// summaries are applied best-effort.
    pub async fn record_sale(&self, branch: Branch, input: RecordSaleInput) -> AppResult<SaleDetail> {
        if input.lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "A sale needs at least one line".to_string(),
            });
        }

        // Units already claimed by earlier lines of this sale, so a request
        // repeating one medicine cannot allocate the same stock twice.
        let mut taken: HashMap<Uuid, i64> = HashMap::new();
        let mut allocations = Vec::new();
        for line in &input.lines {
            if line.quantity <= 0 {
                return Err(AppError::Validation {
                    field: "quantity".to_string(),
                    message: "Line quantity must be positive".to_string(),
                });
            }
            allocations.extend(self.allocate_line(branch, line, &mut taken).await?);
        }

        let total: Decimal = allocations
            .iter()
            .map(|a| a.unit_price * Decimal::from(a.quantity))
            .sum();

        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (branch, total_amount)
            VALUES ($1, $2)
            RETURNING id, branch, total_amount, sold_at, created_at
            "#,
        )
        .bind(branch.as_str())
        .bind(total)
        .fetch_one(&self.db)
        .await?;

        let mut lines = Vec::with_capacity(allocations.len());
        for alloc in &allocations {
            let line = sqlx::query_as::<_, SaleLine>(
                r#"
                INSERT INTO sale_lines (sale_id, lot_id, medicine_name, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, sale_id, lot_id, medicine_name, quantity, unit_price
                "#,
            )
            .bind(sale.id)
            .bind(alloc.lot_id)
            .bind(&alloc.medicine_name)
            .bind(alloc.quantity)
            .bind(alloc.unit_price)
            .fetch_one(&self.db)
            .await?;
            lines.push(line);
        }

        self.deplete(branch, &allocations).await;
        self.bump_summaries(branch, sale.sold_at.date_naive(), total, 1).await;

        AuditService::new(self.db.clone()).log(
            branch,
            "sale.recorded",
            "sale",
            Some(sale.id),
            serde_json::json!({ "total_amount": sale.total_amount, "lines": lines.len() }),
        );

        Ok(SaleDetail { sale, lines })
    }

    /// Resolve one requested line to lot slices, earliest expiry first
    /// (NULL expiry last), oldest lot breaking ties. `taken` tracks units
    /// claimed by earlier lines and is updated with this line's slices.
    async fn allocate_line(
        &self,
        branch: Branch,
        line: &SaleLineInput,
        taken: &mut HashMap<Uuid, i64>,
    ) -> AppResult<Vec<Allocation>> {
        let lots = sqlx::query_as::<_, (Uuid, String, i64, Decimal)>(
            r#"
            SELECT id, invoice_number, total_units, unit_sale_price
            FROM stock_lots
            WHERE branch = $1 AND medicine_name = $2 AND status = 'approved' AND total_units > 0
            ORDER BY expiry_date ASC NULLS LAST, created_at ASC
            "#,
        )
        .bind(branch.as_str())
        .bind(line.medicine_name.trim())
        .fetch_all(&self.db)
        .await?;

        let available: i64 = lots
            .iter()
            .map(|(id, _, units, _)| (units - taken.get(id).copied().unwrap_or(0)).max(0))
            .sum();
        if available < line.quantity {
            return Err(AppError::InsufficientInventory(format!(
                "'{}': requested {} units, {} available",
                line.medicine_name.trim(),
                line.quantity,
                available
            )));
        }

        let mut remaining = line.quantity;
        let mut allocations = Vec::new();
        for (lot_id, invoice_number, units, unit_price) in lots {
            if remaining == 0 {
                break;
            }
            let free = (units - taken.get(&lot_id).copied().unwrap_or(0)).max(0);
            let take = remaining.min(free);
            if take == 0 {
                continue;
            }
            *taken.entry(lot_id).or_insert(0) += take;
            allocations.push(Allocation {
                lot_id,
                medicine_name: line.medicine_name.trim().to_string(),
                invoice_number,
                quantity: take,
                unit_price,
            });
            remaining -= take;
        }

        Ok(allocations)
    }

    /// Debit lots and the inventory aggregate for each allocation.
    /// Best-effort; both sides clamp at zero independently.
    async fn deplete(&self, branch: Branch, allocations: &[Allocation]) {
        let lots = StockLotService::new(self.db.clone());
        let inventory = InventoryService::new(self.db.clone());

        for alloc in allocations {
            if let Err(e) = lots
                .apply_unit_delta(branch, alloc.lot_id, -alloc.quantity)
                .await
            {
                tracing::warn!(lot_id = %alloc.lot_id, "lot depletion failed: {}", e);
            }

            let invoice = (!alloc.invoice_number.trim().is_empty())
                .then_some(alloc.invoice_number.as_str());
            if let Err(e) = inventory
                .increment_clamped(
                    branch,
                    &alloc.medicine_name,
                    invoice,
                    -alloc.quantity,
                    &StockMetadata::default(),
                )
                .await
            {
                tracing::warn!(lot_id = %alloc.lot_id, "inventory debit failed: {}", e);
            }
        }
    }

    /// Fold an amount into the daily and monthly revenue rows. Negative
    /// deltas (refunds) clamp at zero. `sale_count_delta` only moves on
    /// whole sales, not refunds.
    pub async fn bump_summaries(
        &self,
        branch: Branch,
        day: NaiveDate,
        amount: Decimal,
        sale_count_delta: i64,
    ) {
        let month_start = match day.with_day(1) {
            Some(d) => d,
            None => day,
        };

        for (period, start) in [("daily", day), ("monthly", month_start)] {
            let result = sqlx::query(
                r#"
                INSERT INTO sales_summary (branch, period, period_start, total_amount, sale_count)
                VALUES ($1, $2, $3, GREATEST(0, $4), GREATEST(0, $5))
                ON CONFLICT (branch, period, period_start) DO UPDATE
                SET total_amount = GREATEST(0, sales_summary.total_amount + $4),
                    sale_count = GREATEST(0, sales_summary.sale_count + $5)
                "#,
            )
            .bind(branch.as_str())
            .bind(period)
            .bind(start)
            .bind(amount)
            .bind(sale_count_delta)
            .execute(&self.db)
            .await;

            if let Err(e) = result {
                tracing::warn!(period, "sales summary update failed: {}", e);
            }
        }
    }

    /// Get a sale with its lines
    pub async fn get_sale(&self, branch: Branch, sale_id: Uuid) -> AppResult<SaleDetail> {
        let sale = sqlx::query_as::<_, Sale>(
            "SELECT id, branch, total_amount, sold_at, created_at FROM sales WHERE id = $1 AND branch = $2",
        )
        .bind(sale_id)
        .bind(branch.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let lines = sqlx::query_as::<_, SaleLine>(
            r#"
            SELECT id, sale_id, lot_id, medicine_name, quantity, unit_price
            FROM sale_lines
            WHERE sale_id = $1
            ORDER BY medicine_name
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.db)
        .await?;

        Ok(SaleDetail { sale, lines })
    }

    /// Paged sale listing, newest first
    pub async fn list_sales(
        &self,
        branch: Branch,
        filter: SaleFilter,
    ) -> AppResult<PaginatedResponse<Sale>> {
        let pagination = Pagination {
            page: filter.page.unwrap_or(1),
            per_page: filter.per_page.unwrap_or(20),
        };

        let where_clause = r#"
            WHERE branch = $1
              AND ($2::date IS NULL OR sold_at >= $2)
              AND ($3::date IS NULL OR sold_at < $3 + INTERVAL '1 day')
        "#;

        let total_items = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM sales {where_clause}"
        ))
        .bind(branch.as_str())
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.db)
        .await?;

        let sales = sqlx::query_as::<_, Sale>(&format!(
            r#"
            SELECT id, branch, total_amount, sold_at, created_at FROM sales
            {where_clause}
            ORDER BY sold_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(branch.as_str())
        .bind(filter.from)
        .bind(filter.to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: sales,
            pagination: PaginationMeta::new(&pagination, total_items.max(0) as u64),
        })
    }

    /// Revenue summaries for a branch and period kind
    pub async fn summaries(
        &self,
        branch: Branch,
        period: &str,
        limit: i64,
    ) -> AppResult<Vec<SalesSummaryRow>> {
        if period != "daily" && period != "monthly" {
            return Err(AppError::Validation {
                field: "period".to_string(),
                message: "Period must be 'daily' or 'monthly'".to_string(),
            });
        }

        let rows = sqlx::query_as::<_, SalesSummaryRow>(
            r#"
            SELECT id, branch, period, period_start, total_amount, sale_count
            FROM sales_summary
            WHERE branch = $1 AND period = $2
            ORDER BY period_start DESC
            LIMIT $3
            "#,
        )
        .bind(branch.as_str())
        .bind(period)
        .bind(limit.clamp(1, 366))
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }
}

/// One revenue aggregate row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SalesSummaryRow {
    pub id: Uuid,
    pub branch: String,
    pub period: String,
    pub period_start: NaiveDate,
    pub total_amount: Decimal,
    pub sale_count: i64,
}
