//! Customer and supplier returns
//!
//! Customer returns put sold units back on the shelf and refund revenue;
//! supplier returns send purchased units back and log the credit against
//! the supplier without touching the payable balance. Both clamp every
//! counter they touch at zero and treat everything beyond the primary
//! return row as best-effort.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditService;
use crate::services::inventory::{InventoryService, StockMetadata};
use crate::services::purchase::PurchaseService;
use crate::services::sale::SaleService;
use crate::services::stock_lot::{StockLot, StockLotService, LOT_COLUMNS};
use crate::services::supplier::{SupplierReturnEntry, SupplierService};
use shared::{invoice_matches, Branch};

/// Returns processing service
#[derive(Clone)]
pub struct ReturnService {
    db: PgPool,
}

/// Input for a customer return against a sale line
#[derive(Debug, Deserialize)]
pub struct CustomerReturnInput {
    pub sale_id: Uuid,
    pub sale_line_id: Uuid,
    pub quantity: i64,
}

/// A recorded customer return
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CustomerReturn {
    pub id: Uuid,
    pub branch: String,
    pub sale_id: Uuid,
    pub sale_line_id: Uuid,
    pub lot_id: Uuid,
    pub quantity: i64,
    pub refund_amount: Decimal,
    pub returned_at: DateTime<Utc>,
}

/// Input for returning stock to a supplier
#[derive(Debug, Deserialize)]
pub struct SupplierReturnInput {
    pub medicine_name: String,
    pub quantity: i64,
    pub invoice_number: Option<String>,
}

impl ReturnService {
    /// Create a new ReturnService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Process a customer return.
    ///
    /// The requested quantity is clamped to what the line still carries, so
    /// repeated returns against one line can never refund more than was
    /// sold. The refund comes off the sale total and the revenue summaries;
    /// the units go back to the lot and the inventory aggregate.
    pub async fn customer_return(
        &self,
        branch: Branch,
        input: CustomerReturnInput,
    ) -> AppResult<CustomerReturn> {
        if input.quantity <= 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Return quantity must be positive".to_string(),
            });
        }

        let sale = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "SELECT id, sold_at FROM sales WHERE id = $1 AND branch = $2",
        )
        .bind(input.sale_id)
        .bind(branch.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        // Decrement the line and compute the refund in one conditional
        // statement: the clamp to the remaining quantity happens here, and a
        // line already at zero refuses the return.
        let line = sqlx::query_as::<_, (Uuid, Uuid, String, Decimal, i64)>(
            r#"
            UPDATE sale_lines AS line
            SET quantity = line.quantity - LEAST(line.quantity, $3)
            FROM sale_lines AS before
            WHERE line.id = before.id
              AND line.id = $1 AND line.sale_id = $2 AND line.quantity > 0
            RETURNING line.id, line.lot_id, line.medicine_name, line.unit_price,
                      LEAST(before.quantity, $3)
            "#,
        )
        .bind(input.sale_line_id)
        .bind(input.sale_id)
        .bind(input.quantity)
        .fetch_optional(&self.db)
        .await?;

        let (line_id, lot_id, medicine_name, unit_price, returned) = match line {
            Some(row) => row,
            None => {
                return Err(AppError::InvalidStateTransition(
                    "Sale line not found or already fully returned".to_string(),
                ))
            }
        };

        let refund = unit_price * Decimal::from(returned);

        // Primary record of the return.
        let record = sqlx::query_as::<_, CustomerReturn>(
            r#"
            INSERT INTO customer_returns (branch, sale_id, sale_line_id, lot_id, quantity, refund_amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, branch, sale_id, sale_line_id, lot_id, quantity, refund_amount, returned_at
            "#,
        )
        .bind(branch.as_str())
        .bind(input.sale_id)
        .bind(line_id)
        .bind(lot_id)
        .bind(returned)
        .bind(refund)
        .fetch_one(&self.db)
        .await?;

        // Units back on the shelf. The lot may have been deleted since the
        // sale; inventory still gets the credit, keyed by name.
        let lots = StockLotService::new(self.db.clone());
        let invoice = match lots.get(branch, lot_id).await {
            Ok(lot) => {
                if let Err(e) = lots.apply_unit_delta(branch, lot_id, returned).await {
                    tracing::warn!(lot_id = %lot_id, "lot credit on return failed: {}", e);
                }
                Some(lot.invoice_number)
            }
            Err(_) => None,
        };
        let sync = InventoryService::new(self.db.clone())
            .increment_clamped(
                branch,
                &medicine_name,
                invoice.as_deref().map(str::trim).filter(|s| !s.is_empty()),
                returned,
                &StockMetadata::default(),
            )
            .await;
        if let Err(e) = sync {
            tracing::warn!(lot_id = %lot_id, "inventory credit on return failed: {}", e);
        }

        // Revenue comes back out, clamped at zero on every counter.
        if let Err(e) = sqlx::query(
            "UPDATE sales SET total_amount = GREATEST(0, total_amount - $2) WHERE id = $1",
        )
        .bind(input.sale_id)
        .bind(refund)
        .execute(&self.db)
        .await
        {
            tracing::warn!(sale_id = %input.sale_id, "sale total refund failed: {}", e);
        }

        SaleService::new(self.db.clone())
            .bump_summaries(branch, sale.1.date_naive(), -refund, 0)
            .await;

        AuditService::new(self.db.clone()).log(
            branch,
            "return.customer",
            "customer_return",
            Some(record.id),
            serde_json::json!({
                "sale_id": input.sale_id,
                "medicine": medicine_name,
                "quantity": returned,
                "refund_amount": refund,
            }),
        );

        Ok(record)
    }

    /// Return stock to its supplier.
    ///
    /// The target is the most recently approved lot for the medicine; when
    /// an invoice is given only lots whose invoice matches (raw or
    /// normalized) qualify. The lot and the inventory aggregate are debited
    /// by the requested quantity, clamping at zero when it exceeds what is
    /// left. The credit is logged on the supplier's return ledger at the
    /// lot's buy price; the payable balance is deliberately left alone.
    pub async fn supplier_return(
        &self,
        branch: Branch,
        input: SupplierReturnInput,
    ) -> AppResult<SupplierReturnEntry> {
        if input.quantity <= 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Return quantity must be positive".to_string(),
            });
        }
        let medicine_name = input.medicine_name.trim();
        if medicine_name.is_empty() {
            return Err(AppError::Validation {
                field: "medicine_name".to_string(),
                message: "Medicine name cannot be empty".to_string(),
            });
        }

        let lot = self
            .find_return_lot(branch, medicine_name, input.invoice_number.as_deref())
            .await?;

        // The refund is priced on the requested quantity even when it
        // exceeds what the lot still holds; the unit counters clamp at zero
        // on their own.
        let refund = lot.unit_buy_price * Decimal::from(input.quantity);

        let purchase_id = match PurchaseService::new(self.db.clone()).get_for_lot(lot.id).await {
            Ok(record) => record.map(|r| r.id),
            Err(e) => {
                tracing::warn!(lot_id = %lot.id, "purchase record lookup failed: {}", e);
                None
            }
        };

        // Ledger entry first: it is the primary record of the return.
        let entry = SupplierService::new(self.db.clone())
            .append_return(
                lot.supplier_id,
                refund,
                input.quantity,
                medicine_name,
                purchase_id,
            )
            .await?;

        let lots = StockLotService::new(self.db.clone());
        if let Err(e) = lots.apply_unit_delta(branch, lot.id, -input.quantity).await {
            tracing::warn!(lot_id = %lot.id, "lot debit on supplier return failed: {}", e);
        }

        let sync = InventoryService::new(self.db.clone())
            .increment_clamped(
                branch,
                medicine_name,
                lot.invoice(),
                -input.quantity,
                &StockMetadata::default(),
            )
            .await;
        if let Err(e) = sync {
            tracing::warn!(lot_id = %lot.id, "inventory debit on supplier return failed: {}", e);
        }

        AuditService::new(self.db.clone()).log(
            branch,
            "return.supplier",
            "supplier_return",
            Some(entry.id),
            serde_json::json!({
                "medicine": medicine_name,
                "quantity": input.quantity,
                "amount": refund,
                "supplier_id": lot.supplier_id,
            }),
        );

        Ok(entry)
    }

    /// Most recently created approved lot for the medicine, optionally
    /// narrowed by invoice. The invoice filter runs here rather than in SQL
    /// so raw and normalized spellings both match.
    async fn find_return_lot(
        &self,
        branch: Branch,
        medicine_name: &str,
        invoice: Option<&str>,
    ) -> AppResult<StockLot> {
        let lots = sqlx::query_as::<_, StockLot>(&format!(
            r#"
            SELECT {LOT_COLUMNS} FROM stock_lots
            WHERE branch = $1 AND medicine_name = $2 AND status = 'approved'
            ORDER BY created_at DESC
            "#
        ))
        .bind(branch.as_str())
        .bind(medicine_name)
        .fetch_all(&self.db)
        .await?;

        let invoice = invoice.map(str::trim).filter(|s| !s.is_empty());

        lots.into_iter()
            .find(|lot| match invoice {
                Some(q) => invoice_matches(&lot.invoice_number, &lot.invoice_key, q),
                None => true,
            })
            .ok_or_else(|| AppError::NotFound("Approved stock lot for return".to_string()))
    }
}
