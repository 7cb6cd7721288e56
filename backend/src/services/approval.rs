//! Approval workflow for pending stock lots
//!
//! Approving a lot either flips it to `approved` in place or, when an
//! already-approved lot of the same medicine carries a matching invoice,
//! folds its units into that lot and deletes the pending row. The primary
//! mutation in both paths is a single conditional statement keyed on
//! `status = 'pending'`, so a doubled approve request applies exactly once.
//! Everything downstream of the primary write (inventory credit, purchase
//! mirror, supplier fold, audit) is best-effort and never rolls it back.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditService;
use crate::services::inventory::InventoryService;
use crate::services::purchase::PurchaseService;
use crate::services::stock_lot::{StockLot, LOT_COLUMNS};
use crate::services::supplier::SupplierService;
use shared::{find_merge_target, Branch, LotStatus, MergeCandidate};

/// Approval workflow service
#[derive(Clone)]
pub struct ApprovalService {
    db: PgPool,
}

/// Outcome of an approve call
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApproveOutcome {
    /// The surviving approved lot (the merge target, or the lot itself)
    pub lot: StockLot,
    /// Set when the pending lot was folded into an existing approved lot
    pub merged_into: Option<Uuid>,
    /// Units credited by this approval
    pub units_added: i64,
}

impl ApprovalService {
    /// Create a new ApprovalService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Approve a pending lot, merging into an existing approved lot when
    /// invoices match.
    pub async fn approve(&self, branch: Branch, lot_id: Uuid) -> AppResult<ApproveOutcome> {
        let pending = self.load(branch, lot_id).await?;
        if pending.status() != Some(LotStatus::Pending) {
            return Err(AppError::InvalidStateTransition(format!(
                "Lot is already {}",
                pending.status
            )));
        }

        // A lot created before its unit counter was populated still counts
        // for its full pack content.
        let mut units = pending.total_units;
        if units == 0 {
            units = pending.packs as i64 * pending.units_per_pack as i64;
        }

        let target = if pending.invoice_number.trim().is_empty() {
            None
        } else {
            let candidates = self.merge_candidates(&pending).await?;
            find_merge_target(&candidates, &pending.invoice_number)
        };

        let outcome = match target {
            Some(target_id) => self.merge_approve(&pending, target_id, units).await?,
            None => self.standalone_approve(branch, &pending, units).await?,
        };

        self.post_approval(branch, pending.id, &outcome).await;

        Ok(outcome)
    }

    /// Reject a pending lot. No inventory, purchase-amount, or supplier
    /// effect; the mirror record just follows the status.
    pub async fn reject(&self, branch: Branch, lot_id: Uuid) -> AppResult<StockLot> {
        let lot = sqlx::query_as::<_, StockLot>(&format!(
            r#"
            UPDATE stock_lots
            SET status = 'rejected', updated_at = now()
            WHERE id = $1 AND branch = $2 AND status = 'pending'
            RETURNING {LOT_COLUMNS}
            "#
        ))
        .bind(lot_id)
        .bind(branch.as_str())
        .fetch_optional(&self.db)
        .await?;

        let lot = match lot {
            Some(lot) => lot,
            None => {
                let existing = self.load(branch, lot_id).await?;
                return Err(AppError::InvalidStateTransition(format!(
                    "Lot is already {}",
                    existing.status
                )));
            }
        };

        if let Err(e) = PurchaseService::new(self.db.clone())
            .mark_status(lot.id, LotStatus::Rejected)
            .await
        {
            tracing::warn!(lot_id = %lot.id, "purchase mirror status update failed: {}", e);
        }

        AuditService::new(self.db.clone()).log(
            branch,
            "stock_lot.rejected",
            "stock_lot",
            Some(lot.id),
            serde_json::json!({ "medicine": lot.medicine_name }),
        );

        Ok(lot)
    }

    async fn load(&self, branch: Branch, lot_id: Uuid) -> AppResult<StockLot> {
        sqlx::query_as::<_, StockLot>(&format!(
            "SELECT {LOT_COLUMNS} FROM stock_lots WHERE id = $1 AND branch = $2"
        ))
        .bind(lot_id)
        .bind(branch.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock lot".to_string()))
    }

    /// Approved lots of the same medicine, the candidate pool for invoice
    /// matching
    async fn merge_candidates(&self, pending: &StockLot) -> AppResult<Vec<MergeCandidate>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, chrono::DateTime<chrono::Utc>)>(
            r#"
            SELECT id, invoice_number, invoice_key, created_at
            FROM stock_lots
            WHERE branch = $1 AND medicine_name = $2 AND status = 'approved' AND id <> $3
            "#,
        )
        .bind(&pending.branch)
        .bind(&pending.medicine_name)
        .bind(pending.id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(lot_id, invoice_number, invoice_key, created_at)| MergeCandidate {
                lot_id,
                invoice_number,
                invoice_key,
                created_at,
            })
            .collect())
    }

    /// Fold the pending lot into an approved target. The conditional DELETE
    /// is the at-most-once guard: if another approve already consumed the
    /// pending row, nothing is added twice.
    async fn merge_approve(
        &self,
        pending: &StockLot,
        target_id: Uuid,
        units: i64,
    ) -> AppResult<ApproveOutcome> {
        let deleted = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM stock_lots WHERE id = $1 AND status = 'pending' RETURNING id",
        )
        .bind(pending.id)
        .fetch_optional(&self.db)
        .await?;
        if deleted.is_none() {
            return Err(AppError::InvalidStateTransition(
                "Lot is no longer pending".to_string(),
            ));
        }

        // Newest information wins on the target's descriptive fields.
        let lot = sqlx::query_as::<_, StockLot>(&format!(
            r#"
            UPDATE stock_lots
            SET total_units = total_units + $2,
                packs = ((total_units + $2) / units_per_pack)::INT,
                buy_price_per_pack = $3, unit_buy_price = $4,
                sale_price_per_pack = $5, unit_sale_price = $6, profit_per_unit = $7,
                expiry_date = COALESCE($8, expiry_date),
                supplier_id = $9, supplier_name = $10,
                category = COALESCE($11, category),
                min_stock = $12,
                updated_at = now()
            WHERE id = $1
            RETURNING {LOT_COLUMNS}
            "#
        ))
        .bind(target_id)
        .bind(units)
        .bind(pending.buy_price_per_pack)
        .bind(pending.unit_buy_price)
        .bind(pending.sale_price_per_pack)
        .bind(pending.unit_sale_price)
        .bind(pending.profit_per_unit)
        .bind(pending.expiry_date)
        .bind(pending.supplier_id)
        .bind(&pending.supplier_name)
        .bind(&pending.category)
        .bind(pending.min_stock)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Merge target lot".to_string()))?;

        Ok(ApproveOutcome {
            lot,
            merged_into: Some(target_id),
            units_added: units,
        })
    }

    /// Flip the pending lot to approved in place. The `status = 'pending'`
    /// predicate makes the flip apply at most once.
    async fn standalone_approve(
        &self,
        branch: Branch,
        pending: &StockLot,
        units: i64,
    ) -> AppResult<ApproveOutcome> {
        let lot = sqlx::query_as::<_, StockLot>(&format!(
            r#"
            UPDATE stock_lots
            SET status = 'approved', total_units = $3, updated_at = now()
            WHERE id = $1 AND branch = $2 AND status = 'pending'
            RETURNING {LOT_COLUMNS}
            "#
        ))
        .bind(pending.id)
        .bind(branch.as_str())
        .bind(units)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            AppError::InvalidStateTransition("Lot is no longer pending".to_string())
        })?;

        Ok(ApproveOutcome {
            lot,
            merged_into: None,
            units_added: units,
        })
    }

    /// Secondary effects of an approval. Each is independent and
    /// best-effort; a failure leaves the system eventually repairable via
    /// inventory recompute and supplier recalc.
    async fn post_approval(&self, branch: Branch, source_lot_id: Uuid, outcome: &ApproveOutcome) {
        let lot = &outcome.lot;

        let inventory = InventoryService::new(self.db.clone())
            .increment_clamped(
                branch,
                &lot.medicine_name,
                Some(&lot.invoice_number),
                outcome.units_added,
                &lot.stock_metadata(),
            )
            .await;
        if let Err(e) = inventory {
            tracing::warn!(lot_id = %lot.id, "inventory credit after approval failed: {}", e);
        }

        let purchases = PurchaseService::new(self.db.clone());
        // The approved amount is always the pending lot's own purchase
        // record. On a merge that record outlives its lot as orphan history;
        // the target's record was folded when the target itself was approved.
        match purchases.mark_status(source_lot_id, LotStatus::Approved).await {
            Ok(Some(record)) => {
                let fold = SupplierService::new(self.db.clone())
                    .apply_approved_purchase(
                        record.supplier_id,
                        record.total_purchase_amount,
                        record.purchase_date,
                    )
                    .await;
                if let Err(e) = fold {
                    tracing::warn!(lot_id = %lot.id, "supplier ledger fold failed: {}", e);
                }
            }
            Ok(None) => {
                tracing::warn!(lot_id = %lot.id, "no purchase record found for approved lot");
            }
            Err(e) => {
                tracing::warn!(lot_id = %lot.id, "purchase mirror status update failed: {}", e);
            }
        }

        AuditService::new(self.db.clone()).log(
            branch,
            "stock_lot.approved",
            "stock_lot",
            Some(lot.id),
            serde_json::json!({
                "medicine": lot.medicine_name,
                "units_added": outcome.units_added,
                "merged_into": outcome.merged_into,
            }),
        );
    }
}
