//! Supplier finance ledger
//!
//! Two strategies keep the supplier aggregate honest: incremental folds
//! applied when a purchase is approved, and `recalc_for_supplier`, a full
//! recompute from purchase history that is idempotent and safe to run on a
//! schedule as the corrective pass for drift.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{PaymentMethod, UNKNOWN_SUPPLIER};
use shared::Branch;

/// Supplier ledger service
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

/// A supplier account with its financial aggregate
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub branch: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub total_purchases: Decimal,
    pub total_paid: Decimal,
    pub pending_payments: Decimal,
    pub last_order: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payment ledger entry
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SupplierPayment {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub note: Option<String>,
    pub paid_at: DateTime<Utc>,
}

/// Supplier return ledger entry
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SupplierReturnEntry {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub amount: Decimal,
    pub quantity_units: i64,
    pub medicine_name: String,
    pub purchase_id: Option<Uuid>,
    pub returned_at: DateTime<Utc>,
}

/// Input for creating a supplier
#[derive(Debug, Deserialize)]
pub struct CreateSupplierInput {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Input for updating supplier contact details
#[derive(Debug, Deserialize)]
pub struct UpdateSupplierInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Input for recording a payment
#[derive(Debug, Deserialize)]
pub struct AddPaymentInput {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub note: Option<String>,
}

const SUPPLIER_COLUMNS: &str = "id, branch, name, phone, email, address, total_purchases, \
     total_paid, pending_payments, last_order, created_at, updated_at";

impl SupplierService {
    /// Create a new SupplierService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a supplier
    pub async fn create(&self, branch: Branch, input: CreateSupplierInput) -> AppResult<Supplier> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Supplier name cannot be empty".to_string(),
            });
        }

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO suppliers (branch, name, phone, email, address)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (branch, name) DO NOTHING
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(branch.as_str())
        .bind(name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::DuplicateEntry("supplier name".to_string()))?;

        Ok(supplier)
    }

    /// Get a supplier by id
    pub async fn get(&self, branch: Branch, supplier_id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1 AND branch = $2"
        ))
        .bind(supplier_id)
        .bind(branch.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    /// List suppliers for a branch
    pub async fn list(&self, branch: Branch) -> AppResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE branch = $1 ORDER BY name"
        ))
        .bind(branch.as_str())
        .fetch_all(&self.db)
        .await?;

        Ok(suppliers)
    }

    /// Update contact details. Financial fields are never edited directly.
    pub async fn update(
        &self,
        branch: Branch,
        supplier_id: Uuid,
        input: UpdateSupplierInput,
    ) -> AppResult<Supplier> {
        let existing = self.get(branch, supplier_id).await?;

        let name = input.name.unwrap_or(existing.name);
        let phone = input.phone.or(existing.phone);
        let email = input.email.or(existing.email);
        let address = input.address.or(existing.address);

        if name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Supplier name cannot be empty".to_string(),
            });
        }

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers
            SET name = $1, phone = $2, email = $3, address = $4, updated_at = now()
            WHERE id = $5
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(name.trim())
        .bind(&phone)
        .bind(&email)
        .bind(&address)
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;

        Ok(supplier)
    }

    /// Delete a supplier and its ledgers
    pub async fn delete(&self, branch: Branch, supplier_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1 AND branch = $2")
            .bind(supplier_id)
            .bind(branch.as_str())
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Supplier".to_string()));
        }

        Ok(())
    }

    /// The sentinel supplier for purchases that arrive without one.
    /// Idempotent: concurrent callers converge on the same row.
    pub async fn find_or_create_unknown(&self, branch: Branch) -> AppResult<Supplier> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO suppliers (branch, name)
            VALUES ($1, $2)
            ON CONFLICT (branch, name) DO UPDATE SET updated_at = now()
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(branch.as_str())
        .bind(UNKNOWN_SUPPLIER)
        .fetch_one(&self.db)
        .await?;

        Ok(supplier)
    }

    /// Resolve an optional supplier reference, falling back to the sentinel.
    pub async fn resolve(&self, branch: Branch, supplier_id: Option<Uuid>) -> AppResult<Supplier> {
        match supplier_id {
            Some(id) => self.get(branch, id).await,
            None => self.find_or_create_unknown(branch).await,
        }
    }

    /// Incremental fold applied when a purchase is approved.
    pub async fn apply_approved_purchase(
        &self,
        supplier_id: Uuid,
        amount: Decimal,
        purchase_date: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE suppliers
            SET total_purchases = total_purchases + $2,
                pending_payments = GREATEST(0, total_purchases + $2 - total_paid),
                last_order = GREATEST(COALESCE(last_order, $3), $3),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(supplier_id)
        .bind(amount)
        .bind(purchase_date)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Full recompute from purchase history. Idempotent; this is the
    /// corrective pass for drift between the incremental folds and reality.
    pub async fn recalc_for_supplier(
        &self,
        branch: Branch,
        supplier_id: Uuid,
    ) -> AppResult<Supplier> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers s
            SET total_purchases = COALESCE((
                    SELECT SUM(total_purchase_amount) FROM purchase_records
                    WHERE supplier_id = s.id AND status = 'approved'
                ), 0),
                last_order = (
                    SELECT MAX(purchase_date) FROM purchase_records
                    WHERE supplier_id = s.id AND status = 'approved'
                ),
                pending_payments = GREATEST(0, COALESCE((
                    SELECT SUM(total_purchase_amount) FROM purchase_records
                    WHERE supplier_id = s.id AND status = 'approved'
                ), 0) - s.total_paid),
                updated_at = now()
            WHERE s.id = $1 AND s.branch = $2
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(supplier_id)
        .bind(branch.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        Ok(supplier)
    }

    /// Append a payment to the ledger and recompute the pending balance.
    pub async fn add_payment(
        &self,
        branch: Branch,
        supplier_id: Uuid,
        input: AddPaymentInput,
    ) -> AppResult<SupplierPayment> {
        if input.amount <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "amount".to_string(),
                message: "Payment amount must be positive".to_string(),
            });
        }

        // Referential check before any mutation
        self.get(branch, supplier_id).await?;

        let payment = sqlx::query_as::<_, SupplierPayment>(
            r#"
            INSERT INTO supplier_payments (supplier_id, amount, method, note)
            VALUES ($1, $2, $3, $4)
            RETURNING id, supplier_id, amount, method, note, paid_at
            "#,
        )
        .bind(supplier_id)
        .bind(input.amount)
        .bind(input.method.as_str())
        .bind(&input.note)
        .fetch_one(&self.db)
        .await?;

        sqlx::query(
            r#"
            UPDATE suppliers
            SET total_paid = total_paid + $2,
                pending_payments = GREATEST(0, total_purchases - (total_paid + $2)),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(supplier_id)
        .bind(input.amount)
        .execute(&self.db)
        .await?;

        Ok(payment)
    }

    /// Payment history for a supplier
    pub async fn list_payments(
        &self,
        branch: Branch,
        supplier_id: Uuid,
    ) -> AppResult<Vec<SupplierPayment>> {
        self.get(branch, supplier_id).await?;

        let payments = sqlx::query_as::<_, SupplierPayment>(
            r#"
            SELECT id, supplier_id, amount, method, note, paid_at
            FROM supplier_payments
            WHERE supplier_id = $1
            ORDER BY paid_at DESC
            "#,
        )
        .bind(supplier_id)
        .fetch_all(&self.db)
        .await?;

        Ok(payments)
    }

    /// Append a supplier-return entry. Leaves total_purchases, total_paid,
    /// and pending_payments untouched: supplier returns adjust physical
    /// stock and this audit trail, not the payable balance.
    pub async fn append_return(
        &self,
        supplier_id: Uuid,
        amount: Decimal,
        quantity_units: i64,
        medicine_name: &str,
        purchase_id: Option<Uuid>,
    ) -> AppResult<SupplierReturnEntry> {
        let entry = sqlx::query_as::<_, SupplierReturnEntry>(
            r#"
            INSERT INTO supplier_returns (supplier_id, amount, quantity_units, medicine_name, purchase_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, supplier_id, amount, quantity_units, medicine_name, purchase_id, returned_at
            "#,
        )
        .bind(supplier_id)
        .bind(amount)
        .bind(quantity_units)
        .bind(medicine_name)
        .bind(purchase_id)
        .fetch_one(&self.db)
        .await?;

        Ok(entry)
    }

    /// Returns history for a supplier
    pub async fn list_returns(
        &self,
        branch: Branch,
        supplier_id: Uuid,
    ) -> AppResult<Vec<SupplierReturnEntry>> {
        self.get(branch, supplier_id).await?;

        let returns = sqlx::query_as::<_, SupplierReturnEntry>(
            r#"
            SELECT id, supplier_id, amount, quantity_units, medicine_name, purchase_id, returned_at
            FROM supplier_returns
            WHERE supplier_id = $1
            ORDER BY returned_at DESC
            "#,
        )
        .bind(supplier_id)
        .fetch_all(&self.db)
        .await?;

        Ok(returns)
    }
}
