//! Medicine identity resolver
//!
//! Stock additions refer to medicines by name; the registry find-or-creates
//! the identity row so lots, purchases, and the inventory aggregate all key
//! off the same spelling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::Branch;

/// Medicine registry service
#[derive(Clone)]
pub struct MedicineService {
    db: PgPool,
}

/// A registered medicine
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Medicine {
    pub id: Uuid,
    pub branch: String,
    pub name: String,
    pub generic_name: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a medicine directly
#[derive(Debug, Deserialize)]
pub struct CreateMedicineInput {
    pub name: String,
    pub generic_name: Option<String>,
    pub category: Option<String>,
}

impl MedicineService {
    /// Create a new MedicineService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Find a medicine by name, creating it on first reference. The upsert
    /// is a single statement so concurrent callers converge on one row.
    pub async fn find_or_create(
        &self,
        branch: Branch,
        name: &str,
        category: Option<&str>,
    ) -> AppResult<Medicine> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Medicine name cannot be empty".to_string(),
            });
        }

        let medicine = sqlx::query_as::<_, Medicine>(
            r#"
            INSERT INTO medicines (branch, name, category)
            VALUES ($1, $2, $3)
            ON CONFLICT (branch, name)
            DO UPDATE SET category = COALESCE(EXCLUDED.category, medicines.category),
                          updated_at = now()
            RETURNING id, branch, name, generic_name, category, created_at, updated_at
            "#,
        )
        .bind(branch.as_str())
        .bind(name)
        .bind(category)
        .fetch_one(&self.db)
        .await?;

        Ok(medicine)
    }

    /// Register a medicine explicitly
    pub async fn create(&self, branch: Branch, input: CreateMedicineInput) -> AppResult<Medicine> {
        let medicine = self
            .find_or_create(branch, &input.name, input.category.as_deref())
            .await?;

        if let Some(generic) = &input.generic_name {
            let medicine = sqlx::query_as::<_, Medicine>(
                r#"
                UPDATE medicines
                SET generic_name = $1, updated_at = now()
                WHERE id = $2
                RETURNING id, branch, name, generic_name, category, created_at, updated_at
                "#,
            )
            .bind(generic)
            .bind(medicine.id)
            .fetch_one(&self.db)
            .await?;
            return Ok(medicine);
        }

        Ok(medicine)
    }

    /// Get a medicine by id
    pub async fn get(&self, branch: Branch, medicine_id: Uuid) -> AppResult<Medicine> {
        sqlx::query_as::<_, Medicine>(
            r#"
            SELECT id, branch, name, generic_name, category, created_at, updated_at
            FROM medicines
            WHERE id = $1 AND branch = $2
            "#,
        )
        .bind(medicine_id)
        .bind(branch.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Medicine".to_string()))
    }

    /// List medicines for a branch
    pub async fn list(&self, branch: Branch) -> AppResult<Vec<Medicine>> {
        let medicines = sqlx::query_as::<_, Medicine>(
            r#"
            SELECT id, branch, name, generic_name, category, created_at, updated_at
            FROM medicines
            WHERE branch = $1
            ORDER BY name
            "#,
        )
        .bind(branch.as_str())
        .fetch_all(&self.db)
        .await?;

        Ok(medicines)
    }
}
