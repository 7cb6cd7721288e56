//! Fire-and-forget audit log sink
//!
//! Audit writes ride on a spawned task and never fail the request that
//! produced them; a lost entry costs a log line, nothing more.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use shared::Branch;

/// Audit service recording stock mutations as they happen
#[derive(Clone)]
pub struct AuditService {
    db: PgPool,
}

/// A recorded audit entry
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditEntry {
    pub id: Uuid,
    pub branch: String,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<Uuid>,
    pub detail: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl AuditService {
    /// Create a new AuditService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record an action without blocking the caller. Insert failures are
    /// logged and dropped.
    pub fn log(
        &self,
        branch: Branch,
        action: &str,
        entity: &str,
        entity_id: Option<Uuid>,
        detail: serde_json::Value,
    ) {
        let db = self.db.clone();
        let action = action.to_string();
        let entity = entity.to_string();

        tokio::spawn(async move {
            let result = sqlx::query(
                r#"
                INSERT INTO audit_log (branch, action, entity, entity_id, detail)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(branch.as_str())
            .bind(&action)
            .bind(&entity)
            .bind(entity_id)
            .bind(&detail)
            .execute(&db)
            .await;

            if let Err(e) = result {
                tracing::warn!(action = %action, entity = %entity, "audit log write failed: {}", e);
            }
        });
    }

    /// Most recent audit entries for a branch
    pub async fn recent(&self, branch: Branch, limit: i64) -> AppResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, branch, action, entity, entity_id, detail, created_at
            FROM audit_log
            WHERE branch = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(branch.as_str())
        .bind(limit.clamp(1, 500))
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}
