//! Append-only audit trail.

use async_trait::async_trait;
use sqlx::Row;
use tracing::{debug, error};

use super::records::AuditRecord;
use super::Database;
use crate::errors::BackupResult;

/// Append-only `{action, entity_type, details, timestamp}` sink
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: AuditRecord) -> BackupResult<()>;
}

#[async_trait]
impl AuditSink for Database {
    async fn append(&self, record: AuditRecord) -> BackupResult<()> {
        debug!("Appending audit record {} ({})", record.id, record.action);

        match sqlx::query(
            r#"
            INSERT INTO audit_log (id, action, entity_type, details, timestamp)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.action)
        .bind(&record.entity_type)
        .bind(&record.details)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Failed to append audit record {}: {}", record.action, e);
                Err(e.into())
            }
        }
    }
}

impl Database {
    /// Most recent audit records, newest first
    pub async fn recent_audit_records(&self, limit: i64) -> BackupResult<Vec<AuditRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, action, entity_type, details, timestamp
            FROM audit_log
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(AuditRecord {
                id: row.try_get("id")?,
                action: row.try_get("action")?,
                entity_type: row.try_get("entity_type")?,
                details: row.try_get("details")?,
                timestamp: row.try_get("timestamp")?,
            });
        }
        Ok(records)
    }
}
