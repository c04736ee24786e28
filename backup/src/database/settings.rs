//! Key-value settings persistence.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use super::records::GlobalSettingRecord;
use super::Database;
use crate::errors::BackupResult;

/// Generic key-value settings collaborator
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> BackupResult<Option<String>>;

    async fn set_setting(&self, key: &str, value: &str) -> BackupResult<()>;
}

impl Database {
    pub async fn get_all_settings(&self) -> BackupResult<Vec<GlobalSettingRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT key, value, updated_at
            FROM global_settings
            ORDER BY key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut settings = Vec::new();
        for row in rows {
            settings.push(GlobalSettingRecord {
                key: row.try_get("key")?,
                value: row.try_get("value")?,
                updated_at: row.try_get("updated_at")?,
            });
        }
        Ok(settings)
    }

    pub async fn upsert_setting(&self, setting: &GlobalSettingRecord) -> BackupResult<()> {
        sqlx::query(
            r#"
            INSERT INTO global_settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&setting.key)
        .bind(&setting.value)
        .bind(setting.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for Database {
    async fn get_setting(&self, key: &str) -> BackupResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM global_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn set_setting(&self, key: &str, value: &str) -> BackupResult<()> {
        self.upsert_setting(&GlobalSettingRecord {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: Utc::now(),
        })
        .await
    }
}
