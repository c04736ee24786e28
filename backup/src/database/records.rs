//! Database record types (entities).
//!
//! This module contains all the record structs used by the database layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSettingRecord {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// One append-only audit entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditRecord {
    pub id: String,
    pub action: String,
    pub entity_type: String,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(action: &str, entity_type: &str, details: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            details: Some(details.to_string()),
            timestamp: Utc::now(),
        }
    }
}
