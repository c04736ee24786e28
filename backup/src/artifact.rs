//! Backup artifacts: naming, validation, classification and listing.
//!
//! Kind, format and origin are not stored anywhere; they are read back from
//! the file name (`auto_full_20250101_020000_000.tar.gz` is a scheduled,
//! full-scope container). Renaming an artifact by hand therefore changes how
//! it is classified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::constants::naming;
use crate::errors::{BackupError, BackupResult};

/// Data-only or full (code + config + data) selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackupScope {
    #[default]
    Data,
    Full,
}

impl BackupScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupScope::Data => "data",
            BackupScope::Full => "full",
        }
    }
}

impl fmt::Display for BackupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupScope {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "data" => Ok(BackupScope::Data),
            "full" => Ok(BackupScope::Full),
            other => Err(BackupError::invalid_config(
                "scope",
                format!("expected 'data' or 'full', got '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Raw, directly openable copy of the store
    Snapshot,
    /// Compressed tar container
    Container,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackupOrigin {
    Manual,
    Scheduled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupArtifact {
    pub name: String,
    pub kind: BackupScope,
    pub format: ArtifactFormat,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub origin: BackupOrigin,
}

impl BackupArtifact {
    /// Build an artifact record from a name and the file's metadata
    pub fn from_metadata(name: &str, metadata: &std::fs::Metadata) -> Self {
        let created_at = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Self {
            name: name.to_string(),
            kind: classify_kind(name),
            format: classify_format(name),
            size_bytes: metadata.len(),
            created_at,
            origin: classify_origin(name),
        }
    }
}

/// Check a caller-supplied artifact name against the accepted grammar.
///
/// Accepts 1-255 characters from `[A-Za-z0-9._-]`, starting with an
/// alphanumeric, without any `..`, ending in a recognized extension.
pub fn validate_artifact_name(name: &str) -> BackupResult<()> {
    if name.is_empty() {
        return Err(BackupError::invalid_name(name, "name is empty"));
    }

    if name.len() > naming::MAX_NAME_LENGTH {
        return Err(BackupError::invalid_name(
            name,
            format!("name exceeds {} characters", naming::MAX_NAME_LENGTH),
        ));
    }

    if name.contains(['/', '\\']) {
        return Err(BackupError::invalid_name(name, "path separators are not allowed"));
    }

    if name.contains("..") {
        return Err(BackupError::invalid_name(name, "'..' is not allowed"));
    }

    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(BackupError::invalid_name(
            name,
            "name must start with a letter or digit",
        ));
    }

    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(BackupError::invalid_name(
            name,
            format!("character '{}' is not allowed", bad.escape_default()),
        ));
    }

    if !has_recognized_extension(name) {
        return Err(BackupError::invalid_name(
            name,
            "extension must be .db, .sqlite or .tar.gz",
        ));
    }

    Ok(())
}

fn has_recognized_extension(name: &str) -> bool {
    let stem_len = |ext: &str| name.len().saturating_sub(ext.len());
    if name.ends_with(naming::CONTAINER_EXTENSION) {
        return stem_len(naming::CONTAINER_EXTENSION) > 0;
    }
    naming::SNAPSHOT_EXTENSIONS
        .iter()
        .any(|ext| name.ends_with(ext) && stem_len(ext) > 0)
}

pub fn classify_format(name: &str) -> ArtifactFormat {
    if name.ends_with(naming::CONTAINER_EXTENSION) {
        ArtifactFormat::Container
    } else {
        ArtifactFormat::Snapshot
    }
}

pub fn classify_kind(name: &str) -> BackupScope {
    if name.contains(naming::FULL_MARKER) {
        BackupScope::Full
    } else {
        BackupScope::Data
    }
}

pub fn classify_origin(name: &str) -> BackupOrigin {
    if name.starts_with(&format!("{}_", naming::SCHEDULED_PREFIX)) {
        BackupOrigin::Scheduled
    } else {
        BackupOrigin::Manual
    }
}

/// Name for a new container, e.g. `backup_full_20250109_143022_517.tar.gz`
pub fn container_name(origin: BackupOrigin, scope: BackupScope, now: DateTime<Utc>) -> String {
    let prefix = match origin {
        BackupOrigin::Manual => naming::MANUAL_PREFIX,
        BackupOrigin::Scheduled => naming::SCHEDULED_PREFIX,
    };
    format!(
        "{}_{}_{}{}",
        prefix,
        scope,
        now.format(naming::TIMESTAMP_FORMAT),
        naming::CONTAINER_EXTENSION
    )
}

/// Name for the raw safety snapshot taken before a restore
pub fn safety_backup_name(now: DateTime<Utc>) -> String {
    format!(
        "{}_{}{}",
        naming::SAFETY_PREFIX,
        now.format(naming::TIMESTAMP_FORMAT),
        naming::SNAPSHOT_EXTENSIONS[0]
    )
}

/// List every published artifact in `backup_dir`, newest first by mtime.
///
/// In-progress files and anything that does not match the name grammar are
/// ignored. A missing directory lists as empty.
pub async fn list_artifacts(backup_dir: &Path) -> BackupResult<Vec<BackupArtifact>> {
    let mut entries = match tokio::fs::read_dir(backup_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Backup directory {} does not exist yet", backup_dir.display());
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(BackupError::io(
                format!("read backup directory {}", backup_dir.display()),
                e,
            ))
        }
    };

    let mut artifacts = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| BackupError::io("read backup directory entry", e))?
    {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };

        if name.starts_with(naming::IN_PROGRESS_PREFIX) || validate_artifact_name(name).is_err() {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(e) => {
                warn!("Could not stat backup {}: {}", name, e);
                continue;
            }
        };

        artifacts.push(BackupArtifact::from_metadata(name, &metadata));
    }

    // Newest first; the name breaks mtime ties so ordering is stable
    artifacts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.name.cmp(&a.name))
    });

    Ok(artifacts)
}
