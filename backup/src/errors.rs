//! Custom error types for the backup core
//!
//! Every caller-facing operation returns `BackupError`. The four variants map
//! one-to-one onto how the administrative layer is expected to react:
//! reject the input, report a missing object, surface an I/O failure, or
//! refuse because another restore is already pending.

use std::fmt;

/// Main error type for backup, retention and restore operations
#[derive(Debug)]
pub enum BackupError {
    /// Malformed artifact name or configuration value
    Validation(ValidationError),

    /// Artifact or embedded payload entry missing
    NotFound(NotFoundError),

    /// I/O failure: disk full, permission denied, partial write, store error
    Storage(StorageError),

    /// A restore is already pending activation, or a backup run is in flight
    Conflict { reason: String },
}

/// Validation error variants
#[derive(Debug)]
pub enum ValidationError {
    /// Artifact name does not match the accepted grammar
    InvalidArtifactName { name: String, reason: String },

    /// Configuration value out of range or unparseable
    InvalidConfig { field: String, reason: String },
}

/// Not-found error variants
#[derive(Debug)]
pub enum NotFoundError {
    /// No artifact with this name in the backup directory
    Artifact { name: String },

    /// Container holds no entry for the data file
    PayloadEntry { artifact: String, entry: String },

    /// No pending restore to act on
    PendingRestore,
}

/// Storage error variants
#[derive(Debug)]
pub enum StorageError {
    /// Filesystem operation failed
    Io { operation: String, reason: String },

    /// The live store rejected an operation
    Database { operation: String, reason: String },

    /// Marker or settings value could not be (de)serialized
    Serialization { reason: String },
}

impl BackupError {
    pub fn invalid_name(name: &str, reason: impl Into<String>) -> Self {
        BackupError::Validation(ValidationError::InvalidArtifactName {
            name: name.to_string(),
            reason: reason.into(),
        })
    }

    pub fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        BackupError::Validation(ValidationError::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        })
    }

    pub fn artifact_not_found(name: &str) -> Self {
        BackupError::NotFound(NotFoundError::Artifact {
            name: name.to_string(),
        })
    }

    pub fn io(operation: impl Into<String>, err: impl fmt::Display) -> Self {
        BackupError::Storage(StorageError::Io {
            operation: operation.into(),
            reason: err.to_string(),
        })
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        BackupError::Conflict {
            reason: reason.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, BackupError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BackupError::NotFound(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, BackupError::Storage(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, BackupError::Conflict { .. })
    }
}

pub type BackupResult<T> = Result<T, BackupError>;

// Implement Display for all error types
impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupError::Validation(e) => write!(f, "Validation error: {}", e),
            BackupError::NotFound(e) => write!(f, "Not found: {}", e),
            BackupError::Storage(e) => write!(f, "Storage error: {}", e),
            BackupError::Conflict { reason } => write!(f, "Conflict: {}", reason),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidArtifactName { name, reason } => {
                write!(f, "Invalid artifact name '{}': {}", name, reason)
            }
            ValidationError::InvalidConfig { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundError::Artifact { name } => write!(f, "Backup '{}' does not exist", name),
            NotFoundError::PayloadEntry { artifact, entry } => {
                write!(f, "Backup '{}' contains no '{}' entry", artifact, entry)
            }
            NotFoundError::PendingRestore => write!(f, "No restore is pending"),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io { operation, reason } => {
                write!(f, "Failed to {}: {}", operation, reason)
            }
            StorageError::Database { operation, reason } => {
                write!(f, "Database {} failed: {}", operation, reason)
            }
            StorageError::Serialization { reason } => {
                write!(f, "Serialization error: {}", reason)
            }
        }
    }
}

// Implement std::error::Error
impl std::error::Error for BackupError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for NotFoundError {}
impl std::error::Error for StorageError {}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        BackupError::Storage(StorageError::Io {
            operation: "access filesystem".to_string(),
            reason: err.to_string(),
        })
    }
}

impl From<sqlx::Error> for BackupError {
    fn from(err: sqlx::Error) -> Self {
        BackupError::Storage(StorageError::Database {
            operation: "query".to_string(),
            reason: err.to_string(),
        })
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        BackupError::Storage(StorageError::Serialization {
            reason: err.to_string(),
        })
    }
}

// Conversions from anyhow::Error for internal plumbing
impl From<anyhow::Error> for BackupError {
    fn from(err: anyhow::Error) -> Self {
        BackupError::Storage(StorageError::Io {
            operation: "complete operation".to_string(),
            reason: err.to_string(),
        })
    }
}

impl From<ValidationError> for BackupError {
    fn from(err: ValidationError) -> Self {
        BackupError::Validation(err)
    }
}

impl From<NotFoundError> for BackupError {
    fn from(err: NotFoundError) -> Self {
        BackupError::NotFound(err)
    }
}

impl From<StorageError> for BackupError {
    fn from(err: StorageError) -> Self {
        BackupError::Storage(err)
    }
}
