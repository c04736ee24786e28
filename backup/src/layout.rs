//! Filesystem layout of the live store and the backup directory.
//!
//! `StoreLayout` only computes paths; it never touches the disk. Startup
//! recovery depends on it alone, which is what allows recovery to run before
//! the store is opened.

use std::path::{Path, PathBuf};

use crate::constants::{naming, store};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    data_dir: PathBuf,
    database_file: String,
    backup_dir: PathBuf,
}

impl StoreLayout {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        database_file: impl Into<String>,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            database_file: database_file.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// File name of the live store; also the canonical payload name in containers
    pub fn database_file(&self) -> &str {
        &self.database_file
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn marker_path(&self) -> PathBuf {
        self.data_dir.join(store::RESTORE_MARKER)
    }

    pub fn staged_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}{}", self.database_file, store::STAGED_SUFFIX))
    }

    pub fn previous_generation_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}{}", self.database_file, store::PREVIOUS_SUFFIX))
    }

    /// Path of an artifact. Callers must validate `name` first.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.backup_dir.join(name)
    }

    /// In-progress path for an artifact that is about to be published as `name`
    pub fn in_progress_path(&self, name: &str) -> PathBuf {
        self.backup_dir
            .join(format!("{}{}", naming::IN_PROGRESS_PREFIX, name))
    }
}

/// `<path>.partial`, the temporary sibling used before an atomic rename
pub fn partial_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(store::PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// `<path><suffix>` for SQLite sidecars such as `-wal`
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
