// File: backup/src/archive/builder.rs
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::guide::render_restore_guide;
use crate::artifact::{self, ArtifactFormat, BackupArtifact, BackupOrigin, BackupScope};
use crate::config::AuxiliarySource;
use crate::constants::archive;
use crate::errors::{BackupError, BackupResult};
use crate::fsutil::{exists, remove_if_exists, sync_parent_dir};
use crate::layout::StoreLayout;
use crate::snapshot::SnapshotEngine;

#[derive(Clone)]
pub struct ArchiveBuilder {
    snapshot_engine: SnapshotEngine,
    layout: StoreLayout,
    auxiliary_sources: Vec<AuxiliarySource>,
    /// Held for a whole build; clones share it so in-progress names never collide
    build_lock: Arc<Mutex<()>>,
}

/// Everything the blocking packer needs, owned so it can cross into
/// `spawn_blocking`
struct PackJob {
    container_path: PathBuf,
    snapshot_path: PathBuf,
    artifact_name: String,
    database_file: String,
    scope: BackupScope,
    auxiliary_sources: Vec<AuxiliarySource>,
}

impl ArchiveBuilder {
    pub fn new(
        snapshot_engine: SnapshotEngine,
        layout: StoreLayout,
        auxiliary_sources: Vec<AuxiliarySource>,
    ) -> Self {
        Self {
            snapshot_engine,
            layout,
            auxiliary_sources,
            build_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn snapshot_engine(&self) -> &SnapshotEngine {
        &self.snapshot_engine
    }

    /// Snapshot the live store and package it into `destination_name`.
    ///
    /// For full scope every present auxiliary source and a restore guide are
    /// packed as well; missing sources are skipped.
    #[instrument(skip(self), fields(scope = %scope))]
    pub async fn build(
        &self,
        scope: BackupScope,
        destination_name: &str,
    ) -> BackupResult<BackupArtifact> {
        let _guard = self.build_lock.lock().await;
        self.build_locked(scope, destination_name).await
    }

    /// Build under a freshly generated name for `origin`.
    ///
    /// The name is picked while holding the build lock, so concurrent callers
    /// always end up with distinct artifacts.
    #[instrument(skip(self), fields(scope = %scope))]
    pub async fn build_next(
        &self,
        origin: BackupOrigin,
        scope: BackupScope,
    ) -> BackupResult<BackupArtifact> {
        let _guard = self.build_lock.lock().await;

        let mut name = artifact::container_name(origin, scope, Utc::now());
        while exists(&self.layout.artifact_path(&name)).await {
            tokio::time::sleep(Duration::from_millis(1)).await;
            name = artifact::container_name(origin, scope, Utc::now());
        }
        self.build_locked(scope, &name).await
    }

    async fn build_locked(
        &self,
        scope: BackupScope,
        destination_name: &str,
    ) -> BackupResult<BackupArtifact> {
        artifact::validate_artifact_name(destination_name)?;
        if artifact::classify_format(destination_name) != ArtifactFormat::Container {
            return Err(BackupError::invalid_name(
                destination_name,
                "containers must use the .tar.gz extension",
            ));
        }

        let destination_path = self.layout.artifact_path(destination_name);
        if exists(&destination_path).await {
            return Err(BackupError::conflict(format!(
                "backup '{}' already exists",
                destination_name
            )));
        }

        tokio::fs::create_dir_all(self.layout.backup_dir())
            .await
            .map_err(|e| {
                BackupError::io(
                    format!("create {}", self.layout.backup_dir().display()),
                    e,
                )
            })?;

        info!("Building {} backup {}", scope, destination_name);

        // Step 1: consistent snapshot next to the container, under an in-progress name
        let snapshot_path = self
            .layout
            .in_progress_path(&format!("{}.snapshot", destination_name));
        self.snapshot_engine.snapshot(&snapshot_path).await?;
        info!("✓ Step 1: store snapshot taken");

        // Step 2: pack snapshot (and auxiliary trees) into the in-progress container
        let container_path = self.layout.in_progress_path(destination_name);
        let job = PackJob {
            container_path: container_path.clone(),
            snapshot_path: snapshot_path.clone(),
            artifact_name: destination_name.to_string(),
            database_file: self.layout.database_file().to_string(),
            scope,
            auxiliary_sources: match scope {
                BackupScope::Data => Vec::new(),
                BackupScope::Full => self.auxiliary_sources.clone(),
            },
        };

        let packed = tokio::task::spawn_blocking(move || write_container(&job))
            .await
            .map_err(|e| BackupError::io("join packing task", e))
            .and_then(|result| {
                result.map_err(|e| BackupError::io(format!("write container {}", destination_name), e))
            });

        let included = match packed {
            Ok(included) => included,
            Err(e) => {
                error!("✗ Packing {} failed: {}", destination_name, e);
                self.discard(&[&container_path, &snapshot_path]).await;
                return Err(e);
            }
        };
        info!("✓ Step 2: container written ({} auxiliary sources)", included.len());

        // Step 3: publish under the final name
        if let Err(e) = tokio::fs::rename(&container_path, &destination_path).await {
            error!("✗ Publishing {} failed: {}", destination_name, e);
            self.discard(&[&container_path, &snapshot_path]).await;
            return Err(BackupError::io(format!("publish {}", destination_name), e));
        }
        sync_parent_dir(&destination_path).await;
        info!("✓ Step 3: container published as {}", destination_name);

        // Step 4: the snapshot now lives inside the container
        if let Err(e) = remove_if_exists(&snapshot_path).await {
            warn!("Could not remove packed snapshot {}: {}", snapshot_path.display(), e);
        }

        let metadata = tokio::fs::metadata(&destination_path)
            .await
            .map_err(|e| BackupError::io(format!("stat {}", destination_name), e))?;
        let artifact = BackupArtifact::from_metadata(destination_name, &metadata);

        info!(
            "Backup {} completed ({:.1} KB)",
            destination_name,
            artifact.size_bytes as f64 / 1024.0
        );
        Ok(artifact)
    }

    async fn discard(&self, paths: &[&Path]) {
        for path in paths {
            if let Err(e) = remove_if_exists(path).await {
                warn!("Could not remove partial file {}: {}", path.display(), e);
            }
        }
    }
}

/// Write the tar+gzip container. Returns the archive names of the auxiliary
/// sources that were present and packed.
fn write_container(job: &PackJob) -> io::Result<Vec<String>> {
    let file = File::create(&job.container_path)?;
    let encoder = GzEncoder::new(
        BufWriter::new(file),
        Compression::new(archive::COMPRESSION_LEVEL),
    );
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    let payload_name = format!("{}/{}", archive::DATA_DIR, job.database_file);
    builder.append_path_with_name(&job.snapshot_path, &payload_name)?;

    let mut included = Vec::new();
    if job.scope == BackupScope::Full {
        for source in &job.auxiliary_sources {
            let metadata = match std::fs::metadata(&source.path) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Skipping missing auxiliary source {}", source.path.display());
                    continue;
                }
                Err(e) => return Err(e),
            };

            if metadata.is_dir() {
                builder.append_dir_all(&source.archive_name, &source.path)?;
            } else {
                let file_name = source
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| source.archive_name.clone());
                builder.append_path_with_name(
                    &source.path,
                    format!("{}/{}", source.archive_name, file_name),
                )?;
            }
            included.push(source.archive_name.clone());
        }

        let guide = render_restore_guide(
            &job.artifact_name,
            &job.database_file,
            &included,
            Utc::now(),
        );
        let mut header = tar::Header::new_gnu();
        header.set_size(guide.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(Utc::now().timestamp().max(0) as u64);
        header.set_cksum();
        builder.append_data(&mut header, archive::RESTORE_GUIDE, guide.as_bytes())?;
    }

    let encoder = builder.into_inner()?;
    let writer = encoder.finish()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    Ok(included)
}
