// File: backup/src/config/manager.rs
use super::Config;
use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::artifact;

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_dir: impl AsRef<Path>) -> Result<Self> {
        let config = Self::load_configuration(config_dir.as_ref()).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_dir: &Path) -> Result<Config> {
        let main_config_path = config_dir.join("main.toml");
        let main_config_content = fs::read_to_string(&main_config_path)
            .await
            .map_err(|e| anyhow!("Failed to read main config {}: {}", main_config_path.display(), e))?;

        let config = Self::parse(&main_config_content)?;

        info!(
            "Loaded config: store {}/{}, backups in {}, {} auxiliary sources",
            config.data_dir.display(),
            config.database_file,
            config.backup_dir.display(),
            config.auxiliary_sources.len()
        );

        Ok(config)
    }

    /// Parse and validate a `main.toml` document
    pub fn parse(content: &str) -> Result<Config> {
        let config: Config =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse main config: {}", e))?;

        artifact::validate_artifact_name(&config.database_file)
            .map_err(|e| anyhow!("database_file: {}", e))?;

        if config.auto_backup.interval_hours == 0 {
            return Err(anyhow!("auto_backup.interval_hours must be greater than zero"));
        }

        for source in &config.auxiliary_sources {
            if source.archive_name.is_empty()
                || source.archive_name.contains(['/', '\\'])
                || source.archive_name == ".."
                || source.archive_name == crate::constants::archive::DATA_DIR
            {
                return Err(anyhow!(
                    "Invalid archive_name '{}' for auxiliary source {}",
                    source.archive_name,
                    source.path.display()
                ));
            }
            if !source.path.exists() {
                warn!(
                    "Auxiliary source {} does not exist yet, it will be skipped by full backups",
                    source.path.display()
                );
            } else {
                debug!("Auxiliary source {} -> {}", source.path.display(), source.archive_name);
            }
        }

        Ok(config)
    }
}
