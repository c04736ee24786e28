//! Test configuration builder for creating test configs programmatically

use std::fs;
use std::path::{Path, PathBuf};

use backup::config::{AuxiliarySource, AutoBackupDefaults, Config};
use backup::BackupScope;

/// Builder for a `Config` rooted in a test directory
pub struct TestConfigBuilder {
    root: PathBuf,
    database_file: String,
    auxiliary_sources: Vec<AuxiliarySource>,
    auto_backup: AutoBackupDefaults,
}

impl TestConfigBuilder {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            database_file: "store.db".to_string(),
            auxiliary_sources: Vec::new(),
            auto_backup: AutoBackupDefaults::default(),
        }
    }

    pub fn with_database_file(mut self, name: &str) -> Self {
        self.database_file = name.to_string();
        self
    }

    /// Add an auxiliary source at `<root>/<relative>`, packed as `archive_name`
    pub fn with_auxiliary_source(mut self, relative: &str, archive_name: &str) -> Self {
        self.auxiliary_sources.push(AuxiliarySource {
            path: self.root.join(relative),
            archive_name: archive_name.to_string(),
        });
        self
    }

    pub fn with_auto_backup(
        mut self,
        enabled: bool,
        interval_hours: u32,
        scope: BackupScope,
        retention_cap: u32,
    ) -> Self {
        self.auto_backup = AutoBackupDefaults {
            enabled,
            interval_hours,
            scope,
            retention_cap,
        };
        self
    }

    pub fn build(self) -> Config {
        Config {
            data_dir: self.root.join("data"),
            database_file: self.database_file,
            backup_dir: self.root.join("backups"),
            auxiliary_sources: self.auxiliary_sources,
            auto_backup: self.auto_backup,
        }
    }

    /// Write `config/main.toml` under the root and return the config directory
    pub fn write_main_toml(self) -> PathBuf {
        let config_dir = self.root.join("config");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        let config = self.build();
        let main_toml = toml::to_string(&config).expect("Failed to serialize config");
        fs::write(config_dir.join("main.toml"), main_toml).expect("Failed to write main.toml");

        config_dir
    }
}
