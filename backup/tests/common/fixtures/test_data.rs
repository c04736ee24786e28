//! Common test data and file helpers

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// Artifact names that follow the production naming convention
pub mod names {
    pub const MANUAL_DATA: &str = "backup_data_20250109_143022_517.tar.gz";
    pub const MANUAL_FULL: &str = "backup_full_20250109_143022_517.tar.gz";
    pub const SCHEDULED_DATA: &str = "auto_data_20250110_000000_000.tar.gz";
    pub const SAFETY: &str = "pre_restore_20250111_080000_250.db";
}

/// Write `contents` to `path` and backdate its mtime by `age_secs`
pub fn write_aged_file(path: &Path, contents: &[u8], age_secs: u64) {
    fs::write(path, contents).expect("Failed to write test file");
    set_age(path, age_secs);
}

/// Backdate the mtime of `path` by `age_secs`
pub fn set_age(path: &Path, age_secs: u64) {
    let modified = SystemTime::now() - Duration::from_secs(age_secs);
    File::options()
        .write(true)
        .open(path)
        .expect("Failed to open test file")
        .set_modified(modified)
        .expect("Failed to set mtime");
}

/// Create a standalone SQLite file at `path` holding a single note
pub async fn create_sqlite_file(path: &Path, note: &str) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create sqlite file");

    sqlx::query("CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT NOT NULL)")
        .execute(&pool)
        .await
        .expect("Failed to create notes table");
    sqlx::query("INSERT INTO notes (body) VALUES (?)")
        .bind(note)
        .execute(&pool)
        .await
        .expect("Failed to insert note");

    pool.close().await;
}

/// Build a `.tar.gz` at `path` with the given `(entry path, contents)` pairs
pub fn write_container(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("Failed to create container");
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, *contents)
            .expect("Failed to append entry");
    }

    builder
        .into_inner()
        .expect("Failed to finish tar")
        .finish()
        .expect("Failed to finish gzip");
}
