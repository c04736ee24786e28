// File: backup/src/archive/guide.rs
use chrono::{DateTime, Utc};

/// Render the human-readable restore guide shipped inside full containers
pub fn render_restore_guide(
    artifact_name: &str,
    database_file: &str,
    included_sources: &[String],
    created_at: DateTime<Utc>,
) -> String {
    let mut guide = String::new();

    guide.push_str("# Restore Guide\n\n");
    guide.push_str(&format!("Backup: `{}`\n", artifact_name));
    guide.push_str(&format!("Created: {}\n\n", created_at.to_rfc3339()));

    guide.push_str("## Contents\n\n");
    guide.push_str(&format!(
        "- `data/{}` - consistent snapshot of the record store\n",
        database_file
    ));
    for source in included_sources {
        guide.push_str(&format!("- `{}/` - auxiliary files\n", source));
    }
    guide.push('\n');

    guide.push_str("## Restoring the data only\n\n");
    guide.push_str("1. Copy this file into the service's backup directory.\n");
    guide.push_str("2. Start a restore for this backup from the administration page.\n");
    guide.push_str("3. Restart the service. The restore is applied during startup, before\n");
    guide.push_str("   the store is opened. The replaced store is kept next to it with the\n");
    guide.push_str("   `.previous` suffix.\n\n");

    guide.push_str("## Restoring everything by hand\n\n");
    guide.push_str("1. Stop the service.\n");
    guide.push_str(&format!(
        "2. Extract the archive: `tar -xzf {}`\n",
        artifact_name
    ));
    guide.push_str(&format!(
        "3. Replace the store with `data/{}` and delete any `-wal`/`-shm` files\n",
        database_file
    ));
    guide.push_str("   left next to the old store.\n");
    if !included_sources.is_empty() {
        guide.push_str("4. Copy the auxiliary directories back to their original locations.\n");
        guide.push_str("5. Start the service.\n");
    } else {
        guide.push_str("4. Start the service.\n");
    }

    guide
}
