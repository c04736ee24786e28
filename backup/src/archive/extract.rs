// File: backup/src/archive/extract.rs
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use tracing::debug;

/// Copy the first regular entry whose file name equals `database_file` out of
/// the container at `container` into `destination`.
///
/// Returns `Ok(false)` when the container holds no such entry; `destination`
/// is only created once a matching entry is found.
pub fn extract_payload(container: &Path, database_file: &str, destination: &Path) -> io::Result<bool> {
    let reader = BufReader::new(File::open(container)?);
    let mut archive = tar::Archive::new(GzDecoder::new(reader));

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let matches = {
            let path = entry.path()?;
            path.file_name()
                .map(|name| name == database_file)
                .unwrap_or(false)
        };
        if !matches {
            continue;
        }

        debug!("Extracting payload entry from {}", container.display());
        let mut output = File::create(destination)?;
        io::copy(&mut entry, &mut output)?;
        output.sync_all()?;
        return Ok(true);
    }

    Ok(false)
}

/// Names of every entry in a container, in archive order
pub fn list_entries(container: &Path) -> io::Result<Vec<String>> {
    let reader = BufReader::new(File::open(container)?);
    let mut archive = tar::Archive::new(GzDecoder::new(reader));

    let mut names = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        names.push(entry.path()?.to_string_lossy().into_owned());
    }
    Ok(names)
}
