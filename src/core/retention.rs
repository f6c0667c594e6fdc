/// Retention cleanup and backup selection

use std::fs;
use std::path::{Path, PathBuf};

use super::artifact::{matching_file_names, retention_pattern};
use super::error::{BackupError, Result};

/// Remove every backup of `name` beyond the `generation` most recent ones.
///
/// Recency is the reverse string order of the file names, which is
/// chronological because of the fixed-width timestamp.
pub fn delete_older_backups(dir: &Path, name: &str, generation: usize) -> Result<Vec<PathBuf>> {
    tracing::info!(name, generation, dir = %dir.display(), "Cleaning up older backups");

    let pattern = retention_pattern(name);
    let files = matching_file_names(dir, |f| pattern.is_match(f))?;

    let mut removed = Vec::new();
    for file in files.into_iter().skip(generation) {
        let path = dir.join(file);
        tracing::info!(path = %path.display(), "Removing old backup");
        fs::remove_file(&path)?;
        removed.push(path);
    }

    Ok(removed)
}

/// Pick the backup to restore: the given file, or the most recent one of `name`.
pub fn select_backup(dir: &Path, name: &str, file: Option<&Path>) -> Result<PathBuf> {
    let selected = match file {
        Some(file) => file.to_path_buf(),
        None => {
            let pattern = retention_pattern(name);
            let newest = matching_file_names(dir, |f| pattern.is_match(f))?
                .into_iter()
                .next()
                .ok_or_else(|| BackupError::NoBackupFound {
                    name: name.to_string(),
                    dir: dir.to_path_buf(),
                })?;
            dir.join(newest)
        }
    };

    tracing::info!(file = %selected.display(), "Selecting backup");
    Ok(selected)
}
