/// Backup artifacts: files named `<name>-<YYYY-MM-DD_HH-MM>.sql.bz2`
///
/// The directory listing is the only index. Everything about an artifact
/// except its size is derived from the file name.

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{BackupError, Result};
use crate::utils::{
    format_size_mb, BACKUP_SUFFIX, DISPLAY_DATE_FORMAT, TIMESTAMP_FORMAT, TIMESTAMP_LEN,
};

#[derive(Debug, Clone, Serialize)]
pub struct BackupArtifact {
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub created: Option<NaiveDateTime>,
    pub size_bytes: u64,
}

impl BackupArtifact {
    /// Build an artifact from a path on disk, reading its size
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let size_bytes = fs::metadata(path)?.len();

        Ok(Self {
            created: parse_timestamp(&file_name),
            file_name,
            path: path.to_path_buf(),
            size_bytes,
        })
    }

    pub fn display_date(&self) -> String {
        self.created
            .map(|d| d.format(DISPLAY_DATE_FORMAT).to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn display_size(&self) -> String {
        format_size_mb(self.size_bytes)
    }
}

pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// `<name>-<timestamp>.sql.bz2`
pub fn artifact_file_name(name: &str, timestamp: NaiveDateTime) -> String {
    format!("{}-{}{}", name, format_timestamp(timestamp), BACKUP_SUFFIX)
}

/// Parse the creation time embedded in a backup file name.
///
/// The timestamp is the trailing `YYYY-MM-DD_HH-MM` before the suffix, so
/// names containing `-` themselves still parse.
pub fn parse_timestamp(file_name: &str) -> Option<NaiveDateTime> {
    let stem = file_name.strip_suffix(BACKUP_SUFFIX)?;
    if stem.len() < TIMESTAMP_LEN + 2 || !stem.is_char_boundary(stem.len() - TIMESTAMP_LEN) {
        return None;
    }

    let (prefix, timestamp) = stem.split_at(stem.len() - TIMESTAMP_LEN);
    if !prefix.ends_with('-') {
        return None;
    }

    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()
}

/// Pattern of the files that belong to the backup set `name`
pub fn retention_pattern(name: &str) -> Regex {
    let pattern = format!(
        r"^{}-20[0-9][0-9]-[0-1][0-9]-[0-3][0-9]_[0-2][0-9]-[0-6][0-9]\.sql\.bz2$",
        regex::escape(name)
    );
    Regex::new(&pattern).expect("escaped name always yields a valid pattern")
}

pub fn matches_backup_set(name: &str, file_name: &str) -> bool {
    retention_pattern(name).is_match(file_name)
}

/// A file name is served or deleted only if it names a plain entry of the
/// backup directory.
pub fn is_safe_file_name(file_name: &str) -> bool {
    !file_name.is_empty()
        && file_name != "."
        && file_name != ".."
        && !file_name.contains('/')
        && !file_name.contains('\\')
        && !file_name.contains('\0')
}

/// File names in `dir` for which `keep` returns true, sorted newest first
pub(crate) fn matching_file_names<F>(dir: &Path, keep: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> bool,
{
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        match file_name.to_str() {
            Some(name) if keep(name) => names.push(name.to_string()),
            Some(_) => {}
            None => tracing::warn!(file = ?file_name, "Skipping file with non UTF-8 name"),
        }
    }

    names.sort_unstable_by(|a, b| b.cmp(a));
    Ok(names)
}

/// Every `*.sql.bz2` file in `dir`, newest first. A missing directory is empty.
pub fn list_artifacts(dir: &Path) -> Result<Vec<BackupArtifact>> {
    let names = matching_file_names(dir, |name| name.ends_with(BACKUP_SUFFIX))?;
    artifacts_from_names(dir, names)
}

/// Files removed after the directory scan are left out of the listing
fn artifacts_from_names(dir: &Path, names: Vec<String>) -> Result<Vec<BackupArtifact>> {
    let mut artifacts = Vec::with_capacity(names.len());
    for name in names {
        match BackupArtifact::from_path(&dir.join(&name)) {
            Ok(artifact) => artifacts.push(artifact),
            Err(BackupError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(file = %name, "Backup vanished while listing");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_timestamp_round_trip() {
        let ts = at(2024, 3, 9, 17, 45);
        let file_name = artifact_file_name("app", ts);
        assert_eq!(file_name, "app-2024-03-09_17-45.sql.bz2");
        assert_eq!(parse_timestamp(&file_name), Some(ts));
    }

    #[test]
    fn test_parse_timestamp_hyphenated_name() {
        let ts = at(2023, 12, 31, 23, 59);
        assert_eq!(parse_timestamp("my-app-db-2023-12-31_23-59.sql.bz2"), Some(ts));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp("app.sql.bz2"), None);
        assert_eq!(parse_timestamp("app-2024-13-01_00-00.sql.bz2"), None);
        assert_eq!(parse_timestamp("app-2024-01-01_00-00.tar"), None);
        assert_eq!(parse_timestamp("app2024-01-01_00-00.sql.bz2"), None);
    }

    #[test]
    fn test_display_unknown_date() {
        let artifact = BackupArtifact {
            file_name: "manual.sql.bz2".into(),
            path: PathBuf::from("manual.sql.bz2"),
            created: None,
            size_bytes: 2 * 1024 * 1024,
        };
        assert_eq!(artifact.display_date(), "Unknown");
        assert_eq!(artifact.display_size(), "2.00 MB");
    }

    #[test]
    fn test_matches_backup_set() {
        assert!(matches_backup_set("app", "app-2024-01-02_03-04.sql.bz2"));
        assert!(!matches_backup_set("app", "app-1999-01-02_03-04.sql.bz2"));
        assert!(!matches_backup_set("app", "other-2024-01-02_03-04.sql.bz2"));
        assert!(!matches_backup_set("app", "app-2024-01-02_03-04.sql.bz2.tmp"));
        assert!(!matches_backup_set("a.p", "axp-2024-01-02_03-04.sql.bz2"));
    }

    #[test]
    fn test_is_safe_file_name() {
        assert!(is_safe_file_name("app-2024-01-02_03-04.sql.bz2"));
        assert!(!is_safe_file_name(""));
        assert!(!is_safe_file_name(".."));
        assert!(!is_safe_file_name("../etc/passwd"));
        assert!(!is_safe_file_name("sub/file.sql.bz2"));
    }

    #[test]
    fn test_list_artifacts_sorted_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app-2024-01-01_00-00.sql.bz2"), b"a").unwrap();
        fs::write(dir.path().join("app-2024-02-01_00-00.sql.bz2"), b"bb").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested.sql.bz2")).unwrap();

        let artifacts = list_artifacts(dir.path()).unwrap();
        let names: Vec<_> = artifacts.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["app-2024-02-01_00-00.sql.bz2", "app-2024-01-01_00-00.sql.bz2"]
        );
        assert_eq!(artifacts[0].size_bytes, 2);
        assert_eq!(artifacts[0].created, Some(at(2024, 2, 1, 0, 0)));
    }

    #[test]
    fn test_list_artifacts_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_artifacts(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn test_vanished_file_is_left_out() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app-2024-01-01_00-00.sql.bz2"), b"a").unwrap();

        let names = vec![
            "app-2024-02-01_00-00.sql.bz2".to_string(),
            "app-2024-01-01_00-00.sql.bz2".to_string(),
        ];
        let artifacts = artifacts_from_names(dir.path(), names).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].file_name, "app-2024-01-01_00-00.sql.bz2");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_name_does_not_break_listing() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"bad-\xff.sql.bz2")), b"x").unwrap();
        fs::write(dir.path().join("app-2024-01-01_00-00.sql.bz2"), b"a").unwrap();

        let artifacts = list_artifacts(dir.path()).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].file_name, "app-2024-01-01_00-00.sql.bz2");
    }
}
