/// Backup and restore management
///
/// `BackupManager` owns the settings and a `CommandRunner`, and exposes the
/// operations both the CLI and the web admin use: create (dump + retention
/// cleanup), list, download lookup, delete and restore.

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::artifact::{artifact_file_name, is_safe_file_name, list_artifacts, BackupArtifact};
use super::command::{dump_pipeline, restore_pipeline, DumpRequest, RestoreRequest};
use super::config::BackupSettings;
use super::error::{BackupError, Result};
use super::retention::{delete_older_backups, select_backup};
use super::runner::{CommandRunner, ProcessRunner};

/// Parameters of a single dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOptions {
    pub database_name: String,
    /// Backup set name, the file name prefix
    pub name: String,
    pub format: String,
    pub generation: usize,
    pub username: String,
    pub sudo: bool,
}

impl BackupOptions {
    /// Dump the configured database under its own name
    pub fn from_settings(settings: &BackupSettings) -> Self {
        Self {
            database_name: settings.database.name.clone(),
            name: settings.database.name.clone(),
            format: settings.format.clone(),
            generation: settings.generations,
            username: settings.database.user.clone(),
            sudo: settings.sudo,
        }
    }
}

/// Parameters of a restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOptions {
    pub database_name: String,
    /// Backup set searched when no `file` is given
    pub name: String,
    pub format: String,
    pub username: String,
    pub clean: bool,
    pub if_exists: bool,
    pub file: Option<PathBuf>,
    pub sudo: bool,
}

impl RestoreOptions {
    pub fn from_settings(settings: &BackupSettings) -> Self {
        Self {
            database_name: settings.database.name.clone(),
            name: settings.database.name.clone(),
            format: settings.format.clone(),
            username: settings.database.user.clone(),
            clean: false,
            if_exists: false,
            file: None,
            sudo: settings.sudo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

pub struct BackupManager {
    settings: BackupSettings,
    runner: Arc<dyn CommandRunner>,
}

impl BackupManager {
    pub fn new(settings: BackupSettings) -> Self {
        Self::with_runner(settings, Arc::new(ProcessRunner::new()))
    }

    pub fn with_runner(settings: BackupSettings, runner: Arc<dyn CommandRunner>) -> Self {
        Self { settings, runner }
    }

    pub fn settings(&self) -> &BackupSettings {
        &self.settings
    }

    pub fn backup_dir(&self) -> &Path {
        &self.settings.backup_dir
    }

    /// Dump the database into a new timestamped artifact, then drop the
    /// backups of the same name beyond `generation`.
    pub fn create_backup(&self, options: &BackupOptions) -> Result<BackupArtifact> {
        self.create_backup_at(options, Utc::now().naive_utc())
    }

    pub fn create_backup_at(
        &self,
        options: &BackupOptions,
        now: NaiveDateTime,
    ) -> Result<BackupArtifact> {
        let file_name = artifact_file_name(&options.name, now);
        if !is_safe_file_name(&options.name) || !is_safe_file_name(&file_name) {
            return Err(BackupError::InvalidFileName(file_name));
        }

        fs::create_dir_all(self.backup_dir())?;
        let output = self.backup_dir().join(&file_name);

        let request = DumpRequest {
            connection: self.settings.connection(&options.username),
            database_name: options.database_name.clone(),
            format: options.format.clone(),
            output: output.clone(),
        };
        if let Err(err) = self.runner.run(&dump_pipeline(&request, options.sudo)) {
            // The redirect target exists even when the dump failed
            match fs::remove_file(&output) {
                Ok(()) => tracing::warn!(path = %output.display(), "Removed incomplete backup"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %output.display(), error = %e, "Could not remove incomplete backup"),
            }
            return Err(err);
        }

        let artifact = BackupArtifact::from_path(&output)?;
        tracing::info!(file = %artifact.file_name, size = artifact.size_bytes, "Backup created");

        self.cleanup(&options.name, options.generation)?;
        Ok(artifact)
    }

    /// Retention cleanup for the backup set `name`
    pub fn cleanup(&self, name: &str, generation: usize) -> Result<Vec<PathBuf>> {
        delete_older_backups(self.backup_dir(), name, generation)
    }

    pub fn list_backups(&self) -> Result<Vec<BackupArtifact>> {
        list_artifacts(self.backup_dir())
    }

    /// Most recent backup of `name`
    pub fn latest_backup(&self, name: &str) -> Result<PathBuf> {
        select_backup(self.backup_dir(), name, None)
    }

    /// Path of a downloadable backup, `None` if there is no such file
    pub fn resolve_download(&self, file_name: &str) -> Option<PathBuf> {
        if !is_safe_file_name(file_name) {
            tracing::warn!(file = file_name, "Rejected download of unsafe file name");
            return None;
        }

        let path = self.backup_dir().join(file_name);
        path.is_file().then_some(path)
    }

    /// Delete a backup. A missing file is reported, never an error.
    pub fn delete_backup(&self, file_name: &str) -> Result<DeleteOutcome> {
        let Some(path) = self.resolve_download(file_name) else {
            tracing::warn!(file = file_name, "Backup file not found");
            return Ok(DeleteOutcome::NotFound);
        };

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Backup deleted");
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DeleteOutcome::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Restore from `options.file`, or from the most recent backup of
    /// `options.name`. Returns the file restored from.
    pub fn restore(&self, options: &RestoreOptions) -> Result<PathBuf> {
        let input = select_backup(self.backup_dir(), &options.name, options.file.as_deref())?;

        let request = RestoreRequest {
            connection: self.settings.connection(&options.username),
            database_name: options.database_name.clone(),
            format: options.format.clone(),
            clean: options.clean,
            if_exists: options.if_exists,
            input: input.clone(),
        };
        self.runner.run(&restore_pipeline(&request, options.sudo))?;

        tracing::info!(file = %input.display(), database = %options.database_name, "Restore finished");
        Ok(input)
    }
}
