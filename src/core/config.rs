/// Settings for database connection, backup directory and retention
///
/// Resolved from defaults, then an optional TOML file
/// (`~/.config/pgbackup-admin/config.toml` unless `--config` is given),
/// then environment variables. `.env` files are loaded into the environment
/// by the binary before this runs.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::command::Connection;
use crate::utils::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_DATABASE_HOST.to_string(),
            port: DEFAULT_DATABASE_PORT,
            name: DEFAULT_DATABASE_NAME.to_string(),
            user: DEFAULT_DATABASE_USER.to_string(),
            password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
    pub backup_dir: PathBuf,
    /// Number of most recent backups kept per name
    pub generations: usize,
    /// pg_dump / pg_restore `--format`
    pub format: String,
    /// Prefix the external tools with `sudo -S`
    pub sudo: bool,
    pub database: DatabaseSettings,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            generations: DEFAULT_GENERATIONS,
            format: DEFAULT_DATABASE_FORMAT.to_string(),
            sudo: true,
            database: DatabaseSettings::default(),
        }
    }
}

impl BackupSettings {
    /// `~/.config/pgbackup-admin/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load settings from a TOML file
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Resolve settings from an explicit file (which must exist), or the
    /// default location when present, then apply environment overrides.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut settings = match config_file {
            Some(path) => Self::load_file(path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::load_file(&path)?,
                _ => Self::default(),
            },
        };

        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        tracing::debug!(
            backup_dir = %settings.backup_dir.display(),
            generations = settings.generations,
            "Settings resolved"
        );
        Ok(settings)
    }

    /// Override fields from environment-style lookups
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_DATABASE_HOST) {
            self.database.host = host;
        }
        if let Some(port) = lookup(ENV_DATABASE_PORT) {
            self.database.port = port
                .trim()
                .parse()
                .with_context(|| format!("{} must be a port number, got {:?}", ENV_DATABASE_PORT, port))?;
        }
        if let Some(name) = lookup(ENV_DATABASE_NAME) {
            self.database.name = name;
        }
        if let Some(user) = lookup(ENV_DATABASE_USER) {
            self.database.user = user;
        }
        if let Some(password) = lookup(ENV_DATABASE_PASSWORD) {
            self.database.password = Some(password);
        }
        if let Some(dir) = lookup(ENV_BACKUP_DIR) {
            self.backup_dir = PathBuf::from(dir);
        }
        if let Some(generations) = lookup(ENV_BACKUP_GENERATIONS) {
            self.generations = generations.trim().parse().with_context(|| {
                format!("{} must be a number, got {:?}", ENV_BACKUP_GENERATIONS, generations)
            })?;
        }
        if let Some(format) = lookup(ENV_BACKUP_FORMAT) {
            self.format = format;
        }
        if let Some(sudo) = lookup(ENV_BACKUP_SUDO) {
            self.sudo = parse_bool(&sudo)
                .ok_or_else(|| anyhow!("{} must be true or false, got {:?}", ENV_BACKUP_SUDO, sudo))?;
        }

        Ok(())
    }

    /// Save settings to a TOML file, creating its directory
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.database.host.trim().is_empty() {
            errors.push("database.host is not set".to_string());
        }
        if self.database.port == 0 {
            errors.push("database.port must be greater than 0".to_string());
        }
        if self.database.name.trim().is_empty() {
            errors.push("database.name is not set".to_string());
        }
        if self.database.user.trim().is_empty() {
            errors.push("database.user is not set".to_string());
        }
        if self.generations == 0 {
            errors.push("generations must be at least 1".to_string());
        }
        if !DATABASE_FORMATS.contains(&self.format.as_str()) {
            errors.push(format!(
                "Invalid format: {} (expected one of {})",
                self.format,
                DATABASE_FORMATS.join(", ")
            ));
        }
        if self.backup_dir.as_os_str().is_empty() {
            errors.push("backup_dir is not set".to_string());
        } else if self.backup_dir.exists() && !is_dir_writable(&self.backup_dir) {
            errors.push(format!(
                "backup_dir {} is not a writable directory",
                self.backup_dir.display()
            ));
        }

        errors
    }

    /// Connection parameters for the given database role
    pub fn connection(&self, username: &str) -> Connection {
        Connection {
            host: self.database.host.clone(),
            port: self.database.port,
            username: username.to_string(),
            password: self.database.password.clone(),
        }
    }

    /// Flattened view for display, with the password masked
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("database.host".to_string(), self.database.host.clone());
        map.insert("database.port".to_string(), self.database.port.to_string());
        map.insert("database.name".to_string(), self.database.name.clone());
        map.insert("database.user".to_string(), self.database.user.clone());
        map.insert(
            "database.password".to_string(),
            match &self.database.password {
                Some(_) => "****".to_string(),
                None => "<not set>".to_string(),
            },
        );
        map.insert("backup_dir".to_string(), self.backup_dir.display().to_string());
        map.insert("generations".to_string(), self.generations.to_string());
        map.insert("format".to_string(), self.format.clone());
        map.insert("sudo".to_string(), self.sudo.to_string());
        map
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
