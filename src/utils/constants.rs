/// Backup naming conventions and configuration defaults
///
/// The artifact name layout is `<name>-<YYYY-MM-DD_HH-MM>.sql.bz2`.

/// chrono format of the timestamp embedded in every backup file name
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M";

/// Display format used by the listing page and `list` command
pub const DISPLAY_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Length of a rendered `TIMESTAMP_FORMAT` value
pub const TIMESTAMP_LEN: usize = 16;

/// Suffix shared by all compressed backup artifacts
pub const BACKUP_SUFFIX: &str = ".sql.bz2";

/// Extension that selects the decompression stage on restore
pub const COMPRESSED_EXTENSION: &str = "bz2";

/// MIME type of a download
pub const BACKUP_CONTENT_TYPE: &str = "application/x-bzip2";

// Defaults
pub const DEFAULT_BACKUP_DIR: &str = "backup";
pub const DEFAULT_DATABASE_FORMAT: &str = "t";
pub const DEFAULT_GENERATIONS: usize = 7;
pub const DEFAULT_DATABASE_HOST: &str = "localhost";
pub const DEFAULT_DATABASE_PORT: u16 = 5432;
pub const DEFAULT_DATABASE_NAME: &str = "postgres";
pub const DEFAULT_DATABASE_USER: &str = "postgres";

/// Output formats accepted by pg_dump / pg_restore (plain, custom, directory, tar)
pub const DATABASE_FORMATS: &[&str] = &["p", "c", "d", "t"];

// External programs
pub const PG_DUMP: &str = "pg_dump";
pub const PG_RESTORE: &str = "pg_restore";
pub const BZIP2: &str = "bzip2";
pub const SUDO: &str = "sudo";

/// Environment variable carrying the database password to pg_dump/pg_restore
pub const PGPASSWORD: &str = "PGPASSWORD";

// Environment overrides
pub const ENV_DATABASE_HOST: &str = "DATABASE_HOST";
pub const ENV_DATABASE_PORT: &str = "DATABASE_PORT";
pub const ENV_DATABASE_NAME: &str = "DATABASE_NAME";
pub const ENV_DATABASE_USER: &str = "DATABASE_USER";
pub const ENV_DATABASE_PASSWORD: &str = "DATABASE_PASSWORD";
pub const ENV_BACKUP_DIR: &str = "POSTGRES_BACKUP_DIR";
pub const ENV_BACKUP_GENERATIONS: &str = "POSTGRES_BACKUP_GENERATIONS";
pub const ENV_BACKUP_FORMAT: &str = "POSTGRES_BACKUP_FORMAT";
pub const ENV_BACKUP_SUDO: &str = "POSTGRES_BACKUP_SUDO";

/// Token protecting the web admin surface
pub const ENV_WEB_TOKEN: &str = "PGBACKUP_WEB_TOKEN";

/// Directory under the user config dir holding `config.toml`
pub const CONFIG_DIR_NAME: &str = "pgbackup-admin";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_len_matches_format() {
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 0)
            .unwrap()
            .format(TIMESTAMP_FORMAT)
            .to_string();
        assert_eq!(ts.len(), TIMESTAMP_LEN);
    }

    #[test]
    fn test_default_format_is_known() {
        assert!(DATABASE_FORMATS.contains(&DEFAULT_DATABASE_FORMAT));
    }
}
