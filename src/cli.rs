/// CLI argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// Build timestamp injected at compile time
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser)]
#[command(name = "pgbackup-admin")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    /// Settings file (default: ~/.config/pgbackup-admin/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// .env file loaded into the environment before reading settings
    #[arg(long, global = true, default_value = ".env")]
    pub env_file: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides shared by commands that talk to the database
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// Database to dump or restore into
    #[arg(short, long)]
    pub database: Option<String>,

    /// Backup set name used as the file name prefix (default: database name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// pg_dump / pg_restore format (p, c, d, t)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Database role
    #[arg(short, long)]
    pub username: Option<String>,

    /// Run the tools without sudo
    #[arg(long)]
    pub no_sudo: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dump the database and prune old backups
    Backup {
        #[command(flatten)]
        db: DatabaseArgs,

        /// Number of most recent backups to keep
        #[arg(short, long)]
        generations: Option<usize>,
    },

    /// Prune old backups without creating a new one
    Cleanup {
        /// Backup set name (default: database name)
        #[arg(short, long)]
        name: Option<String>,

        /// Number of most recent backups to keep
        #[arg(short, long)]
        generations: Option<usize>,
    },

    /// List backups in the backup directory
    List,

    /// Print the path of the most recent backup
    Latest {
        /// Backup set name (default: database name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Restore a backup with pg_restore
    Restore {
        #[command(flatten)]
        db: DatabaseArgs,

        /// Backup file to restore (default: most recent backup)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Drop database objects before recreating them
        #[arg(long)]
        clean: bool,

        /// Use IF EXISTS when dropping objects
        #[arg(long)]
        if_exists: bool,
    },

    /// Delete a backup file
    Delete {
        /// File name inside the backup directory
        file: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Run the web admin server
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Enable CORS for cross-origin requests
        #[arg(long)]
        cors: bool,
    },

    /// Generate a token for the web admin server
    #[cfg(feature = "server")]
    Token,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// View resolved configuration
    View,

    /// Validate configuration
    Validate,

    /// Write the resolved configuration to the settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_restore() {
        let cli = Cli::parse_from([
            "pgbackup-admin",
            "restore",
            "--clean",
            "--if-exists",
            "--file",
            "backup/app-2024-01-01_00-00.sql.bz2",
            "--no-sudo",
        ]);

        match cli.command {
            Commands::Restore { db, file, clean, if_exists } => {
                assert!(clean);
                assert!(if_exists);
                assert!(db.no_sudo);
                assert_eq!(file, Some(PathBuf::from("backup/app-2024-01-01_00-00.sql.bz2")));
            }
            _ => panic!("expected restore"),
        }
    }

    #[test]
    fn test_parse_backup_with_global_config() {
        let cli = Cli::parse_from([
            "pgbackup-admin",
            "backup",
            "--generations",
            "3",
            "--config",
            "/etc/pgbackup.toml",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("/etc/pgbackup.toml")));
        match cli.command {
            Commands::Backup { generations, db } => {
                assert_eq!(generations, Some(3));
                assert!(db.database.is_none());
            }
            _ => panic!("expected backup"),
        }
    }
}
