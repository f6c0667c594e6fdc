mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;

use cli::{Cli, Commands, ConfigCommands, DatabaseArgs};
use pgbackup_admin::core::{
    BackupManager, BackupOptions, BackupSettings, DeleteOutcome, RestoreOptions,
};
use pgbackup_admin::utils::{format_bytes, truncate_string};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    load_env_file(&cli.env_file)?;

    let settings = BackupSettings::load(cli.config.as_deref())?;
    let manager = BackupManager::new(settings);

    match cli.command {
        Commands::Backup { db, generations } => {
            handle_backup(&manager, db, generations)?;
        }
        Commands::Cleanup { name, generations } => {
            handle_cleanup(&manager, name, generations)?;
        }
        Commands::List => {
            handle_list(&manager)?;
        }
        Commands::Latest { name } => {
            let name = name.unwrap_or_else(|| manager.settings().database.name.clone());
            let path = manager.latest_backup(&name)?;
            println!("{}", path.display());
        }
        Commands::Restore {
            db,
            file,
            clean,
            if_exists,
        } => {
            let mut options = RestoreOptions::from_settings(manager.settings());
            apply_database_args(
                &db,
                &mut options.database_name,
                &mut options.name,
                &mut options.format,
                &mut options.username,
                &mut options.sudo,
            );
            options.file = file;
            options.clean = clean;
            options.if_exists = if_exists;

            let restored = manager.restore(&options)?;
            println!(
                "✓ Restored {} from {}",
                options.database_name,
                restored.display()
            );
        }
        Commands::Delete { file } => match manager.delete_backup(&file)? {
            DeleteOutcome::Deleted => println!("✓ Backup {} deleted", file),
            DeleteOutcome::NotFound => println!("Backup file {} not found.", file),
        },
        Commands::Config { command } => {
            handle_config(&manager, command, cli.config.as_deref())?;
        }
        #[cfg(feature = "server")]
        Commands::Serve { port, host, cors } => {
            pgbackup_admin::server::run(host, port, cors, manager).await?;
        }
        #[cfg(feature = "server")]
        Commands::Token => {
            let token = pgbackup_admin::server::auth::generate_token();
            println!("{}", token);
            eprintln!(
                "\nStart the server with: export {}=\"{}\"",
                pgbackup_admin::utils::ENV_WEB_TOKEN,
                token
            );
        }
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load a `.env` file if present; variables already set win
fn load_env_file(path: &Path) -> Result<()> {
    if path.exists() {
        dotenv::from_path(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }
    Ok(())
}

fn apply_database_args(
    db: &DatabaseArgs,
    database_name: &mut String,
    name: &mut String,
    format: &mut String,
    username: &mut String,
    sudo: &mut bool,
) {
    if let Some(database) = &db.database {
        *database_name = database.clone();
        // The set name follows the database unless given explicitly
        *name = database.clone();
    }
    if let Some(n) = &db.name {
        *name = n.clone();
    }
    if let Some(f) = &db.format {
        *format = f.clone();
    }
    if let Some(u) = &db.username {
        *username = u.clone();
    }
    if db.no_sudo {
        *sudo = false;
    }
}

fn handle_backup(manager: &BackupManager, db: DatabaseArgs, generations: Option<usize>) -> Result<()> {
    let mut options = BackupOptions::from_settings(manager.settings());
    apply_database_args(
        &db,
        &mut options.database_name,
        &mut options.name,
        &mut options.format,
        &mut options.username,
        &mut options.sudo,
    );
    if let Some(generations) = generations {
        options.generation = generations;
    }

    println!("Backing up {} to {}...", options.database_name, manager.backup_dir().display());
    let artifact = manager
        .create_backup(&options)
        .context("Error creating backup")?;

    println!(
        "✓ Backup created: {} ({})",
        artifact.path.display(),
        format_bytes(artifact.size_bytes)
    );
    Ok(())
}

fn handle_cleanup(manager: &BackupManager, name: Option<String>, generations: Option<usize>) -> Result<()> {
    let name = name.unwrap_or_else(|| manager.settings().database.name.clone());
    let generations = generations.unwrap_or(manager.settings().generations);

    let removed = manager.cleanup(&name, generations)?;
    if removed.is_empty() {
        println!("Nothing to clean up (keeping {} most recent backups of {})", generations, name);
    } else {
        for path in &removed {
            println!("Removed {}", path.display());
        }
        println!("✓ Removed {} old backup(s)", removed.len());
    }
    Ok(())
}

fn handle_list(manager: &BackupManager) -> Result<()> {
    let backups = manager.list_backups()?;

    println!("Database Backups ({})\n", manager.backup_dir().display());
    if backups.is_empty() {
        println!("No backups found.");
        return Ok(());
    }

    println!("{:<45} {:<18} {:>12}", "Filename", "Date", "Size");
    println!("{}", "-".repeat(77));
    for backup in backups {
        println!(
            "{:<45} {:<18} {:>12}",
            truncate_string(&backup.file_name, 45),
            backup.display_date(),
            backup.display_size()
        );
    }
    Ok(())
}

fn handle_config(manager: &BackupManager, command: ConfigCommands, config_path: Option<&Path>) -> Result<()> {
    let settings = manager.settings();

    match command {
        ConfigCommands::View => {
            println!("Configuration:\n");
            for (key, value) in settings.to_map() {
                println!("{}: {}", key, value);
            }
        }
        ConfigCommands::Validate => {
            let errors = settings.validate();

            if errors.is_empty() {
                println!("✓ Configuration is valid");
            } else {
                println!("✗ Configuration errors:");
                for error in errors {
                    println!("  - {}", error);
                }
            }
        }
        ConfigCommands::Init { force } => {
            let path = match config_path {
                Some(path) => path.to_path_buf(),
                None => BackupSettings::default_config_path()
                    .context("Could not determine the user config directory")?,
            };
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }

            // Keep the password in the environment, not on disk
            let mut to_save = settings.clone();
            to_save.database.password = None;
            to_save.save(&path)?;
            println!("✓ Wrote {}", path.display());
        }
    }

    Ok(())
}
