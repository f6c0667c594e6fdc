pub mod artifact;
pub mod backup;
pub mod command;
pub mod config;
pub mod error;
pub mod retention;
pub mod runner;

pub use artifact::BackupArtifact;
pub use backup::{BackupManager, BackupOptions, DeleteOutcome, RestoreOptions};
pub use config::BackupSettings;
pub use error::BackupError;
pub use runner::{CommandRunner, ProcessRunner};
