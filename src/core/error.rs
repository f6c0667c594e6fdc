/// Error type shared by the backup core

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: ExitStatus },

    #[error("no backup of {name} found in {}", dir.display())]
    NoBackupFound { name: String, dir: PathBuf },

    #[error("invalid backup file name: {0}")]
    InvalidFileName(String),
}

pub type Result<T> = std::result::Result<T, BackupError>;
