use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Stream(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("invalid entry name '{0}'")]
    InvalidEntryName(String),
    #[error("no file entry '{0}'")]
    MissingEntry(String),
    #[error("malformed manifest at line {line}: {reason}")]
    Manifest { line: usize, reason: String },
    #[error("timestamp {0} cannot be stored in a zip entry")]
    Timestamp(String),
    #[error("compression of '{0}' did not complete")]
    WorkerLost(String),
    #[error("failed to start compression pool: {0}")]
    Pool(String),
}

impl ArchiveError {
    pub fn io(path: impl AsRef<Path>) -> impl FnOnce(std::io::Error) -> ArchiveError {
        let path = path.as_ref().to_path_buf();
        move |source| ArchiveError::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
