use jarforge_api::ArtifactCoords;
use jarforge_archive::ArchiveError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Invalid package configuration:\n{}", .0.join("\n"))]
    Configuration(Vec<String>),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("Failed to copy {coords} from {}: {source}", path.display())]
    Dependency {
        coords: ArtifactCoords,
        path: PathBuf,
        #[source]
        source: Box<PackageError>,
    },
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PackageError {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> PackageError {
        let path = path.into();
        move |source| PackageError::Io { path, source }
    }

    pub fn dependency(coords: &ArtifactCoords, path: impl Into<PathBuf>) -> impl FnOnce(PackageError) -> PackageError {
        let coords = coords.clone();
        let path = path.into();
        move |source| PackageError::Dependency {
            coords,
            path,
            source: Box::new(source),
        }
    }
}

impl From<zip::result::ZipError> for PackageError {
    fn from(err: zip::result::ZipError) -> Self {
        PackageError::Archive(ArchiveError::Zip(err))
    }
}

impl From<rmp_serde::encode::Error> for PackageError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        PackageError::Serialization(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for PackageError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        PackageError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PackageError>;
