use crate::error::{ArchiveError, Result};
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub const FILE_MODE: u32 = 0o644;
pub const DIR_MODE: u32 = 0o755;

const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Content of a file entry: either in memory or read from disk when the entry is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

impl EntrySource {
    pub fn len(&self) -> Result<u64> {
        match self {
            EntrySource::Bytes(bytes) => Ok(bytes.len() as u64),
            EntrySource::File(path) => Ok(std::fs::metadata(path)
                .map_err(ArchiveError::io(path))?
                .len()),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn read_all(&self) -> Result<Vec<u8>> {
        match self {
            EntrySource::Bytes(bytes) => Ok(bytes.clone()),
            EntrySource::File(path) => std::fs::read(path).map_err(ArchiveError::io(path)),
        }
    }

    pub fn open(&self) -> Result<Box<dyn Read + '_>> {
        match self {
            EntrySource::Bytes(bytes) => Ok(Box::new(bytes.as_slice())),
            EntrySource::File(path) => Ok(Box::new(
                File::open(path).map_err(ArchiveError::io(path))?,
            )),
        }
    }
}

impl From<Vec<u8>> for EntrySource {
    fn from(bytes: Vec<u8>) -> Self {
        EntrySource::Bytes(bytes)
    }
}

impl From<&[u8]> for EntrySource {
    fn from(bytes: &[u8]) -> Self {
        EntrySource::Bytes(bytes.to_vec())
    }
}

impl From<PathBuf> for EntrySource {
    fn from(path: PathBuf) -> Self {
        EntrySource::File(path)
    }
}

impl From<&Path> for EntrySource {
    fn from(path: &Path) -> Self {
        EntrySource::File(path.to_path_buf())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// DEFLATED when set, STORED otherwise.
    pub compress: bool,
    /// Timestamp stamped on every entry. `None` means the DOS epoch (1980-01-01 00:00:00).
    pub timestamp: Option<DateTime<Utc>>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            compress: true,
            timestamp: None,
        }
    }
}

impl ArchiveOptions {
    pub fn zip_time(&self) -> Result<zip::DateTime> {
        let Some(ts) = self.timestamp else {
            return Ok(zip::DateTime::default());
        };
        let year = u16::try_from(ts.year()).map_err(|_| ArchiveError::Timestamp(ts.to_rfc3339()))?;
        zip::DateTime::from_date_and_time(
            year,
            ts.month() as u8,
            ts.day() as u8,
            ts.hour() as u8,
            ts.minute() as u8,
            ts.second() as u8,
        )
        .map_err(|_| ArchiveError::Timestamp(ts.to_rfc3339()))
    }

    pub(crate) fn file_options(&self) -> Result<SimpleFileOptions> {
        let method = if self.compress {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        Ok(SimpleFileOptions::default()
            .compression_method(method)
            .last_modified_time(self.zip_time()?)
            .unix_permissions(FILE_MODE))
    }

    pub(crate) fn directory_options(&self) -> Result<SimpleFileOptions> {
        Ok(SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(self.zip_time()?)
            .unix_permissions(DIR_MODE))
    }
}

pub(crate) fn sized(options: SimpleFileOptions, len: u64) -> SimpleFileOptions {
    options.large_file(len >= ZIP64_THRESHOLD)
}

/// Canonical `/`-separated entry name without leading or trailing separators.
pub fn normalize_entry_name(name: &str) -> Result<String> {
    let mut parts = Vec::new();
    for segment in name.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return Err(ArchiveError::InvalidEntryName(name.to_string())),
            s => parts.push(s),
        }
    }
    if parts.is_empty() {
        return Err(ArchiveError::InvalidEntryName(name.to_string()));
    }
    Ok(parts.join("/"))
}

/// Every proper ancestor of `name`, outermost first: `a/b/c` yields `a`, `a/b`.
pub(crate) fn parent_directories(name: &str) -> impl Iterator<Item = &str> {
    name.match_indices('/').map(move |(i, _)| &name[..i])
}
