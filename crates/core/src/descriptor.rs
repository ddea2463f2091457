use crate::aot::ResourceIndex;
use crate::error::{PackageError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;
use zip::ZipArchive;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JarDescriptor {
    /// Relative to the distribution root, `/`-separated.
    pub path: String,
    /// Every directory in the jar, sorted.
    pub directories: Vec<String>,
}

/// The `quarkus-application.dat` blob: what the boot classloader opens, in which order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDescriptor {
    pub main_class: String,
    pub jars: Vec<JarDescriptor>,
    pub parent_first: Vec<String>,
    pub non_existent_resources: Vec<String>,
    #[serde(default)]
    pub resource_index: Option<ResourceIndex>,
}

impl ApplicationDescriptor {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?).map_err(PackageError::io(path))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(PackageError::io(path))?;
        Self::from_bytes(&bytes)
    }
}

/// Directories implied by a set of entry names, including explicit directory entries.
pub fn directories_of<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut dirs = BTreeSet::new();
    for name in names {
        let is_dir = name.ends_with('/');
        let name = name.trim_end_matches('/');
        if is_dir && !name.is_empty() {
            dirs.insert(name.to_string());
        }
        for (i, _) in name.match_indices('/') {
            dirs.insert(name[..i].to_string());
        }
    }
    dirs.into_iter().collect()
}

pub fn jar_directories(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(PackageError::io(path))?;
    let archive = ZipArchive::new(file)?;
    Ok(directories_of(archive.file_names()))
}
