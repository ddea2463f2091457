use super::dependency::{ApplicationModel, ArtifactKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything a later re-augmentation needs to rebuild a mutable jar without resolving again.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MutableJarApplicationModel {
    pub base_name: String,
    /// Dependency key to the `/`-separated paths, relative to the build directory, it was copied to.
    pub relative_paths: BTreeMap<String, Vec<String>>,
    pub app_model: ApplicationModel,
    pub user_providers_directory: Option<String>,
    pub app_archive_path: String,
}

impl MutableJarApplicationModel {
    pub fn paths_for(&self, key: &ArtifactKey) -> Option<&[String]> {
        self.relative_paths.get(&key.to_string()).map(Vec::as_slice)
    }
}
