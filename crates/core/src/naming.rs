use jarforge_api::{ArtifactKey, ResolvedDependency};
use std::collections::BTreeSet;
use std::path::Path;

/// Maps a dependency path to its file name inside a flat library directory.
#[derive(Debug, Clone, Default)]
pub struct DependencyArtifactNamer {
    artifact_id_only: BTreeSet<ArtifactKey>,
}

impl DependencyArtifactNamer {
    pub fn new(artifact_id_only: impl IntoIterator<Item = ArtifactKey>) -> Self {
        Self {
            artifact_id_only: artifact_id_only.into_iter().collect(),
        }
    }

    /// Jars keep their file name behind the group. Directories, commonly all called
    /// `classes`, get a name built from the full coordinates.
    pub fn file_name(&self, dep: &ResolvedDependency, resolved: &Path) -> String {
        if self.artifact_id_only.contains(dep.key()) {
            return format!("{}.{}", dep.artifact_id(), dep.coords.kind());
        }
        if resolved.is_dir() {
            let mut name = format!("{}.{}-", dep.group_id(), dep.artifact_id());
            if !dep.coords.classifier().is_empty() {
                name.push_str(dep.coords.classifier());
                name.push('-');
            }
            name.push_str(dep.version());
            name.push('.');
            name.push_str(dep.coords.kind());
            return name;
        }
        let file = resolved
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}.{}", dep.group_id(), file)
    }
}
