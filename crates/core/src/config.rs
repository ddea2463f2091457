use crate::error::{PackageError, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use jarforge_archive::ArchiveOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum JarType {
    #[default]
    FastJar,
    MutableJar,
    UberJar,
    LegacyJar,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct ManifestConfig {
    pub add_implementation_entries: bool,
    pub attributes: IndexMap<String, String>,
    pub sections: IndexMap<String, IndexMap<String, String>>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            add_implementation_entries: true,
            attributes: IndexMap::new(),
            sections: IndexMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct DecompilerConfig {
    pub enabled: bool,
    /// Resolved against the parent of the build directory.
    pub output_directory: PathBuf,
    /// Where the decompiler tool jar lives.
    pub jar_directory: PathBuf,
    pub tool_jar: String,
}

impl Default for DecompilerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_directory: PathBuf::from("decompiled"),
            jar_directory: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("jarforge/decompiler"),
            tool_jar: "vineflower.jar".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct JarConfig {
    #[serde(rename = "type")]
    pub kind: JarType,
    /// Build the AOT flavour of the fast or legacy layout.
    pub aot: bool,
    pub compress: bool,
    pub user_configured_ignored_entries: Vec<String>,
    /// Extra files concatenated instead of shadowed in uber jars.
    pub user_merged_resources: Vec<String>,
    /// Relative to the fast-jar build directory.
    pub user_providers_directory: Option<String>,
    pub include_dependency_list: bool,
    /// `group:artifact[:classifier[:type]]` keys copied as `{artifact}.{type}`.
    pub force_use_artifact_id_only_as_name: Vec<String>,
    pub manifest: ManifestConfig,
    pub decompiler: DecompilerConfig,
}

impl Default for JarConfig {
    fn default() -> Self {
        Self {
            kind: JarType::FastJar,
            aot: false,
            compress: true,
            user_configured_ignored_entries: Vec::new(),
            user_merged_resources: Vec::new(),
            user_providers_directory: None,
            include_dependency_list: true,
            force_use_artifact_id_only_as_name: Vec::new(),
            manifest: ManifestConfig::default(),
            decompiler: DecompilerConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct PackageConfig {
    /// Overrides where archives land. Relative paths resolve against the build target directory.
    pub output_directory: Option<PathBuf>,
    pub output_name: Option<String>,
    pub runner_suffix: String,
    /// Fixed timestamp for every zip entry. Unset means the DOS epoch.
    pub output_timestamp: Option<DateTime<Utc>>,
    /// When off, every optional dependency is packaged.
    pub filter_optional_dependencies: bool,
    pub included_optional_dependencies: Vec<String>,
    pub parent_first_artifacts: Vec<String>,
    pub removed_artifacts: Vec<String>,
    /// Compression threads; 0 picks one per CPU.
    pub compression_threads: usize,
    pub jar: JarConfig,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            output_directory: None,
            output_name: None,
            runner_suffix: "-runner".to_string(),
            output_timestamp: None,
            filter_optional_dependencies: true,
            included_optional_dependencies: Vec::new(),
            parent_first_artifacts: Vec::new(),
            removed_artifacts: Vec::new(),
            compression_threads: 0,
            jar: JarConfig::default(),
        }
    }
}

impl PackageConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(PackageError::io(path))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions {
            compress: self.jar.compress,
            timestamp: self.output_timestamp,
        }
    }

    /// `-runner` becomes the `runner` classifier.
    pub fn runner_classifier(&self) -> Option<String> {
        let suffix = self
            .runner_suffix
            .strip_prefix('-')
            .unwrap_or(&self.runner_suffix);
        (!suffix.is_empty()).then(|| suffix.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: PackageConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PackageConfig::default());
        assert_eq!(config.jar.kind, JarType::FastJar);
        assert!(config.jar.compress);
        assert_eq!(config.runner_classifier().as_deref(), Some("runner"));
    }

    #[test]
    fn test_kebab_case_keys() {
        let json = r#"{
            "runner-suffix": "",
            "output-timestamp": "2024-01-02T03:04:05Z",
            "jar": {
                "type": "uber-jar",
                "user-configured-ignored-entries": ["META-INF/foo.txt"],
                "manifest": { "attributes": { "X-Built-By": "ci" } }
            }
        }"#;
        let config: PackageConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.jar.kind, JarType::UberJar);
        assert_eq!(config.runner_classifier(), None);
        assert!(config.jar.manifest.add_implementation_entries);
        assert_eq!(config.jar.manifest.attributes["X-Built-By"], "ci");
        assert!(config.archive_options().timestamp.is_some());
    }
}
