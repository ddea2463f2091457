use crate::config::PackageConfig;
use crate::error::{PackageError, Result};
use jarforge_api::{ApplicationModel, GeneratedClass, GeneratedResource, TransformedClasses};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Packaging format demanded by an extension regardless of configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FormatRequirement {
    UberJar,
    LegacyJar,
}

/// Everything the external build hands over for one packaging pass.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct PackageInputs {
    pub app_model: ApplicationModel,
    /// Directory of compiled classes or a jar.
    pub app_root: PathBuf,
    pub main_class: String,
    #[serde(default)]
    pub application_info: ApplicationInfo,
    /// Build output directory of the project, e.g. `target/`.
    pub target_directory: PathBuf,
    pub base_name: String,
    #[serde(default)]
    pub rebuild: bool,
    #[serde(default)]
    pub build_system_properties: BTreeMap<String, String>,
    #[serde(default)]
    pub transformed_classes: TransformedClasses,
    #[serde(default)]
    pub generated_classes: Vec<GeneratedClass>,
    #[serde(default)]
    pub generated_resources: Vec<GeneratedResource>,
    /// Classes that only exist for the native image build.
    #[serde(default)]
    pub native_image_classes: Vec<GeneratedClass>,
    #[serde(default)]
    pub additional_archives: Vec<PathBuf>,
    #[serde(default)]
    pub uber_merged_resources: Vec<String>,
    #[serde(default)]
    pub uber_ignored_resources: Vec<String>,
    #[serde(default)]
    pub format_requirements: Vec<FormatRequirement>,
    #[serde(default)]
    pub non_existent_resources: BTreeSet<String>,
    #[serde(default)]
    pub appcds_directory: Option<PathBuf>,
}

impl PackageInputs {
    pub fn new(
        app_model: ApplicationModel,
        app_root: impl Into<PathBuf>,
        main_class: impl Into<String>,
        target_directory: impl Into<PathBuf>,
        base_name: impl Into<String>,
    ) -> Self {
        Self {
            app_model,
            app_root: app_root.into(),
            main_class: main_class.into(),
            application_info: ApplicationInfo::default(),
            target_directory: target_directory.into(),
            base_name: base_name.into(),
            rebuild: false,
            build_system_properties: BTreeMap::new(),
            transformed_classes: TransformedClasses::new(),
            generated_classes: Vec::new(),
            generated_resources: Vec::new(),
            native_image_classes: Vec::new(),
            additional_archives: Vec::new(),
            uber_merged_resources: Vec::new(),
            uber_ignored_resources: Vec::new(),
            format_requirements: Vec::new(),
            non_existent_resources: BTreeSet::new(),
            appcds_directory: None,
        }
    }

    pub fn requires(&self, requirement: FormatRequirement) -> bool {
        self.format_requirements.contains(&requirement)
    }
}

/// Where the archives of this pass land and what they are called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub output_directory: PathBuf,
    pub base_name: String,
    /// Set when the output directory came from configuration rather than the build.
    pub explicit: bool,
}

impl OutputTarget {
    pub fn resolve(inputs: &PackageInputs, config: &PackageConfig) -> Self {
        let (output_directory, explicit) = match &config.output_directory {
            Some(dir) if dir.is_absolute() => (dir.clone(), true),
            Some(dir) => (inputs.target_directory.join(dir), true),
            None => (inputs.target_directory.clone(), false),
        };
        Self {
            output_directory,
            base_name: config
                .output_name
                .clone()
                .unwrap_or_else(|| inputs.base_name.clone()),
            explicit,
        }
    }

    pub fn jar(&self, suffix: &str) -> PathBuf {
        self.output_directory
            .join(format!("{}{}.jar", self.base_name, suffix))
    }
}

/// Inputs plus configuration, as stored in a plan file.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BuildPlan {
    pub inputs: PackageInputs,
    #[serde(default)]
    pub config: PackageConfig,
}

impl BuildPlan {
    /// Reads a plan from JSON, or from MessagePack when the extension is `.msgpack`.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(PackageError::io(path))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("msgpack") | Some("mp") => Ok(rmp_serde::from_slice(&bytes)?),
            _ => Ok(serde_json::from_slice(&bytes)?),
        }
    }
}
