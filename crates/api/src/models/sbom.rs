use super::dependency::{ArtifactCoords, ArtifactKey, ResolvedDependency};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ComponentScope {
    #[default]
    Runtime,
    Development,
}

/// One produced file of a distribution and where it came from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApplicationComponent {
    /// Path relative to the distribution directory, `/`-separated.
    pub path: Option<String>,
    pub dependency: Option<ArtifactCoords>,
    #[serde(default)]
    pub dependencies: Vec<ArtifactKey>,
    #[serde(default)]
    pub scope: ComponentScope,
    pub pedigree: Option<String>,
}

impl ApplicationComponent {
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            dependency: None,
            dependencies: Vec::new(),
            scope: ComponentScope::Runtime,
            pedigree: None,
        }
    }

    pub fn with_dependency(mut self, dep: &ResolvedDependency) -> Self {
        self.dependency = Some(dep.coords.clone());
        self.dependencies = dep.dependencies.clone();
        self
    }

    pub fn with_dependencies(mut self, keys: Vec<ArtifactKey>) -> Self {
        self.dependencies = keys;
        self
    }

    pub fn development(mut self) -> Self {
        self.scope = ComponentScope::Development;
        self
    }

    pub fn with_pedigree(mut self, pedigree: impl Into<String>) -> Self {
        self.pedigree = Some(pedigree.into());
        self
    }
}

/// Provenance record of one build. Not read by the runtime.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApplicationManifestConfig {
    pub distribution_directory: PathBuf,
    pub main_component: Option<ApplicationComponent>,
    pub runner_path: Option<String>,
    pub components: Vec<ApplicationComponent>,
}

impl ApplicationManifestConfig {
    pub fn builder(distribution_directory: impl Into<PathBuf>) -> ApplicationManifestConfigBuilder {
        ApplicationManifestConfigBuilder {
            distribution_directory: distribution_directory.into(),
            main_component: None,
            runner_path: None,
            components: Vec::new(),
        }
    }

    pub fn component(&self, path: &str) -> Option<&ApplicationComponent> {
        self.components
            .iter()
            .find(|c| c.path.as_deref() == Some(path))
    }
}

pub struct ApplicationManifestConfigBuilder {
    distribution_directory: PathBuf,
    main_component: Option<ApplicationComponent>,
    runner_path: Option<String>,
    components: Vec<ApplicationComponent>,
}

impl ApplicationManifestConfigBuilder {
    pub fn distribution_directory(&self) -> &Path {
        &self.distribution_directory
    }

    /// Turns an absolute output path into the `/`-separated form recorded in components.
    pub fn relativize(&self, path: &Path) -> String {
        let rel = path
            .strip_prefix(&self.distribution_directory)
            .unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn add_component(&mut self, component: ApplicationComponent) -> &mut Self {
        self.components.push(component);
        self
    }

    pub fn set_main_component(&mut self, component: ApplicationComponent) -> &mut Self {
        self.main_component = Some(component);
        self
    }

    pub fn set_runner_path(&mut self, path: &Path) -> &mut Self {
        self.runner_path = Some(self.relativize(path));
        self
    }

    pub fn build(mut self) -> ApplicationManifestConfig {
        self.components.sort_by(|a, b| a.path.cmp(&b.path));
        ApplicationManifestConfig {
            distribution_directory: self.distribution_directory,
            main_component: self.main_component,
            runner_path: self.runner_path,
            components: self.components,
        }
    }
}
