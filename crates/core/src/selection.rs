use crate::config::PackageConfig;
use crate::error::{PackageError, Result};
use crate::naming::DependencyArtifactNamer;
use jarforge_api::{ApplicationModel, ArtifactKey, ResolvedDependency};
use std::collections::BTreeSet;
use std::path::Path;

/// Which dependencies get packaged, and where parent-first ones go.
///
/// Built once per packaging pass from the model and the configuration.
#[derive(Debug, Clone)]
pub struct DependencySelection {
    filter_optional: bool,
    included_optional: BTreeSet<ArtifactKey>,
    removed: BTreeSet<ArtifactKey>,
    parent_first: BTreeSet<ArtifactKey>,
    namer: DependencyArtifactNamer,
}

fn parse_keys(values: &[String]) -> Result<BTreeSet<ArtifactKey>> {
    values
        .iter()
        .map(|v| {
            v.parse::<ArtifactKey>()
                .map_err(|e| PackageError::Configuration(vec![e.to_string()]))
        })
        .collect()
}

impl DependencySelection {
    pub fn new(model: &ApplicationModel, config: &PackageConfig) -> Result<Self> {
        let mut parent_first = model.runner_parent_first.clone();
        parent_first.extend(
            model
                .dependencies
                .iter()
                .filter(|d| d.flags.parent_first)
                .map(|d| d.key().clone()),
        );
        parent_first.extend(parse_keys(&config.parent_first_artifacts)?);

        Ok(Self {
            filter_optional: config.filter_optional_dependencies,
            included_optional: parse_keys(&config.included_optional_dependencies)?,
            removed: parse_keys(&config.removed_artifacts)?,
            parent_first,
            namer: DependencyArtifactNamer::new(parse_keys(
                &config.jar.force_use_artifact_id_only_as_name,
            )?),
        })
    }

    /// `jar ∧ (¬optional ∨ explicitly included) ∧ ¬removed`
    pub fn include(&self, dep: &ResolvedDependency) -> bool {
        if !dep.is_jar() {
            return false;
        }
        if dep.is_optional() && self.filter_optional && !self.included_optional.contains(dep.key())
        {
            return false;
        }
        !self.removed.contains(dep.key())
    }

    pub fn is_parent_first(&self, key: &ArtifactKey) -> bool {
        self.parent_first.contains(key)
    }

    /// Runtime dependencies that pass [`include`](Self::include), in model order.
    pub fn runtime<'a>(
        &'a self,
        model: &'a ApplicationModel,
    ) -> impl Iterator<Item = &'a ResolvedDependency> + 'a {
        model.runtime_dependencies().filter(|d| self.include(d))
    }

    pub fn file_name(&self, dep: &ResolvedDependency, resolved: &Path) -> String {
        self.namer.file_name(dep, resolved)
    }
}
