use crate::config::{JarType, PackageConfig};
use crate::error::{PackageError, Result};
use crate::inputs::{FormatRequirement, OutputTarget, PackageInputs};
use jarforge_api::ArtifactKey;
use std::collections::BTreeMap;
use std::path::Path;

/// Checks everything that can be checked before the first archive is opened.
///
/// Every problem found is reported in one [`PackageError::Configuration`].
pub fn validate(inputs: &PackageInputs, config: &PackageConfig) -> Result<()> {
    let mut problems = Vec::new();

    duplicate_generated_classes(inputs, &mut problems);

    if inputs.requires(FormatRequirement::UberJar) && inputs.requires(FormatRequirement::LegacyJar) {
        problems.push(
            "Extensions with conflicting package types: one requires uber-jar, another requires legacy-jar"
                .to_string(),
        );
    }

    let keys = [
        ("included-optional-dependencies", &config.included_optional_dependencies),
        ("parent-first-artifacts", &config.parent_first_artifacts),
        ("removed-artifacts", &config.removed_artifacts),
        (
            "jar.force-use-artifact-id-only-as-name",
            &config.jar.force_use_artifact_id_only_as_name,
        ),
    ];
    for (option, values) in keys {
        for value in values {
            if let Err(e) = value.parse::<ArtifactKey>() {
                problems.push(format!("{option}: {e}"));
            }
        }
    }

    if builds_fast_jar(inputs, config) {
        additional_archives(inputs, config, &mut problems);
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(PackageError::Configuration(problems))
    }
}

fn duplicate_generated_classes(inputs: &PackageInputs, problems: &mut Vec<String>) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for class in &inputs.generated_classes {
        *counts.entry(class.binary_name()).or_default() += 1;
    }
    for (name, count) in counts {
        if count > 1 {
            problems.push(format!(
                "Generated class {name} was produced {count} times"
            ));
        }
    }
}

fn builds_fast_jar(inputs: &PackageInputs, config: &PackageConfig) -> bool {
    inputs.format_requirements.is_empty()
        && matches!(config.jar.kind, JarType::FastJar | JarType::MutableJar)
}

fn additional_archives(inputs: &PackageInputs, config: &PackageConfig, problems: &mut Vec<String>) {
    if inputs.additional_archives.is_empty() {
        return;
    }
    let providers = config.jar.user_providers_directory.as_ref().map(|dir| {
        let target = OutputTarget::resolve(inputs, config);
        crate::layout::fast_jar::build_directory(&target).join(dir)
    });
    for archive in &inputs.additional_archives {
        let inside = match &providers {
            Some(dir) => archive.parent() == Some(dir.as_path()),
            None => false,
        };
        if !inside {
            problems.push(format!(
                "Additional application archive {} is not in the user providers directory {}",
                archive.display(),
                providers
                    .as_deref()
                    .map(Path::display)
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "(not configured)".to_string())
            ));
        }
    }
}
