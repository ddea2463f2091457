//! A single self-contained `<base>-runner.jar` with every dependency unpacked into it.

use crate::content::{self, TreeEntry};
use crate::error::{PackageError, Result};
use crate::layout::common::{
    ConcatenatedEntries, DuplicateTracker, IgnoredEntries, copy_common_content,
    make_world_readable,
};
use crate::layout::{BuildContext, Format, ProducedArtifacts};
use crate::manifest::ManifestBuilder;
use jarforge_api::{ApplicationComponent, ApplicationManifestConfig, ArtifactKey, GeneratedClass};
use jarforge_archive::{
    ArchiveWriter, MANIFEST_PATH, Manifest, MountedArchiveWriter, is_signature_file,
};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

pub fn assemble(ctx: &BuildContext) -> Result<ProducedArtifacts> {
    let output = &ctx.target.output_directory;
    std::fs::create_dir_all(output).map_err(PackageError::io(output))?;
    let runner = ctx.target.jar(&ctx.config.runner_suffix);
    info!("Building uber jar: {}", runner.display());

    // Built beside the final name and moved over it once complete.
    let staging = tempfile::Builder::new()
        .prefix(&format!(".{}-", ctx.target.base_name))
        .suffix(".jar")
        .tempfile_in(output)
        .map_err(PackageError::io(output))?
        .into_temp_path();
    let mut writer = MountedArchiveWriter::create(staging.to_path_buf(), ctx.options)?;
    let dependencies = build(ctx, &mut writer, &ctx.inputs.generated_classes)?;
    writer.close()?;
    staging
        .persist(&runner)
        .map_err(|e| PackageError::io(&runner)(e.error))?;
    make_world_readable(&runner)?;

    let mut sbom = ApplicationManifestConfig::builder(output);
    let main_component = ApplicationComponent::for_path(sbom.relativize(&runner))
        .with_dependency(&ctx.inputs.app_model.app_artifact)
        .with_dependencies(dependencies);
    sbom.set_main_component(main_component);
    sbom.set_runner_path(&runner);

    let standard = ctx.target.jar("");
    let original_jar = if standard != runner && standard.is_file() {
        Some(standard)
    } else {
        None
    };

    Ok(ProducedArtifacts {
        runner,
        original_jar,
        library_dir: None,
        format: Format::UberJar,
        classifier: ctx.config.runner_classifier(),
        manifest_config: Some(sbom.build()),
    })
}

/// Fills `writer` with the application and every included runtime dependency. Returns the keys
/// of the dependencies that went in.
pub fn build(
    ctx: &BuildContext,
    writer: &mut MountedArchiveWriter,
    classes: &[GeneratedClass],
) -> Result<Vec<ArtifactKey>> {
    let inputs = ctx.inputs;
    let jar = &ctx.config.jar;
    let ignored = IgnoredEntries::with_defaults(
        jar.user_configured_ignored_entries
            .iter()
            .chain(&inputs.uber_ignored_resources),
    );
    let mut concatenated = ConcatenatedEntries::new(
        jar.user_merged_resources
            .iter()
            .chain(&inputs.uber_merged_resources),
    );

    let existing = match content::read(&inputs.app_root, MANIFEST_PATH)? {
        Some(bytes) => Some(Manifest::parse(&bytes)?),
        None => None,
    };
    let built = ManifestBuilder::new(&jar.manifest, &inputs.application_info, &inputs.app_model.app_artifact)
        .build(existing, None, &inputs.main_class);
    writer.add_manifest(built.manifest);

    copy_common_content(ctx, writer, classes, &ignored, &mut concatenated)?;

    let generated: BTreeSet<String> = inputs
        .generated_resources
        .iter()
        .map(|r| r.name.clone())
        .collect();
    let mut duplicates = DuplicateTracker::default();
    let mut included = Vec::new();
    for dep in ctx.selection.runtime(&inputs.app_model) {
        let label = dep.to_string();
        for resolved in &dep.resolved_paths {
            let mut skip = inputs.transformed_classes.files_for_jar(resolved);
            skip.extend(generated.iter().cloned());
            let mut visitor = DependencyVisitor {
                label: &label,
                skip: &skip,
                ignored: &ignored,
                concatenated: &mut concatenated,
                duplicates: &mut duplicates,
            };
            visitor
                .copy(resolved, writer)
                .map_err(PackageError::dependency(&dep.coords, resolved))?;
        }
        included.push(dep.key().clone());
    }
    duplicates.report();

    concatenated.write_into(writer)?;
    if writer.make_multi_version() {
        debug!("uber jar will be marked as multi-release jar");
    }
    Ok(included)
}

struct DependencyVisitor<'a> {
    label: &'a str,
    /// Entries the build replaced or generated.
    skip: &'a BTreeSet<String>,
    ignored: &'a IgnoredEntries,
    concatenated: &'a mut ConcatenatedEntries,
    duplicates: &'a mut DuplicateTracker,
}

impl DependencyVisitor<'_> {
    fn copy(&mut self, root: &Path, writer: &mut MountedArchiveWriter) -> Result<()> {
        content::walk(root, |entry| {
            match entry {
                TreeEntry::Directory(name) => writer.add_directory(&name, self.label)?,
                TreeEntry::File { name, source } => {
                    if is_signature_file(&name) {
                        debug!(
                            "Signature file {} from dependency {} will not be included in the uber jar",
                            name, self.label
                        );
                        return Ok(());
                    }
                    if self.skip.contains(&name) {
                        return Ok(());
                    }
                    if self.concatenated.is_concatenated(&name) {
                        self.concatenated.push(&name, &source.read_all()?);
                        return Ok(());
                    }
                    if self.ignored.contains(&name) {
                        return Ok(());
                    }
                    self.duplicates.record(&name, self.label);
                    writer.add_file_if_not_exists(source, &name, self.label)?;
                }
            }
            Ok(())
        })
    }
}
