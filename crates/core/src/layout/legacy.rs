//! `<base>-runner.jar` with the application inside and its dependencies next to it in `lib/`.

use crate::aot::AotIndexCollector;
use crate::content;
use crate::descriptor::{ApplicationDescriptor, JarDescriptor, jar_directories};
use crate::error::{PackageError, Result};
use crate::layout::common::{
    ConcatenatedEntries, GENERATED, IgnoredEntries, class_path_attribute, copy_common_content,
    ensure_empty_dir, make_world_readable, package_directory, remove_file_if_exists,
    unsign_dependency,
};
use crate::layout::fast_jar::LIB;
use crate::layout::{AOT_ENTRY_POINT, BuildContext, Format, ProducedArtifacts};
use crate::manifest::ManifestBuilder;
use jarforge_api::{
    ApplicationComponent, ApplicationManifestConfig, ApplicationManifestConfigBuilder, GeneratedClass,
    ResolvedDependency,
};
use jarforge_archive::{ArchiveWriter, EntrySource, MANIFEST_PATH, Manifest};
use std::path::{Path, PathBuf};
use tracing::info;

/// Where legacy AOT layouts keep the serialized application descriptor inside the runner jar.
pub const AOT_DESCRIPTOR_ENTRY: &str = "META-INF/quarkus-application.dat";
pub const MODIFIED_PREFIX: &str = "modified-";

pub fn assemble(ctx: &BuildContext, format: Format) -> Result<ProducedArtifacts> {
    let output = &ctx.target.output_directory;
    let runner = ctx.target.jar(&ctx.config.runner_suffix);
    let lib_dir = output.join(LIB);
    remove_file_if_exists(&runner)?;
    ensure_empty_dir(&lib_dir)?;

    info!("Building thin jar: {}", runner.display());
    let mut sbom = ApplicationManifestConfig::builder(output);
    generate(
        ctx,
        &runner,
        &lib_dir,
        &ctx.inputs.generated_classes,
        format.is_aot(),
        &mut sbom,
    )?;
    make_world_readable(&runner)?;
    make_world_readable(&lib_dir)?;
    sbom.set_runner_path(&runner);

    Ok(ProducedArtifacts {
        runner,
        original_jar: None,
        library_dir: Some(lib_dir),
        format,
        classifier: ctx.config.runner_classifier(),
        manifest_config: Some(sbom.build()),
    })
}

/// Writes the runner jar and fills `lib_dir`. `lib_dir` must exist and be empty.
pub fn generate(
    ctx: &BuildContext,
    runner: &Path,
    lib_dir: &Path,
    classes: &[GeneratedClass],
    aot: bool,
    sbom: &mut ApplicationManifestConfigBuilder,
) -> Result<PathBuf> {
    let mut libraries = Vec::new();
    for dep in ctx.selection.runtime(&ctx.inputs.app_model) {
        for resolved in &dep.resolved_paths {
            let library = copy_library(ctx, dep, resolved, lib_dir)
                .map_err(PackageError::dependency(&dep.coords, resolved))?;
            let component = ApplicationComponent::for_path(sbom.relativize(&library)).with_dependency(dep);
            sbom.add_component(component);
            libraries.push(library);
        }
    }
    let class_path: Vec<String> = libraries
        .iter()
        .filter_map(|l| l.file_name())
        .map(|name| format!("{}/{}", LIB, name.to_string_lossy()))
        .collect();

    let existing = match content::read(&ctx.inputs.app_root, MANIFEST_PATH)? {
        Some(bytes) => Some(Manifest::parse(&bytes)?),
        None => None,
    };
    let main_class = if aot {
        AOT_ENTRY_POINT
    } else {
        ctx.inputs.main_class.as_str()
    };
    let built = ManifestBuilder::new(
        &ctx.config.jar.manifest,
        &ctx.inputs.application_info,
        &ctx.inputs.app_model.app_artifact,
    )
    .build(existing, class_path_attribute(&class_path).as_deref(), main_class);

    let mut writer = ctx.parallel_writer(runner)?;
    writer.add_manifest(built.manifest);
    let ignored = IgnoredEntries::with_defaults(&ctx.config.jar.user_configured_ignored_entries);
    let mut concatenated = ConcatenatedEntries::new(&ctx.config.jar.user_merged_resources);
    copy_common_content(ctx, &mut writer, classes, &ignored, &mut concatenated)?;

    if aot {
        let descriptor = aot_descriptor(ctx, classes, &libraries, &class_path)?;
        writer.add_file(
            EntrySource::Bytes(descriptor.to_bytes()?),
            AOT_DESCRIPTOR_ENTRY,
            GENERATED,
        )?;
    }
    concatenated.write_into(&mut writer)?;

    let runner = writer.close()?;
    let main_component = ApplicationComponent::for_path(sbom.relativize(&runner))
        .with_dependency(&ctx.inputs.app_model.app_artifact);
    sbom.set_main_component(main_component);
    Ok(runner)
}

/// Copies one resolved path of `dep` into `lib_dir` and returns where it landed.
///
/// Jars lose their signatures; jars the build transformed lose every transformed entry and get
/// a `modified-` name. Directories are zipped.
fn copy_library(
    ctx: &BuildContext,
    dep: &ResolvedDependency,
    resolved: &Path,
    lib_dir: &Path,
) -> Result<PathBuf> {
    let file_name = ctx.selection.file_name(dep, resolved);
    if resolved.is_dir() {
        return package_directory(ctx, resolved, &lib_dir.join(file_name));
    }
    let transformed = ctx.inputs.transformed_classes.files_for_jar(resolved);
    let target = if transformed.is_empty() {
        lib_dir.join(file_name)
    } else {
        lib_dir.join(format!("{MODIFIED_PREFIX}{file_name}"))
    };
    unsign_dependency(dep, resolved, &target, &transformed)?;
    Ok(target)
}

fn aot_descriptor(
    ctx: &BuildContext,
    classes: &[GeneratedClass],
    libraries: &[PathBuf],
    class_path: &[String],
) -> Result<ApplicationDescriptor> {
    let mut collector = AotIndexCollector::new();
    for class in ctx.inputs.transformed_classes.iter().filter(|c| !c.is_removed()) {
        collector.add_path(&class.file_name);
    }
    collector.add_generated(classes, &ctx.inputs.generated_resources);
    collector.add_tree(&ctx.inputs.app_root)?;

    let mut jars = Vec::with_capacity(libraries.len());
    for (library, path) in libraries.iter().zip(class_path) {
        collector.add_tree(library)?;
        jars.push(JarDescriptor {
            path: path.clone(),
            directories: jar_directories(library)?,
        });
    }

    Ok(ApplicationDescriptor {
        main_class: ctx.inputs.main_class.clone(),
        jars,
        parent_first: Vec::new(),
        non_existent_resources: ctx.inputs.non_existent_resources.iter().cloned().collect(),
        resource_index: Some(collector.finish()),
    })
}
