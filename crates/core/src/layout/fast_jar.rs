//! The fast-jar distribution: a directory with the application split into tiers and a
//! manifest-only `quarkus-run.jar` that boots it.
//!
//! ```text
//! quarkus-app/
//!   app/<base>.jar
//!   lib/boot/        parent-first dependencies, on the run jar's Class-Path
//!   lib/main/        every other runtime dependency
//!   quarkus/         transformed-bytecode.jar, generated-bytecode.jar
//!   quarkus-application.dat
//!   quarkus-run.jar
//! ```

use crate::aot::AotIndexCollector;
use crate::decompiler::{self, Decompiler};
use crate::descriptor::{ApplicationDescriptor, JarDescriptor, jar_directories};
use crate::error::{PackageError, Result};
use crate::inputs::OutputTarget;
use crate::layout::common::{
    APPLICATION, CopiedArtifacts, GENERATED, IgnoredEntries, LibraryLayout, TRANSFORMED,
    class_path_attribute, copy_dependency, copy_files, ensure_empty_dir, ensure_manifest,
    make_world_readable, relative_path,
};
use crate::layout::{
    AOT_ENTRY_POINT, BuildContext, FAST_JAR_ENTRY_POINT, Format, ProducedArtifacts, mutable,
};
use crate::manifest::ManifestBuilder;
use jarforge_api::{ApplicationComponent, ApplicationManifestConfig, ApplicationManifestConfigBuilder};
use jarforge_archive::{ArchiveWriter, EntrySource};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const FAST_JAR_DIRECTORY: &str = "quarkus-app";
pub const LIB: &str = "lib";
pub const BOOT_LIB: &str = "boot";
pub const MAIN: &str = "main";
pub const DEPLOYMENT_LIB: &str = "deployment";
pub const APP: &str = "app";
pub const QUARKUS: &str = "quarkus";
pub const TRANSFORMED_BYTECODE_JAR: &str = "transformed-bytecode.jar";
pub const GENERATED_BYTECODE_JAR: &str = "generated-bytecode.jar";
pub const APPLICATION_DAT: &str = "quarkus-application.dat";
pub const RUN_JAR: &str = "quarkus-run.jar";
pub const DEPENDENCY_LIST: &str = "quarkus-app-dependencies.txt";
pub const KEEP_FILE: &str = ".keep";

/// Root of the fast-jar tree: the configured output directory itself, or `quarkus-app` below
/// the build output.
pub(crate) fn build_directory(target: &OutputTarget) -> PathBuf {
    if target.explicit {
        target.output_directory.clone()
    } else {
        target.output_directory.join(FAST_JAR_DIRECTORY)
    }
}

#[derive(Debug, Clone)]
pub struct FastJarPaths {
    pub build_dir: PathBuf,
    pub lib: PathBuf,
    pub main: PathBuf,
    pub boot: PathBuf,
    pub app: PathBuf,
    pub quarkus: PathBuf,
    pub providers: Option<PathBuf>,
}

impl FastJarPaths {
    pub fn new(ctx: &BuildContext) -> Self {
        let build_dir = build_directory(&ctx.target);
        let lib = build_dir.join(LIB);
        Self {
            main: lib.join(MAIN),
            boot: lib.join(BOOT_LIB),
            app: build_dir.join(APP),
            quarkus: build_dir.join(QUARKUS),
            providers: ctx
                .config
                .jar
                .user_providers_directory
                .as_ref()
                .map(|dir| build_dir.join(dir)),
            lib,
            build_dir,
        }
    }

    fn prepare(&self, rebuild: bool) -> Result<()> {
        if rebuild {
            return ensure_empty_dir(&self.quarkus);
        }
        ensure_empty_dir(&self.build_dir)?;
        for dir in [&self.main, &self.boot, &self.app, &self.quarkus] {
            std::fs::create_dir_all(dir).map_err(PackageError::io(dir))?;
        }
        if let Some(providers) = &self.providers {
            std::fs::create_dir_all(providers).map_err(PackageError::io(providers))?;
            let keep = providers.join(KEEP_FILE);
            std::fs::write(&keep, b"").map_err(PackageError::io(&keep))?;
        }
        Ok(())
    }
}

pub fn assemble(ctx: &BuildContext, format: Format) -> Result<ProducedArtifacts> {
    let paths = FastJarPaths::new(ctx);
    let rebuild = ctx.inputs.rebuild;
    paths.prepare(rebuild)?;
    let mut sbom = ApplicationManifestConfig::builder(&paths.build_dir);

    let decompile = prepare_decompiler(ctx, &paths)?;
    let mut decompiled = true;
    let mut jars = Vec::new();

    if let Some(transformed) = write_transformed_jar(ctx, &paths.quarkus)? {
        if let Some((tool, out)) = &decompile {
            decompiled &= decompiler::run(*tool, &transformed, out);
        }
        add_component(&mut sbom, &transformed);
        jars.push(transformed);
    }
    let generated = write_generated_jar(ctx, &paths.quarkus)?;
    if let Some((tool, out)) = &decompile {
        decompiled &= decompiler::run(*tool, &generated, out);
        if decompiled {
            info!("The decompiled output can be found at: {}", out.display());
        }
    }
    add_component(&mut sbom, &generated);
    jars.push(generated);

    let app_jar = paths.app.join(format!("{}.jar", ctx.target.base_name));
    if !rebuild {
        write_app_jar(ctx, &app_jar)?;
    }
    let main_component = ApplicationComponent::for_path(sbom.relativize(&app_jar))
        .with_dependency(&ctx.inputs.app_model.app_artifact);
    sbom.set_main_component(main_component);
    jars.push(app_jar.clone());

    let layout = LibraryLayout {
        main: paths.main.clone(),
        boot: Some(paths.boot.clone()),
        apply_transforms: true,
        write: !rebuild,
        development: false,
    };
    let mut copied = CopiedArtifacts::default();
    for dep in ctx.selection.runtime(&ctx.inputs.app_model) {
        copy_dependency(ctx, dep, &layout, &mut copied, &mut sbom)?;
    }
    let mut dependencies = copied.main().to_vec();
    dependencies.sort();
    jars.extend(dependencies);
    jars.extend(ctx.inputs.additional_archives.iter().cloned());
    let mut parent_first = copied.boot().to_vec();
    parent_first.sort();

    let aot = format.is_aot();
    let descriptor_path = write_descriptor(ctx, &paths.build_dir, &jars, &parent_first, aot)?;
    add_component(&mut sbom, &descriptor_path);

    let run_jar = paths.build_dir.join(RUN_JAR);
    if !rebuild {
        let class_path: Vec<String> = if aot {
            parent_first
                .iter()
                .chain(jars.iter())
                .map(|p| relative_path(&paths.build_dir, p))
                .collect()
        } else {
            parent_first.iter().map(|p| relative_path(&paths.build_dir, p)).collect()
        };
        let main_class = if aot { AOT_ENTRY_POINT } else { FAST_JAR_ENTRY_POINT };
        write_run_jar(ctx, &run_jar, class_path_attribute(&class_path).as_deref(), main_class)?;
    }
    add_component(&mut sbom, &run_jar);

    if format == Format::MutableJar {
        let properties = mutable::write_build_system_properties(
            &ctx.inputs.build_system_properties,
            &paths.quarkus,
        )?;
        let component = ApplicationComponent::for_path(sbom.relativize(&properties)).development();
        sbom.add_component(component);
        if !rebuild {
            mutable::write_deployment(ctx, &paths, &app_jar, &mut copied, &mut sbom)?;
        }
    }

    if !rebuild && ctx.config.jar.include_dependency_list {
        let list = write_dependency_list(ctx, &paths.build_dir)?;
        add_component(&mut sbom, &list);
    }

    make_world_readable(&paths.build_dir)?;
    sbom.set_runner_path(&run_jar);
    Ok(ProducedArtifacts {
        runner: run_jar,
        original_jar: None,
        library_dir: Some(paths.lib),
        format,
        classifier: None,
        manifest_config: Some(sbom.build()),
    })
}

fn add_component(sbom: &mut ApplicationManifestConfigBuilder, path: &Path) {
    let component = ApplicationComponent::for_path(sbom.relativize(path));
    sbom.add_component(component);
}

fn prepare_decompiler<'a>(
    ctx: &BuildContext<'a>,
    paths: &FastJarPaths,
) -> Result<Option<(&'a dyn Decompiler, PathBuf)>> {
    let config = &ctx.config.jar.decompiler;
    if !config.enabled {
        return Ok(None);
    }
    let Some(decompiler) = ctx.decompiler else {
        debug!("Decompilation requested but no decompiler is available");
        return Ok(None);
    };
    let parent = paths
        .build_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| paths.build_dir.clone());
    let out = parent.join(&config.output_directory);
    ensure_empty_dir(&out)?;
    std::fs::create_dir_all(&config.jar_directory).map_err(PackageError::io(&config.jar_directory))?;
    Ok(Some((decompiler, out)))
}

/// Replacement bytes of every transformed class, sorted by source jar then file name.
fn write_transformed_jar(ctx: &BuildContext, quarkus: &Path) -> Result<Option<PathBuf>> {
    let transformed = &ctx.inputs.transformed_classes;
    if transformed.is_empty() {
        return Ok(None);
    }
    let mut writer = ctx.parallel_writer(&quarkus.join(TRANSFORMED_BYTECODE_JAR))?;
    for (_, classes) in transformed.sorted() {
        for class in classes {
            if let Some(data) = &class.data {
                writer.add_file(EntrySource::from(data.as_slice()), &class.file_name, TRANSFORMED)?;
            }
        }
    }
    Ok(Some(writer.close()?))
}

fn write_generated_jar(ctx: &BuildContext, quarkus: &Path) -> Result<PathBuf> {
    let mut writer = ctx.parallel_writer(&quarkus.join(GENERATED_BYTECODE_JAR))?;
    let mut classes: Vec<_> = ctx.inputs.generated_classes.iter().collect();
    classes.sort_by_key(|c| c.binary_name());
    for class in classes {
        writer.add_file(
            EntrySource::from(class.data.as_slice()),
            &class.resource_name(),
            GENERATED,
        )?;
    }
    let mut resources: Vec<_> = ctx.inputs.generated_resources.iter().collect();
    resources.sort_by(|a, b| a.name.cmp(&b.name));
    for resource in resources {
        writer.add_file(EntrySource::from(resource.data.as_slice()), &resource.name, GENERATED)?;
    }
    Ok(writer.close()?)
}

/// The application root as a jar. Service files are copied as they are.
fn write_app_jar(ctx: &BuildContext, app_jar: &Path) -> Result<PathBuf> {
    let mut writer = ctx.parallel_writer(app_jar)?;
    let ignored = IgnoredEntries::user(&ctx.config.jar.user_configured_ignored_entries);
    copy_files(&ctx.inputs.app_root, &mut writer, None, &ignored, APPLICATION)?;
    ensure_manifest(&mut writer);
    Ok(writer.close()?)
}

fn write_run_jar(
    ctx: &BuildContext,
    run_jar: &Path,
    class_path: Option<&str>,
    main_class: &str,
) -> Result<PathBuf> {
    let built = ManifestBuilder::new(
        &ctx.config.jar.manifest,
        &ctx.inputs.application_info,
        &ctx.inputs.app_model.app_artifact,
    )
    .build(None, class_path, main_class);
    let mut writer = ctx.parallel_writer(run_jar)?;
    writer.add_manifest(built.manifest);
    Ok(writer.close()?)
}

fn write_descriptor(
    ctx: &BuildContext,
    build_dir: &Path,
    jars: &[PathBuf],
    parent_first: &[PathBuf],
    aot: bool,
) -> Result<PathBuf> {
    let mut descriptors = Vec::with_capacity(jars.len());
    for jar in jars {
        descriptors.push(JarDescriptor {
            path: relative_path(build_dir, jar),
            directories: jar_directories(jar)?,
        });
    }

    let resource_index = if aot {
        let mut collector = AotIndexCollector::new();
        for jar in parent_first.iter().chain(jars) {
            collector.add_tree(jar)?;
        }
        Some(collector.finish())
    } else {
        None
    };

    let descriptor = ApplicationDescriptor {
        main_class: ctx.inputs.main_class.clone(),
        jars: descriptors,
        parent_first: parent_first.iter().map(|p| relative_path(build_dir, p)).collect(),
        non_existent_resources: ctx.inputs.non_existent_resources.iter().cloned().collect(),
        resource_index,
    };
    let path = build_dir.join(APPLICATION_DAT);
    descriptor.write(&path)?;
    debug!("Wrote application descriptor {}", path.display());
    Ok(path)
}

/// Sorted `group:artifact:classifier:type:version` of every runtime dependency, one per line.
fn write_dependency_list(ctx: &BuildContext, build_dir: &Path) -> Result<PathBuf> {
    let mut lines: Vec<String> = ctx
        .inputs
        .app_model
        .runtime_dependencies()
        .map(|d| d.to_gactv_string())
        .collect();
    lines.sort();
    let mut content = String::new();
    for line in lines {
        content.push_str(&line);
        content.push('\n');
    }
    let path = build_dir.join(DEPENDENCY_LIST);
    std::fs::write(&path, content).map_err(PackageError::io(&path))?;
    Ok(path)
}
