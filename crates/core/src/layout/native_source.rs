//! Input for the native image builder: a thin jar plus `lib/`, with native-image-only classes
//! added and the application's top-level JSON configuration files next to it.

use crate::content::{self, TreeEntry};
use crate::error::{PackageError, Result};
use crate::layout::common::{ensure_empty_dir, make_world_readable};
use crate::layout::fast_jar::LIB;
use crate::layout::{BuildContext, Format, ProducedArtifacts, legacy};
use jarforge_api::ApplicationManifestConfig;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SOURCE_JAR_SUFFIX: &str = "-native-image-source-jar";

pub fn source_jar_directory(ctx: &BuildContext) -> PathBuf {
    ctx.target
        .output_directory
        .join(format!("{}{}", ctx.target.base_name, SOURCE_JAR_SUFFIX))
}

pub fn assemble(ctx: &BuildContext) -> Result<ProducedArtifacts> {
    let dir = source_jar_directory(ctx);
    ensure_empty_dir(&dir)?;
    copy_json_config_files(&ctx.inputs.app_root, &dir)?;

    let runner = dir.join(format!(
        "{}{}.jar",
        ctx.target.base_name, ctx.config.runner_suffix
    ));
    let lib_dir = dir.join(LIB);
    std::fs::create_dir_all(&lib_dir).map_err(PackageError::io(&lib_dir))?;

    let mut classes = ctx.inputs.generated_classes.clone();
    classes.extend(ctx.inputs.native_image_classes.iter().cloned());

    info!("Building native image source jar: {}", runner.display());
    let mut sbom = ApplicationManifestConfig::builder(&dir);
    legacy::generate(ctx, &runner, &lib_dir, &classes, false, &mut sbom)?;
    make_world_readable(&dir)?;
    sbom.set_runner_path(&runner);

    Ok(ProducedArtifacts {
        runner,
        original_jar: None,
        library_dir: Some(lib_dir),
        format: Format::LegacyThinJar,
        classifier: None,
        manifest_config: Some(sbom.build()),
    })
}

/// Copies `*.json` files sitting directly in the application root into `target`.
fn copy_json_config_files(app_root: &Path, target: &Path) -> Result<usize> {
    let mut copied = 0;
    content::walk(app_root, |entry| {
        if let TreeEntry::File { name, source } = entry {
            if !name.contains('/') && name.ends_with(".json") {
                let path = target.join(&name);
                std::fs::write(&path, source.read_all()?).map_err(PackageError::io(&path))?;
                copied += 1;
            }
        }
        Ok(())
    })?;
    Ok(copied)
}
