use jarforge_core::{BuildPlan, LayoutEngine, PackageConfig, ProducedArtifacts, ToolJarDecompiler};
use std::path::Path;
use tracing::info;

pub fn run(
    plan: &Path,
    config: Option<&Path>,
    native_source: bool,
    sbom: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let BuildPlan {
        inputs,
        config: planned,
    } = BuildPlan::load(plan)?;
    let config = match config {
        Some(path) => PackageConfig::from_json_file(path)?,
        None => planned,
    };

    let engine = engine(&config)?;
    let produced = if native_source {
        engine.assemble_native_image_source(&inputs, &config)?
    } else {
        engine.assemble(&inputs, &config)?
    };
    report(&produced);

    if let Some(path) = sbom {
        if let Some(manifest_config) = &produced.manifest_config {
            std::fs::write(path, serde_json::to_vec_pretty(manifest_config)?)?;
            info!("Provenance record written to {}", path.display());
        }
    }
    Ok(())
}

fn engine(config: &PackageConfig) -> jarforge_core::Result<LayoutEngine> {
    let engine = LayoutEngine::from_config(config)?;
    let decompiler = &config.jar.decompiler;
    if !decompiler.enabled {
        return Ok(engine);
    }
    let tool = decompiler.jar_directory.join(&decompiler.tool_jar);
    Ok(engine.with_decompiler(Box::new(ToolJarDecompiler::new(tool))))
}

fn report(produced: &ProducedArtifacts) {
    info!("Built {:?}: {}", produced.format, produced.runner.display());
    if let Some(lib) = &produced.library_dir {
        info!("Libraries: {}", lib.display());
    }
    if let Some(original) = &produced.original_jar {
        info!("Original jar kept at {}", original.display());
    }
    if let Some(classifier) = &produced.classifier {
        info!("Classifier: {}", classifier);
    }
}
