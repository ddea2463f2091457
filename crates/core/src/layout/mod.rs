//! Turns a resolved application into one of the distribution formats.
//!
//! Every format is a plain `assemble` function over a [`BuildContext`]; [`LayoutEngine`]
//! picks one with a single `match`.

pub mod common;
pub mod fast_jar;
pub mod legacy;
pub mod mutable;
pub mod native_source;
pub mod uber;

use crate::appcds;
use crate::config::{JarType, PackageConfig};
use crate::decompiler::Decompiler;
use crate::error::{PackageError, Result};
use crate::inputs::{FormatRequirement, OutputTarget, PackageInputs};
use crate::selection::DependencySelection;
use crate::validate::validate;
use jarforge_api::ApplicationManifestConfig;
use jarforge_archive::{ArchiveOptions, CompressionPool, ParallelArchiveWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// Main class of `quarkus-run.jar`; reads the application descriptor and starts the real main class.
pub const FAST_JAR_ENTRY_POINT: &str = "io.quarkus.bootstrap.runner.QuarkusEntryPoint";
/// Main class of AOT layouts; boots from the serialized resource index.
pub const AOT_ENTRY_POINT: &str = "io.quarkus.bootstrap.runner.AotQuarkusEntryPoint";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    FastJar,
    MutableJar,
    LegacyThinJar,
    UberJar,
    AotFastJar,
    AotLegacyJar,
}

impl Format {
    /// Extension requirements win over configuration. Uber and legacy requirements together
    /// are a configuration error.
    pub fn select(inputs: &PackageInputs, config: &PackageConfig) -> Result<Self> {
        let uber = inputs.requires(FormatRequirement::UberJar);
        let legacy = inputs.requires(FormatRequirement::LegacyJar);
        if uber && legacy {
            return Err(PackageError::Configuration(vec![
                "Extensions with conflicting package types: one requires uber-jar, another requires legacy-jar"
                    .to_string(),
            ]));
        }
        let aot = config.jar.aot;
        let format = if !legacy && (uber || config.jar.kind == JarType::UberJar) {
            Format::UberJar
        } else if legacy || config.jar.kind == JarType::LegacyJar {
            if aot {
                Format::AotLegacyJar
            } else {
                Format::LegacyThinJar
            }
        } else if config.jar.kind == JarType::MutableJar {
            Format::MutableJar
        } else if aot {
            Format::AotFastJar
        } else {
            Format::FastJar
        };
        Ok(format)
    }

    pub fn is_aot(self) -> bool {
        matches!(self, Format::AotFastJar | Format::AotLegacyJar)
    }

    pub fn jar_type(self) -> JarType {
        match self {
            Format::FastJar | Format::AotFastJar => JarType::FastJar,
            Format::MutableJar => JarType::MutableJar,
            Format::LegacyThinJar | Format::AotLegacyJar => JarType::LegacyJar,
            Format::UberJar => JarType::UberJar,
        }
    }
}

/// What a packaging pass produced.
#[derive(Debug, Clone)]
pub struct ProducedArtifacts {
    /// The jar to run.
    pub runner: PathBuf,
    /// A previous plain jar left next to an uber jar.
    pub original_jar: Option<PathBuf>,
    pub library_dir: Option<PathBuf>,
    pub format: Format,
    pub classifier: Option<String>,
    pub manifest_config: Option<ApplicationManifestConfig>,
}

/// Everything one assembly reads. Nothing in here is shared across formats.
pub struct BuildContext<'a> {
    pub inputs: &'a PackageInputs,
    pub config: &'a PackageConfig,
    pub target: OutputTarget,
    pub selection: DependencySelection,
    pub options: ArchiveOptions,
    pub pool: CompressionPool,
    pub decompiler: Option<&'a dyn Decompiler>,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        inputs: &'a PackageInputs,
        config: &'a PackageConfig,
        pool: CompressionPool,
        decompiler: Option<&'a dyn Decompiler>,
    ) -> Result<Self> {
        Ok(Self {
            inputs,
            config,
            target: OutputTarget::resolve(inputs, config),
            selection: DependencySelection::new(&inputs.app_model, config)?,
            options: config.archive_options(),
            pool,
            decompiler,
        })
    }

    pub(crate) fn parallel_writer(&self, path: &Path) -> Result<ParallelArchiveWriter> {
        Ok(ParallelArchiveWriter::create(
            path,
            self.options,
            self.pool.clone(),
        )?)
    }
}

/// Packages applications. Holds the compression pool shared by every archive it writes.
pub struct LayoutEngine {
    pool: CompressionPool,
    decompiler: Option<Box<dyn Decompiler>>,
}

impl LayoutEngine {
    pub fn new(pool: CompressionPool) -> Self {
        Self {
            pool,
            decompiler: None,
        }
    }

    /// Pool sized from `compression_threads`, one thread per CPU when zero.
    pub fn from_config(config: &PackageConfig) -> Result<Self> {
        let threads = match config.compression_threads {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        };
        Ok(Self::new(CompressionPool::new(threads)?))
    }

    pub fn with_decompiler(mut self, decompiler: Box<dyn Decompiler>) -> Self {
        self.decompiler = Some(decompiler);
        self
    }

    pub fn pool(&self) -> &CompressionPool {
        &self.pool
    }

    pub fn assemble(&self, inputs: &PackageInputs, config: &PackageConfig) -> Result<ProducedArtifacts> {
        validate(inputs, config)?;
        if let Some(dir) = &inputs.appcds_directory {
            appcds::write_class_list(dir, &inputs.generated_classes, &inputs.transformed_classes)?;
        }

        let format = Format::select(inputs, config)?;
        let ctx = BuildContext::new(inputs, config, self.pool.clone(), self.decompiler.as_deref())?;
        info!(
            "Packaging {} as {:?} into {}",
            ctx.target.base_name,
            format,
            ctx.target.output_directory.display()
        );

        match format {
            Format::FastJar | Format::MutableJar | Format::AotFastJar => {
                fast_jar::assemble(&ctx, format)
            }
            Format::LegacyThinJar | Format::AotLegacyJar => legacy::assemble(&ctx, format),
            Format::UberJar => uber::assemble(&ctx),
        }
    }

    /// Thin jar plus `lib/` laid out for the native image builder.
    pub fn assemble_native_image_source(
        &self,
        inputs: &PackageInputs,
        config: &PackageConfig,
    ) -> Result<ProducedArtifacts> {
        validate(inputs, config)?;
        let ctx = BuildContext::new(inputs, config, self.pool.clone(), self.decompiler.as_deref())?;
        native_source::assemble(&ctx)
    }
}
