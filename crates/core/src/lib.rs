pub mod error;
pub mod logging;

pub mod aot;
pub mod appcds;
pub mod config;
pub mod content;
pub mod decompiler;
pub mod descriptor;
pub mod inputs;
pub mod layout;
pub mod manifest;
pub mod naming;
pub mod selection;
pub mod validate;

pub use config::{JarConfig, JarType, PackageConfig};
pub use decompiler::{Decompiler, ToolJarDecompiler};
pub use error::{PackageError, Result};
pub use inputs::{BuildPlan, FormatRequirement, OutputTarget, PackageInputs};
pub use layout::{Format, LayoutEngine, ProducedArtifacts};
