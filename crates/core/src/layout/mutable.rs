//! Extra state a mutable jar keeps so it can be re-augmented later without resolving again.

use crate::error::{PackageError, Result};
use crate::layout::BuildContext;
use crate::layout::common::{CopiedArtifacts, LibraryLayout, copy_dependency, relative_path};
use crate::layout::fast_jar::{DEPLOYMENT_LIB, FastJarPaths};
use jarforge_api::{ApplicationComponent, ApplicationManifestConfigBuilder, MutableJarApplicationModel};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const BUILD_SYSTEM_PROPERTIES: &str = "build-system.properties";
pub const APPMODEL_DAT: &str = "appmodel.dat";
pub const DEPLOYMENT_CLASS_PATH_DAT: &str = "deployment-class-path.dat";

/// Writes `key=value` lines with Java properties escaping, sorted, joined by `\n`, no comments.
pub fn write_build_system_properties(
    properties: &BTreeMap<String, String>,
    quarkus_dir: &Path,
) -> Result<PathBuf> {
    let mut lines: Vec<String> = properties
        .iter()
        .map(|(key, value)| format!("{}={}", escape_property(key, true), escape_property(value, false)))
        .collect();
    lines.sort();
    let path = quarkus_dir.join(BUILD_SYSTEM_PROPERTIES);
    std::fs::write(&path, lines.join("\n")).map_err(PackageError::io(&path))?;
    Ok(path)
}

fn escape_property(value: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            ' ' if i == 0 || is_key => out.push_str("\\ "),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04X}", unit);
                }
            }
        }
    }
    out
}

/// Copies every deployment dependency to `lib/deployment` and records how to rebuild the
/// classpath: the serialized application model and the deployment class path.
pub fn write_deployment(
    ctx: &BuildContext,
    paths: &FastJarPaths,
    app_jar: &Path,
    copied: &mut CopiedArtifacts,
    sbom: &mut ApplicationManifestConfigBuilder,
) -> Result<PathBuf> {
    let deployment = paths.lib.join(DEPLOYMENT_LIB);
    std::fs::create_dir_all(&deployment).map_err(PackageError::io(&deployment))?;

    let layout = LibraryLayout {
        main: deployment.clone(),
        boot: None,
        apply_transforms: false,
        write: true,
        development: true,
    };
    let model = &ctx.inputs.app_model;
    for dep in model.dependencies.iter().filter(|d| ctx.selection.include(d)) {
        copy_dependency(ctx, dep, &layout, copied, sbom)?;
    }

    let relative_paths = copied.relative_paths(&paths.build_dir);
    let mut class_path = Vec::new();
    for dep in &model.dependencies {
        if let Some(entries) = relative_paths.get(&dep.key().to_string()) {
            class_path.extend(entries.iter().cloned());
        }
    }

    let app_model = MutableJarApplicationModel {
        base_name: ctx.target.base_name.clone(),
        relative_paths,
        app_model: model.clone(),
        user_providers_directory: ctx.config.jar.user_providers_directory.clone(),
        app_archive_path: relative_path(&paths.build_dir, app_jar),
    };
    let appmodel = deployment.join(APPMODEL_DAT);
    let bytes = rmp_serde::to_vec_named(&app_model)?;
    let compressed = zstd::encode_all(&bytes[..], 0).map_err(PackageError::io(&appmodel))?;
    std::fs::write(&appmodel, compressed).map_err(PackageError::io(&appmodel))?;

    let deployment_cp = deployment.join(DEPLOYMENT_CLASS_PATH_DAT);
    std::fs::write(&deployment_cp, rmp_serde::to_vec(&class_path)?)
        .map_err(PackageError::io(&deployment_cp))?;
    debug!(
        "Recorded {} deployment class path entries in {}",
        class_path.len(),
        deployment_cp.display()
    );

    for path in [&appmodel, &deployment_cp] {
        let component = ApplicationComponent::for_path(sbom.relativize(path)).development();
        sbom.add_component(component);
    }
    Ok(deployment)
}

pub fn read_application_model(path: &Path) -> Result<MutableJarApplicationModel> {
    let compressed = std::fs::read(path).map_err(PackageError::io(path))?;
    let bytes = zstd::decode_all(&compressed[..]).map_err(PackageError::io(path))?;
    Ok(rmp_serde::from_slice(&bytes)?)
}

pub fn read_deployment_class_path(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).map_err(PackageError::io(path))?;
    Ok(rmp_serde::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_escape_property() {
        assert_eq!(escape_property("a key", true), "a\\ key");
        assert_eq!(escape_property(" lead", false), "\\ lead");
        assert_eq!(escape_property("a b", false), "a b");
        assert_eq!(escape_property("x=y:z#!", false), "x\\=y\\:z\\#\\!");
        assert_eq!(escape_property("C:\\tmp\n", false), "C\\:\\\\tmp\\n");
        assert_eq!(escape_property("caf\u{e9}", false), "caf\\u00E9");
    }

    #[test]
    fn test_build_system_properties_sorted_without_comments() {
        let dir = tempdir().unwrap();
        let mut properties = BTreeMap::new();
        properties.insert("quarkus.profile".to_string(), "prod".to_string());
        properties.insert("maven.home".to_string(), "/opt/maven".to_string());
        properties.insert("a.first".to_string(), "1".to_string());

        let path = write_build_system_properties(&properties, dir.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "a.first=1\nmaven.home=/opt/maven\nquarkus.profile=prod"
        );
    }
}
