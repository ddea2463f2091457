use crate::config::ManifestConfig;
use crate::inputs::ApplicationInfo;
use jarforge_api::ResolvedDependency;
use jarforge_archive::manifest::{
    CLASS_PATH, IMPLEMENTATION_TITLE, IMPLEMENTATION_VERSION, MAIN_CLASS, MANIFEST_VERSION,
};
use jarforge_archive::Manifest;
use tracing::warn;

/// Computes the manifest of a runnable jar.
///
/// Order of application: the manifest already shipped by the application, the configured
/// attributes and sections, then `Class-Path` and `Main-Class`, then implementation entries
/// where still missing. The build owns `Class-Path` and `Main-Class`; overriding either one
/// produces a warning.
pub struct ManifestBuilder<'a> {
    config: &'a ManifestConfig,
    info: &'a ApplicationInfo,
    app_artifact: &'a ResolvedDependency,
}

pub struct BuiltManifest {
    pub manifest: Manifest,
    pub warnings: Vec<String>,
}

impl<'a> ManifestBuilder<'a> {
    pub fn new(
        config: &'a ManifestConfig,
        info: &'a ApplicationInfo,
        app_artifact: &'a ResolvedDependency,
    ) -> Self {
        Self {
            config,
            info,
            app_artifact,
        }
    }

    /// `class_path` of `None` means the jar must not carry one.
    pub fn build(
        &self,
        existing: Option<Manifest>,
        class_path: Option<&str>,
        main_class: &str,
    ) -> BuiltManifest {
        let mut manifest = existing.unwrap_or_default();
        let mut warnings = Vec::new();

        let main = manifest.main_attributes_mut();
        main.insert(MANIFEST_VERSION, "1.0");
        for (name, value) in &self.config.attributes {
            main.insert(name, value);
        }

        match class_path {
            Some(class_path) => {
                if main.contains(CLASS_PATH) {
                    warnings.push(format!(
                        "A {CLASS_PATH} entry was already defined in the application manifest or configuration; it has been overwritten"
                    ));
                }
                main.insert(CLASS_PATH, class_path);
            }
            None => {
                if main.remove(CLASS_PATH).is_some() {
                    warnings.push(format!(
                        "A {CLASS_PATH} entry was defined in the application manifest or configuration; it has been removed"
                    ));
                }
            }
        }

        if let Some(existing) = main.get(MAIN_CLASS) {
            if existing != main_class {
                warnings.push(format!(
                    "A {MAIN_CLASS} entry was already defined ({existing}); it has been overwritten with {main_class}"
                ));
            }
        }
        main.insert(MAIN_CLASS, main_class);

        if self.config.add_implementation_entries {
            if !main.contains(IMPLEMENTATION_TITLE) {
                let title = self
                    .info
                    .name
                    .as_deref()
                    .unwrap_or(self.app_artifact.artifact_id());
                main.insert(IMPLEMENTATION_TITLE, title);
            }
            if !main.contains(IMPLEMENTATION_VERSION) {
                let version = self
                    .info
                    .version
                    .as_deref()
                    .unwrap_or(self.app_artifact.version());
                main.insert(IMPLEMENTATION_VERSION, version);
            }
        }

        for (section, attributes) in &self.config.sections {
            let target = manifest.section_mut(section);
            for (name, value) in attributes {
                target.insert(name, value);
            }
        }

        for warning in &warnings {
            warn!("{}", warning);
        }
        BuiltManifest { manifest, warnings }
    }
}
