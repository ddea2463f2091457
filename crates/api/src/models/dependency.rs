use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const JAR_TYPE: &str = "jar";

/// Identity of an artifact without its version: group, artifact, classifier and type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default)]
    pub classifier: String,
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
}

fn default_type() -> String {
    JAR_TYPE.to_string()
}

impl ArtifactKey {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            classifier: String::new(),
            kind: default_type(),
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = classifier.into();
        self
    }

    pub fn with_type(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.classifier, self.kind
        )
    }
}

/// Parses `group:artifact[:classifier[:type]]`. The type defaults to `jar`.
impl FromStr for ArtifactKey {
    type Err = ApiError;

    fn from_str(s: &str) -> ApiResult<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 2 || parts.len() > 4 {
            return Err(ApiError::InvalidCoordinates {
                coords: s.to_string(),
                reason: "expected group:artifact[:classifier[:type]]",
            });
        }
        if parts[0].is_empty() || parts[1].is_empty() {
            return Err(ApiError::InvalidCoordinates {
                coords: s.to_string(),
                reason: "group and artifact must not be empty",
            });
        }
        let mut key = ArtifactKey::new(parts[0], parts[1]);
        if let Some(classifier) = parts.get(2) {
            key.classifier = classifier.to_string();
        }
        if let Some(kind) = parts.get(3).filter(|t| !t.is_empty()) {
            key.kind = kind.to_string();
        }
        Ok(key)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactCoords {
    #[serde(flatten)]
    pub key: ArtifactKey,
    pub version: String,
}

impl ArtifactCoords {
    pub fn new(key: ArtifactKey, version: impl Into<String>) -> Self {
        Self {
            key,
            version: version.into(),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.key.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.key.artifact_id
    }

    pub fn classifier(&self) -> &str {
        &self.key.classifier
    }

    pub fn kind(&self) -> &str {
        &self.key.kind
    }

    pub fn to_gactv_string(&self) -> String {
        format!("{}:{}", self.key, self.version)
    }
}

impl fmt::Display for ArtifactCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key.classifier.is_empty() {
            write!(
                f,
                "{}:{}:{}:{}",
                self.key.group_id, self.key.artifact_id, self.key.kind, self.version
            )
        } else {
            write!(
                f,
                "{}:{}:{}:{}:{}",
                self.key.group_id,
                self.key.artifact_id,
                self.key.classifier,
                self.key.kind,
                self.version
            )
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct DependencyFlags {
    pub optional: bool,
    /// Provided scope: needed to compile, supplied by the environment at runtime.
    pub compile_only: bool,
    pub runtime_cp: bool,
    pub deployment_cp: bool,
    pub parent_first: bool,
    pub runtime_extension_artifact: bool,
    pub workspace_module: bool,
    pub reloadable: bool,
}

impl DependencyFlags {
    pub fn runtime() -> Self {
        Self {
            runtime_cp: true,
            deployment_cp: true,
            ..Self::default()
        }
    }

    pub fn deployment() -> Self {
        Self {
            deployment_cp: true,
            ..Self::default()
        }
    }
}

/// A dependency as handed over by the resolver. Never mutated while packaging.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    #[serde(flatten)]
    pub coords: ArtifactCoords,
    pub resolved_paths: Vec<PathBuf>,
    #[serde(default)]
    pub flags: DependencyFlags,
    #[serde(default)]
    pub dependencies: Vec<ArtifactKey>,
}

impl ResolvedDependency {
    pub fn new(coords: ArtifactCoords, path: impl Into<PathBuf>, flags: DependencyFlags) -> Self {
        Self {
            coords,
            resolved_paths: vec![path.into()],
            flags,
            dependencies: Vec::new(),
        }
    }

    pub fn key(&self) -> &ArtifactKey {
        &self.coords.key
    }

    pub fn group_id(&self) -> &str {
        self.coords.group_id()
    }

    pub fn artifact_id(&self) -> &str {
        self.coords.artifact_id()
    }

    pub fn version(&self) -> &str {
        &self.coords.version
    }

    pub fn is_jar(&self) -> bool {
        self.coords.kind() == JAR_TYPE
    }

    pub fn is_optional(&self) -> bool {
        self.flags.optional
    }

    pub fn is_runtime(&self) -> bool {
        self.flags.runtime_cp && !self.flags.compile_only
    }

    pub fn to_gactv_string(&self) -> String {
        self.coords.to_gactv_string()
    }
}

impl fmt::Display for ResolvedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.coords.fmt(f)
    }
}

/// The fully resolved application: its own artifact plus every runtime and deployment dependency.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApplicationModel {
    pub app_artifact: ResolvedDependency,
    #[serde(default)]
    pub dependencies: Vec<ResolvedDependency>,
    #[serde(default)]
    pub runner_parent_first: BTreeSet<ArtifactKey>,
}

impl ApplicationModel {
    pub fn new(app_artifact: ResolvedDependency) -> Self {
        Self {
            app_artifact,
            dependencies: Vec::new(),
            runner_parent_first: BTreeSet::new(),
        }
    }

    /// Dependencies on the runtime classpath, in model order. Provided dependencies are left out.
    pub fn runtime_dependencies(&self) -> impl Iterator<Item = &ResolvedDependency> {
        self.dependencies.iter().filter(|d| d.is_runtime())
    }

    pub fn find(&self, key: &ArtifactKey) -> Option<&ResolvedDependency> {
        self.dependencies.iter().find(|d| d.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_defaults_type() {
        let key: ArtifactKey = "org.acme:lib-a".parse().unwrap();
        assert_eq!(key.group_id, "org.acme");
        assert_eq!(key.artifact_id, "lib-a");
        assert_eq!(key.classifier, "");
        assert_eq!(key.kind, "jar");

        let key: ArtifactKey = "org.acme:lib-a:tests:test-jar".parse().unwrap();
        assert_eq!(key.classifier, "tests");
        assert_eq!(key.kind, "test-jar");
    }

    #[test]
    fn test_parse_key_rejects_garbage() {
        assert!("lib-a".parse::<ArtifactKey>().is_err());
        assert!(":lib-a".parse::<ArtifactKey>().is_err());
        assert!("a:b:c:d:e".parse::<ArtifactKey>().is_err());
    }

    #[test]
    fn test_gactv_string() {
        let coords = ArtifactCoords::new(ArtifactKey::new("org.acme", "lib-a"), "1.0");
        assert_eq!(coords.to_gactv_string(), "org.acme:lib-a::jar:1.0");
        assert_eq!(coords.to_string(), "org.acme:lib-a:jar:1.0");
    }

    #[test]
    fn test_runtime_dependencies_skip_provided() {
        let app = ResolvedDependency::new(
            ArtifactCoords::new(ArtifactKey::new("org.acme", "app"), "1.0"),
            "/app",
            DependencyFlags::default(),
        );
        let mut model = ApplicationModel::new(app);
        model.dependencies.push(ResolvedDependency::new(
            ArtifactCoords::new(ArtifactKey::new("org.acme", "lib-a"), "1.0"),
            "/repo/lib-a-1.0.jar",
            DependencyFlags::runtime(),
        ));
        model.dependencies.push(ResolvedDependency::new(
            ArtifactCoords::new(ArtifactKey::new("org.acme", "lib-b"), "1.0"),
            "/repo/lib-b-1.0.jar",
            DependencyFlags {
                compile_only: true,
                ..DependencyFlags::runtime()
            },
        ));
        model.dependencies.push(ResolvedDependency::new(
            ArtifactCoords::new(ArtifactKey::new("org.acme", "lib-c-deployment"), "1.0"),
            "/repo/lib-c-deployment-1.0.jar",
            DependencyFlags::deployment(),
        ));

        let names: Vec<_> = model.runtime_dependencies().map(|d| d.artifact_id()).collect();
        assert_eq!(names, vec!["lib-a"]);
    }

    #[test]
    fn test_dependency_json_shape() {
        let json = r#"{
            "group_id": "org.acme",
            "artifact_id": "lib-a",
            "version": "1.0",
            "resolved_paths": ["/repo/lib-a-1.0.jar"],
            "flags": { "runtime_cp": true }
        }"#;
        let dep: ResolvedDependency = serde_json::from_str(json).unwrap();
        assert_eq!(dep.key().kind, "jar");
        assert!(dep.is_jar());
        assert!(dep.is_runtime());
        assert!(!dep.is_optional());
    }
}
