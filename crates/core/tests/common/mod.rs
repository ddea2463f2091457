#![allow(dead_code)]

use jarforge_api::{ApplicationModel, ArtifactCoords, ArtifactKey, DependencyFlags, ResolvedDependency};
use jarforge_archive::{MANIFEST_PATH, Manifest};
use jarforge_core::{LayoutEngine, PackageConfig, PackageInputs};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipArchive;
use zip::write::SimpleFileOptions;

/// A throwaway project: compiled classes, a local repository of jars, and a build directory.
pub struct Project {
    pub dir: TempDir,
    pub classes: PathBuf,
    pub repo: PathBuf,
    pub target: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let classes = dir.path().join("target/classes");
        let repo = dir.path().join("repo");
        let target = dir.path().join("target");
        std::fs::create_dir_all(classes.join("org/acme")).unwrap();
        std::fs::create_dir_all(&repo).unwrap();
        std::fs::write(classes.join("org/acme/Main.class"), b"main").unwrap();
        std::fs::write(classes.join("application.properties"), b"greeting=hello").unwrap();
        Self {
            dir,
            classes,
            repo,
            target,
        }
    }

    pub fn class_file(&self, name: &str, data: &[u8]) {
        let path = self.classes.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    pub fn jar(&self, file_name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = self.repo.join(file_name);
        write_jar(&path, entries);
        path
    }

    pub fn inputs(&self, deps: Vec<ResolvedDependency>) -> PackageInputs {
        let app = ResolvedDependency::new(
            ArtifactCoords::new(ArtifactKey::new("org.acme", "app"), "1.0"),
            &self.classes,
            DependencyFlags::runtime(),
        );
        let mut model = ApplicationModel::new(app);
        model.dependencies = deps;
        PackageInputs::new(model, &self.classes, "org.acme.Main", &self.target, "app-1.0")
    }
}

pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory(name.to_string(), options).unwrap();
        } else {
            zip.start_file(name.to_string(), options).unwrap();
            zip.write_all(data).unwrap();
        }
    }
    zip.finish().unwrap();
}

pub fn dep(artifact: &str, path: &Path) -> ResolvedDependency {
    dep_with(artifact, path, DependencyFlags::runtime())
}

pub fn dep_with(artifact: &str, path: &Path, flags: DependencyFlags) -> ResolvedDependency {
    ResolvedDependency::new(
        ArtifactCoords::new(ArtifactKey::new("org.acme", artifact), "1.0"),
        path,
        flags,
    )
}

pub fn provided(artifact: &str, path: &Path) -> ResolvedDependency {
    dep_with(
        artifact,
        path,
        DependencyFlags {
            compile_only: true,
            ..DependencyFlags::runtime()
        },
    )
}

pub fn config() -> PackageConfig {
    PackageConfig {
        compression_threads: 2,
        ..PackageConfig::default()
    }
}

pub fn engine(config: &PackageConfig) -> LayoutEngine {
    LayoutEngine::from_config(config).unwrap()
}

pub fn entry_names(path: &Path) -> Vec<String> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

pub fn file_names(path: &Path) -> Vec<String> {
    entry_names(path)
        .into_iter()
        .filter(|n| !n.ends_with('/'))
        .collect()
}

pub fn read_entry(path: &Path, name: &str) -> Option<Vec<u8>> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).ok()?;
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf).unwrap();
    Some(buf)
}

pub fn manifest(path: &Path) -> Manifest {
    Manifest::parse(&read_entry(path, MANIFEST_PATH).unwrap()).unwrap()
}

pub fn list_dir(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(path)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
