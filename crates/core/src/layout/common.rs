//! Pieces shared by every layout: entry filtering, concatenated resources, dependency copying
//! and output directory housekeeping.

use crate::content::{self, TreeEntry};
use crate::error::{PackageError, Result};
use crate::layout::BuildContext;
use indexmap::IndexMap;
use jarforge_api::{
    ApplicationComponent, ApplicationManifestConfigBuilder, ArtifactKey, GeneratedClass,
    ResolvedDependency,
};
use jarforge_archive::manifest::MANIFEST_VERSION;
use jarforge_archive::{ArchiveWriter, EntrySource, UnsignOutcome, unsign};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Entries never copied from the application root or a dependency into a single archive.
pub const IGNORED_ENTRIES: [&str; 27] = [
    "META-INF/INDEX.LIST",
    "META-INF/MANIFEST.MF",
    "module-info.class",
    "META-INF/LICENSE",
    "META-INF/LICENSE.txt",
    "META-INF/LICENSE.md",
    "META-INF/LGPL-3.0.txt",
    "META-INF/ASL-2.0.txt",
    "META-INF/NOTICE",
    "META-INF/NOTICE.txt",
    "META-INF/NOTICE.md",
    "META-INF/README",
    "META-INF/README.txt",
    "META-INF/README.md",
    "META-INF/DEPENDENCIES",
    "META-INF/DEPENDENCIES.txt",
    "META-INF/beans.xml",
    "META-INF/quarkus-config-roots.list",
    "META-INF/quarkus-javadoc.properties",
    "META-INF/quarkus-extension.properties",
    "META-INF/quarkus-extension.json",
    "META-INF/quarkus-extension.yaml",
    "META-INF/quarkus-deployment-dependency.graph",
    "META-INF/jandex.idx",
    "META-INF/panache-archive.marker",
    "META-INF/build.metadata",
    "LICENSE",
];

pub const INDEX_LIST: &str = "META-INF/INDEX.LIST";
pub const SERVICES_PREFIX: &str = "META-INF/services/";
const NETTY_VERSIONS: &str = "META-INF/io.netty.versions.properties";
const SISU_NAMED: &str = "META-INF/sisu/javax.inject.Named";

pub const APPLICATION: &str = "application";
pub const GENERATED: &str = "generated";
pub const TRANSFORMED: &str = "transformed";

#[derive(Debug, Clone, Default)]
pub struct IgnoredEntries {
    entries: BTreeSet<String>,
}

impl IgnoredEntries {
    /// The fixed list plus `extra`.
    pub fn with_defaults<'a>(extra: impl IntoIterator<Item = &'a String>) -> Self {
        let mut entries: BTreeSet<String> = IGNORED_ENTRIES.iter().map(|e| e.to_string()).collect();
        entries.extend(extra.into_iter().cloned());
        Self { entries }
    }

    /// Only what the user configured.
    pub fn user<'a>(extra: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            entries: extra.into_iter().cloned().collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }
}

/// Resources whose copies from every contributor are joined instead of shadowed.
///
/// Owned by one assembly; pieces keep the order they were pushed in and each is followed by `\n`.
#[derive(Debug, Default)]
pub struct ConcatenatedEntries {
    merge_paths: BTreeSet<String>,
    entries: IndexMap<String, Vec<u8>>,
}

impl ConcatenatedEntries {
    pub fn new<'a>(merge_paths: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            merge_paths: merge_paths.into_iter().cloned().collect(),
            entries: IndexMap::new(),
        }
    }

    pub fn is_concatenated(&self, name: &str) -> bool {
        is_service_file(name)
            || name == NETTY_VERSIONS
            || name == SISU_NAMED
            || self.merge_paths.contains(name)
    }

    pub fn push(&mut self, name: &str, data: &[u8]) {
        let buf = self.entries.entry(name.to_string()).or_default();
        buf.extend_from_slice(data);
        buf.push(b'\n');
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn write_into(self, writer: &mut impl ArchiveWriter) -> Result<()> {
        for (name, data) in self.entries {
            writer.add_file(EntrySource::Bytes(data), &name, "concatenated")?;
        }
        Ok(())
    }
}

pub fn is_service_file(name: &str) -> bool {
    name.len() > SERVICES_PREFIX.len() && name.starts_with(SERVICES_PREFIX)
}

/// Copies every entry below `root` into `writer` without replacing anything already there.
///
/// With `concatenated` set, mergeable resources are collected instead of written; without it
/// they are copied like any other file. `META-INF/INDEX.LIST` is always dropped.
pub fn copy_files(
    root: &Path,
    writer: &mut impl ArchiveWriter,
    mut concatenated: Option<&mut ConcatenatedEntries>,
    ignored: &IgnoredEntries,
    provenance: &str,
) -> Result<()> {
    content::walk(root, |entry| {
        if ignored.contains(entry.name()) {
            return Ok(());
        }
        match entry {
            TreeEntry::Directory(name) => writer.add_directory(&name, provenance)?,
            TreeEntry::File { name, source } => {
                if let Some(concatenated) = concatenated.as_deref_mut() {
                    if concatenated.is_concatenated(&name) {
                        concatenated.push(&name, &source.read_all()?);
                        return Ok(());
                    }
                }
                if name != INDEX_LIST {
                    writer.add_file_if_not_exists(source, &name, provenance)?;
                }
            }
        }
        Ok(())
    })
}

/// Writes the content every single-archive format carries: transformed classes, generated
/// classes, generated resources and the application root, in that priority order.
///
/// Concatenated resources are only collected; the caller writes them once everything else is in.
pub fn copy_common_content(
    ctx: &BuildContext,
    writer: &mut impl ArchiveWriter,
    classes: &[GeneratedClass],
    ignored: &IgnoredEntries,
    concatenated: &mut ConcatenatedEntries,
) -> Result<()> {
    for class in ctx.inputs.transformed_classes.iter() {
        if let Some(data) = &class.data {
            writer.add_file(EntrySource::from(data.as_slice()), &class.file_name, TRANSFORMED)?;
        }
    }
    for class in classes {
        writer.add_file_if_not_exists(
            EntrySource::from(class.data.as_slice()),
            &class.resource_name(),
            GENERATED,
        )?;
    }
    for resource in &ctx.inputs.generated_resources {
        if ignored.contains(&resource.name) {
            continue;
        }
        if concatenated.is_concatenated(&resource.name) {
            concatenated.push(&resource.name, &resource.data);
            continue;
        }
        writer.add_file_if_not_exists(
            EntrySource::from(resource.data.as_slice()),
            &resource.name,
            GENERATED,
        )?;
    }
    copy_files(
        &ctx.inputs.app_root,
        writer,
        Some(concatenated),
        ignored,
        APPLICATION,
    )
}

/// `Class-Path` value for space-separated entries; none at all when there are no entries.
pub fn class_path_attribute(entries: &[String]) -> Option<String> {
    if entries.is_empty() {
        None
    } else {
        Some(entries.join(" "))
    }
}

/// Gives an archive without a shipped manifest a minimal one.
pub fn ensure_manifest(writer: &mut impl ArchiveWriter) {
    let main = writer.manifest_mut().main_attributes_mut();
    if !main.contains(MANIFEST_VERSION) {
        main.insert(MANIFEST_VERSION, "1.0");
    }
}

/// Leaves `path` as an existing, empty directory.
pub fn ensure_empty_dir(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(PackageError::io(path)(e)),
    }
    std::fs::create_dir_all(path).map_err(PackageError::io(path))
}

pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PackageError::io(path)(e)),
    }
}

/// Adds read permission for everyone to every file and directory below `root`.
#[cfg(unix)]
pub fn make_world_readable(root: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for entry in WalkDir::new(root) {
        let entry = entry?;
        let mut permissions = entry.metadata()?.permissions();
        let extra = if entry.file_type().is_dir() { 0o555 } else { 0o444 };
        let mode = permissions.mode();
        if mode & extra != extra {
            permissions.set_mode(mode | extra);
            std::fs::set_permissions(entry.path(), permissions)
                .map_err(PackageError::io(entry.path()))?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn make_world_readable(_root: &Path) -> Result<()> {
    Ok(())
}

pub fn copy_file_preserving_mtime(source: &Path, target: &Path) -> Result<()> {
    std::fs::copy(source, target).map_err(PackageError::io(source))?;
    let modified = std::fs::metadata(source)
        .and_then(|m| m.modified())
        .map_err(PackageError::io(source))?;
    let file = File::options()
        .write(true)
        .open(target)
        .map_err(PackageError::io(target))?;
    file.set_modified(modified).map_err(PackageError::io(target))
}

/// Zips the files below `dir` into `target`.
pub fn package_directory(ctx: &BuildContext, dir: &Path, target: &Path) -> Result<PathBuf> {
    let mut writer = ctx.parallel_writer(target)?;
    let provenance = dir.display().to_string();
    content::walk(dir, |entry| {
        if let TreeEntry::File { name, source } = entry {
            writer.add_file(source, &name, &provenance)?;
        }
        Ok(())
    })?;
    Ok(writer.close()?)
}

/// Where copied dependencies go.
#[derive(Debug, Clone)]
pub struct LibraryLayout {
    pub main: PathBuf,
    /// Parent-first dependencies land here when set.
    pub boot: Option<PathBuf>,
    /// Drop classes the build removed from a jar.
    pub apply_transforms: bool,
    /// When false only target paths are computed; nothing is written.
    pub write: bool,
    /// Record copies as development-scope components.
    pub development: bool,
}

/// Dependencies copied during one assembly.
#[derive(Debug, Default)]
pub struct CopiedArtifacts {
    by_key: IndexMap<ArtifactKey, Vec<PathBuf>>,
    main: Vec<PathBuf>,
    boot: Vec<PathBuf>,
}

impl CopiedArtifacts {
    pub fn contains(&self, key: &ArtifactKey) -> bool {
        self.by_key.contains_key(key)
    }

    fn record(&mut self, key: &ArtifactKey, path: PathBuf, boot: bool) {
        self.by_key.entry(key.clone()).or_default().push(path.clone());
        if boot {
            self.boot.push(path);
        } else {
            self.main.push(path);
        }
    }

    pub fn paths_for(&self, key: &ArtifactKey) -> &[PathBuf] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn main(&self) -> &[PathBuf] {
        &self.main
    }

    pub fn boot(&self) -> &[PathBuf] {
        &self.boot
    }

    /// Key to `/`-separated paths relative to `base`.
    pub fn relative_paths(&self, base: &Path) -> BTreeMap<String, Vec<String>> {
        self.by_key
            .iter()
            .map(|(key, paths)| {
                let rel = paths.iter().map(|p| relative_path(base, p)).collect();
                (key.to_string(), rel)
            })
            .collect()
    }
}

pub fn relative_path(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Copies every resolved path of `dep` into the library layout and records an SBOM component
/// for each. Already copied keys are skipped.
pub fn copy_dependency(
    ctx: &BuildContext,
    dep: &ResolvedDependency,
    layout: &LibraryLayout,
    copied: &mut CopiedArtifacts,
    sbom: &mut ApplicationManifestConfigBuilder,
) -> Result<()> {
    if copied.contains(dep.key()) {
        return Ok(());
    }
    let boot = layout
        .boot
        .as_ref()
        .filter(|_| ctx.selection.is_parent_first(dep.key()));
    let dir = boot.unwrap_or(&layout.main);

    for resolved in &dep.resolved_paths {
        let target = dir.join(ctx.selection.file_name(dep, resolved));
        copied.record(dep.key(), target.clone(), boot.is_some());

        let mut component = ApplicationComponent::for_path(sbom.relativize(&target)).with_dependency(dep);
        if layout.development {
            component = component.development();
        }
        if layout.write {
            if let Some(pedigree) = copy_resolved_path(ctx, resolved, &target, layout.apply_transforms)
                .map_err(PackageError::dependency(&dep.coords, resolved))?
            {
                component = component.with_pedigree(pedigree);
            }
        }
        sbom.add_component(component);
    }
    Ok(())
}

/// Returns the pedigree note when classes had to be dropped.
fn copy_resolved_path(
    ctx: &BuildContext,
    resolved: &Path,
    target: &Path,
    apply_transforms: bool,
) -> Result<Option<String>> {
    if resolved.is_dir() {
        package_directory(ctx, resolved, target)?;
        return Ok(None);
    }
    let removed = if apply_transforms {
        ctx.inputs.transformed_classes.removed_for_jar(resolved)
    } else {
        BTreeSet::new()
    };
    if removed.is_empty() {
        copy_file_preserving_mtime(resolved, target)?;
        return Ok(None);
    }
    unsign(resolved, target, |name| !removed.contains(name))?;
    let removed: Vec<&str> = removed.iter().map(String::as_str).collect();
    Ok(Some(format!("Removed {}", removed.join(","))))
}

/// Copies a jar dependency with its signature and, optionally, some entries removed.
pub fn unsign_dependency(
    dep: &ResolvedDependency,
    source: &Path,
    target: &Path,
    drop: &BTreeSet<String>,
) -> Result<()> {
    let outcome = unsign(source, target, |name| !drop.contains(name))
        .map_err(|e| PackageError::dependency(&dep.coords, source)(e.into()))?;
    if let UnsignOutcome::Rewritten { dropped } = outcome {
        debug!(
            "Dropped {} entries from {} while copying",
            dropped.len(),
            source.display()
        );
    }
    Ok(())
}

/// Paths offered by more than one dependency. Reported once per distinct set of dependencies.
#[derive(Debug, Default)]
pub struct DuplicateTracker {
    owners: BTreeMap<String, BTreeSet<String>>,
}

impl DuplicateTracker {
    pub fn record(&mut self, path: &str, dependency: &str) {
        self.owners
            .entry(path.to_string())
            .or_default()
            .insert(dependency.to_string());
    }

    /// Colliding dependency sets with the paths they share.
    pub fn collisions(&self) -> BTreeMap<Vec<String>, Vec<String>> {
        let mut collisions: BTreeMap<Vec<String>, Vec<String>> = BTreeMap::new();
        for (path, owners) in &self.owners {
            if owners.len() > 1 {
                collisions
                    .entry(owners.iter().cloned().collect())
                    .or_default()
                    .push(path.clone());
            }
        }
        collisions
    }

    pub fn report(&self) {
        for (owners, paths) in self.collisions() {
            warn!(
                "Dependencies with duplicate files detected. The dependencies {} contain duplicate files: {}",
                owners.join(", "),
                paths.join(", ")
            );
        }
    }
}
