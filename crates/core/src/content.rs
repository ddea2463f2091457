//! Uniform view over the two shapes application content comes in: a directory of compiled
//! classes, or a jar.

use crate::error::{PackageError, Result};
use jarforge_archive::EntrySource;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use walkdir::WalkDir;
use zip::ZipArchive;

/// Upper bound on what a zip header's declared size may pre-allocate.
const MAX_SIZE_HINT: u64 = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    Directory(String),
    File { name: String, source: EntrySource },
}

impl TreeEntry {
    pub fn name(&self) -> &str {
        match self {
            TreeEntry::Directory(name) => name,
            TreeEntry::File { name, .. } => name,
        }
    }
}

/// Visits every entry below `root` with `/`-separated relative names.
///
/// Directories are walked in file-name order, following links. Jars are visited in archive
/// order, with file content read into memory.
pub fn walk(root: &Path, mut visit: impl FnMut(TreeEntry) -> Result<()>) -> Result<()> {
    if root.is_dir() {
        for entry in WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .min_depth(1)
        {
            let entry = entry?;
            let name = relative_name(root, entry.path());
            if entry.file_type().is_dir() {
                visit(TreeEntry::Directory(name))?;
            } else {
                visit(TreeEntry::File {
                    name,
                    source: EntrySource::File(entry.into_path()),
                })?;
            }
        }
        return Ok(());
    }

    let file = File::open(root).map_err(PackageError::io(root))?;
    let mut archive = ZipArchive::new(file)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().trim_end_matches('/').to_string();
        if name.is_empty() {
            continue;
        }
        if entry.is_dir() {
            visit(TreeEntry::Directory(name))?;
            continue;
        }
        let mut data = Vec::with_capacity(size_hint(entry.size()));
        entry.read_to_end(&mut data).map_err(PackageError::io(root))?;
        drop(entry);
        visit(TreeEntry::File {
            name,
            source: EntrySource::Bytes(data),
        })?;
    }
    Ok(())
}

/// Reads a single file below `root`, if present.
pub fn read(root: &Path, name: &str) -> Result<Option<Vec<u8>>> {
    if root.is_dir() {
        let path = root.join(name);
        if !path.is_file() {
            return Ok(None);
        }
        return std::fs::read(&path).map(Some).map_err(PackageError::io(path));
    }
    let file = File::open(root).map_err(PackageError::io(root))?;
    let mut archive = ZipArchive::new(file)?;
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut data = Vec::new();
    entry.read_to_end(&mut data).map_err(PackageError::io(root))?;
    Ok(Some(data))
}

fn size_hint(declared: u64) -> usize {
    declared.min(MAX_SIZE_HINT) as usize
}

fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    #[test]
    fn test_walk_directory_in_name_order() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("org/acme")).unwrap();
        std::fs::write(dir.path().join("org/acme/B.class"), b"b").unwrap();
        std::fs::write(dir.path().join("org/acme/A.class"), b"a").unwrap();
        std::fs::write(dir.path().join("app.properties"), b"x=1").unwrap();

        let mut names = Vec::new();
        walk(dir.path(), |e| {
            names.push(e.name().to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(
            names,
            vec!["app.properties", "org", "org/acme", "org/acme/A.class", "org/acme/B.class"]
        );
    }

    #[test]
    fn test_declared_size_does_not_drive_allocation() {
        assert_eq!(size_hint(13), 13);
        assert_eq!(size_hint(u64::MAX), MAX_SIZE_HINT as usize);
    }

    #[test]
    fn test_walk_and_read_jar() {
        let dir = tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        let mut zip = zip::ZipWriter::new(File::create(&jar).unwrap());
        zip.add_directory("META-INF/", SimpleFileOptions::default()).unwrap();
        zip.start_file("META-INF/services/org.acme.Spi", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"org.acme.Impl").unwrap();
        zip.finish().unwrap();

        let mut entries = Vec::new();
        walk(&jar, |e| {
            entries.push(e);
            Ok(())
        })
        .unwrap();
        assert_eq!(entries[0], TreeEntry::Directory("META-INF".to_string()));
        assert_eq!(
            entries[1],
            TreeEntry::File {
                name: "META-INF/services/org.acme.Spi".to_string(),
                source: EntrySource::Bytes(b"org.acme.Impl".to_vec()),
            }
        );

        assert_eq!(
            read(&jar, "META-INF/services/org.acme.Spi").unwrap().unwrap(),
            b"org.acme.Impl"
        );
        assert!(read(&jar, "missing.txt").unwrap().is_none());
    }
}
