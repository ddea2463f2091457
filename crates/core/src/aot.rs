use crate::content::{self, TreeEntry};
use crate::error::{PackageError, Result};
use jarforge_api::{GeneratedClass, GeneratedResource};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// Directories whose listings are recorded completely.
pub const TRACKED_DIRECTORIES: [&str; 3] = ["", "META-INF", "META-INF/services"];

const SERVICES_PREFIX: &str = "META-INF/services/";

/// Resource lookup data computed at build time so the runtime can skip classpath scans.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceIndex {
    /// Tracked directory to the names of its direct children.
    pub fully_indexed_directories: BTreeMap<String, BTreeSet<String>>,
    /// Service interface name to the concatenated provider files, in classpath order.
    pub services: BTreeMap<String, ByteBuf>,
}

impl ResourceIndex {
    pub fn children(&self, directory: &str) -> Option<&BTreeSet<String>> {
        self.fully_indexed_directories.get(directory)
    }

    pub fn service(&self, name: &str) -> Option<&[u8]> {
        self.services.get(name).map(|b| b.as_slice())
    }
}

/// Accumulates a [`ResourceIndex`]. Feed content in classpath order.
#[derive(Debug, Default)]
pub struct AotIndexCollector {
    index: ResourceIndex,
}

impl AotIndexCollector {
    pub fn new() -> Self {
        let mut index = ResourceIndex::default();
        for dir in TRACKED_DIRECTORIES {
            index.fully_indexed_directories.insert(dir.to_string(), BTreeSet::new());
        }
        Self { index }
    }

    /// Records `name` as a child of every tracked directory on its path.
    pub fn add_path(&mut self, name: &str) {
        let name = name.trim_matches('/');
        if name.is_empty() {
            return;
        }
        let mut parent = String::new();
        for segment in name.split('/') {
            if let Some(children) = self.index.fully_indexed_directories.get_mut(&parent) {
                children.insert(segment.to_string());
            }
            if !parent.is_empty() {
                parent.push('/');
            }
            parent.push_str(segment);
        }
    }

    pub fn add_file(&mut self, name: &str, data: &[u8]) {
        self.add_path(name);
        if let Some(service) = service_name(name) {
            let buf = self
                .index
                .services
                .entry(service.to_string())
                .or_insert_with(|| ByteBuf::from(Vec::new()));
            buf.extend_from_slice(data);
            buf.push(b'\n');
        }
    }

    pub fn add_generated(&mut self, classes: &[GeneratedClass], resources: &[GeneratedResource]) {
        for class in classes {
            self.add_path(&class.resource_name());
        }
        for resource in resources {
            self.add_file(&resource.name, &resource.data);
        }
    }

    /// Adds a directory tree or jar. Only service files are read.
    pub fn add_tree(&mut self, root: &Path) -> Result<()> {
        if root.is_dir() {
            return content::walk(root, |entry| {
                match entry {
                    TreeEntry::Directory(name) => self.add_path(&name),
                    TreeEntry::File { name, source } => {
                        if service_name(&name).is_some() {
                            self.add_file(&name, &source.read_all()?);
                        } else {
                            self.add_path(&name);
                        }
                    }
                }
                Ok(())
            });
        }
        let file = File::open(root).map_err(PackageError::io(root))?;
        let mut archive = ZipArchive::new(file)?;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            if !entry.is_dir() && service_name(&name).is_some() {
                let mut data = Vec::new();
                entry.read_to_end(&mut data).map_err(PackageError::io(root))?;
                self.add_file(&name, &data);
            } else {
                self.add_path(&name);
            }
        }
        Ok(())
    }

    pub fn finish(self) -> ResourceIndex {
        self.index
    }
}

fn service_name(name: &str) -> Option<&str> {
    name.strip_prefix(SERVICES_PREFIX)
        .filter(|s| !s.is_empty() && !s.contains('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_directories_list_direct_children() {
        let mut collector = AotIndexCollector::new();
        collector.add_path("org/acme/A.class");
        collector.add_path("META-INF/versions/11/org/acme/A.class");
        collector.add_file("META-INF/services/org.acme.Spi", b"org.acme.Impl");
        collector.add_path("application.properties");
        let index = collector.finish();

        let root: Vec<_> = index.children("").unwrap().iter().cloned().collect();
        assert_eq!(root, vec!["META-INF", "application.properties", "org"]);
        let meta: Vec<_> = index.children("META-INF").unwrap().iter().cloned().collect();
        assert_eq!(meta, vec!["services", "versions"]);
        assert!(index.children("org").is_none());
    }

    #[test]
    fn test_services_concatenate_in_feed_order() {
        let mut collector = AotIndexCollector::new();
        collector.add_file("META-INF/services/org.acme.Spi", b"first.Impl");
        collector.add_file("META-INF/services/org.acme.Spi", b"second.Impl");
        collector.add_file("META-INF/services/nested/not.a.Service", b"x");
        let index = collector.finish();

        assert_eq!(
            index.service("org.acme.Spi").unwrap(),
            b"first.Impl\nsecond.Impl\n"
        );
        assert_eq!(index.services.len(), 1);
    }
}
