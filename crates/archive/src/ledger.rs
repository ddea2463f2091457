use crate::error::Result;
use crate::manifest::{MANIFEST_PATH, META_INF, Manifest};
use crate::types::{EntrySource, normalize_entry_name, parent_directories};
use indexmap::IndexMap;

/// What happened to a submitted file.
pub(crate) enum Claim {
    /// New target, or a replacement keeping the position of the first submission.
    Write(String),
    /// The manifest was captured instead of being written as an entry.
    Manifest,
    Skipped,
}

/// Per-archive bookkeeping shared by both writers: target names in submission order,
/// their provenance, and the captured manifest.
#[derive(Default)]
pub(crate) struct Ledger {
    directories: IndexMap<String, String>,
    files: IndexMap<String, String>,
    manifest: Option<Manifest>,
}

impl Ledger {
    pub(crate) fn add_directory(&mut self, target: &str, provenance: &str) -> Result<()> {
        let name = normalize_entry_name(target)?;
        self.register_parents(&name, provenance);
        self.directories
            .entry(name)
            .or_insert_with(|| provenance.to_string());
        Ok(())
    }

    pub(crate) fn claim_file(
        &mut self,
        source: &EntrySource,
        target: &str,
        provenance: &str,
        overwrite: bool,
    ) -> Result<Claim> {
        let name = normalize_entry_name(target)?;
        if name == MANIFEST_PATH {
            if overwrite || self.manifest.is_none() {
                self.manifest = Some(Manifest::parse(&source.read_all()?)?);
                return Ok(Claim::Manifest);
            }
            return Ok(Claim::Skipped);
        }
        if !overwrite && self.files.contains_key(&name) {
            return Ok(Claim::Skipped);
        }
        self.register_parents(&name, provenance);
        self.files.insert(name.clone(), provenance.to_string());
        Ok(Claim::Write(name))
    }

    fn register_parents(&mut self, name: &str, provenance: &str) {
        for dir in parent_directories(name) {
            if !self.directories.contains_key(dir) {
                self.directories
                    .insert(dir.to_string(), provenance.to_string());
            }
        }
    }

    pub(crate) fn set_manifest(&mut self, manifest: Manifest) {
        self.manifest = Some(manifest);
    }

    pub(crate) fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub(crate) fn manifest_mut(&mut self) -> &mut Manifest {
        self.manifest.get_or_insert_with(Manifest::new)
    }

    pub(crate) fn contains(&self, target: &str) -> bool {
        match normalize_entry_name(target) {
            Ok(name) if name == MANIFEST_PATH => self.manifest.is_some(),
            Ok(name) => self.files.contains_key(&name) || self.directories.contains_key(&name),
            Err(_) => false,
        }
    }

    pub(crate) fn is_directory(&self, target: &str) -> bool {
        normalize_entry_name(target)
            .map(|name| self.directories.contains_key(&name))
            .unwrap_or(false)
    }

    pub(crate) fn provenance(&self, target: &str) -> Option<&str> {
        let name = normalize_entry_name(target).ok()?;
        self.files
            .get(&name)
            .or_else(|| self.directories.get(&name))
            .map(String::as_str)
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.directories
            .keys()
            .chain(self.files.keys())
            .map(String::as_str)
    }

    /// Directories to write, in order. `META-INF` is left out when the manifest brings it.
    pub(crate) fn directories(&self) -> impl Iterator<Item = &str> {
        let skip_meta_inf = self.manifest.is_some();
        self.directories
            .keys()
            .map(String::as_str)
            .filter(move |d| !(skip_meta_inf && *d == META_INF))
    }

    pub(crate) fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}
