use crate::error::Result;
use crate::manifest::{MULTI_RELEASE, Manifest};
use crate::types::EntrySource;
use std::path::PathBuf;

pub const VERSIONS_PREFIX: &str = "META-INF/versions/";

/// Appends files and directories to a single zip archive.
///
/// Each target path is written at most once. `META-INF/MANIFEST.MF` never goes through
/// the generic path: it is held aside and written first when the archive is closed.
pub trait ArchiveWriter {
    /// Writes `target`, replacing anything submitted for it before.
    fn add_file(&mut self, source: EntrySource, target: &str, provenance: &str) -> Result<()>;

    /// Writes `target` only if nothing claimed it yet. Returns whether this call wrote it.
    fn add_file_if_not_exists(
        &mut self,
        source: EntrySource,
        target: &str,
        provenance: &str,
    ) -> Result<bool>;

    fn add_directory(&mut self, target: &str, provenance: &str) -> Result<()>;

    fn add_manifest(&mut self, manifest: Manifest);

    fn manifest_mut(&mut self) -> &mut Manifest;

    fn contains(&self, target: &str) -> bool;

    /// Who contributed `target`, if anything did.
    fn provenance(&self, target: &str) -> Option<&str>;

    fn entry_names(&self) -> Box<dyn Iterator<Item = &str> + '_>;

    fn is_multi_version(&self) -> bool {
        self.entry_names().any(|n| n.starts_with(VERSIONS_PREFIX))
    }

    /// Stamps `Multi-Release: true` when versioned entries are present.
    fn make_multi_version(&mut self) -> bool {
        if !self.is_multi_version() {
            return false;
        }
        self.manifest_mut()
            .main_attributes_mut()
            .insert(MULTI_RELEASE, "true");
        true
    }

    /// Writes the archive and returns its path.
    fn close(self) -> Result<PathBuf>
    where
        Self: Sized;
}
