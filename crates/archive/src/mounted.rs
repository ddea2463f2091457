use crate::error::{ArchiveError, Result};
use crate::ledger::{Claim, Ledger};
use crate::manifest::{MANIFEST_PATH, Manifest};
use crate::parallel::write_manifest;
use crate::traits::ArchiveWriter;
use crate::types::{ArchiveOptions, EntrySource, normalize_entry_name, sized};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Writer that stages every entry as a real file so content can be read back and the
/// manifest changed after all entries are in. Zipping happens sequentially on `close`.
///
/// Staged files are numbered slots rather than mirrors of the entry names, so entries
/// differing only by case, or a file `x` next to `x/y`, never meet on disk.
pub struct MountedArchiveWriter {
    path: PathBuf,
    staging: TempDir,
    file_options: SimpleFileOptions,
    directory_options: SimpleFileOptions,
    ledger: Ledger,
    slots: HashMap<String, PathBuf>,
}

impl MountedArchiveWriter {
    pub fn create(path: impl Into<PathBuf>, options: ArchiveOptions) -> Result<Self> {
        let path = path.into();
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&parent).map_err(ArchiveError::io(&parent))?;
        let staging = tempfile::Builder::new()
            .prefix(".jarforge-staging-")
            .tempdir_in(&parent)
            .map_err(ArchiveError::io(&parent))?;
        Ok(Self {
            path,
            staging,
            file_options: options.file_options()?,
            directory_options: options.directory_options()?,
            ledger: Ledger::default(),
            slots: HashMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staged(&self, name: &str) -> Result<&Path> {
        self.slots
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| ArchiveError::MissingEntry(name.to_string()))
    }

    /// Replacements reuse the slot of the first submission.
    fn stage(&mut self, source: EntrySource, name: &str) -> Result<()> {
        let next = self.slots.len();
        let target = self
            .slots
            .entry(name.to_string())
            .or_insert_with(|| self.staging.path().join(format!("{next:08}.entry")))
            .clone();
        match source {
            EntrySource::Bytes(bytes) => {
                std::fs::write(&target, bytes).map_err(ArchiveError::io(&target))?
            }
            EntrySource::File(path) => {
                std::fs::copy(&path, &target).map_err(ArchiveError::io(&path))?;
            }
        }
        Ok(())
    }

    /// Reads back a file entry. The manifest is served from its captured form.
    pub fn read(&self, target: &str) -> Result<Vec<u8>> {
        let name = normalize_entry_name(target)?;
        if name == MANIFEST_PATH {
            return Ok(self
                .ledger
                .manifest()
                .map(Manifest::to_bytes)
                .unwrap_or_default());
        }
        let staged = self.staged(&name)?;
        std::fs::read(staged).map_err(ArchiveError::io(staged))
    }

    pub fn is_directory(&self, target: &str) -> bool {
        self.ledger.is_directory(target)
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.ledger.manifest()
    }
}

impl ArchiveWriter for MountedArchiveWriter {
    fn add_file(&mut self, source: EntrySource, target: &str, provenance: &str) -> Result<()> {
        if let Claim::Write(name) = self.ledger.claim_file(&source, target, provenance, true)? {
            self.stage(source, &name)?;
        }
        Ok(())
    }

    fn add_file_if_not_exists(
        &mut self,
        source: EntrySource,
        target: &str,
        provenance: &str,
    ) -> Result<bool> {
        match self.ledger.claim_file(&source, target, provenance, false)? {
            Claim::Write(name) => {
                self.stage(source, &name)?;
                Ok(true)
            }
            Claim::Manifest => Ok(true),
            Claim::Skipped => Ok(false),
        }
    }

    fn add_directory(&mut self, target: &str, provenance: &str) -> Result<()> {
        self.ledger.add_directory(target, provenance)
    }

    fn add_manifest(&mut self, manifest: Manifest) {
        self.ledger.set_manifest(manifest);
    }

    fn manifest_mut(&mut self) -> &mut Manifest {
        self.ledger.manifest_mut()
    }

    fn contains(&self, target: &str) -> bool {
        self.ledger.contains(target)
    }

    fn provenance(&self, target: &str) -> Option<&str> {
        self.ledger.provenance(target)
    }

    fn entry_names(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.ledger.names())
    }

    fn close(self) -> Result<PathBuf> {
        let file = File::create(&self.path).map_err(ArchiveError::io(&self.path))?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        if let Some(manifest) = self.ledger.manifest() {
            write_manifest(&mut zip, manifest, self.file_options, self.directory_options)?;
        }
        for dir in self.ledger.directories() {
            zip.add_directory(format!("{dir}/"), self.directory_options)?;
        }
        for name in self.ledger.files() {
            let staged = self.staged(name)?;
            let mut input = File::open(staged).map_err(ArchiveError::io(staged))?;
            let len = input.metadata().map_err(ArchiveError::io(staged))?.len();
            zip.start_file(name, sized(self.file_options, len))?;
            std::io::copy(&mut input, &mut zip)?;
        }
        let mut out = zip.finish()?;
        out.flush().map_err(ArchiveError::io(&self.path))?;
        info!("Created archive {}", self.path.display());

        let staging = self.staging.path().to_path_buf();
        if let Err(e) = self.staging.close() {
            debug!("Failed to remove staging directory {}: {}", staging.display(), e);
        }
        Ok(self.path)
    }
}
