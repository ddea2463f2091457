use crate::error::{ArchiveError, Result};
use crate::ledger::{Claim, Ledger};
use crate::manifest::{MANIFEST_PATH, META_INF, Manifest};
use crate::pool::CompressionPool;
use crate::traits::ArchiveWriter;
use crate::types::{ArchiveOptions, EntrySource, sized};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use tempfile::SpooledTempFile;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Entries smaller than this are compressed in memory.
const SPOOL_THRESHOLD: usize = 512 * 1024;

type Scratch = ZipArchive<SpooledTempFile>;
type JobResult = (usize, Result<Scratch>);

/// Scatter/gather writer: each file is compressed on the pool into its own single-entry
/// scratch zip, and `close` stitches the scratch zips together in submission order.
pub struct ParallelArchiveWriter {
    path: PathBuf,
    file_options: SimpleFileOptions,
    directory_options: SimpleFileOptions,
    pool: CompressionPool,
    ledger: Ledger,
    /// Latest job submitted for each target.
    jobs: HashMap<String, usize>,
    submitted: usize,
    sender: Sender<JobResult>,
    receiver: Receiver<JobResult>,
}

impl ParallelArchiveWriter {
    pub fn create(path: impl Into<PathBuf>, options: ArchiveOptions, pool: CompressionPool) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ArchiveError::io(parent))?;
        }
        let (sender, receiver) = channel();
        Ok(Self {
            path,
            file_options: options.file_options()?,
            directory_options: options.directory_options()?,
            pool,
            ledger: Ledger::default(),
            jobs: HashMap::new(),
            submitted: 0,
            sender,
            receiver,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn submit(&mut self, source: EntrySource, name: String) {
        let job = self.submitted;
        self.submitted += 1;
        self.jobs.insert(name.clone(), job);

        let sender = self.sender.clone();
        let options = self.file_options;
        self.pool.spawn(move || {
            let result = compress_entry(&name, source, options);
            // The receiver is gone only if the writer was dropped without closing.
            let _ = sender.send((job, result));
        });
    }

    fn collect(&mut self) -> Result<HashMap<usize, Result<Scratch>>> {
        let mut results = HashMap::with_capacity(self.submitted);
        for _ in 0..self.submitted {
            let (job, result) = self
                .receiver
                .recv()
                .map_err(|_| ArchiveError::WorkerLost(self.path.display().to_string()))?;
            results.insert(job, result);
        }
        Ok(results)
    }
}

fn compress_entry(name: &str, source: EntrySource, options: SimpleFileOptions) -> Result<Scratch> {
    let mut zip = ZipWriter::new(tempfile::spooled_tempfile(SPOOL_THRESHOLD));
    zip.start_file(name, sized(options, source.len()?))?;
    let mut reader = source.open()?;
    std::io::copy(&mut reader, &mut zip)?;
    Ok(zip.finish_into_readable()?)
}

pub(crate) fn write_manifest<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    manifest: &Manifest,
    file_options: SimpleFileOptions,
    directory_options: SimpleFileOptions,
) -> Result<()> {
    zip.add_directory(format!("{META_INF}/"), directory_options)?;
    zip.start_file(MANIFEST_PATH, file_options)?;
    zip.write_all(&manifest.to_bytes())?;
    Ok(())
}

impl ArchiveWriter for ParallelArchiveWriter {
    fn add_file(&mut self, source: EntrySource, target: &str, provenance: &str) -> Result<()> {
        if let Claim::Write(name) = self.ledger.claim_file(&source, target, provenance, true)? {
            self.submit(source, name);
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
                self.submit(source, name);
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

    fn close(mut self) -> Result<PathBuf> {
        let mut results = self.collect()?;

        let file = File::create(&self.path).map_err(ArchiveError::io(&self.path))?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        if let Some(manifest) = self.ledger.manifest() {
            write_manifest(&mut zip, manifest, self.file_options, self.directory_options)?;
        }
        for dir in self.ledger.directories() {
            zip.add_directory(format!("{dir}/"), self.directory_options)?;
        }
        for name in self.ledger.files() {
            let job = self
                .jobs
                .get(name)
                .copied()
                .ok_or_else(|| ArchiveError::WorkerLost(name.to_string()))?;
            let scratch = results
                .remove(&job)
                .ok_or_else(|| ArchiveError::WorkerLost(name.to_string()))??;
            zip.merge_archive(scratch)?;
        }
        let mut out = zip.finish()?;
        out.flush().map_err(ArchiveError::io(&self.path))?;

        // Superseded submissions are dropped here along with their scratch storage.
        debug!(
            "Discarded {} superseded entries for {}",
            results.len(),
            self.path.display()
        );
        info!("Created archive {}", self.path.display());
        Ok(self.path)
    }
}
