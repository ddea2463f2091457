use crate::error::{ArchiveError, Result};
use crate::manifest::{MANIFEST_PATH, Manifest};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::read::ZipFile;
use zip::{ZipArchive, ZipWriter};

const SIGNATURE_SUFFIXES: [&str; 4] = [".SF", ".DSA", ".RSA", ".EC"];

/// Signature block or signature file sitting directly under `META-INF/`.
pub fn is_signature_file(name: &str) -> bool {
    let Some(file) = name.strip_prefix("META-INF/") else {
        return false;
    };
    !file.contains('/') && SIGNATURE_SUFFIXES.iter().any(|s| file.ends_with(s))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsignOutcome {
    /// Nothing to drop: the jar was copied byte for byte with its modification time.
    Copied,
    /// Entries were dropped; lists them in archive order.
    Rewritten { dropped: Vec<String> },
}

/// Copies `source` to `target` without signature entries and without entries `keep` rejects.
///
/// Remaining entries are copied raw, without recompression. Digest attributes are removed
/// from the manifest once signatures are stripped.
pub fn unsign(source: &Path, target: &Path, keep: impl Fn(&str) -> bool) -> Result<UnsignOutcome> {
    let input = File::open(source).map_err(ArchiveError::io(source))?;
    let mut archive = ZipArchive::new(input)?;

    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        names.push(archive.by_index_raw(i)?.name().to_string());
    }
    let dropped: Vec<String> = names
        .iter()
        .filter(|n| is_signature_file(n) || !keep(n))
        .cloned()
        .collect();

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(ArchiveError::io(parent))?;
    }
    if dropped.is_empty() {
        copy_preserving_mtime(source, target)?;
        return Ok(UnsignOutcome::Copied);
    }
    let signed = dropped.iter().any(|n| is_signature_file(n));

    let output = File::create(target).map_err(ArchiveError::io(target))?;
    let mut zip = ZipWriter::new(BufWriter::new(output));
    for (i, name) in names.iter().enumerate() {
        if dropped.contains(name) {
            debug!("Dropping {} from {}", name, source.display());
            continue;
        }
        if signed && name == MANIFEST_PATH {
            let mut entry = archive.by_index(i)?;
            let options = rewritten_entry_options(&entry);
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            drop(entry);
            let manifest = strip_digests(Manifest::parse(&bytes)?);
            zip.start_file(name.as_str(), options)?;
            zip.write_all(&manifest.to_bytes())?;
            continue;
        }
        zip.raw_copy_file(archive.by_index_raw(i)?)?;
    }
    let mut out = zip.finish()?;
    out.flush().map_err(ArchiveError::io(target))?;
    Ok(UnsignOutcome::Rewritten { dropped })
}

/// Carries the source entry's method, time and mode over; the writer default would stamp
/// the current time.
fn rewritten_entry_options<R: Read>(entry: &ZipFile<'_, R>) -> SimpleFileOptions {
    let mut options = SimpleFileOptions::default()
        .compression_method(entry.compression())
        .last_modified_time(entry.last_modified().unwrap_or_default());
    if let Some(mode) = entry.unix_mode() {
        options = options.unix_permissions(mode);
    }
    options
}

fn strip_digests(mut manifest: Manifest) -> Manifest {
    manifest.retain_sections(|_, attributes| {
        attributes.retain(|name, _| !name.to_ascii_lowercase().ends_with("-digest"));
        !attributes.is_empty()
    });
    manifest
}

fn copy_preserving_mtime(source: &Path, target: &Path) -> Result<()> {
    std::fs::copy(source, target).map_err(ArchiveError::io(source))?;
    let modified = std::fs::metadata(source)
        .and_then(|m| m.modified())
        .map_err(ArchiveError::io(source))?;
    let file = File::options()
        .write(true)
        .open(target)
        .map_err(ArchiveError::io(target))?;
    file.set_modified(modified).map_err(ArchiveError::io(target))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_files_only_directly_under_meta_inf() {
        assert!(is_signature_file("META-INF/BC.SF"));
        assert!(is_signature_file("META-INF/BC.RSA"));
        assert!(is_signature_file("META-INF/BC.DSA"));
        assert!(is_signature_file("META-INF/BC.EC"));
        assert!(!is_signature_file("META-INF/versions/9/BC.SF"));
        assert!(!is_signature_file("org/acme/KEY.RSA"));
        assert!(!is_signature_file("META-INF/MANIFEST.MF"));
    }

    #[test]
    fn test_strip_digests_drops_empty_sections() {
        let text = "Manifest-Version: 1.0\r\n\r\nName: a/A.class\r\nSHA-256-Digest: x\r\n\r\nName: b/\r\nSealed: true\r\nSHA1-Digest: y\r\n\r\n";
        let manifest = strip_digests(Manifest::parse(text.as_bytes()).unwrap());
        assert!(manifest.section("a/A.class").is_none());
        let b = manifest.section("b/").unwrap();
        assert_eq!(b.get("Sealed"), Some("true"));
        assert!(!b.contains("SHA1-Digest"));
    }
}
