//! Zip archive writing for jar packaging.
//!
//! Two [`ArchiveWriter`] implementations share the same entry rules: a parallel
//! scatter/gather writer for throughput and a staged writer for archives whose content
//! has to be read back before they are closed.

pub mod error;
mod ledger;
pub mod manifest;
pub mod mounted;
pub mod parallel;
pub mod pool;
pub mod traits;
pub mod types;
pub mod unsign;

pub use error::{ArchiveError, Result};
pub use manifest::{Attributes, MANIFEST_PATH, Manifest};
pub use mounted::MountedArchiveWriter;
pub use parallel::ParallelArchiveWriter;
pub use pool::CompressionPool;
pub use traits::ArchiveWriter;
pub use types::{ArchiveOptions, EntrySource, normalize_entry_name};
pub use unsign::{UnsignOutcome, is_signature_file, unsign};
