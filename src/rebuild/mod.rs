//! Backing up and rewriting the archive.
//!
//! The original file is only ever replaced by a rename of a fully written,
//! synced sibling file, and only after a verified backup exists.

mod backup;

pub use self::backup::*;

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::jar_utils::{Container, ContainerError};

const TEMP_PREFIX: &str = ".lookup-patch-";
const TEMP_SUFFIX: &str = ".tmp";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] ZipError),
    #[error(transparent)]
    Container(#[from] ContainerError),
}

#[derive(Debug, thiserror::Error)]
pub enum RebuildError {
    #[error("cannot back up {} to {}: {reason}", .original.display(), .backup.display())]
    BackupFailed {
        original: PathBuf,
        backup: PathBuf,
        reason: String,
    },
    #[error("cannot rewrite {}: {source}", .path.display())]
    RebuildIo {
        path: PathBuf,
        #[source]
        source: WriteError,
    },
}

// ---------------------------------------------------------------------------
// Rebuilder
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub entries_written: usize,
    pub entries_substituted: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebuildSummary {
    pub backup: BackupRecord,
    pub entries_written: usize,
    pub entries_substituted: usize,
}

/// Writes a patched copy of an archive over the original.
#[derive(Clone, Debug)]
pub struct ArchiveRebuilder {
    original: PathBuf,
    staging_dir: Option<PathBuf>,
    timestamp: Option<NaiveDateTime>,
}

impl ArchiveRebuilder {
    pub fn new(original: impl Into<PathBuf>) -> Self {
        ArchiveRebuilder {
            original: original.into(),
            staging_dir: None,
            timestamp: None,
        }
    }

    /// Directory for the temporary output. It must be on the same filesystem
    /// as the original, since the result is moved into place by rename.
    pub fn staging_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.staging_dir = dir;
        self
    }

    /// Pin the timestamp used in the backup name instead of local time.
    pub fn timestamp(mut self, timestamp: Option<NaiveDateTime>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Back up the original, then replace it with `container`'s entries where
    /// every path in `substitutions` gets the new bytes.
    pub fn rebuild(
        &self,
        container: &Container,
        substitutions: &BTreeMap<String, Vec<u8>>,
    ) -> Result<RebuildSummary, RebuildError> {
        let timestamp = self
            .timestamp
            .unwrap_or_else(|| Local::now().naive_local());
        let backup = create_backup(&self.original, container.bytes(), timestamp)?;

        let stats = self
            .write_and_replace(container, substitutions)
            .map_err(|source| RebuildError::RebuildIo {
                path: self.original.clone(),
                source,
            })?;
        info!(
            archive = %self.original.display(),
            entries = stats.entries_written,
            substituted = stats.entries_substituted,
            "archive replaced"
        );

        Ok(RebuildSummary {
            backup,
            entries_written: stats.entries_written,
            entries_substituted: stats.entries_substituted,
        })
    }

    fn staging_location(&self) -> PathBuf {
        if let Some(dir) = &self.staging_dir {
            return dir.clone();
        }
        match self.original.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn write_and_replace(
        &self,
        container: &Container,
        substitutions: &BTreeMap<String, Vec<u8>>,
    ) -> Result<WriteStats, WriteError> {
        let staging = self.staging_location();
        // Dropping `tmp` on any early return removes the partial file.
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&staging)?;
        debug!(temp = %tmp.path().display(), "writing rebuilt archive");

        let stats = {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            let stats = write_rebuilt(container, substitutions, &mut writer)?;
            writer.flush()?;
            stats
        };
        tmp.as_file().sync_all()?;

        let permissions = fs::metadata(&self.original)?.permissions();
        fs::set_permissions(tmp.path(), permissions)?;

        tmp.persist(&self.original).map_err(|e| WriteError::Io(e.error))?;
        sync_parent(&self.original);
        Ok(stats)
    }
}

/// Stream every entry of `container` into `writer` in archive order.
///
/// Entries named in `substitutions` are recompressed from the new bytes
/// with their original method, timestamp and permissions. All other entries
/// are raw-copied, so their compressed data and headers are untouched.
pub fn write_rebuilt<W: Write + Seek>(
    container: &Container,
    substitutions: &BTreeMap<String, Vec<u8>>,
    writer: W,
) -> Result<WriteStats, WriteError> {
    let mut archive = container.archive()?;
    let mut zip = ZipWriter::new(writer);
    let mut stats = WriteStats::default();

    for i in 0..archive.len() {
        let file = archive.by_index_raw(i)?;
        match substitutions.get(file.name()) {
            Some(data) => {
                let method = match file.compression() {
                    CompressionMethod::Stored => CompressionMethod::Stored,
                    _ => CompressionMethod::Deflated,
                };
                let mut options = SimpleFileOptions::default()
                    .compression_method(method)
                    .large_file(data.len() as u64 >= u32::MAX as u64);
                if let Some(modified) = file.last_modified() {
                    options = options.last_modified_time(modified);
                }
                if let Some(mode) = file.unix_mode() {
                    options = options.unix_permissions(mode);
                }
                let name = file.name().to_string();
                drop(file);

                debug!(entry = %name, bytes = data.len(), "writing substituted entry");
                zip.start_file(name, options)?;
                zip.write_all(data)?;
                stats.entries_substituted += 1;
            }
            None => zip.raw_copy_file(file)?,
        }
        stats.entries_written += 1;
    }

    for name in substitutions.keys().filter(|n| !container.contains(n)) {
        warn!(entry = %name, "substitution for an entry the archive does not have; ignored");
    }

    zip.set_raw_comment(archive.comment().into());
    zip.finish()?;
    Ok(stats)
}

#[cfg(unix)]
fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::File::open(parent).and_then(|d| d.sync_all()) {
            debug!(dir = %parent.display(), error = %e, "cannot sync directory");
        }
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) {}
