use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::RebuildError;

/// Format of the timestamp embedded in backup names.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y.%m.%d_%H.%M.%S";

/// Give up after this many colliding names.
const MAX_COLLISIONS: u32 = 1000;

/// A verified copy of the original archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupRecord {
    pub path: PathBuf,
    pub len: u64,
}

/// `<stem>_<timestamp>.orig.<ext>` next to `original`. A non-zero `collision`
/// is appended to the stamp as `_N`.
pub fn backup_path(original: &Path, timestamp: NaiveDateTime, collision: u32) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{}_{}", stem, timestamp.format(BACKUP_TIMESTAMP_FORMAT));
    if collision > 0 {
        name.push_str(&format!("_{}", collision));
    }
    name.push_str(".orig");
    if let Some(ext) = original.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    original.with_file_name(name)
}

/// Copy `original` to a fresh backup file and check it holds exactly
/// `expected`. An existing file is never overwritten.
pub fn create_backup(
    original: &Path,
    expected: &[u8],
    timestamp: NaiveDateTime,
) -> Result<BackupRecord, RebuildError> {
    let (path, mut file) = open_fresh(original, timestamp)?;
    let failed = |path: &Path, reason: String| RebuildError::BackupFailed {
        original: original.to_path_buf(),
        backup: path.to_path_buf(),
        reason,
    };

    let copied = File::open(original)
        .and_then(|mut source| io::copy(&mut source, &mut file))
        .and_then(|n| file.sync_all().map(|_| n))
        .and_then(|n| {
            let permissions = fs::metadata(original)?.permissions();
            fs::set_permissions(&path, permissions)?;
            Ok(n)
        });
    drop(file);
    if let Err(e) = copied {
        let _ = fs::remove_file(&path);
        return Err(failed(&path, e.to_string()));
    }

    // Read back what actually landed on disk.
    let written = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = fs::remove_file(&path);
            return Err(failed(&path, format!("cannot read backup back: {}", e)));
        }
    };
    if written != expected {
        let _ = fs::remove_file(&path);
        return Err(failed(
            &path,
            format!(
                "backup does not match the loaded archive ({} bytes on disk, {} expected)",
                written.len(),
                expected.len()
            ),
        ));
    }

    info!(backup = %path.display(), bytes = written.len(), "backup created and verified");
    Ok(BackupRecord {
        path,
        len: written.len() as u64,
    })
}

fn open_fresh(original: &Path, timestamp: NaiveDateTime) -> Result<(PathBuf, File), RebuildError> {
    let mut last = backup_path(original, timestamp, 0);
    for collision in 0..MAX_COLLISIONS {
        let path = backup_path(original, timestamp, collision);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(backup = %path.display(), "backup name taken");
                last = path;
            }
            Err(e) => {
                return Err(RebuildError::BackupFailed {
                    original: original.to_path_buf(),
                    backup: path,
                    reason: e.to_string(),
                })
            }
        }
    }
    Err(RebuildError::BackupFailed {
        original: original.to_path_buf(),
        backup: last,
        reason: "no free backup name".into(),
    })
}
