use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("archive {} not found", .path.display())]
    ArchiveNotFound { path: PathBuf },
    #[error("archive {} is unreadable: {source}", .path.display())]
    ArchiveUnreadable {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("entry {0} not found in archive")]
    EntryNotFound(String),
    #[error("entry {entry} is unreadable: {source}")]
    EntryUnreadable {
        entry: String,
        #[source]
        source: ZipError,
    },
}

pub type ContainerResult<T> = Result<T, ContainerError>;

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// Read-only view of a JAR (ZIP) archive.
///
/// The archive is loaded into memory once and shared behind an `Arc`. Each
/// read opens its own [`ZipArchive`] over those bytes, so a `Container` can
/// be queried from several threads at once.
#[derive(Clone, Debug)]
pub struct Container {
    path: PathBuf,
    bytes: Arc<[u8]>,
    /// Entry paths in central-directory order.
    names: Vec<String>,
}

impl Container {
    /// Open the archive at `path`.
    pub fn open(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ContainerError::ArchiveNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path).map_err(|e| ContainerError::ArchiveUnreadable {
            path: path.to_path_buf(),
            source: ZipError::Io(e),
        })?;
        Self::from_bytes(path, bytes)
    }

    /// Wrap archive bytes already in memory; `path` is only recorded.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: impl Into<Arc<[u8]>>) -> ContainerResult<Self> {
        let path = path.into();
        let bytes: Arc<[u8]> = bytes.into();
        let unreadable = |source| ContainerError::ArchiveUnreadable {
            path: path.clone(),
            source,
        };

        let names = {
            let mut archive = ZipArchive::new(Cursor::new(&bytes[..])).map_err(unreadable)?;
            let mut names = Vec::with_capacity(archive.len());
            for i in 0..archive.len() {
                let file = archive.by_index_raw(i).map_err(unreadable)?;
                names.push(file.name().to_string());
            }
            names
        };
        debug!(archive = %path.display(), entries = names.len(), "opened archive");

        Ok(Container { path, bytes, names })
    }

    /// A fresh reader over the archive. Every caller gets its own.
    pub fn archive(&self) -> ContainerResult<ZipArchive<Cursor<&[u8]>>> {
        ZipArchive::new(Cursor::new(&self.bytes[..])).map_err(|source| {
            ContainerError::ArchiveUnreadable {
                path: self.path.clone(),
                source,
            }
        })
    }

    // -- Entry access --

    /// Decompressed bytes of the entry at `entry`.
    pub fn lookup(&self, entry: &str) -> ContainerResult<Vec<u8>> {
        let mut archive = self.archive()?;
        let mut file = match archive.by_name(entry) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => {
                return Err(ContainerError::EntryNotFound(entry.to_string()))
            }
            Err(source) => {
                return Err(ContainerError::EntryUnreadable {
                    entry: entry.to_string(),
                    source,
                })
            }
        };
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)
            .map_err(|e| ContainerError::EntryUnreadable {
                entry: entry.to_string(),
                source: ZipError::Io(e),
            })?;
        Ok(data)
    }

    /// Iterate over all entry paths in archive order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }

    /// Check whether an entry exists.
    pub fn contains(&self, entry: &str) -> bool {
        self.names.iter().any(|n| n == entry)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The archive exactly as it was loaded.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
