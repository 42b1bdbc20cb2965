use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::target::PatchMode;

/// Everything one patch run needs to know.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchConfig {
    pub archive: PathBuf,
    pub mode: PatchMode,
    /// Patch targets on the rayon pool instead of one after another.
    pub parallel: bool,
    /// Where the rebuilt archive is staged before the rename. Defaults to
    /// the archive's own directory.
    pub staging_dir: Option<PathBuf>,
    /// Fixed backup timestamp; local time when unset.
    pub timestamp: Option<NaiveDateTime>,
}

impl PatchConfig {
    pub fn new(archive: impl Into<PathBuf>, mode: PatchMode) -> Self {
        PatchConfig {
            archive: archive.into(),
            mode,
            parallel: false,
            staging_dir: None,
            timestamp: None,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}
