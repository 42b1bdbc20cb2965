//! Running a whole patch: resolve, patch each target, rebuild once.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::class_patch::{patch_class, ClassPatchError};
use crate::compile::{BodyCompiler, StubCompiler};
use crate::config::PatchConfig;
use crate::jar_utils::{Container, ContainerError};
use crate::rebuild::{ArchiveRebuilder, RebuildError, RebuildSummary};
use crate::target::{resolve, PatchTarget};
use crate::version::{detect_commons_text, CommonsTextVersion};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Failures that stop a run. Per-target problems are [`PatchOutcome`]s.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Rebuild(#[from] RebuildError),
}

pub type PatchResult<T> = Result<T, PatchError>;

// ---------------------------------------------------------------------------
// Outcomes and report
// ---------------------------------------------------------------------------

/// What happened to one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The patched class bytes.
    Applied(Vec<u8>),
    EntryNotFound,
    MethodNotFound,
    CompileFailed(String),
    /// The entry exists but could not be decompressed or parsed.
    EntryUnreadable(String),
}

impl PatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, PatchOutcome::Applied(_))
    }

    /// Status line text for the operator.
    pub fn describe(&self) -> String {
        match self {
            PatchOutcome::Applied(_) => "Applied".into(),
            PatchOutcome::EntryNotFound => "not found in archive".into(),
            PatchOutcome::MethodNotFound => "method not found".into(),
            PatchOutcome::CompileFailed(reason) => format!("compile failed: {}", reason),
            PatchOutcome::EntryUnreadable(reason) => format!("unreadable: {}", reason),
        }
    }
}

impl fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[derive(Clone, Debug)]
pub struct TargetReport {
    pub target: PatchTarget,
    pub outcome: PatchOutcome,
}

#[derive(Clone, Debug)]
pub struct PatchReport {
    pub archive: PathBuf,
    pub version: CommonsTextVersion,
    /// One entry per target, in resolver order.
    pub targets: Vec<TargetReport>,
    pub rebuild: RebuildSummary,
}

impl PatchReport {
    pub fn applied(&self) -> usize {
        self.targets.iter().filter(|t| t.outcome.is_applied()).count()
    }

    pub fn skipped(&self) -> usize {
        self.targets.len() - self.applied()
    }
}

// ---------------------------------------------------------------------------
// Patcher
// ---------------------------------------------------------------------------

pub struct Patcher<C = StubCompiler> {
    config: PatchConfig,
    compiler: C,
}

impl Patcher<StubCompiler> {
    pub fn new(config: PatchConfig) -> Self {
        Patcher::with_compiler(config, StubCompiler)
    }
}

impl<C: BodyCompiler> Patcher<C> {
    pub fn with_compiler(config: PatchConfig, compiler: C) -> Self {
        Patcher { config, compiler }
    }

    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    /// Patch every target of the configured mode and replace the archive.
    ///
    /// The archive is rewritten even when nothing applied, so a run always
    /// leaves a backup behind.
    pub fn run(&self) -> PatchResult<PatchReport> {
        let targets = resolve(self.config.mode);
        let container = Container::open(&self.config.archive)?;

        let version = detect_commons_text(&container);
        info!(archive = %container.path().display(), %version, "detected Commons Text");

        let outcomes: Vec<PatchOutcome> = if self.config.parallel {
            targets
                .par_iter()
                .map(|t| patch_target(&container, t, &self.compiler))
                .collect()
        } else {
            targets
                .iter()
                .map(|t| patch_target(&container, t, &self.compiler))
                .collect()
        };

        let substitutions: BTreeMap<String, Vec<u8>> = targets
            .iter()
            .zip(&outcomes)
            .filter_map(|(target, outcome)| match outcome {
                PatchOutcome::Applied(bytes) => Some((target.entry_path(), bytes.clone())),
                _ => None,
            })
            .collect();

        let rebuild = ArchiveRebuilder::new(&self.config.archive)
            .staging_dir(self.config.staging_dir.clone())
            .timestamp(self.config.timestamp)
            .rebuild(&container, &substitutions)?;

        Ok(PatchReport {
            archive: self.config.archive.clone(),
            version,
            targets: targets
                .into_iter()
                .zip(outcomes)
                .map(|(target, outcome)| TargetReport { target, outcome })
                .collect(),
            rebuild,
        })
    }
}

/// Look up and patch one target. Never fails; problems become outcomes.
pub fn patch_target(
    container: &Container,
    target: &PatchTarget,
    compiler: &dyn BodyCompiler,
) -> PatchOutcome {
    let entry = target.entry_path();
    let class_bytes = match container.lookup(&entry) {
        Ok(bytes) => bytes,
        Err(ContainerError::EntryNotFound(_)) => {
            warn!(entry = %entry, "class not found in archive");
            return PatchOutcome::EntryNotFound;
        }
        Err(e) => {
            warn!(entry = %entry, error = %e, "cannot read class");
            return PatchOutcome::EntryUnreadable(e.to_string());
        }
    };
    debug!(entry = %entry, bytes = class_bytes.len(), "class found in archive");

    match patch_class(
        &class_bytes,
        &target.method_name,
        &target.method_signature,
        &target.replacement_source,
        compiler,
    ) {
        Ok(patched) => {
            info!(entry = %entry, method = %target.method_name, "method patched");
            PatchOutcome::Applied(patched)
        }
        Err(ClassPatchError::MethodNotFound { name, descriptor }) => {
            warn!(entry = %entry, "{}({}) method not found", name, descriptor);
            PatchOutcome::MethodNotFound
        }
        Err(ClassPatchError::CompileFailed(e)) => {
            warn!(entry = %entry, error = %e, "replacement body failed to compile");
            PatchOutcome::CompileFailed(e.to_string())
        }
        Err(ClassPatchError::Malformed(reason)) => {
            warn!(entry = %entry, %reason, "class cannot be parsed");
            PatchOutcome::EntryUnreadable(reason)
        }
    }
}
