use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;

use crate::jar_patch::PatchReport;
use crate::target::{PatchMode, ResolveError};

pub const USAGE: &str = "\
Usage:
  lookup-patch TARGET_JAR [PATCHING_MODE]
  Where TARGET_JAR is the application to patch and PATCHING_MODE is
    0 (default): Patch Script lookup
    1:           Patch Script + DNS + URL lookups
  [Note: The original Jar will be kept in the same folder with the .orig.jar extension]";

#[derive(Parser, Debug)]
#[command(name = "lookup-patch")]
#[command(about = "Disable the Commons Text script, DNS and URL string lookups inside a JAR")]
#[command(version, after_help = USAGE)]
pub struct Args {
    /// Archive to patch in place
    pub target_jar: PathBuf,

    /// 0 patches the script lookup, 1 also patches the DNS and URL lookups
    #[arg(allow_negative_numbers = true)]
    pub patching_mode: Option<String>,

    /// Patch targets concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Directory for the temporary rebuilt archive (same filesystem as the target)
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    #[error("PATCHING_MODE given as argument <{0}> is not an integer.")]
    NotAnInteger(String),
    #[error(transparent)]
    OutOfRange(#[from] ResolveError),
}

/// Interpret the optional mode argument; absent means `0`.
pub fn parse_mode(raw: Option<&str>) -> Result<PatchMode, ModeError> {
    let Some(raw) = raw else {
        return Ok(PatchMode::default());
    };
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ModeError::NotAnInteger(raw.to_string()))?;
    Ok(PatchMode::try_from(value)?)
}

/// Human-readable account of a finished run.
pub fn print_report(report: &PatchReport, out: &mut impl Write) -> io::Result<()> {
    writeln!(
        out,
        "Commons Text in {}: {}",
        report.archive.display(),
        report.version
    )?;
    for entry in &report.targets {
        writeln!(
            out,
            "  {}.{}: {}",
            entry.target.container_path,
            entry.target.method_name,
            entry.outcome
        )?;
    }
    writeln!(
        out,
        "{} of {} targets patched, {} skipped; backup at {}",
        report.applied(),
        report.targets.len(),
        report.skipped(),
        report.rebuild.backup.path.display()
    )?;
    writeln!(out, "Jar {} replaced - patch done.", report.archive.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing() {
        assert_eq!(parse_mode(None), Ok(PatchMode::ScriptOnly));
        assert_eq!(parse_mode(Some("1")), Ok(PatchMode::ScriptDnsUrl));
        assert_eq!(
            parse_mode(Some("two")),
            Err(ModeError::NotAnInteger("two".into()))
        );
        assert_eq!(
            parse_mode(Some("2")),
            Err(ModeError::OutOfRange(ResolveError::InvalidMode(2)))
        );
    }

    #[test]
    fn messages_match_operator_wording() {
        assert_eq!(
            ModeError::NotAnInteger("x".into()).to_string(),
            "PATCHING_MODE given as argument <x> is not an integer."
        );
        assert_eq!(
            parse_mode(Some("-1")).unwrap_err().to_string(),
            "Level of patching outside the available range."
        );
    }

    #[test]
    fn negative_mode_is_positional() {
        let args = Args::try_parse_from(["lookup-patch", "app.jar", "-1"]).unwrap();
        assert_eq!(args.patching_mode.as_deref(), Some("-1"));
    }

    #[test]
    fn target_is_required() {
        assert!(Args::try_parse_from(["lookup-patch"]).is_err());
    }

    #[test]
    fn flags() {
        let args =
            Args::try_parse_from(["lookup-patch", "-v", "--parallel", "app.jar", "1"]).unwrap();
        assert!(args.verbose);
        assert!(args.parallel);
        assert_eq!(args.target_jar, PathBuf::from("app.jar"));
    }
}
