use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use lookup_patch::cli::{self, Args, ModeError};
use lookup_patch::config::PatchConfig;
use lookup_patch::jar_patch::Patcher;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            println!("{}", cli::USAGE);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(args.verbose) {
        eprintln!("warning: {:#}", e);
    }

    let mode = match cli::parse_mode(args.patching_mode.as_deref()) {
        Ok(mode) => mode,
        Err(e @ ModeError::NotAnInteger(_)) => {
            println!("{}", e);
            return ExitCode::FAILURE;
        }
        Err(e @ ModeError::OutOfRange(_)) => {
            println!("{}", e);
            println!("{}", cli::USAGE);
            return ExitCode::FAILURE;
        }
    };

    let mut config = PatchConfig::new(&args.target_jar, mode).parallel(args.parallel);
    if let Some(dir) = args.staging_dir {
        config = config.staging_dir(dir);
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: PatchConfig) -> Result<()> {
    debug!(?config, "starting patch run");
    let archive = config.archive.clone();
    let report = Patcher::new(config)
        .run()
        .with_context(|| format!("patching {} failed", archive.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    cli::print_report(&report, &mut out).context("cannot write report")?;
    out.flush().context("cannot write report")?;
    Ok(())
}

/// `RUST_LOG` wins; otherwise `-v` turns on debug output for this crate.
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("lookup_patch=debug")
    } else {
        EnvFilter::new("lookup_patch=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("cannot install log subscriber")?;

    debug!("Logging initialized (verbose={})", verbose);
    Ok(())
}
