//! PacFlow CLI - a thin consumer of the governance pipeline
//!
//! Lints PAC documents (explicit paths or a git diff range) against the
//! configured registry and exits non-zero if any file fails. Denials are
//! surfaced verbatim - there is no generic "validation failed" fallback.

use clap::{Parser, Subcommand};
use pacflow::config::Settings;
use pacflow::lint;
use pacflow::registry::Registry;
use std::path::PathBuf;
use std::process::Command as ProcessCommand;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "pacflow",
    version,
    about = "Governance Enforcement Platform - fail-closed admission gates for PAC execution contexts"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run structural and identity checks over PAC documents
    Lint {
        /// Files to check
        files: Vec<PathBuf>,

        /// Check the files changed in a git diff range instead (e.g. "main..HEAD")
        #[arg(long)]
        diff: Option<String>,
    },
    /// Print the canonical agent roster
    Roster,
    /// Validate the registry sources and print version and fingerprint
    Check,
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::load()?;

    let registry = match Registry::load(
        &settings.registry.agents_path,
        &settings.registry.locks_path,
    ) {
        Ok(registry) => registry,
        Err(e) => {
            // a registry that fails schema validation must never half-load
            error!("FATAL: registry failed to load: {e}");
            anyhow::bail!("registry failed to load: {e}");
        }
    };

    match cli.command {
        Command::Lint { files, diff } => run_lint(&registry, files, diff),
        Command::Roster => {
            println!("{}", registry.roster_summary());
            Ok(())
        }
        Command::Check => {
            println!(
                "registry v{} ok ({} agents, {} locks)",
                registry.version(),
                registry.agents().count(),
                registry.locks().iter().count()
            );
            println!("fingerprint: {}", registry.fingerprint());
            Ok(())
        }
    }
}

fn run_lint(
    registry: &Registry,
    mut files: Vec<PathBuf>,
    diff: Option<String>,
) -> anyhow::Result<()> {
    if let Some(range) = diff {
        files.extend(files_from_diff(&range)?);
    }
    if files.is_empty() {
        anyhow::bail!("no files to lint (pass paths or --diff <range>)");
    }

    info!(count = files.len(), "linting PAC documents");
    let (reports, all_passed) = lint::lint_paths(&files, registry);

    for report in &reports {
        if report.passed() {
            println!("PASS {}", report.path.display());
        } else {
            println!("FAIL {}", report.path.display());
            for violation in &report.violations {
                println!("  {violation}");
            }
        }
    }

    let failed = reports.iter().filter(|r| !r.passed()).count();
    println!();
    println!("{} checked, {} failed", reports.len(), failed);

    if !all_passed {
        std::process::exit(1);
    }
    Ok(())
}

/// Changed files for a git diff range, restricted to ones that still exist
fn files_from_diff(range: &str) -> anyhow::Result<Vec<PathBuf>> {
    let output = ProcessCommand::new("git")
        .args(["diff", "--name-only", range])
        .output()
        .map_err(|e| anyhow::anyhow!("failed to run git diff: {e}"))?;

    if !output.status.success() {
        anyhow::bail!(
            "git diff failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(PathBuf::from)
        .filter(|p| p.exists())
        .collect())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,pacflow=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .compact(),
        )
        .init();
}
