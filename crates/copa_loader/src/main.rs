//! Copa Loader CLI
//!
//! Event JSON → normalized events + team/player/match collections
//! Committed events → team shot KPIs

#[cfg(feature = "cli")]
use anyhow::{Context, Result};
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};
#[cfg(feature = "cli")]
use copa_loader::{JsonLinesStore, PipelineConfig};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
const DEFAULT_LOG_FILTER: &str = "copa_loader=info,copa_core=info";

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "copa_loader")]
#[command(about = "Load football event data into a document store", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct Overrides {
    /// Pipeline config JSON (defaults to $COPA_CONFIG_PATH)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Input events JSON file
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Store root directory
    #[arg(long, global = true)]
    store_root: Option<PathBuf>,

    /// Database name under the store root
    #[arg(long, global = true)]
    database: Option<String>,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Normalize events and replace the events/teams/players/matches collections
    Load,

    /// Recompute team-level shot KPIs from the stored events
    Kpis,

    /// Load, then recompute KPIs
    Run,

    /// Show collection counts from the store
    Inspect {
        /// Verify checksums against the manifest
        #[arg(long, default_value = "false")]
        verify: bool,
    },
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    let config = resolve_config(&cli.overrides)?;

    tracing::info!(
        input = %config.input_path.display(),
        store = %config.store_root.join(&config.database).display(),
        "copa_loader {}",
        env!("CARGO_PKG_VERSION")
    );

    let mut store = JsonLinesStore::open(&config.store_root, &config.database)
        .with_context(|| format!("Failed to open store at {}", config.store_root.display()))?;

    match cli.command {
        Commands::Load => {
            let report = copa_loader::run_load(&config, &mut store)?;
            print_json(&report)?;
        }

        Commands::Kpis => {
            let report = copa_loader::run_kpis(&config, &mut store)?;
            print_json(&report)?;
        }

        Commands::Run => {
            let load = copa_loader::run_load(&config, &mut store)?;
            print_json(&load)?;
            let kpis = copa_loader::run_kpis(&config, &mut store)?;
            print_json(&kpis)?;
        }

        Commands::Inspect { verify } => {
            let statuses = copa_loader::inspect_store(&config, &store, verify)?;
            for status in &statuses {
                let check = match status.verified {
                    Some(true) => "ok",
                    Some(false) => "MISMATCH",
                    None => "-",
                };
                println!(
                    "{:<8} {:<16} {:>8}  {:<8}  {}",
                    status.role,
                    status.collection,
                    status.document_count,
                    check,
                    status.written_at.as_deref().unwrap_or("never written")
                );
            }
            if statuses.iter().any(|s| s.verified == Some(false)) {
                anyhow::bail!("Store verification failed - checksum mismatch or unrecorded collection");
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn init_logging() -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)?,
        _ => EnvFilter::try_new(DEFAULT_LOG_FILTER)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[cfg(feature = "cli")]
fn resolve_config(overrides: &Overrides) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::resolve(overrides.config.as_deref())
        .context("Failed to resolve pipeline config")?;

    if let Some(input) = &overrides.input {
        config.input_path = input.clone();
    }
    if let Some(store_root) = &overrides.store_root {
        config.store_root = store_root.clone();
    }
    if let Some(database) = &overrides.database {
        config.database = database.clone();
    }

    config.validate().context("Invalid pipeline config")?;
    Ok(config)
}

#[cfg(feature = "cli")]
fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("copa_loader CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
