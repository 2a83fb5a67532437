use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use onda::config::AppConfig;
use onda::diagnostics::validate_recordings;
use onda::storage::container_checksum;
use onda::utils::DatasetSummary;
use onda::{recover_interrupted_write, Dataset, RecoveryOutcome};

/// Custom payloads are opaque to the CLI; keep them as raw MessagePack.
type AnyCustom = rmpv::Value;

#[derive(Parser)]
#[command(name = "onda", about = "Inspect and maintain Onda dataset recordings files")]
struct Cli {
    /// TOML config overriding the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty dataset
    Init { root: PathBuf },
    /// Print a JSON summary of a dataset's recordings
    Inspect {
        root: PathBuf,
        /// Include the SHA-256 of the recordings file
        #[arg(long)]
        checksum: bool,
    },
    /// Check signal naming rules and annotation bounds
    Validate { root: PathBuf },
    /// Restore the recordings file from a backup left by an interrupted write
    Recover { root: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load_default()?,
    };

    match cli.command {
        Command::Init { root } => {
            Dataset::<AnyCustom>::create(&root, config.new_header(), &config.write_options())
                .with_context(|| format!("creating dataset at {}", root.display()))?;
        }
        Command::Inspect { root, checksum } => {
            let dataset = Dataset::<AnyCustom>::open(&root, &config.read_options())
                .with_context(|| format!("opening dataset at {}", root.display()))?;
            let checksum = if checksum { Some(container_checksum(&root)?) } else { None };
            let summary = DatasetSummary::new(&dataset.header, &dataset.recordings, checksum);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Validate { root } => {
            let dataset = Dataset::<AnyCustom>::open(&root, &config.read_options())
                .with_context(|| format!("opening dataset at {}", root.display()))?;
            let issues = validate_recordings(&dataset.recordings);
            for issue in &issues {
                println!("{}", issue);
            }
            if !issues.is_empty() {
                bail!("{} issues found in {}", issues.len(), root.display());
            }
            info!("{} recordings valid", dataset.recordings.len());
        }
        Command::Recover { root } => match recover_interrupted_write(&root)? {
            RecoveryOutcome::Restored => info!("restored recordings file in {}", root.display()),
            RecoveryOutcome::Clean => info!("no interrupted write found in {}", root.display()),
        },
    }

    Ok(())
}
