//! claimcheck CLI
//!
//! Evaluates health-insurance claims against policy data with an Azure
//! OpenAI deployment.
//!
//! # Usage
//!
//! ```bash
//! # Evaluate a batch of claim records
//! claimcheck evaluate --records Data/validation_records.json
//!
//! # Check the reference data loads and validates
//! claimcheck check-data --data-dir Data
//!
//! # Age at date of service
//! claimcheck age 1990-06-15 2024-06-14
//! ```
//!
//! Result lines go to stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use claimcheck_core::{calculate_age, ReferenceStore};
use claimcheck_runtime::{
    load_records, AzureOpenAiProvider, AzureOpenAiSettings, BatchDriver, ClaimOrchestratorBuilder,
    RuntimeConfig, RuntimeError,
};

#[derive(Parser)]
#[command(name = "claimcheck")]
#[command(author, version, about = "Health-insurance claim evaluation")]
struct Cli {
    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every record in a JSON file
    Evaluate {
        /// JSON array of claim records
        #[arg(short, long)]
        records: PathBuf,

        /// Directory holding policies.json and diagnosis_codes.json
        #[arg(short, long, default_value = "Data")]
        data_dir: PathBuf,

        /// Environment file with provider settings
        #[arg(short, long, default_value = "./Data/claimaudit.env")]
        env_file: PathBuf,

        /// Records evaluated at once (overrides CLAIMCHECK_CONCURRENCY)
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Also write the full report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Load and validate the reference data
    CheckData {
        /// Directory holding policies.json and diagnosis_codes.json
        #[arg(short, long, default_value = "Data")]
        data_dir: PathBuf,
    },

    /// Print the age at date of service
    Age {
        /// Date of birth (YYYY-MM-DD)
        date_of_birth: String,

        /// Date of service (YYYY-MM-DD)
        date_of_service: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Evaluate {
            records,
            data_dir,
            env_file,
            concurrency,
            report,
        } => evaluate(&records, &data_dir, &env_file, concurrency, report.as_deref()).await,
        Commands::CheckData { data_dir } => check_data(&data_dir),
        Commands::Age {
            date_of_birth,
            date_of_service,
        } => {
            match calculate_age(&date_of_birth, &date_of_service) {
                Some(age) => println!("{}", age),
                None => println!("None"),
            }
            Ok(())
        }
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_env_file(path: &Path) {
    match dotenvy::from_path(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {
            tracing::warn!(path = %path.display(), "Environment file not found, using process environment")
        }
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to load environment file"),
    }
}

async fn evaluate(
    records_path: &Path,
    data_dir: &Path,
    env_file: &Path,
    concurrency: Option<usize>,
    report_path: Option<&Path>,
) -> Result<()> {
    load_env_file(env_file);

    let mut config = RuntimeConfig::from_env().map_err(RuntimeError::from)?;
    if let Some(concurrency) = concurrency {
        config = config.with_concurrency(concurrency);
    }

    let reference = ReferenceStore::load(data_dir)
        .with_context(|| format!("Failed to load reference data from {}", data_dir.display()))?;

    let settings = AzureOpenAiSettings::from_env().map_err(RuntimeError::from)?;
    let provider = AzureOpenAiProvider::connect(settings)
        .await
        .map_err(RuntimeError::from)?;

    let concurrency = config.concurrency;
    let orchestrator = ClaimOrchestratorBuilder::new()
        .provider(Arc::new(provider))
        .reference(Arc::new(reference))
        .config(config)
        .build()?;

    let records = load_records(records_path)?;
    let report = BatchDriver::new(orchestrator)
        .with_concurrency(concurrency)
        .run_with(records, |outcome| println!("{}", outcome.report_line()))
        .await;

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Report written");
    }

    Ok(())
}

fn check_data(data_dir: &Path) -> Result<()> {
    let reference = ReferenceStore::load(data_dir)
        .with_context(|| format!("Failed to load reference data from {}", data_dir.display()))?;

    println!(
        "{}: {} policies, {} codes",
        data_dir.display(),
        reference.policies().len(),
        reference.codes().len()
    );
    Ok(())
}
