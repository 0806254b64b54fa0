//! Catalog Ingest - product file import tool

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use catalog_common::logging::{init_logging, ConsoleStream, LogConfig, LogLevel};
use catalog_ingest::config::IngestConfig;
use catalog_ingest::fetcher::S3ObjectStore;
use catalog_ingest::pipeline::{dry_run, Orchestrator};
use catalog_ingest::secrets::{SecretsManagerStore, TableNameResolver};
use catalog_ingest::writer::DynamoRecordStore;
use catalog_ingest::{ObjectRef, UploadEvent};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "catalog-ingest")]
#[command(author, version, about = "Catalog product file import tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Import every file named by an upload event
    Process {
        /// Event JSON file, or "-" for stdin
        #[arg(short, long)]
        event: String,
    },

    /// Parse and validate a local file without writing anything
    Check {
        /// Local CSV or workbook
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag. Results go to
    // stdout, so console logs go to stderr.
    let log_config = LogConfig::builder()
        .level(log_level)
        .console_stream(ConsoleStream::Stderr)
        .log_file_prefix("catalog-ingest")
        .build();
    let log_config = match log_config.clone().merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Ignoring invalid logging environment: {:#}", e);
            log_config
        },
    };

    let _guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            None
        },
    };

    if let Err(e) = run(cli.command).await {
        error!(error = %format!("{:#}", e), "Command failed");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Process { event } => process(&event).await,
        Command::Check { file } => check(&file),
    }
}

async fn process(source: &str) -> Result<()> {
    let raw = read_event(source)?;
    let event: UploadEvent =
        serde_json::from_str(&raw).context("Failed to decode upload event")?;

    let config = IngestConfig::load().context("Failed to load configuration")?;
    let sdk_config = config.aws_sdk_config().await;

    let orchestrator = Orchestrator::new(
        Arc::new(S3ObjectStore::new(&sdk_config, config.force_path_style())),
        Arc::new(DynamoRecordStore::new(&sdk_config)),
        TableNameResolver::new(
            Arc::new(SecretsManagerStore::new(&sdk_config)),
            config.secrets.secret_name.clone(),
            config.secrets.table_key.clone(),
        ),
        &config,
    );

    let outcomes = orchestrator.process_event(&event).await?;
    info!(files = outcomes.len(), "Import complete");
    println!("{}", serde_json::to_string_pretty(&outcomes)?);

    Ok(())
}

fn check(path: &Path) -> Result<()> {
    let config = IngestConfig::load().context("Failed to load configuration")?;
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let object = ObjectRef::new("local", path.to_string_lossy());
    let outcome = dry_run(&object, &data, &config.limits)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}

fn read_event(source: &str) -> Result<String> {
    if source == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read event from stdin")?;
        return Ok(raw);
    }

    std::fs::read_to_string(source).with_context(|| format!("Failed to read event file {}", source))
}
