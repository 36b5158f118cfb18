//! # Pacer CLI
//!
//! Runs the processing engine against a filesystem blob root, the way the
//! serverless caller would: one invocation at a time, optionally looping on
//! `nextOffset` until the job's stage is complete.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use pacer_core::config::ConfigManager;
use pacer_core::constants::JobStatus;
use pacer_core::logging::init_structured_logging;
use pacer_core::models::{resumable_jobs, InvocationInput, JobRecord};
use pacer_core::orchestration::ContinuationController;
use pacer_core::processing::BlobFetchHandler;
use pacer_core::storage::{BlobJobStore, FsBlobStore, ManifestItemSource};

#[derive(Parser)]
#[command(name = "pacer")]
#[command(about = "Resumable, rate-limited chunk processing")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Blob store root directory
    #[arg(short, long, default_value = "data", global = true)]
    root: PathBuf,

    /// Configuration directory (default: config)
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,

    /// Environment override (default: PACER_ENV, APP_ENV, then development)
    #[arg(short, long, global = true)]
    environment: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one invocation for a job
    Invoke {
        #[arg(long)]
        job_id: String,

        /// Key of the job's source manifest in the blob store
        #[arg(long)]
        source_key: String,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Keep invoking with the returned offset until no continuation is needed
        #[arg(long)]
        until_complete: bool,
    },

    /// Create a pending job record
    CreateJob {
        /// Job id (generated when omitted)
        #[arg(long)]
        job_id: Option<String>,
    },

    /// List job records
    Jobs {
        /// Only jobs that can still be resumed
        #[arg(long)]
        resumable: bool,
    },

    /// Load and validate configuration, then print it
    ValidateConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_structured_logging();

    if let Err(e) = run(cli).await {
        error!(error = %e, "pacer command failed");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &environment)
        .context("loading configuration")?;

    let blobs = Arc::new(FsBlobStore::new(&cli.root));
    let jobs = Arc::new(BlobJobStore::new(
        blobs.clone(),
        manager.config().checkpoint.key_prefix.clone(),
    ));

    match cli.command {
        Commands::Invoke {
            job_id,
            source_key,
            offset,
            until_complete,
        } => {
            let controller = ContinuationController::new(
                manager.config().clone(),
                blobs.clone(),
                jobs,
                Arc::new(ManifestItemSource::new(blobs.clone())),
                Arc::new(BlobFetchHandler::new(blobs)),
            )?;

            let mut input = InvocationInput::new(job_id, source_key).at_offset(offset);
            loop {
                let output = controller.run(&input).await?;
                println!("{}", serde_json::to_string_pretty(&output)?);

                match output.next_input(&input.source_manifest_key) {
                    Some(next) if until_complete => {
                        info!(job_id = %next.job_id, offset = next.offset, "Continuing");
                        input = next;
                    }
                    _ => break,
                }
            }
        }

        Commands::CreateJob { job_id } => {
            let job_id = job_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            if job_id.contains('/') {
                bail!("job id must not contain '/': {job_id}");
            }
            jobs.create_job(&JobRecord::new(&job_id, JobStatus::Pending))
                .await?;
            println!("{job_id}");
        }

        Commands::Jobs { resumable } => {
            let records = jobs.list_jobs().await?;
            let selected: Vec<&JobRecord> = if resumable {
                resumable_jobs(&records)
            } else {
                records.iter().collect()
            };
            println!("{}", serde_json::to_string_pretty(&selected)?);
        }

        Commands::ValidateConfig => {
            println!("Environment: {}", manager.environment());
            println!("Config directory: {}", manager.config_directory().display());
            println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
        }
    }

    Ok(())
}
