use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod background_jobs;
use background_jobs::jobs::{HostPruningJob, ParseUploadsJob};
use background_jobs::{JobContext, JobScheduler};

mod ingest;
use ingest::FileIngestor;

mod inventory_store;
use inventory_store::{InventoryStore, SqliteInventoryStore};

mod os_detection;
mod parsers;

mod server_store;
use server_store::{ServerStore, SqliteServerStore};

mod sqlite_persistence;

use tokio_util::sync::CancellationToken;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite inventory database file (uploads, host records,
    /// settings).
    #[clap(value_parser = parse_path)]
    pub inventory_db: PathBuf,

    /// Path to the SQLite database file for job run history.
    #[clap(value_parser = parse_path)]
    pub server_db: PathBuf,

    /// Seconds between scheduler ticks.
    #[clap(long, default_value_t = 60)]
    pub tick_secs: u64,

    /// Seconds between runs of the upload parsing job.
    #[clap(long, default_value_t = 120)]
    pub parse_period_secs: u64,

    /// Hours between runs of the host retention job.
    #[clap(long, default_value_t = 24)]
    pub prune_period_hours: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    info!(
        "Opening SQLite inventory database at {:?}...",
        cli_args.inventory_db
    );
    let inventory_store: Arc<dyn InventoryStore> =
        Arc::new(SqliteInventoryStore::new(&cli_args.inventory_db)?);
    let server_store: Arc<dyn ServerStore> = Arc::new(SqliteServerStore::new(&cli_args.server_db)?);

    let ingestor = Arc::new(FileIngestor::new(Arc::clone(&inventory_store)));

    let shutdown_token = CancellationToken::new();
    let job_context = JobContext::new(shutdown_token.child_token(), Arc::clone(&inventory_store));
    let scheduler = JobScheduler::new(
        server_store,
        job_context,
        Duration::from_secs(cli_args.tick_secs),
        shutdown_token.clone(),
    );

    scheduler
        .register_job(Arc::new(ParseUploadsJob::new(
            ingestor,
            Duration::from_secs(cli_args.parse_period_secs),
        )))
        .await?;
    scheduler
        .register_job(Arc::new(HostPruningJob::new(Duration::from_secs(
            cli_args.prune_period_hours * 60 * 60,
        ))))
        .await?;

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    info!("Scheduler starting with a {}s tick", cli_args.tick_secs);
    scheduler.run().await;
    Ok(())
}
