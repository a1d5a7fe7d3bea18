//! Observation fusion refresh service.
//!
//! Fetches station observations from the configured networks, merges them,
//! interpolates temperature and pressure fields, extracts contours and
//! serves the latest result over a status API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use refresher::server::{self, ServerState};
use refresher::{ArtifactCache, CycleResult, RefreshScheduler, RefresherConfig};

#[derive(Parser, Debug)]
#[command(name = "refresher")]
#[command(about = "Surface observation fusion and contour refresh service")]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "REFRESHER_CONFIG", default_value = "config/refresher.yaml")]
    config: PathBuf,

    /// Run a single refresh cycle and exit
    #[arg(long)]
    once: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Port for the status HTTP server
    #[arg(long, env = "STATUS_PORT", default_value = "8090")]
    status_port: u16,

    /// Disable status HTTP server
    #[arg(long)]
    no_status_server: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting observation fusion refresher");

    let prometheus = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    let config = RefresherConfig::load(&args.config)?;
    let pipeline = config.build_pipeline()?;
    info!(
        sources = ?pipeline.source_ids(),
        interval_secs = config.schedule.refresh_interval_secs,
        "Pipeline configured"
    );

    let cache = Arc::new(ArtifactCache::new());
    let scheduler = Arc::new(RefreshScheduler::new(
        pipeline,
        cache,
        config.refresh_interval(),
    ));

    if args.once {
        info!("Running single refresh cycle");
        return match scheduler.run_now().await {
            CycleResult::Published(artifact) => {
                info!(
                    status = ?artifact.status,
                    stations = artifact.dataset.len(),
                    "Refresh cycle complete"
                );
                Ok(())
            }
            CycleResult::Failed(e) => Err(anyhow::Error::new(e).context("Refresh cycle failed")),
            CycleResult::Skipped => Ok(()),
        };
    }

    if !args.no_status_server {
        let server_state = Arc::new(ServerState {
            scheduler: scheduler.clone(),
            prometheus: Some(prometheus),
        });
        let status_port = args.status_port;
        tokio::spawn(async move {
            if let Err(e) = server::run_server(server_state, status_port).await {
                tracing::error!(error = %e, "Status server failed");
            }
        });
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx_clone.send(()).ok();
    });

    scheduler.run_forever(shutdown_tx.subscribe()).await?;

    let status = scheduler.status();
    info!(
        pipeline_runs = status.pipeline_runs,
        last_outcome = ?status.last_outcome,
        "Refresher stopped"
    );

    Ok(())
}
