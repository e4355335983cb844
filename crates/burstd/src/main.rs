//! burstd, the burstgrid daemon.
//!
//! Bridges a batch scheduler's idle-job queue and a pod-leasing platform:
//! every iteration it measures unmet demand per resource class, compares
//! it against idle capacity already leased, and launches the difference.
//!
//! # Usage
//!
//! ```text
//! burstd run --config /etc/burstgrid/burstgrid.toml
//! burstd run --config burstgrid.toml --once
//! burstd init-config > burstgrid.toml
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use burstgrid_autoscale::{Provisioner, SizingPolicy};
use burstgrid_core::config::BurstConfig;
use burstgrid_pool::LeaseClient;
use burstgrid_queue::PortalQueue;

#[derive(Parser)]
#[command(name = "burstd", about = "Demand-driven pod provisioning for batch queues")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the provisioning loop.
    Run {
        /// Path to the burstgrid config file.
        #[arg(long, default_value = "/etc/burstgrid/burstgrid.toml")]
        config: PathBuf,

        /// Execute a single iteration and exit.
        #[arg(long)]
        once: bool,

        /// Emit logs as JSON.
        #[arg(long)]
        log_json: bool,
    },

    /// Print a starter config to stdout.
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            once,
            log_json,
        } => run(config, once, log_json).await,
        Command::InitConfig => {
            print!("{}", BurstConfig::scaffold().to_toml_string()?);
            Ok(())
        }
    }
}

async fn run(config_path: PathBuf, once: bool, log_json: bool) -> anyhow::Result<()> {
    init_tracing(log_json);

    let config = BurstConfig::from_file(&config_path)?;
    info!(
        config = %config_path.display(),
        app = %config.daemon.app_name,
        classes = config.catalog.len(),
        "burstd starting"
    );

    let queue = PortalQueue::new(&config.queue, &config.daemon.app_name)?;
    info!(bin = %config.queue.bin, trusted_rules = config.queue.trusted.len(), "queue client ready");

    let platform = LeaseClient::new(
        config.pool.clone(),
        &config.daemon.app_name,
        &config.queue.endpoint,
    );
    info!(bin = %config.pool.bin, image = %config.pool.image, "pool client ready");

    let policy = SizingPolicy::new(
        config.pool.max_pods_per_class,
        config.pool.max_submit_per_class,
    );
    let provisioner = Provisioner::new(queue, platform, config.catalog.clone(), policy);

    if once {
        provisioner.one_iteration().await?;
        return Ok(());
    }

    // Graceful shutdown on Ctrl-C.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    provisioner
        .run(config.daemon.poll_interval(), shutdown_rx)
        .await;

    info!("burstd stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,burstd=debug,burstgrid=debug"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
