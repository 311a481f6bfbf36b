//! Depot Node - self-hosted Git and Git LFS service.

use anyhow::Context;
use clap::Parser;
use depot_node::api::{create_router, AppState};
use depot_node::config::Config;
use depot_node::observability::{init_logging, LogFormat};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Depot Node - self-hosted Git and Git LFS service
#[derive(Parser, Debug)]
#[command(name = "depot-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API listen address
    #[arg(long)]
    api_addr: Option<SocketAddr>,

    /// Data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long)]
    log_format: Option<String>,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(addr) = self.api_addr {
            config.server.api_addr = addr;
        }
        if let Some(dir) = self.data_dir {
            config.storage.data_dir = dir;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    let print_config = args.print_config;
    args.apply(&mut config);
    config.validate().context("validating configuration")?;

    if print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    init_logging(&config.logging.level, LogFormat::parse(&config.logging.format));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Depot node");
    tracing::info!(
        api_addr = %config.server.api_addr,
        public_url = %config.server.public_url,
        data_dir = %config.storage.data_dir.display(),
        blob_dir = %config.blob_dir().display(),
        "Node configuration"
    );
    if config.uses_dev_secret() {
        tracing::warn!("lfs.signing_secret is not set, presigned URLs use the development secret");
    }

    tokio::fs::create_dir_all(&config.storage.data_dir)
        .await
        .with_context(|| format!("creating data directory {}", config.storage.data_dir.display()))?;
    tokio::fs::create_dir_all(config.blob_dir())
        .await
        .context("creating LFS object directory")?;

    let state = AppState::from_config(&config).context("initializing services")?;
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.server.api_addr)
        .await
        .with_context(|| format!("binding {}", config.server.api_addr))?;

    tracing::info!(addr = %config.server.api_addr, "Node is ready. Press Ctrl+C to stop.");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    tracing::info!("Depot node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
