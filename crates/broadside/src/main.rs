//! `broadside-server`: runs a Broadside game server until Ctrl-C.

use std::error::Error;
use std::path::PathBuf;

use broadside::{BroadsideServer, ServerConfig};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Networked two-player Battleship server.
#[derive(Debug, Parser)]
#[command(name = "broadside-server", version, about)]
struct Cli {
    /// TOML config file. Missing keys use their defaults.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. `127.0.0.1:8889`.
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<String>,

    /// Port to listen on, keeping the configured host.
    #[arg(short, long)]
    port: Option<u16>,

    /// `tracing` filter, e.g. `broadside=debug`. Overrides `RUST_LOG`.
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,
}

impl Cli {
    fn server_config(&self) -> Result<ServerConfig, broadside::BroadsideError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = cli.server_config()?;

    // --log, then RUST_LOG, then the config file, then `info`.
    let filter = match &cli.log {
        Some(directive) => EnvFilter::try_new(directive)?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(config.log.as_deref().unwrap_or("info")))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let server = BroadsideServer::builder().config(config).build().await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}
