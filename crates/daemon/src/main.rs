use anyhow::Result;
use clap::Parser;
use portal_core::tracing::init_tracing;
use portal_daemon::DaemonConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};

/// Portal - authenticated request relay for the web frontend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Address to bind, overriding the configuration
    #[arg(short = 'b', long = "bind")]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let mut config = DaemonConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.http.bind_addr = bind;
    }

    init_tracing(&config.log.instrumentation())?;
    if let Some(path) = &cli.config {
        info!("Loaded configuration from: {}", path.display());
    }

    let listener = portal_daemon::bind(&config).await?;
    println!("Server running at: http://{}/", listener.local_addr()?);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal");
    };

    portal_daemon::serve(listener, &config, shutdown).await?;
    Ok(())
}
