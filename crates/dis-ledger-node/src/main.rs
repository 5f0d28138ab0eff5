//! DIS ledger node - HTTP API, verification scheduler and peer heartbeat.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dis_ledger::sync::HttpTransport;
use dis_ledger::{Ledger, Scheduler};
use dis_ledger_node::{build_router, NodeConfig, DEFAULT_LOG_FILTER};

#[derive(Parser)]
#[command(name = "dis-ledger-node")]
#[command(about = "DIS governance node: receipt ledger, verification sweep, peer heartbeat")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API and run the scheduler (default)
    Serve {
        /// Listen address, overriding the configuration
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Run one verification sweep and print the report as JSON
    Verify,
    /// Print the trust ledger as JSON
    Trust,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => NodeConfig::default(),
    };

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            serve(config).await
        }
        Commands::Verify => {
            let ledger = Ledger::open(config.ledger).await?;
            let output = ledger.verify_all().await?;
            println!("{}", serde_json::to_string_pretty(&output.report)?);
            if output.report.invalid > 0 || output.report.errors > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Trust => {
            let ledger = Ledger::open(config.ledger).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&ledger.trust_entries().await)?
            );
            Ok(())
        }
    }
}

async fn serve(config: NodeConfig) -> anyhow::Result<()> {
    let timeout = config.ledger.peer_timeout();
    let ledger = Arc::new(
        Ledger::open(config.ledger)
            .await
            .context("opening ledger")?,
    );
    let transport = Arc::new(HttpTransport::new(timeout)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Arc::new(Scheduler::new(ledger.clone(), transport)).spawn(shutdown_rx);

    let app = build_router(ledger);
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    scheduler.await?;
    Ok(())
}
