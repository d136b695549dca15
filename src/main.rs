mod api;
mod baseline;
mod config;
mod dashboard;
mod detector;
mod error;
mod marketplace;
mod monitor;
mod persistence;
mod scorer;
mod signals;
mod state;
mod types;

use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::{router, ApiState, LogSource};
use crate::baseline::RollingBaselineProvider;
use crate::config::{whales::MIN_SALE_VALUE, Config};
use crate::detector::{detect, trend::find_trending, whale::scan_whales};
use crate::error::Result;
use crate::marketplace::{MarketplaceClient, OpenSeaClient};
use crate::monitor::{ContinuousMonitor, MonitorSettings};
use crate::persistence::LogStore;
use crate::signals::NoSocialSignals;
use crate::types::Baseline;

/// NFT marketplace activity monitor
#[derive(Parser)]
#[command(name = "monitor", about = "Scans NFT collections for unusual trading activity")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan on a fixed schedule until Ctrl-C / SIGTERM.
    Monitor,
    /// Run a single scan cycle, update the log, and exit.
    ScanOnce,
    /// Fetch stats for one collection and show its assessment.
    Stats { collection: String },
    /// Report large buyers of one collection.
    Whales {
        collection: String,
        /// Minimum sale price (ETH) counted as a whale trade.
        #[arg(long, default_value_t = MIN_SALE_VALUE)]
        min_value: f64,
    },
    /// List collections with a one-day change above 50%.
    Trending,
    /// Serve the dashboard and read API over the persisted log.
    Serve {
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cli.command, cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Command, cfg: Config) -> Result<()> {
    let latency = Arc::new(LatencyStats::new());

    match command {
        Command::Monitor => {
            let client = connect(&cfg, &latency)?;
            run_monitor(cfg, client, latency).await
        }
        Command::ScanOnce => {
            let monitor = build_monitor(&cfg, connect(&cfg, &latency)?);
            monitor.load().await;
            let results = monitor.run_cycle().await;
            print_json(&results)
        }
        Command::Stats { collection } => {
            let stats = connect(&cfg, &latency)?.fetch_stats(&collection).await?;
            let alerts = detect(&stats, &Baseline::from_stats(&stats));
            print_json(&scorer::assess(stats, alerts, Utc::now()))
        }
        Command::Whales { collection, min_value } => {
            let client = connect(&cfg, &latency)?;
            let report = scan_whales(client.as_ref(), &collection, min_value).await;
            info!(
                collection = %collection,
                pattern = %report.pattern,
                "{}",
                report.pattern.interpretation()
            );
            if let Some(alert) = report.alert() {
                info!(collection = %collection, severity = %alert.severity, "{}", alert.message);
            }
            print_json(&report)
        }
        Command::Trending => {
            let client = connect(&cfg, &latency)?;
            print_json(&find_trending(client.as_ref()).await?)
        }
        Command::Serve { port } => {
            let state = ApiState {
                log: LogSource::File(LogStore::new(&cfg.log_path)),
                latency,
                health: Arc::new(HealthState::new()),
            };
            serve(state, port).await
        }
    }
}

/// Marketplace client for the commands that talk upstream. `serve` runs
/// without one, so a missing API key only fails here.
fn connect(cfg: &Config, latency: &Arc<LatencyStats>) -> Result<Arc<OpenSeaClient>> {
    Ok(Arc::new(OpenSeaClient::new(cfg, Arc::clone(latency))?))
}

fn build_monitor(cfg: &Config, client: Arc<OpenSeaClient>) -> ContinuousMonitor {
    ContinuousMonitor::new(
        MonitorSettings::from_config(cfg),
        client,
        Arc::new(RollingBaselineProvider::new(cfg.baseline_window)),
        Arc::new(NoSocialSignals),
        LogStore::new(&cfg.log_path),
        Arc::new(HealthState::new()),
    )
}

async fn run_monitor(cfg: Config, client: Arc<OpenSeaClient>, latency: Arc<LatencyStats>) -> Result<()> {
    let monitor = Arc::new(build_monitor(&cfg, client));

    // --- HTTP API / dashboard (optional) ---
    if let Some(port) = cfg.api_port {
        let state = ApiState {
            log: LogSource::Live(monitor.log()),
            latency,
            health: monitor.health(),
        };
        tokio::spawn(async move {
            if let Err(e) = serve(state, port).await {
                error!("HTTP API stopped: {e}");
            }
        });
    }

    let starter = Arc::clone(&monitor);
    let start = tokio::spawn(async move { starter.start().await });

    shutdown_signal().await;
    info!("Shutdown signal received, stopping monitor");

    // Let the initial cycle finish so stop() sees a running monitor.
    if let Err(e) = start.await {
        error!("Monitor start task failed: {e}");
    }
    monitor.stop().await;
    Ok(())
}

async fn serve(state: ApiState, port: u16) -> Result<()> {
    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
