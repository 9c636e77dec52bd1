//! Audio Receiver Application
//!
//! Receives audio packets, measures loss and jitter, and writes the metrics log.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_link_monitor::{
    config::AppConfig,
    network::run_receiver,
    protocol::WrapPolicy,
};

/// Receive audio packets and log packet loss and jitter.
#[derive(Parser, Debug)]
#[command(name = "receiver")]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:5004
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Metrics log path
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Sequence wraparound accounting: signed or rollover
    #[arg(long)]
    wrap: Option<WrapPolicy>,

    /// Do not print a status line per packet
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref()).context("loading config")?;
    if let Some(bind) = args.bind {
        config.network.bind_address = bind;
    }
    if let Some(log) = args.log {
        config.metrics.log_path = log;
    }
    if let Some(wrap) = args.wrap {
        config.stream.wrap_policy = wrap;
    }
    if args.quiet {
        config.metrics.print_status = false;
    }
    config.validate()?;

    tracing::info!("Starting audio receiver ({:?} wraparound)", config.stream.wrap_policy);

    println!("Listening for packets...");

    let stats = run_receiver(&config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    println!(
        "Receiver stopped. {} packets, {} invalid.",
        stats.packets_received, stats.invalid_packets
    );
    Ok(())
}
