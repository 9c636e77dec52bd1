//! Audio Sender Application
//!
//! Captures fixed-size audio frames and streams them to the receiver over UDP.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_link_monitor::{
    audio::{list_devices, AudioCapture, PacketSource, SyntheticSource},
    config::AppConfig,
    network::PacketSender,
    protocol::SequenceMode,
};

/// Stream audio packets to a receiver at a fixed cadence.
#[derive(Parser, Debug)]
#[command(name = "sender")]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Receiver address, e.g. 127.0.0.1:5004
    #[arg(short, long)]
    target: Option<SocketAddr>,

    /// Input device ID (see --list-devices)
    #[arg(short, long)]
    device: Option<String>,

    /// Send a generated tone instead of capturing
    #[arg(long)]
    synthetic: bool,

    /// Send payload only, without the sequence prefix
    #[arg(long)]
    raw: bool,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,
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

    if args.list_devices {
        println!("\n=== Available Input Devices ===");
        for device in list_devices() {
            let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
            println!("  {}{}:", device.name, default_marker);
            println!("    ID: {}", device.id);
            println!("    Sample rates: {:?}", device.sample_rates);
            println!("    Channels: {:?}", device.channels);
        }
        println!();
        return Ok(());
    }

    let mut config = AppConfig::load(args.config.as_deref()).context("loading config")?;
    if let Some(target) = args.target {
        config.network.target_address = target;
    }
    if let Some(device) = args.device {
        config.capture.device_id = Some(device);
    }
    if args.raw {
        config.stream.sequence_mode = SequenceMode::Raw;
    }
    config.validate()?;

    tracing::info!("Starting audio sender -> {}", config.network.target_address);
    tracing::info!(
        "{} samples @ {} Hz ({:.1} ms) per packet, {} ms pacing",
        config.capture.frame_samples,
        config.capture.sample_rate,
        config.capture.frame_duration_ms(),
        config.capture.send_interval_ms
    );

    let mut sender = PacketSender::new(
        &config.network,
        config.stream.sequence_mode,
        config.capture.send_interval(),
    )?;

    if args.synthetic {
        let mut source = SyntheticSource::new(
            config.capture.frame_samples,
            config.capture.channels,
            config.capture.sample_rate,
            440.0,
        );
        stream(&mut sender, &mut source).await
    } else {
        let mut capture = AudioCapture::new(&config.capture)?;
        capture.start()?;
        let result = stream(&mut sender, &mut capture).await;
        capture.stop();
        println!(
            "Captured {} samples from {}.",
            capture.samples_captured(),
            capture.device_name()
        );
        result
    }
}

async fn stream<S: PacketSource>(sender: &mut PacketSender, source: &mut S) -> Result<()> {
    tracing::info!("Recording and transmitting - press Ctrl+C to stop");
    let stats = sender
        .run(source, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;
    println!("Transmission stopped. {} packets sent.", stats.packets_sent);
    Ok(())
}
