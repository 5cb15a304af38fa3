//! A/V Sender Application
//!
//! Captures video frames and microphone audio and streams them to a
//! receiver over two TCP connections.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lan_av_streamer::{
    audio::ToneInput,
    codec::JpegCodec,
    config::AppConfig,
    session::{start_sender, SenderDevices, SessionHandle},
    video::TestPatternSource,
};

/// Stream a camera and microphone to a receiver
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Receiver host name or IP address
    peer: Option<String>,

    #[arg(long)]
    video_port: Option<u16>,

    #[arg(long)]
    audio_port: Option<u16>,

    /// TOML config file (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JPEG quality, 1-100
    #[arg(short, long)]
    quality: Option<u8>,

    /// Capture from the default microphone instead of a test tone
    #[cfg(feature = "cpal-devices")]
    #[arg(long)]
    mic: bool,
}

const STATS_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!("Starting LAN A/V Sender");

    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    if let Some(peer) = args.peer.clone() {
        config.network.peer_address = peer;
    }
    if let Some(port) = args.video_port {
        config.network.video_port = port;
    }
    if let Some(port) = args.audio_port {
        config.network.audio_port = port;
    }
    if let Some(quality) = args.quality {
        config.video.jpeg_quality = quality;
    }

    tracing::info!(
        "Target receiver: {} (video :{}, audio :{})",
        config.network.peer_address,
        config.network.video_port,
        config.network.audio_port
    );

    let devices = build_devices(&config, &args);
    let session = start_sender(&config, devices).context("Failed to start sender session")?;

    run_until_stopped(session).await
}

fn build_devices(config: &AppConfig, args: &Args) -> SenderDevices {
    let (width, height) = (config.video.width, config.video.height);
    let codec = JpegCodec::new(config.video.jpeg_quality);
    let sample_rate = config.audio.sample_rate;

    #[cfg(feature = "cpal-devices")]
    if args.mic {
        let channels = config.audio.channels;
        return SenderDevices::new(
            move || TestPatternSource::open(width, height),
            move || lan_av_streamer::audio::CpalInput::open(None, sample_rate, channels),
            codec,
        );
    }
    let _ = args;

    SenderDevices::new(
        move || TestPatternSource::open(width, height),
        move || ToneInput::open(sample_rate, 440.0),
        codec,
    )
}

/// Log status events and stats until the session ends or Ctrl+C
async fn run_until_stopped(session: SessionHandle) -> Result<()> {
    let mut stats_tick = tokio::time::interval(STATS_INTERVAL);
    stats_tick.tick().await;
    let mut status_tick = tokio::time::interval(Duration::from_millis(100));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tracing::info!("Streaming - press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Stop requested");
                session.stop();
                break;
            }
            _ = stats_tick.tick() => {
                tracing::info!("Stats: {}", session.stats());
            }
            _ = status_tick.tick() => {
                for event in session.status().try_iter() {
                    tracing::info!("Status: {}", event);
                }
                if session.state().is_terminal() {
                    break;
                }
            }
        }
    }

    let session = tokio::task::spawn_blocking(move || {
        session.join();
        session
    })
    .await?;

    for event in session.status().try_iter() {
        tracing::info!("Status: {}", event);
    }
    tracing::info!("Final stats: {}", session.stats());
    Ok(())
}
