//! A/V Receiver Application
//!
//! Listens for a sender on the video and audio ports, renders the frames it
//! receives and plays the audio.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lan_av_streamer::{
    audio::NullOutput,
    codec::JpegCodec,
    config::AppConfig,
    device::RenderSurface,
    session::{start_receiver, ReceiverDevices, SessionHandle},
    video::{SnapshotSurface, StatsSurface},
};

/// Receive and present a stream from one sender
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Interface to listen on
    #[arg(short, long)]
    bind: Option<String>,

    #[arg(long)]
    video_port: Option<u16>,

    #[arg(long)]
    audio_port: Option<u16>,

    /// TOML config file (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep the latest frame in this JPEG file instead of only counting frames
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Play through the default output device instead of discarding audio
    #[cfg(feature = "cpal-devices")]
    #[arg(long)]
    speaker: bool,
}

const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Frames between StatsSurface log lines (about 10 s at 20 fps)
const SURFACE_LOG_EVERY: u64 = 200;

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
    tracing::info!("Starting LAN A/V Receiver");

    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    if let Some(bind) = args.bind.clone() {
        config.network.bind_address = bind;
    }
    if let Some(port) = args.video_port {
        config.network.video_port = port;
    }
    if let Some(port) = args.audio_port {
        config.network.audio_port = port;
    }

    let devices = build_devices(&config, &args);
    let session = start_receiver(&config, devices).context("Failed to start receiver session")?;

    run_until_stopped(session).await
}

fn build_devices(config: &AppConfig, args: &Args) -> ReceiverDevices {
    let (width, height) = (config.video.width, config.video.height);
    let codec = JpegCodec::new(config.video.jpeg_quality)
        .with_output_size(width, height)
        .with_max_dimensions(width.saturating_mul(4), height.saturating_mul(4));

    let surface: Box<dyn RenderSurface> = match &args.snapshot {
        Some(path) => {
            tracing::info!("Writing snapshots to {}", path.display());
            Box::new(SnapshotSurface::new(path.clone(), Duration::from_secs(1)))
        }
        None => Box::new(StatsSurface::new(SURFACE_LOG_EVERY)),
    };

    #[cfg(feature = "cpal-devices")]
    if args.speaker {
        let (rate, channels) = (config.audio.sample_rate, config.audio.channels);
        return ReceiverDevices::new(
            surface,
            move || lan_av_streamer::audio::CpalOutput::open(None, rate, channels),
            codec,
        );
    }

    ReceiverDevices::new(surface, || Ok(NullOutput::new()), codec)
}

/// Log status events and stats until the session ends or Ctrl+C
async fn run_until_stopped(session: SessionHandle) -> Result<()> {
    let mut stats_tick = tokio::time::interval(STATS_INTERVAL);
    stats_tick.tick().await;
    let mut status_tick = tokio::time::interval(Duration::from_millis(100));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    if let (Some(video), Some(audio)) = (session.local_video_addr(), session.local_audio_addr()) {
        tracing::info!("Waiting for a sender on {} / {} - press Ctrl+C to stop", video, audio);
    }

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Stop requested");
                session.stop();
                break;
            }
            _ = stats_tick.tick() => {
                if session.is_running() {
                    tracing::info!("Stats: {}", session.stats());
                }
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
