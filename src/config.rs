//! Application configuration
//!
//! Loaded from a TOML file; every section falls back to the defaults in
//! [`crate::constants`] for fields that are absent.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub video: VideoConfig,
    pub audio: AudioConfig,
}

/// Transport settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Receiver host the sender connects to
    pub peer_address: String,
    /// Interface the receiver listens on
    pub bind_address: String,
    pub video_port: u16,
    pub audio_port: u16,
    /// Sender connect timeout
    pub connect_timeout_ms: u64,
    /// Disable Nagle on both sockets
    pub nodelay: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            peer_address: "127.0.0.1".to_string(),
            bind_address: "0.0.0.0".to_string(),
            video_port: DEFAULT_VIDEO_PORT,
            audio_port: DEFAULT_AUDIO_PORT,
            connect_timeout_ms: 5000,
            nodelay: true,
        }
    }
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Resolve `host:port` for one of the two streams
    fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
        use std::net::ToSocketAddrs;

        (host, port)
            .to_socket_addrs()
            .map_err(|e| Error::Config(format!("Invalid address {}:{}: {}", host, port, e)))?
            .next()
            .ok_or_else(|| Error::Config(format!("Address {}:{} did not resolve", host, port)))
    }

    pub fn peer_video_addr(&self) -> Result<SocketAddr> {
        Self::resolve(&self.peer_address, self.video_port)
    }

    pub fn peer_audio_addr(&self) -> Result<SocketAddr> {
        Self::resolve(&self.peer_address, self.audio_port)
    }

    pub fn bind_video_addr(&self) -> Result<SocketAddr> {
        Self::resolve(&self.bind_address, self.video_port)
    }

    pub fn bind_audio_addr(&self) -> Result<SocketAddr> {
        Self::resolve(&self.bind_address, self.audio_port)
    }
}

/// What the frame queue does when it is full
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued frame to make room
    #[default]
    DropOldest,
    /// Discard the incoming frame
    DropNewest,
    /// Never drop; memory grows with the backlog
    Unbounded,
}

/// Video pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: u8,
    pub frame_interval_ms: u64,
    pub render_poll_ms: u64,
    pub max_frame_size: usize,
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            render_poll_ms: DEFAULT_RENDER_POLL_MS,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

impl VideoConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn render_poll(&self) -> Duration {
        Duration::from_millis(self.render_poll_ms)
    }
}

/// Audio pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_samples: usize,
    pub recv_buffer_bytes: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: AUDIO_SAMPLE_RATE,
            channels: AUDIO_CHANNELS,
            chunk_samples: AUDIO_CHUNK_SAMPLES,
            recv_buffer_bytes: AUDIO_RECV_BUFFER,
        }
    }
}

impl AudioConfig {
    /// Bytes in one captured chunk
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_samples * self.channels as usize * AUDIO_BYTES_PER_SAMPLE
    }
}

impl AppConfig {
    /// Default config file location, e.g. `~/.config/lan-av-streamer/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "lan-av-streamer")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Load `path` if given, else the default location if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(default) if default.exists() => {
                tracing::info!("Loading config from {}", default.display());
                Self::load(&default)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject settings no session could run with
    pub fn validate(&self) -> Result<()> {
        let net = &self.network;
        // Port 0 lets the OS pick when binding
        if net.video_port != 0 && net.video_port == net.audio_port {
            return Err(Error::Config(format!(
                "Video and audio ports must differ (both {})",
                net.video_port
            )));
        }

        let video = &self.video;
        if video.width == 0 || video.height == 0 {
            return Err(Error::Config("Frame dimensions must be non-zero".into()));
        }
        if !(1..=100).contains(&video.jpeg_quality) {
            return Err(Error::Config(format!(
                "JPEG quality {} outside 1..=100",
                video.jpeg_quality
            )));
        }
        if video.frame_interval_ms == 0 {
            return Err(Error::Config("Frame interval must be non-zero".into()));
        }
        if video.max_frame_size == 0 || video.max_frame_size > u32::MAX as usize {
            return Err(Error::Config(format!(
                "Max frame size {} must be in 1..=u32::MAX",
                video.max_frame_size
            )));
        }
        if video.overflow_policy != OverflowPolicy::Unbounded && video.queue_capacity == 0 {
            return Err(Error::Config("Bounded queue needs a capacity".into()));
        }

        let audio = &self.audio;
        if audio.chunk_samples == 0 || audio.recv_buffer_bytes == 0 || audio.channels == 0 {
            return Err(Error::Config("Audio chunk and buffer sizes must be non-zero".into()));
        }

        Ok(())
    }
}
