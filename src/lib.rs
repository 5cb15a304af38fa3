//! # LAN A/V Streamer
//!
//! Live video frames and raw audio samples streamed from a capture PC to a
//! display PC over two independent persistent TCP connections.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            SENDER PC                                │
//! │  ┌─────────────┐                          ┌─────────────┐           │
//! │  │   Camera    │                          │ Microphone  │           │
//! │  └──────┬──────┘                          └──────┬──────┘           │
//! │         ▼                                        ▼                  │
//! │  ┌─────────────┐   ┌─────────────┐        ┌─────────────┐           │
//! │  │ video-send  │──▶│ JPEG encode │        │ audio-send  │           │
//! │  │ (50ms tick) │   └──────┬──────┘        │ 1024 x s16  │           │
//! │  └─────────────┘          ▼               └──────┬──────┘           │
//! │                   [len u32 BE | payload]         │ raw PCM          │
//! └───────────────────────────┼──────────────────────┼──────────────────┘
//!                             │ TCP :5000            │ TCP :5001
//!                             ▼                      ▼
//! ┌───────────────────────────┼──────────────────────┼──────────────────┐
//! │                           │  RECEIVER PC         │                  │
//! │  ┌─────────────┐   ┌──────┴──────┐        ┌──────┴──────┐           │
//! │  │ JPEG decode │◀──│ video-recv  │        │ audio-recv  │           │
//! │  └──────┬──────┘   └─────────────┘        └──────┬──────┘           │
//! │         ▼                                        ▼                  │
//! │  ┌─────────────┐   ┌─────────────┐        ┌─────────────┐           │
//! │  │ FrameQueue  │──▶│video-render │        │  Playback   │           │
//! │  └─────────────┘   └─────────────┘        └─────────────┘           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every pipeline runs on its own thread and observes one shared running
//! flag. Any fatal error tears the whole session down exactly once.

pub mod audio;
pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod protocol;
pub mod session;
pub mod video;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default TCP port for the video stream
    pub const DEFAULT_VIDEO_PORT: u16 = 5000;

    /// Default TCP port for the audio stream
    pub const DEFAULT_AUDIO_PORT: u16 = 5001;

    /// Fixed frame width
    pub const FRAME_WIDTH: u32 = 640;

    /// Fixed frame height
    pub const FRAME_HEIGHT: u32 = 480;

    /// Largest JPEG dimensions the receiver will decode (4x the frame size)
    pub const MAX_DECODE_WIDTH: u32 = FRAME_WIDTH * 4;
    pub const MAX_DECODE_HEIGHT: u32 = FRAME_HEIGHT * 4;

    /// JPEG quality used by the sender
    pub const DEFAULT_JPEG_QUALITY: u8 = 70;

    /// Nominal pause between video iterations (~20 FPS)
    pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 50;

    /// Upper bound on how long the render stage waits for a frame
    pub const DEFAULT_RENDER_POLL_MS: u64 = 10;

    /// Length of the big-endian frame header
    pub const FRAME_HEADER_LEN: usize = 4;

    /// Largest payload accepted on the video stream (1 MiB)
    pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

    /// Decoded frames held between network and render stages
    pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

    /// Audio sample rate
    pub const AUDIO_SAMPLE_RATE: u32 = 44_100;

    /// Mono audio
    pub const AUDIO_CHANNELS: u16 = 1;

    /// Bytes per 16-bit sample
    pub const AUDIO_BYTES_PER_SAMPLE: usize = 2;

    /// Samples captured per audio read
    pub const AUDIO_CHUNK_SAMPLES: usize = 1024;

    /// Bytes per captured audio chunk
    pub const AUDIO_CHUNK_BYTES: usize = AUDIO_CHUNK_SAMPLES * AUDIO_BYTES_PER_SAMPLE;

    /// Receive buffer size for the audio socket
    pub const AUDIO_RECV_BUFFER: usize = 1024;
}
