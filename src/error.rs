//! Error types for the streaming application

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport and framing errors
#[derive(Error, Debug)]
pub enum StreamError {
    /// Peer closed the connection, or closed it part-way through a header
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// Peer closed the connection before the promised payload arrived
    #[error("Truncated frame: expected {expected} bytes, received {received}")]
    TruncatedFrame { expected: usize, received: usize },

    #[error("Frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },

    /// Bind, listen, accept or connect failed before streaming started
    #[error("Setup failed: {0}")]
    SetupFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// True only for an orderly close at a frame boundary. A truncated
    /// frame or a reset connection is a failure and keeps its message.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, StreamError::ConnectionClosed)
    }
}

/// Frame codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Corrupt or unsupported payload; the frame is dropped
    #[error("Decoding failed: {0}")]
    Decode(String),

    #[error("Invalid frame dimensions: {width}x{height} with {len} bytes")]
    InvalidDimensions { width: u32, height: u32, len: usize },
}

/// Capture and playback device errors
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    #[error("Device released")]
    Released,

    #[error("Device stream error: {0}")]
    Stream(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
