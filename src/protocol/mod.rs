//! Wire protocols
//!
//! The video stream is a sequence of length-prefixed frames:
//!
//! ```text
//! Frame := Header(4 bytes, big-endian u32 N) || Payload(N bytes, codec-opaque)
//! ```
//!
//! The audio stream has no framing at all: raw little-endian s16 PCM bytes
//! until the connection closes, so it needs nothing from this module.

pub mod framing;

pub use framing::{read_frame, write_frame, FramedReader, FramedWriter};
