//! Frame codecs
//!
//! A codec turns one raw [`Frame`] into an opaque payload for the wire and
//! back. Both directions are pure: no state carries between frames.

pub mod jpeg;
pub mod raw;

pub use jpeg::JpegCodec;
pub use raw::RawCodec;

use bytes::Bytes;

use crate::error::CodecError;
use crate::media::Frame;

/// Encode/decode boundary used by the video pipelines
pub trait FrameCodec: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Compress a frame, consuming it
    fn encode(&mut self, frame: Frame) -> Result<Bytes, CodecError>;

    /// Decompress one payload
    fn decode(&mut self, payload: &[u8]) -> Result<Frame, CodecError>;
}

impl<C: FrameCodec + ?Sized> FrameCodec for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn encode(&mut self, frame: Frame) -> Result<Bytes, CodecError> {
        (**self).encode(frame)
    }

    fn decode(&mut self, payload: &[u8]) -> Result<Frame, CodecError> {
        (**self).decode(payload)
    }
}
