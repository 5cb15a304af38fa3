//! Video send pipeline: capture → encode → frame → transmit

use std::io::Write;
use std::time::Duration;

use crate::codec::FrameCodec;
use crate::device::VideoSource;
use crate::error::{DeviceError, StreamError};
use crate::media::Frame;
use crate::pipeline::stats::bump;
use crate::protocol::FramedWriter;
use crate::session::{SessionControl, StreamKind};

pub struct VideoSendPipeline<S, C, W> {
    source: S,
    codec: C,
    writer: FramedWriter<W>,
    interval: Duration,
}

impl<S, C, W> VideoSendPipeline<S, C, W>
where
    S: VideoSource,
    C: FrameCodec,
    W: Write,
{
    pub fn new(source: S, codec: C, writer: FramedWriter<W>, interval: Duration) -> Self {
        Self {
            source,
            codec,
            writer,
            interval,
        }
    }

    /// Run until the session stops or a write fails.
    ///
    /// Pacing is open loop: every iteration sleeps the full interval no
    /// matter how long capture, encode and send took.
    pub fn run(mut self, control: &SessionControl) {
        let stats = control.stats().clone();
        tracing::info!(
            "Video send started ({} codec, {} ms interval)",
            self.codec.name(),
            self.interval.as_millis()
        );

        while control.is_running() {
            match self.source.capture() {
                Ok(frame) => {
                    bump(&stats.frames_captured, 1);
                    if !self.transmit(frame, control) {
                        break;
                    }
                }
                Err(DeviceError::Released) if control.is_closing() => break,
                Err(e) => {
                    bump(&stats.capture_failures, 1);
                    tracing::debug!("Capture failed, retrying next tick: {}", e);
                }
            }

            std::thread::sleep(self.interval);
        }

        tracing::info!(
            "Video send stopped after {} frames ({:.1} KB)",
            self.writer.frames_written(),
            self.writer.bytes_written() as f64 / 1024.0
        );
    }

    /// Encode and send one frame; false once the pipeline must stop
    fn transmit(&mut self, frame: Frame, control: &SessionControl) -> bool {
        let stats = control.stats();

        let payload = match self.codec.encode(frame) {
            Ok(payload) => payload,
            Err(e) => {
                bump(&stats.encode_errors, 1);
                tracing::warn!("Encode failed: {}", e);
                return true;
            }
        };

        match self.writer.send(&payload) {
            Ok(written) => {
                bump(&stats.frames_sent, 1);
                bump(&stats.video_bytes_sent, written as u64);
                tracing::trace!("Sent video frame ({} bytes)", written);
                true
            }
            Err(StreamError::FrameTooLarge { len, max }) => {
                tracing::warn!("Dropping {} byte frame (limit {})", len, max);
                true
            }
            Err(e) => {
                control.fail(StreamKind::Video, e);
                false
            }
        }
    }
}
