//! Video receive pipeline
//!
//! Two stages on two threads joined by a [`FrameQueue`]:
//!
//! - [`VideoReceivePipeline`] reads framed payloads off the socket, decodes
//!   them and pushes the frames. It never blocks on the renderer.
//! - [`RenderStage`] sleeps on the queue until frames arrive (or the poll
//!   bound expires), drains everything queued and hands each frame to the
//!   render surface in arrival order.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use crate::codec::FrameCodec;
use crate::device::RenderSurface;
use crate::pipeline::queue::{FrameQueue, PushOutcome};
use crate::pipeline::stats::bump;
use crate::protocol::FramedReader;
use crate::session::{SessionControl, StreamKind};

/// Network stage: receive → decode → enqueue
pub struct VideoReceivePipeline<C, R> {
    codec: C,
    reader: FramedReader<R>,
    queue: Arc<FrameQueue>,
}

impl<C: FrameCodec, R: Read> VideoReceivePipeline<C, R> {
    pub fn new(codec: C, reader: FramedReader<R>, queue: Arc<FrameQueue>) -> Self {
        Self {
            codec,
            reader,
            queue,
        }
    }

    pub fn run(mut self, control: &SessionControl) {
        let stats = control.stats().clone();
        tracing::info!("Video receive started ({} codec)", self.codec.name());

        while control.is_running() {
            let payload = match self.reader.recv() {
                Ok(payload) => payload,
                Err(e) if e.is_disconnect() => {
                    control.peer_closed(StreamKind::Video);
                    break;
                }
                Err(e) => {
                    control.fail(StreamKind::Video, e);
                    break;
                }
            };
            bump(&stats.frames_received, 1);
            bump(&stats.video_bytes_received, payload.len() as u64);

            let frame = match self.codec.decode(&payload) {
                Ok(frame) => frame,
                Err(e) => {
                    bump(&stats.decode_errors, 1);
                    tracing::warn!("Dropping undecodable frame ({} bytes): {}", payload.len(), e);
                    continue;
                }
            };

            match self.queue.push(frame) {
                PushOutcome::Queued => bump(&stats.frames_enqueued, 1),
                PushOutcome::EvictedOldest => {
                    bump(&stats.frames_enqueued, 1);
                    bump(&stats.frames_dropped, 1);
                    tracing::debug!("Render stage behind, evicted oldest frame");
                }
                PushOutcome::Rejected => {
                    bump(&stats.frames_dropped, 1);
                    tracing::debug!("Render stage behind, dropped newest frame");
                }
                PushOutcome::Closed => break,
            }
        }

        self.queue.close();
        tracing::info!(
            "Video receive stopped after {} frames ({:.1} KB)",
            self.reader.frames_read(),
            self.reader.bytes_read() as f64 / 1024.0
        );
    }
}

/// Render consumer
pub struct RenderStage<S> {
    surface: S,
    queue: Arc<FrameQueue>,
    poll: Duration,
}

impl<S: RenderSurface> RenderStage<S> {
    /// `poll` bounds how long one wait on the queue may last
    pub fn new(surface: S, queue: Arc<FrameQueue>, poll: Duration) -> Self {
        Self {
            surface,
            queue,
            poll,
        }
    }

    pub fn run(mut self, control: &SessionControl) {
        let stats = control.stats().clone();

        while control.is_running() {
            let Some(frames) = self.queue.drain_wait(self.poll) else {
                break;
            };
            if frames.len() > 1 {
                tracing::trace!("Rendering backlog of {} frames", frames.len());
            }
            for frame in frames {
                self.surface.display(frame);
                bump(&stats.frames_rendered, 1);
            }
        }

        tracing::debug!("Render stage stopped");
    }
}
