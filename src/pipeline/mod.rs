//! Stream pipelines
//!
//! Each pipeline is a plain struct whose `run` method is the body of one
//! long-lived thread. Loops check [`SessionControl::is_running`] every
//! iteration; a blocked socket or device call is interrupted by teardown
//! closing the resource underneath it.
//!
//! [`SessionControl::is_running`]: crate::session::SessionControl::is_running

pub mod audio_recv;
pub mod audio_send;
pub mod queue;
pub mod stats;
pub mod video_recv;
pub mod video_send;

pub use audio_recv::AudioReceivePipeline;
pub use audio_send::AudioSendPipeline;
pub use queue::{FrameQueue, PushOutcome};
pub use stats::{PipelineStats, StatsSnapshot};
pub use video_recv::{RenderStage, VideoReceivePipeline};
pub use video_send::VideoSendPipeline;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::session::SessionControl;

/// Spawn `body` on a named thread that shares the session
pub(crate) fn spawn_stage<F>(
    name: &str,
    control: &Arc<SessionControl>,
    body: F,
) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce(&SessionControl) + Send + 'static,
{
    let control = control.clone();
    let thread_name = name.to_string();
    thread::Builder::new().name(thread_name.clone()).spawn(move || {
        tracing::debug!("{} started", thread_name);
        body(&control);
        tracing::debug!("{} exited", thread_name);
    })
}
