//! Owner-side handle to a running session

use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::control::{SessionControl, SessionState};
use super::status::{StatusReceiver, StopReason};
use crate::pipeline::stats::StatsSnapshot;

pub(crate) type ThreadList = Arc<Mutex<Vec<JoinHandle<()>>>>;

/// Handle returned by [`start_sender`](super::start_sender) and
/// [`start_receiver`](super::start_receiver).
///
/// Dropping it stops the session; call [`join`](Self::join) to wait for the
/// pipeline threads to exit.
pub struct SessionHandle {
    control: Arc<SessionControl>,
    threads: ThreadList,
    status: StatusReceiver,
    local_video: Option<SocketAddr>,
    local_audio: Option<SocketAddr>,
}

impl SessionHandle {
    pub(crate) fn new(
        control: Arc<SessionControl>,
        threads: ThreadList,
        status: StatusReceiver,
        local_video: Option<SocketAddr>,
        local_audio: Option<SocketAddr>,
    ) -> Self {
        Self {
            control,
            threads,
            status,
            local_video,
            local_audio,
        }
    }

    /// Request a stop; idempotent
    pub fn stop(&self) {
        self.control.teardown(StopReason::UserRequest);
    }

    /// Join every pipeline thread, including ones spawned after this call
    /// starts (the receiver spawns its pipelines only once both peers connect).
    pub fn join(&self) {
        loop {
            let next = self.threads.lock().pop();
            let Some(handle) = next else {
                break;
            };
            let name = handle.thread().name().unwrap_or("pipeline").to_string();
            if handle.join().is_err() {
                tracing::error!("{} thread panicked", name);
            }
        }
    }

    /// Block until the session is over (Stopped, or back to Idle after a
    /// failed setup). Returns false on timeout.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        self.control.wait_finished(timeout)
    }

    pub fn state(&self) -> SessionState {
        self.control.state()
    }

    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.control.stop_reason()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.control.stats().snapshot()
    }

    /// Status events; clones share one queue
    pub fn status(&self) -> &StatusReceiver {
        &self.status
    }

    pub fn control(&self) -> &Arc<SessionControl> {
        &self.control
    }

    /// Bound video address (receiver only)
    pub fn local_video_addr(&self) -> Option<SocketAddr> {
        self.local_video
    }

    /// Bound audio address (receiver only)
    pub fn local_audio_addr(&self) -> Option<SocketAddr> {
        self.local_audio
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
