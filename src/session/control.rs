//! Shared running flag, resource registry and once-only teardown

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::resource::Resource;
use super::status::{StatusEvent, StatusSender, StopReason, StreamKind};
use crate::pipeline::stats::PipelineStats;

/// Lifecycle of one peer's session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Stopping,
    Stopped,
}

impl SessionState {
    /// Nothing further will happen in this state without a new session
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Stopped)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Streaming => "streaming",
            SessionState::Stopping => "stopping",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// State every pipeline of one session shares.
///
/// `running` is the only flag the loops poll; it goes true once all
/// sockets are ready and false exactly once, at the end of teardown.
/// `closing` is the once-guard: whichever caller flips it first performs
/// teardown and everyone after that is a no-op.
pub struct SessionControl {
    id: Uuid,
    running: AtomicBool,
    closing: AtomicBool,
    state: Mutex<SessionState>,
    state_changed: Condvar,
    resources: Mutex<Vec<Arc<dyn Resource>>>,
    stop_reason: Mutex<Option<StopReason>>,
    status: StatusSender,
    stats: Arc<PipelineStats>,
}

impl SessionControl {
    pub fn new(status: StatusSender) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            running: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            state: Mutex::new(SessionState::Idle),
            state_changed: Condvar::new(),
            resources: Mutex::new(Vec::new()),
            stop_reason: Mutex::new(None),
            status,
            stats: Arc::new(PipelineStats::new()),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Loop continuation check for every pipeline
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Teardown (or setup failure) has begun
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason.lock().clone()
    }

    pub fn report(&self, event: StatusEvent) {
        self.status.send(event);
    }

    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock();
        tracing::debug!(session = %self.id, "Session {} -> {}", *state, next);
        *state = next;
        self.state_changed.notify_all();
    }

    /// Idle → Connecting
    pub fn begin_connecting(&self) {
        self.set_state(SessionState::Connecting);
    }

    /// Take ownership of a resource for teardown.
    ///
    /// If teardown already ran, the resource is closed on the spot.
    pub fn register(&self, resource: Arc<dyn Resource>) {
        let mut resources = self.resources.lock();
        if self.is_closing() {
            drop(resources);
            close_quietly(resource.as_ref());
            return;
        }
        tracing::trace!(session = %self.id, "Registered {}", resource.name());
        resources.push(resource);
    }

    /// Connecting → Streaming; false if the session was stopped meanwhile
    pub fn start_streaming(&self) -> bool {
        if self.is_closing() {
            return false;
        }
        self.running.store(true, Ordering::Release);
        self.set_state(SessionState::Streaming);
        self.report(StatusEvent::Streaming);
        tracing::info!(session = %self.id, "Session streaming");
        true
    }

    /// Close every resource once, then drop the running flag.
    ///
    /// Safe to call from any number of threads at once; only the first call
    /// does anything and it returns true.
    pub fn teardown(&self, reason: StopReason) -> bool {
        if self
            .closing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        tracing::info!(session = %self.id, "Stopping session: {}", reason);
        *self.stop_reason.lock() = Some(reason.clone());
        self.set_state(SessionState::Stopping);

        self.close_all();

        self.running.store(false, Ordering::Release);
        self.set_state(SessionState::Stopped);
        self.report(StatusEvent::Stopped { reason });
        true
    }

    /// Connecting → Idle after a bind/connect/accept/device failure
    pub fn fail_setup(&self, message: impl Into<String>) -> bool {
        if self
            .closing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let message = message.into();
        tracing::error!(session = %self.id, "Setup failed: {}", message);
        self.close_all();
        self.set_state(SessionState::Idle);
        self.report(StatusEvent::SetupFailed { message });
        true
    }

    /// A pipeline hit a fatal error: report it (unless we are already
    /// stopping, in which case it is a side effect of teardown) and stop
    /// the whole session.
    pub fn fail(&self, stream: StreamKind, error: impl fmt::Display) {
        if self.is_closing() {
            tracing::debug!(session = %self.id, "{} ended during teardown: {}", stream, error);
            return;
        }

        let message = error.to_string();
        tracing::error!(session = %self.id, "{} pipeline failed: {}", stream, message);
        self.report(StatusEvent::PipelineError {
            stream,
            message: message.clone(),
        });
        self.teardown(StopReason::PipelineError { stream, message });
    }

    /// A receive stage saw the peer close its connection
    pub fn peer_closed(&self, stream: StreamKind) {
        if self.is_closing() {
            return;
        }
        tracing::info!(session = %self.id, "Peer closed the {} connection", stream);
        self.teardown(StopReason::PeerClosed(stream));
    }

    /// Block until the session reaches Idle or Stopped; false on timeout
    pub fn wait_finished(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();
        while !state.is_terminal() || !self.is_closing() {
            match deadline {
                Some(deadline) => {
                    if self.state_changed.wait_until(&mut state, deadline).timed_out() {
                        return state.is_terminal() && self.is_closing();
                    }
                }
                None => self.state_changed.wait(&mut state),
            }
        }
        true
    }

    fn close_all(&self) {
        let resources: Vec<_> = self.resources.lock().drain(..).collect();
        for resource in resources.iter().rev() {
            close_quietly(resource.as_ref());
        }
    }
}

/// Close, swallowing errors from resources that are already broken
fn close_quietly(resource: &dyn Resource) {
    match resource.close() {
        Ok(()) => tracing::debug!("Closed {}", resource.name()),
        Err(e) => tracing::debug!("Ignoring error closing {}: {}", resource.name(), e),
    }
}
