//! Human-readable status events for whoever is watching the session

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt;
use std::net::SocketAddr;

/// Which of the two connections an event concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Video => f.write_str("video"),
            StreamKind::Audio => f.write_str("audio"),
        }
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Explicit stop from the user or the owning program
    UserRequest,
    /// The peer closed one of the connections
    PeerClosed(StreamKind),
    /// A pipeline hit a fatal I/O or device error
    PipelineError { stream: StreamKind, message: String },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::UserRequest => f.write_str("stop requested"),
            StopReason::PeerClosed(stream) => write!(f, "peer closed the {} connection", stream),
            StopReason::PipelineError { stream, message } => {
                write!(f, "{} error: {}", stream, message)
            }
        }
    }
}

/// One status update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Listening { video: SocketAddr, audio: SocketAddr },
    Connected { stream: StreamKind, peer: SocketAddr },
    Streaming,
    PipelineError { stream: StreamKind, message: String },
    SetupFailed { message: String },
    Stopped { reason: StopReason },
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::Listening { video, audio } => write!(
                f,
                "Listening on ports {} (video) and {} (audio)",
                video.port(),
                audio.port()
            ),
            StatusEvent::Connected { stream, peer } => {
                write!(f, "{} connected: {}", stream, peer)
            }
            StatusEvent::Streaming => f.write_str("Streaming"),
            StatusEvent::PipelineError { stream, message } => {
                write!(f, "{} error: {}", stream, message)
            }
            StatusEvent::SetupFailed { message } => write!(f, "Connection failed: {}", message),
            StatusEvent::Stopped { reason } => write!(f, "Stopped ({})", reason),
        }
    }
}

/// Sending half; never blocks and ignores a departed receiver
#[derive(Clone)]
pub struct StatusSender {
    tx: Sender<StatusEvent>,
}

impl StatusSender {
    pub fn send(&self, event: StatusEvent) {
        tracing::debug!("Status: {}", event);
        let _ = self.tx.send(event);
    }
}

pub type StatusReceiver = Receiver<StatusEvent>;

pub fn status_channel() -> (StatusSender, StatusReceiver) {
    let (tx, rx) = unbounded();
    (StatusSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let event = StatusEvent::Stopped {
            reason: StopReason::PeerClosed(StreamKind::Video),
        };
        assert_eq!(event.to_string(), "Stopped (peer closed the video connection)");

        let event = StatusEvent::Listening {
            video: "0.0.0.0:5000".parse().unwrap(),
            audio: "0.0.0.0:5001".parse().unwrap(),
        };
        assert_eq!(event.to_string(), "Listening on ports 5000 (video) and 5001 (audio)");
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = status_channel();
        drop(rx);
        tx.send(StatusEvent::Streaming);
    }
}
