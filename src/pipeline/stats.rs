//! Session-wide pipeline counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters bumped by every pipeline thread
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub frames_captured: AtomicU64,
    pub capture_failures: AtomicU64,
    pub encode_errors: AtomicU64,
    pub frames_sent: AtomicU64,
    pub video_bytes_sent: AtomicU64,
    pub frames_received: AtomicU64,
    pub video_bytes_received: AtomicU64,
    pub decode_errors: AtomicU64,
    pub frames_enqueued: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub frames_rendered: AtomicU64,
    pub audio_chunks_sent: AtomicU64,
    pub audio_bytes_sent: AtomicU64,
    pub audio_bytes_received: AtomicU64,
    pub audio_bytes_played: AtomicU64,
}

/// Plain copy of [`PipelineStats`] at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub frames_captured: u64,
    pub capture_failures: u64,
    pub encode_errors: u64,
    pub frames_sent: u64,
    pub video_bytes_sent: u64,
    pub frames_received: u64,
    pub video_bytes_received: u64,
    pub decode_errors: u64,
    pub frames_enqueued: u64,
    pub frames_dropped: u64,
    pub frames_rendered: u64,
    pub audio_chunks_sent: u64,
    pub audio_bytes_sent: u64,
    pub audio_bytes_received: u64,
    pub audio_bytes_played: u64,
}

pub(crate) fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            frames_captured: load(&self.frames_captured),
            capture_failures: load(&self.capture_failures),
            encode_errors: load(&self.encode_errors),
            frames_sent: load(&self.frames_sent),
            video_bytes_sent: load(&self.video_bytes_sent),
            frames_received: load(&self.frames_received),
            video_bytes_received: load(&self.video_bytes_received),
            decode_errors: load(&self.decode_errors),
            frames_enqueued: load(&self.frames_enqueued),
            frames_dropped: load(&self.frames_dropped),
            frames_rendered: load(&self.frames_rendered),
            audio_chunks_sent: load(&self.audio_chunks_sent),
            audio_bytes_sent: load(&self.audio_bytes_sent),
            audio_bytes_received: load(&self.audio_bytes_received),
            audio_bytes_played: load(&self.audio_bytes_played),
        }
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "video: {} captured / {} sent ({:.1} KB), {} received / {} rendered, \
             {} dropped, {} decode errors; audio: {:.1} KB sent, {:.1} KB played",
            self.frames_captured,
            self.frames_sent,
            self.video_bytes_sent as f64 / 1024.0,
            self.frames_received,
            self.frames_rendered,
            self.frames_dropped,
            self.decode_errors,
            self.audio_bytes_sent as f64 / 1024.0,
            self.audio_bytes_played as f64 / 1024.0,
        )
    }
}
