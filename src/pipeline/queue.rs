//! Hand-off queue between the video network stage and the render stage
//!
//! FIFO: frames come out in the order they went in and the queue never
//! duplicates one. When bounded, a full queue either evicts its oldest frame
//! or refuses the new one, per [`OverflowPolicy`]; every such drop is
//! counted. The consumer blocks on a condition variable until frames arrive,
//! the queue is closed, or its wait bound expires.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::OverflowPolicy;
use crate::media::Frame;
use crate::session::Resource;

/// What happened to a pushed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queued after evicting the oldest frame
    EvictedOldest,
    /// Refused because the queue was full
    Rejected,
    /// Refused because the queue is closed
    Closed,
}

struct Inner {
    frames: VecDeque<Frame>,
    closed: bool,
}

/// Thread-safe FIFO of decoded frames
pub struct FrameQueue {
    inner: Mutex<Inner>,
    ready: Condvar,
    capacity: usize,
    policy: OverflowPolicy,
    dropped: AtomicU64,
}

impl FrameQueue {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner {
                frames: VecDeque::new(),
                closed: false,
            }),
            ready: Condvar::new(),
            capacity: capacity.max(1),
            policy,
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue that never drops
    pub fn unbounded() -> Self {
        Self::new(usize::MAX, OverflowPolicy::Unbounded)
    }

    /// Enqueue without ever blocking the producer
    pub fn push(&self, frame: Frame) -> PushOutcome {
        let mut inner = self.inner.lock();
        if inner.closed {
            return PushOutcome::Closed;
        }

        let full = inner.frames.len() >= self.capacity;
        let outcome = match (self.policy, full) {
            (OverflowPolicy::Unbounded, _) | (_, false) => PushOutcome::Queued,
            (OverflowPolicy::DropNewest, true) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return PushOutcome::Rejected;
            }
            (OverflowPolicy::DropOldest, true) => {
                inner.frames.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                PushOutcome::EvictedOldest
            }
        };

        inner.frames.push_back(frame);
        drop(inner);
        self.ready.notify_one();
        outcome
    }

    /// Take everything queued right now without waiting
    pub fn try_drain(&self) -> Vec<Frame> {
        self.inner.lock().frames.drain(..).collect()
    }

    /// Wait up to `timeout` for frames, then take all of them.
    ///
    /// Returns `None` once the queue is closed and empty, and an empty vec
    /// if the wait simply timed out.
    pub fn drain_wait(&self, timeout: Duration) -> Option<Vec<Frame>> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();

        while inner.frames.is_empty() && !inner.closed {
            if self.ready.wait_until(&mut inner, deadline).timed_out() {
                break;
            }
        }

        if inner.frames.is_empty() {
            return if inner.closed { None } else { Some(Vec::new()) };
        }
        Some(inner.frames.drain(..).collect())
    }

    /// Refuse further pushes and wake any waiting consumer
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> Option<usize> {
        match self.policy {
            OverflowPolicy::Unbounded => None,
            _ => Some(self.capacity),
        }
    }

    /// Frames lost to the overflow policy
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Resource for FrameQueue {
    fn name(&self) -> &str {
        "frame-queue"
    }

    fn close(&self) -> std::io::Result<()> {
        FrameQueue::close(self);
        Ok(())
    }
}
