//! Playback sink that discards audio

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::device::{AudioOutput, ReleaseHandle};
use crate::error::DeviceError;

/// Counts bytes "played" and throws them away
pub struct NullOutput {
    played: Arc<AtomicU64>,
    handle: ReleaseHandle,
}

impl NullOutput {
    pub fn new() -> Self {
        Self {
            played: Arc::new(AtomicU64::new(0)),
            handle: ReleaseHandle::new("null-output"),
        }
    }

    /// Shared counter of bytes written so far
    pub fn counter(&self) -> Arc<AtomicU64> {
        self.played.clone()
    }
}

impl Default for NullOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for NullOutput {
    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        self.handle.check()?;
        self.played.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn release_handle(&self) -> ReleaseHandle {
        self.handle.clone()
    }
}
