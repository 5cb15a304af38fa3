//! Collaborator interfaces for capture, playback and rendering
//!
//! Pipelines only ever talk to devices through these traits. Each device
//! hands out a [`ReleaseHandle`] so the session can release it from another
//! thread during teardown while the owning pipeline is blocked in a call.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::DeviceError;
use crate::media::{AudioChunk, Frame};
use crate::session::Resource;

/// Camera-like frame producer
pub trait VideoSource: Send {
    /// Block until the next frame is available
    fn capture(&mut self) -> Result<Frame, DeviceError>;

    fn release_handle(&self) -> ReleaseHandle;
}

/// Microphone-like PCM producer
pub trait AudioInput: Send {
    /// Read one chunk of `samples` samples.
    ///
    /// An input overflow must not fail the read: implementations log it and
    /// return whatever samples they have.
    fn read_chunk(&mut self, samples: usize) -> Result<AudioChunk, DeviceError>;

    fn release_handle(&self) -> ReleaseHandle;
}

/// Speaker-like PCM consumer
pub trait AudioOutput: Send {
    /// Queue raw s16le bytes for playback
    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError>;

    fn release_handle(&self) -> ReleaseHandle;
}

/// Display target for decoded frames
pub trait RenderSurface: Send {
    /// Show one frame. Must return quickly; it runs on the render thread.
    fn display(&mut self, frame: Frame);
}

impl<T: VideoSource + ?Sized> VideoSource for Box<T> {
    fn capture(&mut self) -> Result<Frame, DeviceError> {
        (**self).capture()
    }

    fn release_handle(&self) -> ReleaseHandle {
        (**self).release_handle()
    }
}

impl<T: AudioInput + ?Sized> AudioInput for Box<T> {
    fn read_chunk(&mut self, samples: usize) -> Result<AudioChunk, DeviceError> {
        (**self).read_chunk(samples)
    }

    fn release_handle(&self) -> ReleaseHandle {
        (**self).release_handle()
    }
}

impl<T: AudioOutput + ?Sized> AudioOutput for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        (**self).write(bytes)
    }

    fn release_handle(&self) -> ReleaseHandle {
        (**self).release_handle()
    }
}

impl<T: RenderSurface + ?Sized> RenderSurface for Box<T> {
    fn display(&mut self, frame: Frame) {
        (**self).display(frame)
    }
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Shared, idempotent release switch for one device
#[derive(Clone)]
pub struct ReleaseHandle {
    name: Arc<str>,
    released: Arc<AtomicBool>,
    hook: Arc<Mutex<Option<ReleaseHook>>>,
}

impl ReleaseHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            released: Arc::new(AtomicBool::new(false)),
            hook: Arc::new(Mutex::new(None)),
        }
    }

    /// Run `hook` on the first release, e.g. to stop a backend stream
    pub fn with_hook(self, hook: impl FnOnce() + Send + 'static) -> Self {
        *self.hook.lock() = Some(Box::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mark released; returns false if it already was
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Some(hook) = self.hook.lock().take() {
            hook();
        }
        tracing::debug!("Released device {}", self.name);
        true
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// `Err(Released)` once the handle has been released
    pub fn check(&self) -> Result<(), DeviceError> {
        if self.is_released() {
            Err(DeviceError::Released)
        } else {
            Ok(())
        }
    }
}

impl Resource for ReleaseHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn close(&self) -> std::io::Result<()> {
        self.release();
        Ok(())
    }
}

impl std::fmt::Debug for ReleaseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseHandle")
            .field("name", &self.name)
            .field("released", &self.is_released())
            .finish()
    }
}
