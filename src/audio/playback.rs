//! Speaker playback through cpal

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::SampleFormat;
use crossbeam_channel::bounded;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::device::{output_device, stream_config};
use crate::audio::SampleAssembler;
use crate::device::{AudioOutput, ReleaseHandle};
use crate::error::DeviceError;

type SharedSamples = Arc<Mutex<VecDeque<i16>>>;

/// Speaker handle fed with raw s16le bytes
pub struct CpalOutput {
    queue: SharedSamples,
    assembler: SampleAssembler,
    scratch: Vec<i16>,
    max_queued: usize,
    trimmed: Arc<AtomicU64>,
    handle: ReleaseHandle,
    thread_handle: Option<JoinHandle<()>>,
}

impl CpalOutput {
    /// Open `device_name` (or the default output). At most one second of
    /// audio is queued; older samples are dropped to bound latency.
    pub fn open(
        device_name: Option<&str>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, DeviceError> {
        let device = output_device(device_name)?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let sample_format = device
            .default_output_config()
            .map_err(|e| DeviceError::Unavailable(e.to_string()))?
            .sample_format();
        let config = stream_config(sample_rate, channels);

        let queue: SharedSamples = Arc::new(Mutex::new(VecDeque::new()));
        let handle = ReleaseHandle::new(format!("output:{}", name));
        let (ready_tx, ready_rx) = bounded::<Result<(), DeviceError>>(1);

        let released = handle.clone();
        let source = queue.clone();
        let thread_handle = thread::Builder::new()
            .name("cpal-playback".to_string())
            .spawn(move || {
                let stream = match build_stream(&device, &config, sample_format, source) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(DeviceError::Unavailable(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                while !released.is_released() {
                    thread::sleep(Duration::from_millis(10));
                }
            })
            .map_err(|e| DeviceError::Stream(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| DeviceError::Unavailable("Playback thread exited".to_string()))??;

        tracing::info!("Opened output {} ({} Hz, {} ch)", name, sample_rate, channels);

        Ok(Self {
            queue,
            assembler: SampleAssembler::default(),
            scratch: Vec::new(),
            max_queued: sample_rate as usize * channels as usize,
            trimmed: Arc::new(AtomicU64::new(0)),
            handle,
            thread_handle: Some(thread_handle),
        })
    }

    /// Samples dropped because playback fell more than a second behind
    pub fn trimmed_samples(&self) -> u64 {
        self.trimmed.load(Ordering::Relaxed)
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: SampleFormat,
    source: SharedSamples,
) -> Result<cpal::Stream, DeviceError> {
    let on_error = |err: cpal::StreamError| tracing::warn!("Output stream error: {}", err);

    let stream = match sample_format {
        SampleFormat::I16 => device.build_output_stream(
            config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                let mut queue = source.lock();
                for out in data.iter_mut() {
                    *out = queue.pop_front().unwrap_or(0);
                }
            },
            on_error,
            None,
        ),
        SampleFormat::F32 => device.build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut queue = source.lock();
                for out in data.iter_mut() {
                    *out = queue.pop_front().unwrap_or(0) as f32 / i16::MAX as f32;
                }
            },
            on_error,
            None,
        ),
        other => {
            return Err(DeviceError::Unavailable(format!(
                "Unsupported sample format {:?}",
                other
            )))
        }
    };

    stream.map_err(|e| DeviceError::Unavailable(e.to_string()))
}

impl AudioOutput for CpalOutput {
    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        self.handle.check()?;

        self.scratch.clear();
        self.assembler.push(bytes, &mut self.scratch);

        let mut queue = self.queue.lock();
        queue.extend(self.scratch.iter().copied());
        if queue.len() > self.max_queued {
            let excess = queue.len() - self.max_queued;
            queue.drain(..excess);
            self.trimmed.fetch_add(excess as u64, Ordering::Relaxed);
        }
        Ok(())
    }

    fn release_handle(&self) -> ReleaseHandle {
        self.handle.clone()
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.handle.release();
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}
