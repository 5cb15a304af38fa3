//! Microphone capture through cpal
//!
//! cpal delivers samples on its own callback thread. The callback forwards
//! them over a bounded channel and [`CpalInput::read_chunk`] turns that back
//! into the blocking "read N samples" interface the pipeline expects.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::SampleFormat;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::device::{input_device, stream_config};
use crate::device::{AudioInput, ReleaseHandle};
use crate::error::DeviceError;
use crate::media::AudioChunk;

/// Callback buffers held before the oldest input is lost
const CAPTURE_QUEUE_DEPTH: usize = 64;

/// Microphone handle
pub struct CpalInput {
    samples_rx: Receiver<Vec<i16>>,
    pending: Vec<i16>,
    overflows: Arc<AtomicU64>,
    handle: ReleaseHandle,
    thread_handle: Option<JoinHandle<()>>,
}

impl CpalInput {
    /// Open `device_name` (or the default input) as mono/stereo s16
    pub fn open(
        device_name: Option<&str>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, DeviceError> {
        let device = input_device(device_name)?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let sample_format = device
            .default_input_config()
            .map_err(|e| DeviceError::Unavailable(e.to_string()))?
            .sample_format();
        let config = stream_config(sample_rate, channels);

        let (samples_tx, samples_rx) = bounded::<Vec<i16>>(CAPTURE_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = bounded::<Result<(), DeviceError>>(1);
        let overflows = Arc::new(AtomicU64::new(0));
        let handle = ReleaseHandle::new(format!("input:{}", name));

        let released = handle.clone();
        let overflow_counter = overflows.clone();
        let thread_handle = thread::Builder::new()
            .name("cpal-capture".to_string())
            .spawn(move || {
                // cpal::Stream is not Send, so it lives and dies on this thread
                let stream = match build_stream(
                    &device,
                    &config,
                    sample_format,
                    samples_tx,
                    overflow_counter,
                ) {
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
                // Stream is dropped here, stopping capture
            })
            .map_err(|e| DeviceError::Stream(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| DeviceError::Unavailable("Capture thread exited".to_string()))??;

        tracing::info!(
            "Opened input {} ({} Hz, {} ch, {:?})",
            name,
            sample_rate,
            channels,
            sample_format
        );

        Ok(Self {
            samples_rx,
            pending: Vec::new(),
            overflows,
            handle,
            thread_handle: Some(thread_handle),
        })
    }

    /// Callback buffers dropped because the reader fell behind
    pub fn overflow_count(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: SampleFormat,
    tx: Sender<Vec<i16>>,
    overflows: Arc<AtomicU64>,
) -> Result<cpal::Stream, DeviceError> {
    let on_error = |err: cpal::StreamError| tracing::warn!("Input stream error: {}", err);

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                forward(&tx, &overflows, data.to_vec());
            },
            on_error,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let samples = data
                    .iter()
                    .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                    .collect();
                forward(&tx, &overflows, samples);
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

fn forward(tx: &Sender<Vec<i16>>, overflows: &AtomicU64, samples: Vec<i16>) {
    // Overflow is tolerated: the buffer is dropped and counted
    if tx.try_send(samples).is_err() {
        overflows.fetch_add(1, Ordering::Relaxed);
    }
}

impl AudioInput for CpalInput {
    fn read_chunk(&mut self, samples: usize) -> Result<AudioChunk, DeviceError> {
        while self.pending.len() < samples {
            self.handle.check()?;
            match self.samples_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(buf) => self.pending.extend_from_slice(&buf),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(DeviceError::Stream("Capture stream ended".to_string()))
                }
            }
        }

        let overflows = self.overflows.swap(0, Ordering::Relaxed);
        if overflows > 0 {
            tracing::debug!("Input overflow: {} callback buffers dropped", overflows);
        }

        let chunk: Vec<i16> = self.pending.drain(..samples).collect();
        Ok(AudioChunk::from_samples(&chunk))
    }

    fn release_handle(&self) -> ReleaseHandle {
        self.handle.clone()
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        self.handle.release();
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}
