//! Synthetic sine-wave microphone

use std::f32::consts::PI;
use std::time::{Duration, Instant};

use crate::device::{AudioInput, ReleaseHandle};
use crate::error::DeviceError;
use crate::media::AudioChunk;

/// Mono sine generator that delivers chunks at the real sample rate
pub struct ToneInput {
    sample_rate: u32,
    frequency: f32,
    amplitude: f32,
    phase: f32,
    paced: bool,
    next_deadline: Option<Instant>,
    samples_generated: u64,
    handle: ReleaseHandle,
}

impl ToneInput {
    pub fn open(sample_rate: u32, frequency: f32) -> Result<Self, DeviceError> {
        if sample_rate == 0 || frequency <= 0.0 || frequency >= sample_rate as f32 / 2.0 {
            return Err(DeviceError::Unavailable(format!(
                "Cannot generate {} Hz at {} Hz",
                frequency, sample_rate
            )));
        }

        tracing::info!("Opened tone input: {} Hz sine at {} Hz", frequency, sample_rate);
        Ok(Self {
            sample_rate,
            frequency,
            amplitude: 0.25,
            phase: 0.0,
            paced: true,
            next_deadline: None,
            samples_generated: 0,
            handle: ReleaseHandle::new("tone-input"),
        })
    }

    /// Return chunks immediately instead of at the sample rate
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    pub fn samples_generated(&self) -> u64 {
        self.samples_generated
    }

    fn pace(&mut self, samples: usize) {
        let chunk_duration =
            Duration::from_secs_f64(samples as f64 / self.sample_rate as f64);
        let deadline = self.next_deadline.unwrap_or_else(Instant::now) + chunk_duration;

        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
            self.next_deadline = Some(deadline);
        } else {
            // Fell behind (e.g. slow consumer); restart the clock
            self.next_deadline = Some(now);
        }
    }
}

impl AudioInput for ToneInput {
    fn read_chunk(&mut self, samples: usize) -> Result<AudioChunk, DeviceError> {
        self.handle.check()?;
        if self.paced {
            self.pace(samples);
        }

        let step = 2.0 * PI * self.frequency / self.sample_rate as f32;
        let mut out = Vec::with_capacity(samples);
        for _ in 0..samples {
            out.push((self.phase.sin() * self.amplitude * i16::MAX as f32) as i16);
            self.phase = (self.phase + step) % (2.0 * PI);
        }
        self.samples_generated += samples as u64;

        Ok(AudioChunk::from_samples(&out))
    }

    fn release_handle(&self) -> ReleaseHandle {
        self.handle.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_size_and_range() {
        let mut tone = ToneInput::open(44_100, 440.0).unwrap().unpaced();
        let chunk = tone.read_chunk(1024).unwrap();

        assert_eq!(chunk.len(), 2048);
        let samples = chunk.samples();
        assert!(samples.iter().any(|&s| s > 0));
        assert!(samples.iter().any(|&s| s < 0));
        assert!(samples.iter().all(|&s| (s as i32).abs() <= i16::MAX as i32 / 4 + 1));
        assert_eq!(tone.samples_generated(), 1024);
    }

    #[test]
    fn test_paced_reads_take_real_time() {
        let mut tone = ToneInput::open(10_000, 440.0).unwrap();
        let start = Instant::now();
        for _ in 0..3 {
            tone.read_chunk(500).unwrap();
        }
        // 3 x 50 ms
        assert!(start.elapsed() >= Duration::from_millis(140));
    }

    #[test]
    fn test_released_input_fails() {
        let mut tone = ToneInput::open(44_100, 440.0).unwrap().unpaced();
        tone.release_handle().release();
        assert!(matches!(tone.read_chunk(16), Err(DeviceError::Released)));
    }

    #[test]
    fn test_rejects_aliasing_frequency() {
        assert!(ToneInput::open(8000, 5000.0).is_err());
    }
}
