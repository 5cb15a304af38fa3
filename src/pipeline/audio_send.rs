//! Audio send pipeline: read one chunk, write its raw bytes, repeat

use std::io::Write;

use crate::device::AudioInput;
use crate::error::DeviceError;
use crate::pipeline::stats::bump;
use crate::session::{SessionControl, StreamKind};

pub struct AudioSendPipeline<I, W> {
    input: I,
    writer: W,
    chunk_samples: usize,
}

impl<I: AudioInput, W: Write> AudioSendPipeline<I, W> {
    pub fn new(input: I, writer: W, chunk_samples: usize) -> Self {
        Self {
            input,
            writer,
            chunk_samples,
        }
    }

    /// Device read and socket write failures are both fatal
    pub fn run(mut self, control: &SessionControl) {
        let stats = control.stats().clone();
        tracing::info!("Audio send started ({} samples per chunk)", self.chunk_samples);

        while control.is_running() {
            let chunk = match self.input.read_chunk(self.chunk_samples) {
                Ok(chunk) => chunk,
                Err(DeviceError::Released) if control.is_closing() => break,
                Err(e) => {
                    control.fail(StreamKind::Audio, e);
                    break;
                }
            };

            if let Err(e) = self.writer.write_all(chunk.as_bytes()) {
                control.fail(StreamKind::Audio, e);
                break;
            }
            bump(&stats.audio_chunks_sent, 1);
            bump(&stats.audio_bytes_sent, chunk.len() as u64);
        }

        tracing::info!("Audio send stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ReleaseHandle;
    use crate::media::AudioChunk;
    use crate::session::{status_channel, StatusEvent, StopReason};
    use std::io;
    use std::sync::Arc;

    /// Ramp input that runs dry after `chunks` reads
    struct RampInput {
        next: i16,
        chunks: usize,
        handle: ReleaseHandle,
    }

    impl AudioInput for RampInput {
        fn read_chunk(&mut self, samples: usize) -> Result<AudioChunk, DeviceError> {
            if self.chunks == 0 {
                return Err(DeviceError::Stream("input overrun".into()));
            }
            self.chunks -= 1;
            let data: Vec<i16> = (0..samples)
                .map(|_| {
                    self.next = self.next.wrapping_add(1);
                    self.next
                })
                .collect();
            Ok(AudioChunk::from_samples(&data))
        }

        fn release_handle(&self) -> ReleaseHandle {
            self.handle.clone()
        }
    }

    fn running() -> (Arc<SessionControl>, crate::session::StatusReceiver) {
        let (tx, rx) = status_channel();
        let control = SessionControl::new(tx);
        control.begin_connecting();
        control.start_streaming();
        (control, rx)
    }

    #[test]
    fn test_chunks_written_unframed() {
        let (control, rx) = running();
        let input = RampInput {
            next: 0,
            chunks: 5,
            handle: ReleaseHandle::new("mic"),
        };
        let mut wire = Vec::new();

        AudioSendPipeline::new(input, &mut wire, 1024).run(&control);

        assert_eq!(wire.len(), 5 * 2048);
        let first = i16::from_le_bytes([wire[0], wire[1]]);
        let last = i16::from_le_bytes([wire[wire.len() - 2], wire[wire.len() - 1]]);
        assert_eq!(first, 1);
        assert_eq!(last, 5 * 1024);

        // The sixth read fails and stops the session
        assert!(matches!(
            control.stop_reason(),
            Some(StopReason::PipelineError { stream: StreamKind::Audio, .. })
        ));
        assert!(rx
            .try_iter()
            .any(|e| matches!(e, StatusEvent::PipelineError { stream: StreamKind::Audio, .. })));
        assert_eq!(control.stats().snapshot().audio_chunks_sent, 5);
    }

    #[test]
    fn test_write_failure_is_fatal() {
        struct Broken;

        impl io::Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::ConnectionReset.into())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let (control, _rx) = running();
        let input = RampInput {
            next: 0,
            chunks: 100,
            handle: ReleaseHandle::new("mic"),
        };

        AudioSendPipeline::new(input, Broken, 1024).run(&control);

        assert!(!control.is_running());
        assert_eq!(control.stats().snapshot().audio_bytes_sent, 0);
    }
}
