//! Audio receive pipeline
//!
//! Reads whatever the socket has (up to the buffer size) and passes it
//! straight to playback. Short reads are normal; a zero-length read is the
//! peer closing the stream.

use std::io::{ErrorKind, Read};

use crate::device::AudioOutput;
use crate::error::DeviceError;
use crate::pipeline::stats::bump;
use crate::session::{SessionControl, StreamKind};

pub struct AudioReceivePipeline<R, O> {
    reader: R,
    output: O,
    buffer: Vec<u8>,
}

impl<R: Read, O: AudioOutput> AudioReceivePipeline<R, O> {
    pub fn new(reader: R, output: O, buffer_len: usize) -> Self {
        Self {
            reader,
            output,
            buffer: vec![0; buffer_len.max(1)],
        }
    }

    pub fn run(mut self, control: &SessionControl) {
        let stats = control.stats().clone();
        tracing::info!("Audio receive started ({} byte reads)", self.buffer.len());

        while control.is_running() {
            let n = match self.reader.read(&mut self.buffer) {
                Ok(0) => {
                    control.peer_closed(StreamKind::Audio);
                    break;
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    control.fail(StreamKind::Audio, e);
                    break;
                }
            };
            bump(&stats.audio_bytes_received, n as u64);

            match self.output.write(&self.buffer[..n]) {
                Ok(()) => bump(&stats.audio_bytes_played, n as u64),
                Err(DeviceError::Released) if control.is_closing() => break,
                Err(e) => {
                    control.fail(StreamKind::Audio, e);
                    break;
                }
            }
        }

        tracing::info!("Audio receive stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ReleaseHandle;
    use crate::session::{status_channel, StopReason};
    use parking_lot::Mutex;
    use std::io;
    use std::sync::Arc;

    /// Delivers the source in reads of the given sizes, cycling
    struct Jagged {
        data: Vec<u8>,
        pos: usize,
        sizes: Vec<usize>,
        turn: usize,
    }

    impl Read for Jagged {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let want = self.sizes[self.turn % self.sizes.len()];
            self.turn += 1;
            let n = want.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[derive(Clone)]
    struct RecordingOutput {
        played: Arc<Mutex<Vec<u8>>>,
        writes: Arc<Mutex<Vec<usize>>>,
        handle: ReleaseHandle,
    }

    impl RecordingOutput {
        fn new() -> Self {
            Self {
                played: Arc::new(Mutex::new(Vec::new())),
                writes: Arc::new(Mutex::new(Vec::new())),
                handle: ReleaseHandle::new("speaker"),
            }
        }
    }

    impl AudioOutput for RecordingOutput {
        fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
            self.handle.check()?;
            self.played.lock().extend_from_slice(bytes);
            self.writes.lock().push(bytes.len());
            Ok(())
        }

        fn release_handle(&self) -> ReleaseHandle {
            self.handle.clone()
        }
    }

    fn running() -> Arc<SessionControl> {
        let (tx, _rx) = status_channel();
        let control = SessionControl::new(tx);
        control.begin_connecting();
        control.start_streaming();
        control
    }

    #[test]
    fn test_five_chunks_arrive_in_order() {
        let control = running();
        let data: Vec<u8> = (0..5 * 2048).map(|i| (i % 251) as u8).collect();
        let reader = Jagged {
            data: data.clone(),
            pos: 0,
            sizes: vec![1024, 7, 600, 1, 1024, 333],
            turn: 0,
        };
        let output = RecordingOutput::new();

        AudioReceivePipeline::new(reader, output.clone(), 1024).run(&control);

        assert_eq!(*output.played.lock(), data);
        assert!(output.writes.lock().iter().all(|&n| n > 0 && n <= 1024));
        assert_eq!(control.stop_reason(), Some(StopReason::PeerClosed(StreamKind::Audio)));

        let stats = control.stats().snapshot();
        assert_eq!(stats.audio_bytes_received, 10240);
        assert_eq!(stats.audio_bytes_played, 10240);
    }

    #[test]
    fn test_playback_failure_is_fatal() {
        let control = running();
        let output = RecordingOutput::new();
        output.handle.release();
        let reader = io::Cursor::new(vec![0u8; 64]);

        AudioReceivePipeline::new(reader, output, 1024).run(&control);

        assert!(matches!(
            control.stop_reason(),
            Some(StopReason::PipelineError { stream: StreamKind::Audio, .. })
        ));
    }
}
