//! End-to-end sessions over loopback TCP

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use lan_av_streamer::codec::{JpegCodec, RawCodec};
use lan_av_streamer::config::{AppConfig, OverflowPolicy};
use lan_av_streamer::device::{AudioInput, AudioOutput, ReleaseHandle, RenderSurface, VideoSource};
use lan_av_streamer::error::{DeviceError, Error, StreamError};
use lan_av_streamer::media::{AudioChunk, Frame};
use lan_av_streamer::session::{
    start_receiver, start_sender, ReceiverDevices, SenderDevices, SessionHandle, SessionState,
    StatusEvent, StopReason,
};
use lan_av_streamer::video::TestPatternSource;

/// Frames carry a 16-bit sequence number in the first pixel
struct SequenceSource {
    next: u16,
    handle: ReleaseHandle,
}

impl SequenceSource {
    fn new() -> Self {
        Self {
            next: 0,
            handle: ReleaseHandle::new("sequence-camera"),
        }
    }
}

impl VideoSource for SequenceSource {
    fn capture(&mut self) -> Result<Frame, DeviceError> {
        self.handle.check()?;
        self.next = self.next.wrapping_add(1);
        let [hi, lo] = self.next.to_be_bytes();
        Ok(Frame::solid(8, 6, [hi, lo, 0]))
    }

    fn release_handle(&self) -> ReleaseHandle {
        self.handle.clone()
    }
}

/// Produces `chunks` ramp chunks, then idles until released
struct RampInput {
    next: i16,
    remaining: usize,
    handle: ReleaseHandle,
}

impl RampInput {
    fn new(chunks: usize) -> Self {
        Self {
            next: 0,
            remaining: chunks,
            handle: ReleaseHandle::new("ramp-mic"),
        }
    }
}

impl AudioInput for RampInput {
    fn read_chunk(&mut self, samples: usize) -> Result<AudioChunk, DeviceError> {
        while self.remaining == 0 {
            self.handle.check()?;
            thread::sleep(Duration::from_millis(5));
        }
        self.handle.check()?;
        self.remaining -= 1;
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

fn ramp_bytes(chunks: usize, samples: usize) -> Vec<u8> {
    (1..=(chunks * samples) as i32)
        .flat_map(|s| (s as i16).to_le_bytes())
        .collect()
}

#[derive(Clone, Default)]
struct RecordingSurface {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl RenderSurface for RecordingSurface {
    fn display(&mut self, frame: Frame) {
        self.frames.lock().push(frame);
    }
}

#[derive(Clone)]
struct RecordingOutput {
    bytes: Arc<Mutex<Vec<u8>>>,
    handle: ReleaseHandle,
}

impl RecordingOutput {
    fn new() -> Self {
        Self {
            bytes: Arc::new(Mutex::new(Vec::new())),
            handle: ReleaseHandle::new("recording-speaker"),
        }
    }
}

impl AudioOutput for RecordingOutput {
    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        self.handle.check()?;
        self.bytes.lock().extend_from_slice(bytes);
        Ok(())
    }

    fn release_handle(&self) -> ReleaseHandle {
        self.handle.clone()
    }
}

fn loopback_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.network.bind_address = "127.0.0.1".into();
    config.network.peer_address = "127.0.0.1".into();
    config.network.video_port = 0;
    config.network.audio_port = 0;
    config.network.connect_timeout_ms = 2000;
    config.video.frame_interval_ms = 5;
    config.video.overflow_policy = OverflowPolicy::Unbounded;
    config
}

/// Point a sender config at a listening receiver
fn sender_config(receiver: &SessionHandle) -> AppConfig {
    let mut config = loopback_config();
    config.network.video_port = receiver.local_video_addr().unwrap().port();
    config.network.audio_port = receiver.local_audio_addr().unwrap().port();
    config
}

fn wait_for(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn sequence_of(frame: &Frame) -> u16 {
    let px = frame.pixels();
    u16::from_be_bytes([px[0], px[1]])
}

#[test]
fn test_raw_session_delivers_video_and_audio_in_order() {
    let surface = RecordingSurface::default();
    let output = RecordingOutput::new();

    let receiver = {
        let output = output.clone();
        start_receiver(
            &loopback_config(),
            ReceiverDevices::new(surface.clone(), move || Ok(output), RawCodec),
        )
        .unwrap()
    };
    assert_eq!(receiver.state(), SessionState::Connecting);

    let sender = start_sender(
        &sender_config(&receiver),
        SenderDevices::new(|| Ok(SequenceSource::new()), || Ok(RampInput::new(5)), RawCodec),
    )
    .unwrap();
    assert_eq!(sender.state(), SessionState::Streaming);

    let expected_audio = ramp_bytes(5, 1024);
    assert!(wait_for(Duration::from_secs(10), || {
        surface.frames.lock().len() >= 20 && output.bytes.lock().len() >= expected_audio.len()
    }));
    assert!(receiver.is_running());

    sender.stop();
    sender.join();
    assert!(receiver.wait(Some(Duration::from_secs(5))));
    receiver.join();

    // Raw codec, unbounded queue: every frame shows up exactly once, in order
    let frames = surface.frames.lock();
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(sequence_of(frame), i as u16 + 1);
        assert_eq!((frame.width(), frame.height()), (8, 6));
    }
    assert_eq!(*output.bytes.lock(), expected_audio);

    assert!(matches!(receiver.stop_reason(), Some(StopReason::PeerClosed(_))));
    assert_eq!(sender.stop_reason(), Some(StopReason::UserRequest));

    let stats = receiver.stats();
    assert_eq!(stats.frames_rendered as usize, frames.len());
    assert_eq!(stats.audio_bytes_played, 5 * 2048);
    assert_eq!(stats.decode_errors, 0);
}

#[test]
fn test_jpeg_session_resizes_to_display_size() {
    let surface = RecordingSurface::default();

    let receiver = start_receiver(
        &loopback_config(),
        ReceiverDevices::new(
            surface.clone(),
            || Ok(RecordingOutput::new()),
            JpegCodec::new(70).with_output_size(640, 480),
        ),
    )
    .unwrap();

    let sender = start_sender(
        &sender_config(&receiver),
        SenderDevices::new(
            || TestPatternSource::open(320, 240),
            || Ok(RampInput::new(0)),
            JpegCodec::new(70),
        ),
    )
    .unwrap();

    assert!(wait_for(Duration::from_secs(10), || surface.frames.lock().len() >= 3));
    receiver.stop();

    // The sender notices on its next write
    assert!(sender.wait(Some(Duration::from_secs(10))));
    sender.join();
    receiver.join();

    for frame in surface.frames.lock().iter() {
        assert_eq!((frame.width(), frame.height()), (640, 480));
    }
    assert!(sender.stats().video_bytes_sent > 0);
}

#[test]
fn test_receiver_stop_while_waiting_for_clients() {
    let receiver = start_receiver(
        &loopback_config(),
        ReceiverDevices::new(
            RecordingSurface::default(),
            || Ok(RecordingOutput::new()),
            RawCodec,
        ),
    )
    .unwrap();

    let listening = receiver
        .status()
        .recv_timeout(Duration::from_secs(1))
        .unwrap();
    assert!(matches!(listening, StatusEvent::Listening { .. }));

    let started = Instant::now();
    receiver.stop();
    receiver.join();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(receiver.state(), SessionState::Stopped);
}

#[test]
fn test_sender_connect_failure_is_setup_failure() {
    // Grab two free ports, then close them
    let vacated = start_receiver(
        &loopback_config(),
        ReceiverDevices::new(
            RecordingSurface::default(),
            || Ok(RecordingOutput::new()),
            RawCodec,
        ),
    )
    .unwrap();
    let config = sender_config(&vacated);
    vacated.stop();
    vacated.join();

    let mic = RampInput::new(0);
    let mic_handle = mic.release_handle();
    let result = start_sender(
        &config,
        SenderDevices::new(|| Ok(SequenceSource::new()), move || Ok(mic), RawCodec),
    );

    assert!(matches!(
        result,
        Err(Error::Stream(StreamError::SetupFailure(_)))
    ));
    // Devices opened before the failure are released
    assert!(mic_handle.is_released());
}

#[test]
fn test_device_open_failure_starts_nothing() {
    let result = start_sender(
        &loopback_config(),
        SenderDevices::new(
            || -> Result<SequenceSource, DeviceError> {
                Err(DeviceError::Unavailable("camera 0".into()))
            },
            || Ok(RampInput::new(0)),
            RawCodec,
        ),
    );

    assert!(matches!(
        result,
        Err(Error::Device(DeviceError::Unavailable(_)))
    ));
}

#[test]
fn test_invalid_config_rejected_before_setup() {
    let mut config = loopback_config();
    config.video.jpeg_quality = 0;

    let result = start_receiver(
        &config,
        ReceiverDevices::new(
            RecordingSurface::default(),
            || Ok(RecordingOutput::new()),
            RawCodec,
        ),
    );
    assert!(matches!(result, Err(Error::Config(_))));
}
