//! Sender side: open devices, connect both streams, start the two pipelines

use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;

use super::control::SessionControl;
use super::handle::{SessionHandle, ThreadList};
use super::net;
use super::Opener;
use super::resource::SocketResource;
use super::status::{status_channel, StatusEvent, StopReason, StreamKind};
use crate::codec::FrameCodec;
use crate::config::AppConfig;
use crate::device::{AudioInput, VideoSource};
use crate::error::{DeviceError, Error, Result, StreamError};
use crate::pipeline::{spawn_stage, AudioSendPipeline, VideoSendPipeline};
use crate::protocol::FramedWriter;

/// Capture devices and codec for one sender session.
///
/// Devices are opened lazily by [`start_sender`] so an open failure is a
/// setup failure of the session like any socket error.
pub struct SenderDevices {
    video: Opener<Box<dyn VideoSource>>,
    audio: Opener<Box<dyn AudioInput>>,
    codec: Box<dyn FrameCodec>,
}

impl SenderDevices {
    pub fn new<V, A, FV, FA, C>(open_video: FV, open_audio: FA, codec: C) -> Self
    where
        V: VideoSource + 'static,
        A: AudioInput + 'static,
        FV: FnOnce() -> std::result::Result<V, DeviceError> + Send + 'static,
        FA: FnOnce() -> std::result::Result<A, DeviceError> + Send + 'static,
        C: FrameCodec + 'static,
    {
        Self {
            video: Box::new(move || open_video().map(|v| Box::new(v) as Box<dyn VideoSource>)),
            audio: Box::new(move || open_audio().map(|a| Box::new(a) as Box<dyn AudioInput>)),
            codec: Box::new(codec),
        }
    }
}

/// Open devices, connect to the receiver and start streaming.
///
/// Returns once both pipelines are running. On any setup error every
/// resource acquired so far is released and the error is returned.
pub fn start_sender(config: &AppConfig, devices: SenderDevices) -> Result<SessionHandle> {
    config.validate()?;

    let (status_tx, status_rx) = status_channel();
    let control = SessionControl::new(status_tx);
    control.begin_connecting();
    tracing::info!(session = %control.id(), "Starting sender session");

    let parts = setup(config, devices.video, devices.audio, &control);
    let (source, input, video_sock, audio_sock) = match parts {
        Ok(parts) => parts,
        Err(e) => {
            control.fail_setup(e.to_string());
            return Err(e);
        }
    };

    if !control.start_streaming() {
        return Err(StreamError::SetupFailure("Session stopped during setup".into()).into());
    }

    let threads: ThreadList = Arc::new(Mutex::new(Vec::new()));

    let interval = config.video.frame_interval();
    let writer = FramedWriter::new(video_sock, config.video.max_frame_size);
    let video = VideoSendPipeline::new(source, devices.codec, writer, interval);
    let chunk_samples = config.audio.chunk_samples;
    let audio = AudioSendPipeline::new(input, audio_sock, chunk_samples);

    let spawned = spawn_stage("video-send", &control, move |c| video.run(c)).and_then(|video| {
        threads.lock().push(video);
        spawn_stage("audio-send", &control, move |c| audio.run(c))
    });
    match spawned {
        Ok(audio) => threads.lock().push(audio),
        Err(e) => {
            control.teardown(StopReason::PipelineError {
                stream: StreamKind::Audio,
                message: e.to_string(),
            });
            return Err(Error::Io(e));
        }
    }

    Ok(SessionHandle::new(control, threads, status_rx, None, None))
}

type SenderParts = (Box<dyn VideoSource>, Box<dyn AudioInput>, TcpStream, TcpStream);

fn setup(
    config: &AppConfig,
    open_video: Opener<Box<dyn VideoSource>>,
    open_audio: Opener<Box<dyn AudioInput>>,
    control: &SessionControl,
) -> Result<SenderParts> {
    let source = open_video()?;
    control.register(Arc::new(source.release_handle()));
    let input = open_audio()?;
    control.register(Arc::new(input.release_handle()));

    let net_config = &config.network;
    let timeout = net_config.connect_timeout();

    let video_addr = net_config.peer_video_addr()?;
    let video_sock = net::connect(video_addr, timeout)?;
    register_socket(control, "video-socket", &video_sock)?;
    net::configure(&video_sock, net_config.nodelay)?;
    control.report(StatusEvent::Connected {
        stream: StreamKind::Video,
        peer: video_addr,
    });

    let audio_addr = net_config.peer_audio_addr()?;
    let audio_sock = net::connect(audio_addr, timeout)?;
    register_socket(control, "audio-socket", &audio_sock)?;
    net::configure(&audio_sock, net_config.nodelay)?;
    control.report(StatusEvent::Connected {
        stream: StreamKind::Audio,
        peer: audio_addr,
    });

    tracing::info!("Connected to {} (video) and {} (audio)", video_addr, audio_addr);
    Ok((source, input, video_sock, audio_sock))
}

pub(crate) fn register_socket(
    control: &SessionControl,
    name: &str,
    stream: &TcpStream,
) -> std::result::Result<(), StreamError> {
    let resource = SocketResource::new(name, stream)
        .map_err(|e| StreamError::SetupFailure(format!("{}: {}", name, e)))?;
    control.register(Arc::new(resource));
    Ok(())
}
