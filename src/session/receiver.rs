//! Receiver side: listen on both ports, accept one client each, then start
//! the network, render and playback pipelines

use parking_lot::Mutex;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use super::control::SessionControl;
use super::handle::{SessionHandle, ThreadList};
use super::net;
use super::sender::register_socket;
use super::status::{status_channel, StatusEvent, StopReason, StreamKind};
use super::Opener;
use crate::codec::FrameCodec;
use crate::config::{AppConfig, OverflowPolicy};
use crate::device::{AudioOutput, RenderSurface};
use crate::error::{DeviceError, Error, Result, StreamError};
use crate::pipeline::{
    spawn_stage, AudioReceivePipeline, FrameQueue, RenderStage, VideoReceivePipeline,
};
use crate::protocol::FramedReader;

/// Render surface, playback device and codec for one receiver session
pub struct ReceiverDevices {
    surface: Box<dyn RenderSurface>,
    audio: Opener<Box<dyn AudioOutput>>,
    codec: Box<dyn FrameCodec>,
}

impl ReceiverDevices {
    pub fn new<S, O, FO, C>(surface: S, open_audio: FO, codec: C) -> Self
    where
        S: RenderSurface + 'static,
        O: AudioOutput + 'static,
        FO: FnOnce() -> std::result::Result<O, DeviceError> + Send + 'static,
        C: FrameCodec + 'static,
    {
        Self {
            surface: Box::new(surface),
            audio: Box::new(move || open_audio().map(|o| Box::new(o) as Box<dyn AudioOutput>)),
            codec: Box::new(codec),
        }
    }
}

type Stage = Box<dyn FnOnce(&SessionControl) + Send>;

/// Everything the accept thread hands to the pipelines
struct Pending {
    devices: ReceiverDevicesOpen,
    queue: Arc<FrameQueue>,
    config: AppConfig,
    threads: ThreadList,
}

struct ReceiverDevicesOpen {
    surface: Box<dyn RenderSurface>,
    output: Box<dyn AudioOutput>,
    codec: Box<dyn FrameCodec>,
}

/// Bind both listeners and return immediately.
///
/// Accepting happens in the background; the session reports
/// [`StatusEvent::Listening`] now and [`StatusEvent::Streaming`] once both
/// clients have connected. Bind and device-open errors are returned directly.
pub fn start_receiver(config: &AppConfig, devices: ReceiverDevices) -> Result<SessionHandle> {
    config.validate()?;

    let (status_tx, status_rx) = status_channel();
    let control = SessionControl::new(status_tx);
    control.begin_connecting();
    tracing::info!(session = %control.id(), "Starting receiver session");

    let (output, video_listener, audio_listener) = match setup(config, devices.audio, &control)
    {
        Ok(parts) => parts,
        Err(e) => {
            control.fail_setup(e.to_string());
            return Err(e);
        }
    };

    let local_video = video_listener.local_addr().ok();
    let local_audio = audio_listener.local_addr().ok();
    if let (Some(video), Some(audio)) = (local_video, local_audio) {
        tracing::info!("Listening on {} (video) and {} (audio)", video, audio);
        control.report(StatusEvent::Listening { video, audio });
    }

    let queue = Arc::new(build_queue(config));
    control.register(queue.clone());

    let threads: ThreadList = Arc::new(Mutex::new(Vec::new()));
    let pending = Pending {
        devices: ReceiverDevicesOpen {
            surface: devices.surface,
            output,
            codec: devices.codec,
        },
        queue,
        config: config.clone(),
        threads: threads.clone(),
    };

    let accept = {
        let control = control.clone();
        thread::Builder::new()
            .name("accept".to_string())
            .spawn(move || accept_and_start(&control, video_listener, audio_listener, pending))
    };
    match accept {
        Ok(handle) => threads.lock().push(handle),
        Err(e) => {
            control.fail_setup(format!("spawn accept thread: {}", e));
            return Err(Error::Io(e));
        }
    }

    Ok(SessionHandle::new(control, threads, status_rx, local_video, local_audio))
}

fn setup(
    config: &AppConfig,
    open_audio: Opener<Box<dyn AudioOutput>>,
    control: &SessionControl,
) -> Result<(Box<dyn AudioOutput>, TcpListener, TcpListener)> {
    let output = open_audio()?;
    control.register(Arc::new(output.release_handle()));

    let video_listener = net::bind_listener(config.network.bind_video_addr()?)?;
    let audio_listener = net::bind_listener(config.network.bind_audio_addr()?)?;
    Ok((output, video_listener, audio_listener))
}

fn build_queue(config: &AppConfig) -> FrameQueue {
    match config.video.overflow_policy {
        OverflowPolicy::Unbounded => FrameQueue::unbounded(),
        policy => FrameQueue::new(config.video.queue_capacity, policy),
    }
}

/// Wait for one client on `listener`; failures end the session's setup
fn accept_one(
    control: &SessionControl,
    listener: TcpListener,
    stream: StreamKind,
) -> Option<(TcpStream, SocketAddr)> {
    match net::accept_until_stopped(&listener, control) {
        Ok(Some((sock, peer))) => {
            tracing::info!("{} client connected from {}", stream, peer);
            control.report(StatusEvent::Connected { stream, peer });
            Some((sock, peer))
        }
        Ok(None) => None,
        Err(e) => {
            control.fail_setup(format!("{} accept: {}", stream, e));
            None
        }
    }
    // Listener dropped here: one client per port per session
}

fn accept_and_start(
    control: &Arc<SessionControl>,
    video_listener: TcpListener,
    audio_listener: TcpListener,
    pending: Pending,
) {
    let spawn_accept = |name: &str, listener: TcpListener, stream: StreamKind| {
        let control = control.clone();
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || accept_one(&control, listener, stream))
    };

    let video = spawn_accept("accept-video", video_listener, StreamKind::Video);
    let audio = spawn_accept("accept-audio", audio_listener, StreamKind::Audio);
    if let Err(e) = video.as_ref().and(audio.as_ref()) {
        // Unblocks whichever accept did start
        control.fail_setup(format!("spawn accept thread: {}", e));
    }

    let video = video.ok().and_then(|h| h.join().ok().flatten());
    let audio = audio.ok().and_then(|h| h.join().ok().flatten());
    let (Some((video_sock, _)), Some((audio_sock, _))) = (video, audio) else {
        tracing::debug!("Receiver setup ended before both clients connected");
        return;
    };

    if let Err(e) = start_pipelines(control, video_sock, audio_sock, pending) {
        // No-op if a teardown already ran
        control.fail_setup(e.to_string());
    }
}

fn start_pipelines(
    control: &Arc<SessionControl>,
    video_sock: TcpStream,
    audio_sock: TcpStream,
    pending: Pending,
) -> Result<()> {
    let Pending {
        devices,
        queue,
        config,
        threads,
    } = pending;

    register_socket(control, "video-socket", &video_sock)?;
    register_socket(control, "audio-socket", &audio_sock)?;
    net::configure(&video_sock, config.network.nodelay)?;
    net::configure(&audio_sock, config.network.nodelay)?;

    if !control.start_streaming() {
        return Err(StreamError::SetupFailure("Session stopped during setup".into()).into());
    }

    let reader = FramedReader::new(video_sock, config.video.max_frame_size);
    let network = VideoReceivePipeline::new(devices.codec, reader, queue.clone());
    let render = RenderStage::new(devices.surface, queue, config.video.render_poll());
    let audio = AudioReceivePipeline::new(
        audio_sock,
        devices.output,
        config.audio.recv_buffer_bytes,
    );

    let stages: [(&str, StreamKind, Stage); 3] = [
        ("video-recv", StreamKind::Video, Box::new(move |c: &SessionControl| network.run(c))),
        ("video-render", StreamKind::Video, Box::new(move |c: &SessionControl| render.run(c))),
        ("audio-recv", StreamKind::Audio, Box::new(move |c: &SessionControl| audio.run(c))),
    ];
    for (name, stream, body) in stages {
        match spawn_stage(name, control, body) {
            Ok(handle) => threads.lock().push(handle),
            Err(e) => {
                control.teardown(StopReason::PipelineError {
                    stream,
                    message: format!("spawn {}: {}", name, e),
                });
                return Err(Error::Io(e));
            }
        }
    }

    Ok(())
}
