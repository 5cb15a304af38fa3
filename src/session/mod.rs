//! Connection lifecycle
//!
//! A session owns the running flag, every socket and device handle, and the
//! single teardown routine that releases them. Per peer it moves through
//!
//! ```text
//! Idle → Connecting → Streaming → Stopping → Stopped
//!            │
//!            └──(setup error)──▶ Idle
//! ```
//!
//! and a stopped session is never restarted; a new one needs fresh sockets.

pub mod control;
pub mod handle;
pub mod net;
pub mod receiver;
pub mod resource;
pub mod sender;
pub mod status;

pub use control::{SessionControl, SessionState};
pub use handle::SessionHandle;
pub use receiver::{start_receiver, ReceiverDevices};
pub use resource::{Resource, SocketResource};
pub use sender::{start_sender, SenderDevices};
pub use status::{status_channel, StatusEvent, StatusReceiver, StatusSender, StopReason, StreamKind};

/// Deferred device open, run while the session is connecting
pub(crate) type Opener<T> =
    Box<dyn FnOnce() -> std::result::Result<T, crate::error::DeviceError> + Send>;
