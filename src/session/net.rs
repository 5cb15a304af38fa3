//! Socket setup for both ends of a session

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use super::control::SessionControl;
use crate::error::StreamError;

/// How often a pending accept rechecks whether the session was stopped
pub const ACCEPT_POLL: Duration = Duration::from_millis(5);

/// Bind a listener that accepts one client at a time.
///
/// The listener is non-blocking so [`accept_until_stopped`] can give up when
/// the session is torn down before a peer shows up.
pub fn bind_listener(addr: SocketAddr) -> Result<TcpListener, StreamError> {
    let setup = |e: io::Error| StreamError::SetupFailure(format!("bind {}: {}", addr, e));

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(setup)?;
    socket.set_reuse_address(true).map_err(setup)?;
    socket.bind(&SockAddr::from(addr)).map_err(setup)?;
    socket.listen(1).map_err(setup)?;
    socket.set_nonblocking(true).map_err(setup)?;

    let listener: TcpListener = socket.into();
    tracing::debug!("Listening on {}", listener.local_addr().map_err(setup)?);
    Ok(listener)
}

/// Wait for one client, or `None` once the session starts closing
pub fn accept_until_stopped(
    listener: &TcpListener,
    control: &SessionControl,
) -> Result<Option<(TcpStream, SocketAddr)>, StreamError> {
    loop {
        if control.is_closing() {
            return Ok(None);
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                // Accepted sockets can inherit non-blocking mode on some platforms
                stream
                    .set_nonblocking(false)
                    .map_err(|e| StreamError::SetupFailure(format!("accept: {}", e)))?;
                return Ok(Some((stream, peer)));
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(StreamError::SetupFailure(format!("accept: {}", e))),
        }
    }
}

/// Connect with a timeout
pub fn connect(addr: SocketAddr, timeout: Duration) -> Result<TcpStream, StreamError> {
    tracing::debug!("Connecting to {}", addr);
    TcpStream::connect_timeout(&addr, timeout)
        .map_err(|e| StreamError::SetupFailure(format!("connect {}: {}", addr, e)))
}

/// Apply per-stream socket options
pub fn configure(stream: &TcpStream, nodelay: bool) -> Result<(), StreamError> {
    stream
        .set_nodelay(nodelay)
        .map_err(|e| StreamError::SetupFailure(format!("set_nodelay: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{status_channel, StopReason};
    use std::io::{Read, Write};

    #[test]
    fn test_accept_and_connect() {
        let (tx, _rx) = status_channel();
        let control = SessionControl::new(tx);
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = connect(addr, Duration::from_secs(2)).unwrap();
            stream.write_all(b"ping").unwrap();
        });

        let (mut stream, _peer) = accept_until_stopped(&listener, &control).unwrap().unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
        client.join().unwrap();
    }

    #[test]
    fn test_accept_gives_up_on_stop() {
        let (tx, _rx) = status_channel();
        let control = SessionControl::new(tx);
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();

        let stopper = {
            let control = control.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                control.teardown(StopReason::UserRequest);
            })
        };

        assert!(accept_until_stopped(&listener, &control).unwrap().is_none());
        stopper.join().unwrap();
    }

    #[test]
    fn test_connect_refused_is_setup_failure() {
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = connect(addr, Duration::from_millis(500)).unwrap_err();
        assert!(matches!(err, StreamError::SetupFailure(_)));
    }
}
