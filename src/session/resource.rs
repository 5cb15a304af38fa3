//! Closeable session resources

use std::io;
use std::net::{Shutdown, TcpStream};

/// Something teardown must release exactly once
pub trait Resource: Send + Sync {
    fn name(&self) -> &str;

    /// Release the resource. Errors are reported but never stop teardown.
    fn close(&self) -> io::Result<()>;
}

/// A connected socket; closing shuts down both directions, which also
/// unblocks any thread sitting in a read or write on a clone of it
pub struct SocketResource {
    name: String,
    stream: TcpStream,
}

impl SocketResource {
    pub fn new(name: impl Into<String>, stream: &TcpStream) -> io::Result<Self> {
        Ok(Self {
            name: name.into(),
            stream: stream.try_clone()?,
        })
    }
}

impl Resource for SocketResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn close(&self) -> io::Result<()> {
        self.stream.shutdown(Shutdown::Both)
    }
}
