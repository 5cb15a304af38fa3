//! Length-prefixed framing for variable-size video payloads

use bytes::{BufMut, Bytes, BytesMut};
use std::io::{ErrorKind, Read, Write};

use crate::constants::FRAME_HEADER_LEN;
use crate::error::StreamError;

/// Write one frame: 4-byte big-endian length followed by the payload.
///
/// Header and payload go out in a single `write_all`, which retries short
/// writes until every byte is sent or the connection fails.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<usize, StreamError> {
    let len = u32::try_from(payload.len()).map_err(|_| StreamError::FrameTooLarge {
        len: payload.len(),
        max: u32::MAX as usize,
    })?;

    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.put_u32(len);
    buf.put_slice(payload);

    writer.write_all(&buf)?;
    Ok(buf.len())
}

/// Read one frame, blocking until exactly the promised payload has arrived.
///
/// Fails with [`StreamError::ConnectionClosed`] if the stream ends before a
/// full header, [`StreamError::TruncatedFrame`] if it ends inside the
/// payload, and [`StreamError::FrameTooLarge`] (before allocating) if the
/// header announces more than `max_len` bytes.
pub fn read_frame<R: Read>(reader: &mut R, max_len: usize) -> Result<Bytes, StreamError> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    let got = read_full(reader, &mut header)?;
    if got < FRAME_HEADER_LEN {
        tracing::trace!("Stream ended after {} header bytes", got);
        return Err(StreamError::ConnectionClosed);
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > max_len {
        return Err(StreamError::FrameTooLarge { len, max: max_len });
    }
    if len == 0 {
        return Ok(Bytes::new());
    }

    let mut payload = BytesMut::zeroed(len);
    let got = read_full(reader, &mut payload)?;
    if got < len {
        return Err(StreamError::TruncatedFrame {
            expected: len,
            received: got,
        });
    }

    Ok(payload.freeze())
}

/// Fill `buf` from `reader`, returning fewer bytes only on end of stream
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, StreamError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(StreamError::Io(e)),
        }
    }
    Ok(filled)
}

/// Frame writer bound to one connection
pub struct FramedWriter<W> {
    inner: W,
    max_len: usize,
    frames_written: u64,
    bytes_written: u64,
}

impl<W: Write> FramedWriter<W> {
    pub fn new(inner: W, max_len: usize) -> Self {
        Self {
            inner,
            max_len,
            frames_written: 0,
            bytes_written: 0,
        }
    }

    /// Send one payload; payloads over the configured cap are refused
    pub fn send(&mut self, payload: &[u8]) -> Result<usize, StreamError> {
        if payload.len() > self.max_len {
            return Err(StreamError::FrameTooLarge {
                len: payload.len(),
                max: self.max_len,
            });
        }

        let written = write_frame(&mut self.inner, payload)?;
        self.frames_written += 1;
        self.bytes_written += written as u64;
        Ok(written)
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Frame reader bound to one connection
pub struct FramedReader<R> {
    inner: R,
    max_len: usize,
    frames_read: u64,
    bytes_read: u64,
}

impl<R: Read> FramedReader<R> {
    pub fn new(inner: R, max_len: usize) -> Self {
        Self {
            inner,
            max_len,
            frames_read: 0,
            bytes_read: 0,
        }
    }

    /// Receive the next payload
    pub fn recv(&mut self) -> Result<Bytes, StreamError> {
        let payload = read_frame(&mut self.inner, self.max_len)?;
        self.frames_read += 1;
        self.bytes_read += (FRAME_HEADER_LEN + payload.len()) as u64;
        Ok(payload)
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }
}
