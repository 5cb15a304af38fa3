//! Uncompressed codec: `width u32 BE | height u32 BE | RGB pixels`

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::FrameCodec;
use crate::error::CodecError;
use crate::media::Frame;

const RAW_HEADER_LEN: usize = 8;

/// Identity codec, mainly for tests and debugging the transport
#[derive(Debug, Default, Clone, Copy)]
pub struct RawCodec;

impl FrameCodec for RawCodec {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn encode(&mut self, frame: Frame) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(RAW_HEADER_LEN + frame.pixels().len());
        buf.put_u32(frame.width());
        buf.put_u32(frame.height());
        buf.put_slice(frame.pixels());
        Ok(buf.freeze())
    }

    fn decode(&mut self, payload: &[u8]) -> Result<Frame, CodecError> {
        if payload.len() < RAW_HEADER_LEN {
            return Err(CodecError::Decode(format!(
                "Raw payload too short: {} bytes",
                payload.len()
            )));
        }

        let mut header = &payload[..RAW_HEADER_LEN];
        let width = header.get_u32();
        let height = header.get_u32();

        Frame::from_rgb(width, height, payload[RAW_HEADER_LEN..].to_vec())
            .map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lossless() {
        let pixels: Vec<u8> = (0..4 * 2 * 3).map(|i| i as u8).collect();
        let frame = Frame::from_rgb(4, 2, pixels).unwrap();

        let mut codec = RawCodec;
        let payload = codec.encode(frame.clone()).unwrap();
        assert_eq!(payload.len(), 8 + 24);
        assert_eq!(codec.decode(&payload).unwrap(), frame);
    }

    #[test]
    fn test_rejects_inconsistent_payload() {
        let mut codec = RawCodec;
        assert!(codec.decode(&[0, 0, 0]).is_err());

        let mut payload = codec.encode(Frame::solid(2, 2, [1, 2, 3])).unwrap().to_vec();
        payload.pop();
        assert!(matches!(codec.decode(&payload), Err(CodecError::Decode(_))));
    }
}
