//! Raw PCM audio chunks

use bytes::Bytes;

/// A block of little-endian signed 16-bit samples.
///
/// On the sender this is exactly one device read; on the wire there are no
/// chunk boundaries, so the receiver's chunks are just whatever one socket
/// read returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    data: Bytes,
}

impl AudioChunk {
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// Encode samples as s16le
    pub fn from_samples(samples: &[i16]) -> Self {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        Self { data: data.into() }
    }

    /// Decode the s16le samples; a trailing odd byte is ignored
    pub fn samples(&self) -> Vec<i16> {
        self.data
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_encoding() {
        let chunk = AudioChunk::from_samples(&[1, -1, i16::MAX]);
        assert_eq!(chunk.as_bytes(), &[1, 0, 0xff, 0xff, 0xff, 0x7f]);
        assert_eq!(chunk.samples(), vec![1, -1, i16::MAX]);
    }

    #[test]
    fn test_odd_byte_ignored() {
        let chunk = AudioChunk::new(Bytes::from_static(&[2, 0, 7]));
        assert_eq!(chunk.samples(), vec![2]);
        assert_eq!(chunk.len(), 3);
    }
}
