//! Raster video frames

use crate::error::CodecError;

/// One RGB8 raster image.
///
/// Frames move by value from stage to stage (capture → encode, decode →
/// queue → render); no stage keeps a reference after handing one on.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    /// Row-major RGB pixels, `width * height * 3` bytes
    pixels: Vec<u8>,
}

impl Frame {
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Wrap a pixel buffer, checking it matches the dimensions
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, CodecError> {
        if width == 0 || height == 0 || pixels.len() != Self::expected_len(width, height) {
            return Err(CodecError::InvalidDimensions {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Uniform frame filled with one colour
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take(Self::expected_len(width, height))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * Self::BYTES_PER_PIXEL
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// RGB value at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * Self::BYTES_PER_PIXEL;
        Some([
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        ])
    }

    /// Mean of all channel values, handy as a cheap content fingerprint
    pub fn mean_intensity(&self) -> f32 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.pixels.iter().map(|&p| p as u64).sum();
        sum as f32 / self.pixels.len() as f32
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgb_checks_length() {
        assert!(Frame::from_rgb(2, 2, vec![0; 12]).is_ok());
        assert!(matches!(
            Frame::from_rgb(2, 2, vec![0; 11]),
            Err(CodecError::InvalidDimensions { width: 2, height: 2, len: 11 })
        ));
        assert!(Frame::from_rgb(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn test_solid_and_pixel() {
        let frame = Frame::solid(4, 3, [10, 20, 30]);
        assert_eq!(frame.pixels().len(), 36);
        assert_eq!(frame.pixel(3, 2), Some([10, 20, 30]));
        assert_eq!(frame.pixel(4, 0), None);
        assert!((frame.mean_intensity() - 20.0).abs() < f32::EPSILON);
    }
}
