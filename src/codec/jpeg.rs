//! JPEG codec backed by the `image` crate

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ImageFormat, ImageReader, Limits, RgbImage};
use std::io::Cursor;

use super::FrameCodec;
use crate::constants::{DEFAULT_JPEG_QUALITY, MAX_DECODE_HEIGHT, MAX_DECODE_WIDTH};
use crate::error::CodecError;
use crate::media::Frame;

/// Baseline JPEG at a fixed quality.
///
/// When an output size is set, decoded frames of any other size are scaled
/// to it so the render surface always sees one resolution. Payloads whose
/// header declares more than `max_dimensions` are rejected before any pixel
/// buffer is allocated.
pub struct JpegCodec {
    quality: u8,
    output_size: Option<(u32, u32)>,
    max_dimensions: (u32, u32),
}

impl JpegCodec {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            output_size: None,
            max_dimensions: (MAX_DECODE_WIDTH, MAX_DECODE_HEIGHT),
        }
    }

    /// Scale every decoded frame to `width` x `height`
    pub fn with_output_size(mut self, width: u32, height: u32) -> Self {
        self.output_size = Some((width, height));
        self
    }

    /// Refuse to decode images larger than `width` x `height`
    pub fn with_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_dimensions = (width, height);
        self
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl FrameCodec for JpegCodec {
    fn name(&self) -> &'static str {
        "jpeg"
    }

    fn encode(&mut self, frame: Frame) -> Result<Bytes, CodecError> {
        let (width, height) = (frame.width(), frame.height());
        let img = RgbImage::from_raw(width, height, frame.into_pixels()).ok_or_else(|| {
            CodecError::Encode(format!("Buffer does not match {}x{}", width, height))
        })?;

        let mut buf = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buf, self.quality);
        img.write_with_encoder(encoder)
            .map_err(|e| CodecError::Encode(e.to_string()))?;

        Ok(Bytes::from(buf.into_inner()))
    }

    fn decode(&mut self, payload: &[u8]) -> Result<Frame, CodecError> {
        let (max_width, max_height) = self.max_dimensions;
        let mut limits = Limits::default();
        limits.max_image_width = Some(max_width);
        limits.max_image_height = Some(max_height);

        let mut reader = ImageReader::with_format(Cursor::new(payload), ImageFormat::Jpeg);
        reader.limits(limits);
        let mut img = reader
            .decode()
            .map_err(|e| CodecError::Decode(e.to_string()))?
            .to_rgb8();

        if let Some((width, height)) = self.output_size {
            if img.dimensions() != (width, height) {
                img = image::imageops::resize(&img, width, height, FilterType::Triangle);
            }
        }

        let (width, height) = img.dimensions();
        Frame::from_rgb(width, height, img.into_raw())
    }
}
