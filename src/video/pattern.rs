//! Animated test pattern standing in for a camera

use std::time::Instant;

use crate::device::{ReleaseHandle, VideoSource};
use crate::error::DeviceError;
use crate::media::Frame;

/// Colour bars that scroll one step per captured frame
pub struct TestPatternSource {
    width: u32,
    height: u32,
    frame_index: u64,
    handle: ReleaseHandle,
    opened_at: Instant,
}

const BARS: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

impl TestPatternSource {
    /// "Open" the pattern generator at the given resolution
    pub fn open(width: u32, height: u32) -> Result<Self, DeviceError> {
        if width == 0 || height == 0 {
            return Err(DeviceError::Unavailable(format!(
                "Test pattern cannot be {}x{}",
                width, height
            )));
        }

        tracing::info!("Opened test pattern source {}x{}", width, height);
        Ok(Self {
            width,
            height,
            frame_index: 0,
            handle: ReleaseHandle::new("test-pattern"),
            opened_at: Instant::now(),
        })
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_index
    }

    fn render(&self) -> Frame {
        let bar_width = (self.width as usize / BARS.len()).max(1);
        let shift = (self.frame_index as usize * 4) % self.width as usize;
        let mut pixels = Vec::with_capacity(Frame::expected_len(self.width, self.height));

        for y in 0..self.height as usize {
            // Bottom eighth is a moving luma ramp so motion is visible in stills
            let ramp = y >= self.height as usize * 7 / 8;
            for x in 0..self.width as usize {
                let xs = (x + shift) % self.width as usize;
                if ramp {
                    let v = (xs * 255 / self.width as usize) as u8;
                    pixels.extend_from_slice(&[v, v, v]);
                } else {
                    let bar = (xs / bar_width).min(BARS.len() - 1);
                    pixels.extend_from_slice(&BARS[bar]);
                }
            }
        }

        match Frame::from_rgb(self.width, self.height, pixels) {
            Ok(frame) => frame,
            Err(_) => Frame::solid(self.width, self.height, [0, 0, 0]),
        }
    }
}

impl VideoSource for TestPatternSource {
    fn capture(&mut self) -> Result<Frame, DeviceError> {
        self.handle.check()?;
        let frame = self.render();
        self.frame_index += 1;
        tracing::trace!(
            "Test pattern frame {} at {:?}",
            self.frame_index,
            self.opened_at.elapsed()
        );
        Ok(frame)
    }

    fn release_handle(&self) -> ReleaseHandle {
        self.handle.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_have_requested_size_and_move() {
        let mut source = TestPatternSource::open(64, 32).unwrap();
        let first = source.capture().unwrap();
        let second = source.capture().unwrap();

        assert_eq!((first.width(), first.height()), (64, 32));
        assert_ne!(first, second);
        assert_eq!(source.frames_captured(), 2);
    }

    #[test]
    fn test_capture_fails_after_release() {
        let mut source = TestPatternSource::open(8, 8).unwrap();
        source.release_handle().release();
        assert!(matches!(source.capture(), Err(DeviceError::Released)));
    }

    #[test]
    fn test_zero_size_is_unavailable() {
        assert!(matches!(
            TestPatternSource::open(0, 480),
            Err(DeviceError::Unavailable(_))
        ));
    }
}
