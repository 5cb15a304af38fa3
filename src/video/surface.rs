//! Headless render surfaces

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::device::RenderSurface;
use crate::media::Frame;

/// Counts displayed frames and logs a summary every `log_every` frames
pub struct StatsSurface {
    displayed: Arc<AtomicU64>,
    log_every: u64,
    last_size: Option<(u32, u32)>,
}

impl StatsSurface {
    pub fn new(log_every: u64) -> Self {
        Self {
            displayed: Arc::new(AtomicU64::new(0)),
            log_every: log_every.max(1),
            last_size: None,
        }
    }

    /// Shared counter of frames displayed so far
    pub fn counter(&self) -> Arc<AtomicU64> {
        self.displayed.clone()
    }
}

impl RenderSurface for StatsSurface {
    fn display(&mut self, frame: Frame) {
        let n = self.displayed.fetch_add(1, Ordering::Relaxed) + 1;
        let size = (frame.width(), frame.height());

        if self.last_size != Some(size) {
            tracing::info!("Rendering {}x{} frames", size.0, size.1);
            self.last_size = Some(size);
        }
        if n % self.log_every == 0 {
            tracing::info!(
                "Displayed {} frames (last mean intensity {:.1})",
                n,
                frame.mean_intensity()
            );
        }
    }
}

/// Writes the latest frame to a JPEG file, at most once per interval.
///
/// Frames arriving between writes replace each other; the file always holds
/// the most recent one that was written.
pub struct SnapshotSurface {
    path: PathBuf,
    interval: Duration,
    last_write: Option<Instant>,
    displayed: u64,
    written: u64,
}

impl SnapshotSurface {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
            last_write: None,
            displayed: 0,
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshots_written(&self) -> u64 {
        self.written
    }

    fn write(&self, frame: Frame) -> anyhow::Result<()> {
        let (width, height) = (frame.width(), frame.height());
        let img = RgbImage::from_raw(width, height, frame.into_pixels())
            .ok_or_else(|| anyhow::anyhow!("Invalid frame dimensions {}x{}", width, height))?;

        // Write beside the target then rename so readers never see half a file
        let tmp = self.path.with_extension("tmp");
        {
            let file = File::create(&tmp)?;
            let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), 90);
            img.write_with_encoder(encoder)?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl RenderSurface for SnapshotSurface {
    fn display(&mut self, frame: Frame) {
        self.displayed += 1;

        let due = self
            .last_write
            .map_or(true, |at| at.elapsed() >= self.interval);
        if !due {
            return;
        }

        match self.write(frame) {
            Ok(()) => {
                self.written += 1;
                tracing::debug!(
                    "Snapshot {} written to {} ({} frames displayed)",
                    self.written,
                    self.path.display(),
                    self.displayed
                );
            }
            Err(e) => tracing::warn!("Failed to write snapshot {}: {}", self.path.display(), e),
        }
        self.last_write = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_surface_counts() {
        let mut surface = StatsSurface::new(2);
        let counter = surface.counter();
        for _ in 0..5 {
            surface.display(Frame::solid(4, 4, [1, 2, 3]));
        }
        assert_eq!(counter.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_snapshot_is_rate_limited() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.jpg");
        let mut surface = SnapshotSurface::new(&path, Duration::from_secs(3600));

        surface.display(Frame::solid(16, 16, [255, 0, 0]));
        surface.display(Frame::solid(16, 16, [0, 255, 0]));

        assert_eq!(surface.snapshots_written(), 1);
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (16, 16));
    }
}
