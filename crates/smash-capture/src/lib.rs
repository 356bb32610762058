use anyhow::{bail, Context, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(feature = "video")]
pub mod video;

/// Properties of a frame stream, queried once when the stream is opened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Sequential supplier of decoded video frames.
///
/// `next_frame` blocks until the next frame is available and returns `None`
/// once the stream is exhausted. Sources never seek backwards.
pub trait FrameSource {
    fn info(&self) -> VideoInfo;
    fn next_frame(&mut self) -> Option<RgbImage>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn info(&self) -> VideoInfo {
        (**self).info()
    }

    fn next_frame(&mut self) -> Option<RgbImage> {
        (**self).next_frame()
    }
}

/// Frames that are already decoded and held in memory.
pub struct MemorySource {
    info: VideoInfo,
    frames: VecDeque<RgbImage>,
}

impl MemorySource {
    pub fn new(frames: Vec<RgbImage>, fps: f64) -> Self {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        Self {
            info: VideoInfo { width, height, fps },
            frames: frames.into(),
        }
    }

    /// Frames not yet handed out.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Option<RgbImage> {
        self.frames.pop_front()
    }
}

const SEQUENCE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// A directory of still images, read in file-name order.
pub struct ImageSequenceSource {
    info: VideoInfo,
    paths: VecDeque<PathBuf>,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path, fps: f64) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory {}", dir.display()))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| SEQUENCE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let first = match paths.first() {
            Some(p) => p,
            None => bail!("No image frames found in {}", dir.display()),
        };
        let (width, height) = image::image_dimensions(first)
            .with_context(|| format!("Failed to read {}", first.display()))?;

        info!(
            "Image sequence opened: {} frame(s), {}x{}",
            paths.len(),
            width,
            height
        );

        Ok(Self {
            info: VideoInfo { width, height, fps },
            paths: paths.into(),
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Option<RgbImage> {
        let path = self.paths.pop_front()?;
        match image::open(&path) {
            Ok(img) => {
                debug!("Read frame {}", path.display());
                Some(img.to_rgb8())
            }
            Err(e) => {
                warn!("Failed to decode frame {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Wraps a source so that raising `stop` ends the stream early.
pub struct StoppableSource<S> {
    inner: S,
    stop: Arc<AtomicBool>,
    stopped: bool,
}

impl<S: FrameSource> StoppableSource<S> {
    pub fn new(inner: S, stop: Arc<AtomicBool>) -> Self {
        Self {
            inner,
            stop,
            stopped: false,
        }
    }
}

impl<S: FrameSource> FrameSource for StoppableSource<S> {
    fn info(&self) -> VideoInfo {
        self.inner.info()
    }

    fn next_frame(&mut self) -> Option<RgbImage> {
        if self.stop.load(Ordering::Relaxed) {
            if !self.stopped {
                info!("Frame source stopping (stop signal received)");
                self.stopped = true;
            }
            return None;
        }
        self.inner.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(value: u8) -> RgbImage {
        RgbImage::from_pixel(8, 6, image::Rgb([value, value, value]))
    }

    #[test]
    fn test_memory_source_in_order() {
        let mut source = MemorySource::new(vec![solid(1), solid(2), solid(3)], 30.0);
        assert_eq!(
            source.info(),
            VideoInfo {
                width: 8,
                height: 6,
                fps: 30.0
            }
        );
        assert_eq!(source.next_frame().unwrap().get_pixel(0, 0)[0], 1);
        assert_eq!(source.next_frame().unwrap().get_pixel(0, 0)[0], 2);
        assert_eq!(source.remaining(), 1);
        assert_eq!(source.next_frame().unwrap().get_pixel(0, 0)[0], 3);
        assert!(source.next_frame().is_none());
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_stoppable_source() {
        let stop = Arc::new(AtomicBool::new(false));
        let inner = MemorySource::new(vec![solid(1), solid(2)], 60.0);
        let mut source = StoppableSource::new(inner, stop.clone());
        assert!(source.next_frame().is_some());
        stop.store(true, Ordering::Relaxed);
        assert!(source.next_frame().is_none());
        assert_eq!(source.info().height, 6);
    }

    #[test]
    fn test_image_sequence_sorted() {
        let dir = tempfile::tempdir().unwrap();
        solid(20).save(dir.path().join("frame_002.png")).unwrap();
        solid(10).save(dir.path().join("frame_001.png")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = ImageSequenceSource::open(dir.path(), 30.0).unwrap();
        assert_eq!(source.info().width, 8);
        assert_eq!(source.next_frame().unwrap().get_pixel(0, 0)[0], 10);
        assert_eq!(source.next_frame().unwrap().get_pixel(0, 0)[0], 20);
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_image_sequence_empty_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageSequenceSource::open(dir.path(), 30.0).is_err());
    }
}
