use image::{GrayImage, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Optional observer for frames and digit crops as they are analyzed.
///
/// Implementations must not influence analysis; every method defaults to a
/// no-op.
pub trait PreviewSink: Send + Sync {
    fn show_frame(&self, _label: &str, _frame: &RgbImage) {}
    fn show_digit(&self, _label: &str, _digit: &GrayImage) {}
}

/// Preview sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPreview;

impl PreviewSink for NoopPreview {}

/// Writes every previewed image as a numbered PNG into a directory.
#[derive(Debug)]
pub struct DirectoryPreview {
    dir: PathBuf,
    counter: AtomicU64,
}

impl DirectoryPreview {
    pub fn new(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            counter: AtomicU64::new(0),
        })
    }

    fn next_path(&self, label: &str) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!("{:06}_{}.png", n, label))
    }
}

impl PreviewSink for DirectoryPreview {
    fn show_frame(&self, label: &str, frame: &RgbImage) {
        let path = self.next_path(label);
        if let Err(e) = frame.save(&path) {
            warn!("Failed to save preview {}: {}", path.display(), e);
        }
    }

    fn show_digit(&self, label: &str, digit: &GrayImage) {
        if digit.width() == 0 || digit.height() == 0 {
            return;
        }
        let path = self.next_path(label);
        if let Err(e) = digit.save(&path) {
            warn!("Failed to save preview {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_preview_numbers_files() {
        let dir = tempfile::tempdir().unwrap();
        let preview = DirectoryPreview::new(&dir.path().join("debug")).unwrap();
        preview.show_frame("frame", &RgbImage::new(4, 4));
        preview.show_digit("tens", &GrayImage::new(2, 3));
        preview.show_digit("empty", &GrayImage::new(0, 0));

        let mut names: Vec<String> = std::fs::read_dir(dir.path().join("debug"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["000000_frame.png", "000001_tens.png"]);
    }
}
