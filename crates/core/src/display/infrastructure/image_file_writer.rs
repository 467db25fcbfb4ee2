use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;

/// Writes frames to an image file using the `image` crate.
///
/// The format follows the path's extension. Each write replaces the
/// previous file, so a live loop leaves its latest frame behind.
pub struct ImageFileWriter {
    path: PathBuf,
}

impl ImageFileWriter {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn write(&self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let img = frame
            .to_rgb_image()
            .ok_or("Failed to create image from frame data")?;
        img.save(&self.path)?;
        Ok(())
    }
}
