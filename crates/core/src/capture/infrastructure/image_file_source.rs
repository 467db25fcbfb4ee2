use std::path::Path;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;

/// Presents a single still image as a one-frame stream.
pub struct ImageFileSource {
    frame: Option<Frame>,
}

impl ImageFileSource {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let img = image::open(path)?.to_rgb8();
        Ok(Self {
            frame: Some(Frame::from_rgb_image(img, 0)),
        })
    }
}

impl FrameSource for ImageFileSource {
    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        Ok(self.frame.take())
    }

    fn release(&mut self) {
        self.frame = None;
    }
}
