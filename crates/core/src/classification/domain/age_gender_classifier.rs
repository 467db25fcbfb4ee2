use crate::classification::domain::labels::DetectionResult;
use crate::shared::face_box::{CropRegion, FaceBox};
use crate::shared::frame::Frame;

/// Domain interface for per-face gender and age classification.
pub trait AgeGenderClassifier: Send {
    /// Classify an already-cropped face image.
    fn classify(&mut self, crop: &Frame) -> Result<DetectionResult, Box<dyn std::error::Error>>;

    /// Crop `face` from `frame` with `margin` pixels on every side and classify it.
    ///
    /// Returns `Ok(None)` when the clamped crop is empty (box entirely
    /// outside the frame).
    fn classify_face(
        &mut self,
        frame: &Frame,
        face: &FaceBox,
        margin: i32,
    ) -> Result<Option<DetectionResult>, Box<dyn std::error::Error>> {
        let Some(region) = CropRegion::around(face, margin, frame.width(), frame.height()) else {
            return Ok(None);
        };
        let crop = frame.crop(&region);
        self.classify(&crop).map(Some)
    }
}
