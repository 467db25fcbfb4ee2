//! SSD face detector (ResNet-10 backbone, 300x300 input) via `ort`.
//!
//! Output rows are `[image_id, label, confidence, x1, y1, x2, y2]` with
//! box corners normalized to `[0, 1]`.

use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::inference::execution_provider::load_session;
use crate::inference::preprocess::{blob_from_frame, BlobSpec, ChannelOrder};
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

const INPUT_SIZE: u32 = 300;
const MEAN_RGB: [f32; 3] = [104.0, 117.0, 123.0];
const VALUES_PER_DETECTION: usize = 7;

const INPUT_SPEC: BlobSpec = BlobSpec {
    width: INPUT_SIZE,
    height: INPUT_SIZE,
    mean: MEAN_RGB,
    order: ChannelOrder::Rgb,
};

pub struct OnnxSsdDetector {
    session: ort::session::Session,
    confidence: f64,
}

impl OnnxSsdDetector {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: load_session(model_path)?,
            confidence,
        })
    }
}

impl FaceDetector for OnnxSsdDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        let input = blob_from_frame(frame, &INPUT_SPEC)?;
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("face detector produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape();
        if shape.last() != Some(&VALUES_PER_DETECTION) {
            return Err(format!("Unexpected face detector output shape: {shape:?}").into());
        }
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        Ok(parse_detections(
            data,
            frame.width(),
            frame.height(),
            self.confidence,
        ))
    }
}

/// Keeps rows whose confidence is strictly above `threshold`, in output order.
fn parse_detections(data: &[f32], frame_width: u32, frame_height: u32, threshold: f64) -> Vec<FaceBox> {
    data.chunks_exact(VALUES_PER_DETECTION)
        .filter(|row| row[2] as f64 > threshold)
        .map(|row| FaceBox::from_normalized([row[3], row[4], row[5], row[6]], frame_width, frame_height))
        .collect()
}
