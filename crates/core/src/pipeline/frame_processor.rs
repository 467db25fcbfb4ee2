use std::time::Instant;

use crate::annotation::frame_annotator::FrameAnnotator;
use crate::classification::domain::age_gender_classifier::AgeGenderClassifier;
use crate::classification::domain::labels::DetectionResult;
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::constants::{CROP_MARGIN, NO_FACE_TEXT};
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceResult {
    pub face_box: FaceBox,
    pub result: DetectionResult,
}

/// What one frame produced. `NoFace` is the sentinel for an empty detection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    NoFace,
    Faces(Vec<FaceResult>),
}

impl FrameOutcome {
    pub fn results(&self) -> &[FaceResult] {
        match self {
            FrameOutcome::NoFace => &[],
            FrameOutcome::Faces(results) => results,
        }
    }

    /// The line shown next to the video: the first face's result, if any.
    pub fn summary_text(&self) -> String {
        match self.results().first() {
            Some(first) => format!("Detected: {}", first.result),
            None => NO_FACE_TEXT.to_string(),
        }
    }
}

pub struct ProcessedFrame {
    pub annotated: Frame,
    pub outcome: FrameOutcome,
}

/// Everything needed to turn a raw frame into an annotated one.
///
/// Built once at startup from loaded models and handed to whichever loop
/// drives it; holds no state between frames.
pub struct FrameProcessor {
    detector: Box<dyn FaceDetector>,
    classifier: Box<dyn AgeGenderClassifier>,
    annotator: FrameAnnotator,
    crop_margin: i32,
}

impl FrameProcessor {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        classifier: Box<dyn AgeGenderClassifier>,
        annotator: FrameAnnotator,
    ) -> Self {
        Self {
            detector,
            classifier,
            annotator,
            crop_margin: CROP_MARGIN,
        }
    }

    /// False when no font could be loaded and frames carry boxes only.
    pub fn labels_enabled(&self) -> bool {
        self.annotator.has_font()
    }

    /// Detect, classify each face in order, then draw boxes and labels on a copy.
    ///
    /// A classifier error aborts the whole frame. Faces whose crop falls
    /// entirely outside the frame keep their box but get no label.
    pub fn process(
        &mut self,
        frame: &Frame,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ProcessedFrame, Box<dyn std::error::Error>> {
        let t0 = Instant::now();
        let boxes = self.detector.detect(frame)?;
        logger.timing("detect", elapsed_ms(t0));
        logger.metric("faces", boxes.len() as f64);

        if boxes.is_empty() {
            return Ok(ProcessedFrame {
                annotated: frame.clone(),
                outcome: FrameOutcome::NoFace,
            });
        }

        let t0 = Instant::now();
        let mut results = Vec::with_capacity(boxes.len());
        for face in &boxes {
            match self
                .classifier
                .classify_face(frame, face, self.crop_margin)?
            {
                Some(result) => results.push(FaceResult {
                    face_box: *face,
                    result,
                }),
                None => log::warn!("Skipping face {face:?}: crop lies outside the frame"),
            }
        }
        logger.timing("classify", elapsed_ms(t0));

        let t0 = Instant::now();
        let labels: Vec<(FaceBox, String)> = results
            .iter()
            .map(|r| (r.face_box, r.result.to_string()))
            .collect();
        let annotated = self.annotator.annotate(frame, &boxes, &labels)?;
        logger.timing("annotate", elapsed_ms(t0));

        Ok(ProcessedFrame {
            annotated,
            outcome: FrameOutcome::Faces(results),
        })
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
