use crate::annotation::frame_annotator::FrameAnnotator;
use crate::classification::infrastructure::onnx_age_gender_classifier::OnnxAgeGenderClassifier;
use crate::detection::infrastructure::onnx_ssd_detector::OnnxSsdDetector;
use crate::pipeline::frame_processor::FrameProcessor;
use crate::provisioning::model_provisioner::ModelPaths;
use crate::shared::config::AppConfig;

/// Loads all three networks and wires them into a [`FrameProcessor`].
///
/// Fails if any model cannot be loaded; a model that fails here is never
/// retried.
pub fn build_frame_processor(
    paths: &ModelPaths,
    config: &AppConfig,
) -> Result<FrameProcessor, Box<dyn std::error::Error>> {
    log::info!(
        "Loading face detector from {} (confidence > {})",
        paths.face_detector.display(),
        config.confidence
    );
    let detector = OnnxSsdDetector::new(&paths.face_detector, config.confidence)
        .map_err(|e| format!("failed to load face detector: {e}"))?;

    log::info!(
        "Loading age and gender networks from {} and {}",
        paths.age.display(),
        paths.gender.display()
    );
    let classifier = OnnxAgeGenderClassifier::new(&paths.gender, &paths.age)
        .map_err(|e| format!("failed to load age/gender networks: {e}"))?;

    let annotator = FrameAnnotator::with_font_search(config.font_path.as_deref());

    Ok(FrameProcessor::new(
        Box::new(detector),
        Box::new(classifier),
        annotator,
    ))
}
