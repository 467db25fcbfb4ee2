//! Age and gender classification with two CaffeNet-style networks via `ort`.
//!
//! Both networks share one input blob: the face crop resized to 227x227,
//! planes in B, G, R order with the training-set mean subtracted.

use std::path::Path;

use crate::classification::domain::age_gender_classifier::AgeGenderClassifier;
use crate::classification::domain::labels::{AgeBucket, DetectionResult, Gender};
use crate::inference::execution_provider::load_session;
use crate::inference::preprocess::{argmax, blob_from_frame, BlobSpec, ChannelOrder};
use crate::shared::frame::Frame;

const INPUT_SIZE: u32 = 227;
const MEAN_BGR: [f32; 3] = [78.426_34, 87.768_91, 114.895_85];

const INPUT_SPEC: BlobSpec = BlobSpec {
    width: INPUT_SIZE,
    height: INPUT_SIZE,
    mean: MEAN_BGR,
    order: ChannelOrder::Bgr,
};

pub struct OnnxAgeGenderClassifier {
    gender_session: ort::session::Session,
    age_session: ort::session::Session,
}

impl OnnxAgeGenderClassifier {
    pub fn new(gender_model: &Path, age_model: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            gender_session: load_session(gender_model)?,
            age_session: load_session(age_model)?,
        })
    }
}

impl AgeGenderClassifier for OnnxAgeGenderClassifier {
    fn classify(&mut self, crop: &Frame) -> Result<DetectionResult, Box<dyn std::error::Error>> {
        let blob = blob_from_frame(crop, &INPUT_SPEC)?;

        let gender_scores = run_scores(&mut self.gender_session, blob.clone())?;
        let age_scores = run_scores(&mut self.age_session, blob)?;

        Ok(DetectionResult {
            gender: gender_from_scores(&gender_scores)?,
            age: age_from_scores(&age_scores)?,
        })
    }
}

fn run_scores(
    session: &mut ort::session::Session,
    blob: ndarray::Array4<f32>,
) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let input_value = ort::value::Tensor::from_array(blob)?;
    let outputs = session.run(ort::inputs![input_value])?;
    if outputs.len() == 0 {
        return Err("classifier produced no outputs".into());
    }
    let scores = outputs[0].try_extract_array::<f32>()?;
    Ok(scores.iter().copied().collect())
}

fn gender_from_scores(scores: &[f32]) -> Result<Gender, Box<dyn std::error::Error>> {
    if scores.len() != Gender::ALL.len() {
        return Err(format!(
            "gender model returned {} scores, expected {}",
            scores.len(),
            Gender::ALL.len()
        )
        .into());
    }
    argmax(scores)
        .and_then(Gender::from_index)
        .ok_or_else(|| "gender scores are empty".into())
}

fn age_from_scores(scores: &[f32]) -> Result<AgeBucket, Box<dyn std::error::Error>> {
    if scores.len() != AgeBucket::ALL.len() {
        return Err(format!(
            "age model returned {} scores, expected {}",
            scores.len(),
            AgeBucket::ALL.len()
        )
        .into());
    }
    argmax(scores)
        .and_then(AgeBucket::from_index)
        .ok_or_else(|| "age scores are empty".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_from_scores() {
        assert_eq!(gender_from_scores(&[0.9, 0.1]).unwrap(), Gender::Male);
        assert_eq!(gender_from_scores(&[0.2, 0.8]).unwrap(), Gender::Female);
    }

    #[test]
    fn test_gender_wrong_length_is_error() {
        assert!(gender_from_scores(&[0.2, 0.3, 0.5]).is_err());
    }

    #[test]
    fn test_age_from_scores() {
        let scores = [0.01, 0.02, 0.03, 0.04, 0.6, 0.2, 0.05, 0.05];
        assert_eq!(age_from_scores(&scores).unwrap(), AgeBucket::YoungAdult);
    }

    #[test]
    fn test_age_wrong_length_is_error() {
        assert!(age_from_scores(&[1.0; 7]).is_err());
    }

    #[test]
    fn test_age_label_always_in_bucket_set() {
        for hot in 0..8 {
            let mut scores = [0.0f32; 8];
            scores[hot] = 1.0;
            let age = age_from_scores(&scores).unwrap();
            assert!(AgeBucket::ALL.contains(&age));
            assert_eq!(age, AgeBucket::ALL[hot]);
        }
    }
}
