use std::fmt;

use crate::shared::constants::{
    AGE_MODEL_NAME, FACE_MODEL_NAME, GENDER_MODEL_NAME, TOPOLOGY_EXTENSION, WEIGHTS_EXTENSION,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelKind {
    FaceDetector,
    Age,
    Gender,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::FaceDetector, ModelKind::Age, ModelKind::Gender];

    fn base_name(self) -> &'static str {
        match self {
            ModelKind::FaceDetector => FACE_MODEL_NAME,
            ModelKind::Age => AGE_MODEL_NAME,
            ModelKind::Gender => GENDER_MODEL_NAME,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::FaceDetector => write!(f, "face detector"),
            ModelKind::Age => write!(f, "age"),
            ModelKind::Gender => write!(f, "gender"),
        }
    }
}

/// A model as it sits on disk: an ONNX topology file plus its external weights.
///
/// The runtime loads the topology and resolves the weights file by name
/// from the same directory, so both must live side by side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelArtifact {
    pub kind: ModelKind,
    pub topology: String,
    pub weights: String,
}

impl ModelArtifact {
    pub fn for_kind(kind: ModelKind) -> Self {
        let base = kind.base_name();
        Self {
            kind,
            topology: format!("{base}.{TOPOLOGY_EXTENSION}"),
            weights: format!("{base}.{WEIGHTS_EXTENSION}"),
        }
    }

    /// The three models the frame processor needs.
    pub fn standard_set() -> Vec<ModelArtifact> {
        ModelKind::ALL.iter().map(|&k| Self::for_kind(k)).collect()
    }

    pub fn file_names(&self) -> [&str; 2] {
        [&self.topology, &self.weights]
    }
}
