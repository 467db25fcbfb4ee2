use std::path::PathBuf;

use thiserror::Error;

use crate::shared::constants::{DEFAULT_CAMERA_INDEX, DEFAULT_CONFIDENCE};

pub const ENV_MODEL_DIR: &str = "AGEGENDER_MODEL_DIR";
pub const ENV_MODEL_URL: &str = "AGEGENDER_MODEL_URL";
pub const ENV_CAMERA: &str = "AGEGENDER_CAMERA";
pub const ENV_CONFIDENCE: &str = "AGEGENDER_CONFIDENCE";
pub const ENV_FONT: &str = "AGEGENDER_FONT";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    InvalidValue {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("confidence must be between 0.0 and 1.0, got {0}")]
    ConfidenceOutOfRange(f64),
}

/// Runtime settings shared by the CLI and the desktop app.
///
/// Layering: built-in defaults, then environment variables, then whatever
/// the front end applies on top (CLI flags, settings file).
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub model_dir: PathBuf,
    /// Where missing model files are fetched from. There is no default
    /// host; without one, every model file must already be on disk.
    pub model_base_url: Option<String>,
    pub camera_index: u32,
    /// Explicit capture device string; overrides the index-derived one.
    pub camera_device: Option<String>,
    pub confidence: f64,
    pub font_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("."),
            model_base_url: None,
            camera_index: DEFAULT_CAMERA_INDEX,
            camera_device: None,
            confidence: DEFAULT_CONFIDENCE,
            font_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from defaults overridden by `lookup(var)` values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_MODEL_DIR) {
            config.model_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup(ENV_MODEL_URL) {
            config.model_base_url = normalize_base_url(&url);
        }
        if let Some(camera) = lookup(ENV_CAMERA) {
            config.camera_index = camera.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: ENV_CAMERA,
                expected: "a camera index",
                value: camera.clone(),
            })?;
        }
        if let Some(conf) = lookup(ENV_CONFIDENCE) {
            config.confidence = conf.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: ENV_CONFIDENCE,
                expected: "a number",
                value: conf.clone(),
            })?;
        }
        if let Some(font) = lookup(ENV_FONT) {
            config.font_path = Some(PathBuf::from(font));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ConfigError::ConfidenceOutOfRange(self.confidence));
        }
        Ok(())
    }
}

/// Trims whitespace and trailing slashes; blank means "not configured".
pub fn normalize_base_url(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    (!url.is_empty()).then(|| url.to_string())
}
