use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use agegender_core::shared::config::{
    AppConfig, ConfigError, ENV_CAMERA, ENV_CONFIDENCE, ENV_FONT, ENV_MODEL_DIR, ENV_MODEL_URL,
};

/// Optional per-user overrides, read from `<config dir>/AgeGender/settings.json`.
///
/// Every field may be omitted. Environment variables still win over
/// anything set here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera_index: Option<u32>,
    pub camera_device: Option<String>,
    pub confidence: Option<f64>,
    pub model_dir: Option<PathBuf>,
    pub model_url: Option<String>,
    pub font_path: Option<PathBuf>,
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("AgeGender").join("settings.json"))
    }

    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// A missing file yields defaults; an unreadable one is logged and ignored.
    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring malformed settings file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Layers environment over these settings over built-in defaults.
    pub fn resolve(&self) -> Result<AppConfig, ConfigError> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    fn resolve_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::from_lookup(|key| env(key).or_else(|| self.lookup(key)))?;
        if let Some(device) = &self.camera_device {
            config.camera_device = Some(device.clone());
        }
        Ok(config)
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            ENV_MODEL_DIR => self.model_dir.as_ref().map(|p| p.display().to_string()),
            ENV_MODEL_URL => self.model_url.clone(),
            ENV_CAMERA => self.camera_index.map(|i| i.to_string()),
            ENV_CONFIDENCE => self.confidence.map(|c| c.to_string()),
            ENV_FONT => self.font_path.as_ref().map(|p| p.display().to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agegender_core::shared::constants::DEFAULT_CONFIDENCE;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            Settings::load_from(&dir.path().join("settings.json")),
            Settings::default()
        );
    }

    #[test]
    fn test_partial_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "camera_index": 3 }"#).unwrap();
        let settings = Settings::load_from(&path);
        assert_eq!(settings.camera_index, Some(3));
        assert_eq!(settings.confidence, None);
    }

    #[test]
    fn test_malformed_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_empty_settings_resolve_to_defaults() {
        let config = Settings::default().resolve_with(no_env).unwrap();
        assert_eq!(config.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(config.model_base_url, None);
        assert_eq!(config.camera_index, 0);
    }

    #[test]
    fn test_settings_override_defaults() {
        let settings = Settings {
            camera_index: Some(1),
            camera_device: Some("/dev/video4".into()),
            confidence: Some(0.85),
            model_dir: Some(PathBuf::from("/opt/models")),
            model_url: Some("https://mirror.local/models/".into()),
            ..Default::default()
        };
        let config = settings.resolve_with(no_env).unwrap();
        assert_eq!(
            config.model_base_url.as_deref(),
            Some("https://mirror.local/models")
        );
        assert_eq!(config.camera_index, 1);
        assert_eq!(config.camera_device.as_deref(), Some("/dev/video4"));
        assert_eq!(config.confidence, 0.85);
        assert_eq!(config.model_dir, PathBuf::from("/opt/models"));
    }

    #[test]
    fn test_environment_overrides_settings() {
        let settings = Settings {
            camera_index: Some(1),
            confidence: Some(0.85),
            ..Default::default()
        };
        let env = |key: &str| (key == ENV_CAMERA).then(|| "5".to_string());
        let config = settings.resolve_with(env).unwrap();
        assert_eq!(config.camera_index, 5);
        assert_eq!(config.confidence, 0.85);
    }

    #[test]
    fn test_out_of_range_confidence_is_rejected() {
        let settings = Settings {
            confidence: Some(2.0),
            ..Default::default()
        };
        assert!(settings.resolve_with(no_env).is_err());
    }

    #[test]
    fn test_serialized_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            model_url: Some("http://mirror.local/models".into()),
            ..Default::default()
        };
        fs::write(&path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }
}
