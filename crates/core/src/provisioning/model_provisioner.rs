use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::provisioning::domain::artifact_fetcher::ArtifactFetcher;
use crate::provisioning::domain::model_artifact::{ModelArtifact, ModelKind};

/// One file that could not be fetched, kept for the aggregate report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadFailure {
    pub file: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("failed to create model directory {path}: {source}")]
    ModelDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "{} model file(s) missing from {} and no download URL is configured; \
         set AGEGENDER_MODEL_URL or --model-url",
        .missing.len(),
        .model_dir.display()
    )]
    NoDownloadUrl {
        model_dir: PathBuf,
        missing: Vec<PathBuf>,
    },
    #[error("model download cancelled")]
    Cancelled,
    #[error("{}", describe_not_ready(.missing, .failures))]
    NotReady {
        missing: Vec<PathBuf>,
        failures: Vec<DownloadFailure>,
    },
}

fn describe_not_ready(missing: &[PathBuf], failures: &[DownloadFailure]) -> String {
    let files: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
    let mut message = format!(
        "{} required model file(s) missing: {}",
        missing.len(),
        files.join(", ")
    );
    for failure in failures {
        message.push_str(&format!("\n  {}: {}", failure.file, failure.message));
    }
    message
}

/// Topology paths of the three models, verified to exist with their weights.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelPaths {
    pub face_detector: PathBuf,
    pub age: PathBuf,
    pub gender: PathBuf,
}

/// Progress callback: `(file_name, bytes_downloaded, total_bytes)`.
pub type ProvisionProgress<'a> = &'a dyn Fn(&str, u64, u64);

/// Makes sure every model file is on disk before inference starts.
///
/// Missing files are fetched once from `<base_url>/<file_name>`. Individual
/// failures don't stop the remaining downloads; the readiness check that
/// follows reports everything still missing in one error. Without a base
/// URL nothing is fetched and any missing file is an error.
pub struct ModelProvisioner {
    model_dir: PathBuf,
    base_url: Option<String>,
    artifacts: Vec<ModelArtifact>,
    fetcher: Box<dyn ArtifactFetcher>,
}

impl ModelProvisioner {
    pub fn new(
        model_dir: &Path,
        base_url: Option<&str>,
        fetcher: Box<dyn ArtifactFetcher>,
    ) -> Self {
        Self {
            model_dir: model_dir.to_path_buf(),
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
            artifacts: ModelArtifact::standard_set(),
            fetcher,
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Fetches whatever is missing, then runs the readiness check.
    ///
    /// `cancelled` is checked before each download; once raised, no further
    /// files are fetched and the call returns [`ProvisionError::Cancelled`].
    pub fn provision(
        &self,
        progress: Option<ProvisionProgress<'_>>,
        cancelled: &AtomicBool,
    ) -> Result<ModelPaths, ProvisionError> {
        fs::create_dir_all(&self.model_dir).map_err(|e| ProvisionError::ModelDir {
            path: self.model_dir.clone(),
            source: e,
        })?;

        let missing = self.missing_files();
        if missing.is_empty() {
            return self.check_ready(Vec::new());
        }
        let Some(base_url) = &self.base_url else {
            return Err(ProvisionError::NoDownloadUrl {
                model_dir: self.model_dir.clone(),
                missing,
            });
        };

        let mut failures = Vec::new();
        for artifact in &self.artifacts {
            for file in artifact.file_names() {
                let dest = self.model_dir.join(file);
                if dest.exists() {
                    log::debug!("Found {} model file {}", artifact.kind, dest.display());
                    continue;
                }
                if cancelled.load(Ordering::Relaxed) {
                    log::info!("Model download cancelled");
                    return Err(ProvisionError::Cancelled);
                }

                let url = format!("{base_url}/{file}");
                log::info!("Downloading {} model file {file} from {url}", artifact.kind);
                let on_bytes: &dyn Fn(u64, u64) = &|downloaded, total| {
                    if let Some(cb) = progress {
                        cb(file, downloaded, total);
                    }
                };
                if let Err(e) = self.fetcher.fetch(&url, &dest, Some(on_bytes)) {
                    log::warn!("Error downloading {file}: {e}");
                    failures.push(DownloadFailure {
                        file: file.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        self.check_ready(failures)
    }

    fn missing_files(&self) -> Vec<PathBuf> {
        self.artifacts
            .iter()
            .flat_map(|a| a.file_names())
            .map(|f| self.model_dir.join(f))
            .filter(|p| !p.exists())
            .collect()
    }

    fn check_ready(&self, failures: Vec<DownloadFailure>) -> Result<ModelPaths, ProvisionError> {
        let missing = self.missing_files();
        if !missing.is_empty() {
            return Err(ProvisionError::NotReady { missing, failures });
        }

        let topology = |kind| self.model_dir.join(ModelArtifact::for_kind(kind).topology);
        Ok(ModelPaths {
            face_detector: topology(ModelKind::FaceDetector),
            age: topology(ModelKind::Age),
            gender: topology(ModelKind::Gender),
        })
    }
}
