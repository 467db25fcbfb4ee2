use std::path::Path;

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn<'a> = &'a dyn Fn(u64, u64);

/// Fetches one remote file to a local path.
///
/// Implementations must not leave a partial file at `dest` on failure.
pub trait ArtifactFetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
