// Downloader backend trait definition

use async_trait::async_trait;
use tracing::info;

use super::errors::DownloadError;
use super::models::{DownloadOutcome, DownloadProgress, DownloadRequest};
use crate::config::DownloaderConfig;

/// Trait for downloader backend implementations
#[async_trait]
pub trait DownloaderBackend: Send + Sync {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// Download with progress updates
    async fn download(
        &self,
        request: &DownloadRequest,
        config: &DownloaderConfig,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadOutcome, DownloadError>;
}

/// Receiver for progress updates
pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: DownloadProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(DownloadProgress) + Send + Sync,
{
    fn emit(&self, progress: DownloadProgress) {
        self(progress)
    }
}

/// Progress sink that writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn emit(&self, progress: DownloadProgress) {
        info!(percent = progress.percent, "{}", progress.status);
    }
}

/// Progress sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _progress: DownloadProgress) {}
}
