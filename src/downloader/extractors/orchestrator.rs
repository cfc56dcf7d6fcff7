// InfoExtractor Orchestrator - mode selection and fallback
//
// Strategy:
// 1. yt-dlp first: it covers every platform
// 2. Piped API as fallback, YouTube only
// 3. Permanent failures (private, removed, DRM) are not retried elsewhere

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::cli::CliInfoExtractor;
use super::piped::PipedInfoExtractor;
use super::traits::{ExtractorConfig, ExtractorMode, InfoExtractor};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::MediaInfo;

/// Orchestrator that manages the CLI and Piped extractors
#[derive(Clone)]
pub struct InfoExtractorOrchestrator {
    cli: Arc<dyn InfoExtractor>,
    piped: Arc<dyn InfoExtractor>,
}

impl InfoExtractorOrchestrator {
    pub fn new() -> Self {
        Self {
            cli: Arc::new(CliInfoExtractor::new()),
            piped: Arc::new(PipedInfoExtractor::new()),
        }
    }

    /// Swap in other extractors, mainly for tests
    pub fn with_extractors(cli: Arc<dyn InfoExtractor>, piped: Arc<dyn InfoExtractor>) -> Self {
        Self { cli, piped }
    }

    pub fn status(&self, config: &ExtractorConfig) -> OrchestratorStatus {
        OrchestratorStatus {
            cli_available: self.cli.is_available(config),
            piped_available: self.piped.is_available(config),
            mode: config.mode,
        }
    }

    async fn extract_auto(&self, url: &str, config: &ExtractorConfig) -> Result<MediaInfo, DownloadError> {
        let piped_fallback = self.piped.supports(url) && self.piped.is_available(config);

        let primary_err = if self.cli.is_available(config) {
            info!("[Orchestrator] Trying primary extractor: {}", self.cli.name());
            match self.cli.extract(url, config).await {
                Ok(media) => return Ok(media),
                Err(e) => {
                    warn!("[Orchestrator] {} failed: {}", self.cli.name(), e);
                    e
                }
            }
        } else {
            DownloadError::ToolNotFound(config.ytdlp_program.clone())
        };

        if !piped_fallback || is_permanent(&primary_err) {
            return Err(primary_err);
        }

        info!("[Orchestrator] Trying fallback extractor: {}", self.piped.name());
        match self.piped.extract(url, config).await {
            Ok(media) => {
                info!("[Orchestrator] Fallback {} succeeded", self.piped.name());
                Ok(media)
            }
            Err(fallback_err) => {
                warn!("[Orchestrator] {} failed: {}", self.piped.name(), fallback_err);
                // The yt-dlp diagnosis is usually the more useful one
                match primary_err {
                    DownloadError::ToolNotFound(_) => Err(fallback_err),
                    other => Err(other),
                }
            }
        }
    }
}

fn is_permanent(err: &DownloadError) -> bool {
    match err {
        DownloadError::Blocked { reason, .. } => reason.is_permanent(),
        DownloadError::InvalidUrl(_) => true,
        _ => false,
    }
}

impl Default for InfoExtractorOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InfoExtractor for InfoExtractorOrchestrator {
    fn name(&self) -> &'static str {
        "orchestrator"
    }

    fn is_available(&self, config: &ExtractorConfig) -> bool {
        self.cli.is_available(config) || self.piped.is_available(config)
    }

    fn supports(&self, url: &str) -> bool {
        self.cli.supports(url) || self.piped.supports(url)
    }

    async fn extract(&self, url: &str, config: &ExtractorConfig) -> Result<MediaInfo, DownloadError> {
        match config.mode {
            ExtractorMode::Cli => self.cli.extract(url, config).await,
            ExtractorMode::Piped => {
                if !self.piped.supports(url) {
                    return Err(DownloadError::UnsupportedPlatform(format!(
                        "Piped extractor only handles YouTube videos: {url}"
                    )));
                }
                self.piped.extract(url, config).await
            }
            ExtractorMode::Auto => self.extract_auto(url, config).await,
        }
    }
}

/// Availability snapshot of the orchestrator
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub cli_available: bool,
    pub piped_available: bool,
    pub mode: ExtractorMode,
}
