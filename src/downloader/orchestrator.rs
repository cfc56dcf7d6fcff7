// Downloader service - ties extraction, quality selection and download together

use std::sync::Arc;
use tracing::{info, warn};

use super::errors::DownloadError;
use super::extractors::{ExtractorConfig, InfoExtractor, InfoExtractorOrchestrator};
use super::format_selector::{format_spec_for, select_best_qualities, standard_qualities, FormatFilter};
use super::models::{
    BatchSummary, Container, DetectReport, DownloadOutcome, DownloadRequest, DownloadTarget,
    MediaInfo, MediaKind, Platform, QualityReport,
};
use super::traits::{DownloaderBackend, ProgressSink};
use super::utils::{is_direct_stream_url, validate_url};
use crate::config::DownloaderConfig;
use crate::ytdlp::YtDlpBackend;

/// Immutable downloader; clone freely, share through `Arc`
#[derive(Clone)]
pub struct Downloader {
    config: Arc<DownloaderConfig>,
    extractor: Arc<dyn InfoExtractor>,
    backend: Arc<dyn DownloaderBackend>,
}

impl Downloader {
    /// yt-dlp/Piped extraction and the yt-dlp backend
    pub fn new(config: DownloaderConfig) -> Self {
        Self::with_components(
            config,
            Arc::new(InfoExtractorOrchestrator::new()),
            Arc::new(YtDlpBackend::new()),
        )
    }

    pub fn with_components(
        config: DownloaderConfig,
        extractor: Arc<dyn InfoExtractor>,
        backend: Arc<dyn DownloaderBackend>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            extractor,
            backend,
        }
    }

    /// Same components, different settings
    pub fn reconfigured(&self, config: DownloaderConfig) -> Self {
        Self {
            config: Arc::new(config),
            extractor: Arc::clone(&self.extractor),
            backend: Arc::clone(&self.backend),
        }
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    fn supported_url<'a>(&self, url: &'a str) -> Result<(&'a str, Platform), DownloadError> {
        let url = validate_url(url)?;
        match Platform::detect(url) {
            Platform::Unknown => Err(DownloadError::UnsupportedPlatform(url.to_string())),
            platform => Ok((url, platform)),
        }
    }

    /// Raw metadata and format list
    pub async fn extract(&self, url: &str) -> Result<MediaInfo, DownloadError> {
        let (url, _) = self.supported_url(url)?;
        let config = ExtractorConfig::from(self.config.as_ref());
        self.extractor.extract(url, &config).await
    }

    /// One option per resolution, best first
    pub async fn fetch_qualities(
        &self,
        url: &str,
        filter: FormatFilter,
    ) -> Result<QualityReport, DownloadError> {
        let media = self.extract(url).await?;

        let qualities = select_best_qualities(&media.formats, |d| filter.matches(d));
        if qualities.is_empty() {
            warn!("No {:?} formats among {} streams for {}", filter, media.formats.len(), url);
            return Err(DownloadError::NoFormats);
        }

        info!("Found {} qualities for '{}'", qualities.len(), media.title);
        Ok(QualityReport {
            qualities,
            video_info: media.summary(),
        })
    }

    /// Platform, metadata and standard qualities for a URL
    pub async fn detect(&self, url: &str) -> Result<DetectReport, DownloadError> {
        let (url, platform) = self.supported_url(url)?;
        let media = self.extract(url).await?;

        let media_type = match platform {
            Platform::Facebook => MediaKind::from_extracted(&media),
            Platform::YouTube if media.is_playlist => MediaKind::Playlist,
            _ => MediaKind::from_url(platform, url),
        };

        Ok(DetectReport {
            platform,
            title: media.title.clone(),
            uploader: media.uploader.clone(),
            duration: media.duration_seconds,
            thumbnail: media.thumbnail.clone(),
            media_type,
            formats: standard_qualities(&media.formats),
            has_subtitles: media.has_subtitles,
            options: platform.options().iter().map(|o| o.to_string()).collect(),
            entry_count: media.entry_count,
        })
    }

    /// Run one download job
    pub async fn download(
        &self,
        request: &DownloadRequest,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadOutcome, DownloadError> {
        let (url, _) = self.supported_url(&request.url)?;

        // Piped format ids are stream URLs; hand them back instead of fetching
        if let DownloadTarget::Format(spec) = &request.target {
            if is_direct_stream_url(spec) {
                info!("Format id is a direct stream URL, returning it");
                return Ok(DownloadOutcome::DirectUrl { url: spec.clone() });
            }
        }

        let request = DownloadRequest {
            url: url.to_string(),
            ..request.clone()
        };
        info!("[Downloader] {} via {}", request.url, self.backend.name());
        self.backend.download(&request, &self.config, sink).await
    }

    /// Follow-up to `fetch_qualities`: download the option the user picked
    pub async fn download_format(
        &self,
        url: &str,
        format_id: &str,
        filter: FormatFilter,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadOutcome, DownloadError> {
        let target = Self::format_target(format_id, filter)?;
        self.download(&DownloadRequest::new(url, target), sink).await
    }

    /// Target for a format id picked from a quality report under `filter`.
    /// Stream URLs pass through untouched.
    pub fn format_target(format_id: &str, filter: FormatFilter) -> Result<DownloadTarget, DownloadError> {
        let format_id = format_id.trim();
        if format_id.is_empty() {
            return Err(DownloadError::MissingFormatId);
        }

        let spec = if is_direct_stream_url(format_id) {
            format_id.to_string()
        } else {
            format_spec_for(format_id, filter)
        };
        Ok(DownloadTarget::Format(spec))
    }

    /// Download several URLs one after another; failures do not stop the run
    pub async fn batch(
        &self,
        urls: &[String],
        target: DownloadTarget,
        container: Container,
        sink: &dyn ProgressSink,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let urls: Vec<&str> = urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()).collect();

        for (idx, url) in urls.iter().enumerate() {
            info!("[Batch] {}/{}: {}", idx + 1, urls.len(), url);
            let request = DownloadRequest::new(*url, target.clone()).with_container(container);

            match self.download(&request, sink).await {
                Ok(_) => summary.succeeded.push(url.to_string()),
                Err(e) => {
                    warn!("[Batch] {} failed: {}", url, e);
                    summary.failed.push((url.to_string(), e.to_string()));
                }
            }
        }

        summary
    }
}
