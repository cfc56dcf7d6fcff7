// Piped InfoExtractor - YouTube metadata over the Piped HTTP API
//
// Needs no local tools. Stream URLs are handed out as format ids, so a
// download through this path is a redirect to the stream itself.

use async_trait::async_trait;
use reqwest::{Client, Proxy, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::traits::{ExtractorConfig, InfoExtractor};
use crate::downloader::errors::DownloadError;
use crate::downloader::extractors::BlockingReason;
use crate::downloader::format_selector::StreamDescriptor;
use crate::downloader::models::MediaInfo;
use crate::downloader::utils::{extract_video_id, is_youtube_url};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipedStreams {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    duration: Option<i64>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    video_streams: Vec<PipedStream>,
    #[serde(default)]
    audio_streams: Vec<PipedStream>,
    #[serde(default)]
    subtitles: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipedStream {
    url: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    video_only: bool,
    #[serde(default)]
    bitrate: Option<f64>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    content_length: Option<i64>,
}

impl PipedStream {
    /// "mp4", "webm", "m4a" from the mime type, falling back to the format name
    fn container(&self) -> String {
        if let Some(sub) = self.mime_type.as_deref().and_then(|m| m.split('/').nth(1)) {
            let sub = sub.split(';').next().unwrap_or(sub).trim();
            return match sub {
                "mp4" if self.height.is_none() => "m4a".to_string(),
                other => other.to_string(),
            };
        }
        match self.format.as_deref() {
            Some("MPEG_4") => "mp4".to_string(),
            Some("WEBMA_OPUS") | Some("WEBM") => "webm".to_string(),
            Some("M4A") => "m4a".to_string(),
            Some(other) => other.to_lowercase(),
            None => String::new(),
        }
    }

    fn filesize(&self) -> Option<u64> {
        self.content_length
            .and_then(|len| u64::try_from(len).ok())
            .filter(|&len| len > 0)
    }

    fn into_video(self) -> StreamDescriptor {
        let container = self.container();
        let filesize = self.filesize();
        StreamDescriptor {
            format_id: self.url,
            has_video: true,
            has_audio: !self.video_only,
            container,
            height: self.height.filter(|&h| h > 0),
            // Piped reports bits per second
            bitrate: self.bitrate.unwrap_or(0.0) / 1000.0,
            filesize,
        }
    }

    fn into_audio(self) -> StreamDescriptor {
        let container = self.container();
        let filesize = self.filesize();
        StreamDescriptor {
            format_id: self.url,
            has_video: false,
            has_audio: true,
            container,
            height: None,
            bitrate: self.bitrate.unwrap_or(0.0) / 1000.0,
            filesize,
        }
    }
}

/// Piped API extractor (YouTube only)
#[derive(Debug, Default, Clone, Copy)]
pub struct PipedInfoExtractor;

impl PipedInfoExtractor {
    pub fn new() -> Self {
        Self
    }

    fn client(config: &ExtractorConfig) -> Result<Client, DownloadError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("unidownload/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy) = &config.proxy {
            let proxy = Proxy::all(proxy)
                .map_err(|e| DownloadError::Http(format!("invalid proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| DownloadError::Http(format!("failed to build HTTP client: {e}")))
    }

    fn into_media_info(video_id: &str, url: &str, streams: PipedStreams) -> MediaInfo {
        let mut formats: Vec<StreamDescriptor> = streams
            .video_streams
            .into_iter()
            .map(PipedStream::into_video)
            .collect();
        formats.extend(streams.audio_streams.into_iter().map(PipedStream::into_audio));

        MediaInfo {
            id: video_id.to_string(),
            title: streams.title.unwrap_or_else(|| "Unknown".to_string()),
            uploader: streams.uploader.unwrap_or_else(|| "Unknown".to_string()),
            duration_seconds: streams.duration.and_then(|d| u64::try_from(d).ok()).unwrap_or(0),
            thumbnail: streams.thumbnail_url.unwrap_or_default(),
            webpage_url: url.to_string(),
            formats,
            has_subtitles: !streams.subtitles.is_empty(),
            is_playlist: false,
            entry_count: None,
            extension: Some("mp4".to_string()),
        }
    }
}

#[async_trait]
impl InfoExtractor for PipedInfoExtractor {
    fn name(&self) -> &'static str {
        "piped-api"
    }

    fn is_available(&self, config: &ExtractorConfig) -> bool {
        !config.piped_api.is_empty()
    }

    fn supports(&self, url: &str) -> bool {
        is_youtube_url(url) && extract_video_id(url).is_some()
    }

    async fn extract(&self, url: &str, config: &ExtractorConfig) -> Result<MediaInfo, DownloadError> {
        let video_id = extract_video_id(url)
            .ok_or_else(|| DownloadError::InvalidUrl(format!("no YouTube video id in {url}")))?;

        let endpoint = format!("{}/streams/{}", config.piped_api, video_id);
        debug!("[PipedExtractor] GET {}", endpoint);

        let response = Self::client(config)?.get(&endpoint).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND => DownloadError::Blocked {
                    reason: BlockingReason::VideoUnavailable,
                    message: body,
                },
                StatusCode::TOO_MANY_REQUESTS => DownloadError::Blocked {
                    reason: BlockingReason::RateLimited,
                    message: body,
                },
                StatusCode::FORBIDDEN => DownloadError::Blocked {
                    reason: BlockingReason::Http403Forbidden,
                    message: body,
                },
                _ => DownloadError::Http(format!("Piped API error: {status} - {body}")),
            });
        }

        let streams: PipedStreams = response
            .json()
            .await
            .map_err(|e| DownloadError::ParseError(format!("Piped response: {e}")))?;

        let info = Self::into_media_info(video_id, url, streams);
        info!(
            "[PipedExtractor] '{}' with {} streams",
            info.title,
            info.formats.len()
        );
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::format_selector::{select_best_qualities, FormatFilter};

    const SAMPLE: &str = r#"{
        "title": "Piped Sample",
        "uploader": "Channel",
        "duration": 212,
        "thumbnailUrl": "https://pipedproxy/vi/abc/maxres.jpg",
        "subtitles": [],
        "videoStreams": [
            {"url": "https://cdn/1080", "format": "MPEG_4", "mimeType": "video/mp4", "videoOnly": true, "bitrate": 4000000, "height": 1080, "contentLength": 1234},
            {"url": "https://cdn/1080webm", "format": "WEBM", "mimeType": "video/webm", "videoOnly": true, "bitrate": 3000000, "height": 1080},
            {"url": "https://cdn/360", "format": "MPEG_4", "mimeType": "video/mp4", "videoOnly": false, "bitrate": 500000, "height": 360}
        ],
        "audioStreams": [
            {"url": "https://cdn/audio", "format": "M4A", "mimeType": "audio/mp4", "bitrate": 128000}
        ]
    }"#;

    fn sample_info() -> MediaInfo {
        let streams: PipedStreams = serde_json::from_str(SAMPLE).unwrap();
        PipedInfoExtractor::into_media_info("dQw4w9WgXcQ", "https://youtu.be/dQw4w9WgXcQ", streams)
    }

    #[test]
    fn test_stream_url_becomes_format_id() {
        let info = sample_info();

        assert_eq!(info.title, "Piped Sample");
        assert_eq!(info.thumbnail, "https://pipedproxy/vi/abc/maxres.jpg");
        assert_eq!(info.duration_seconds, 212);
        assert_eq!(info.formats.len(), 4);
        assert_eq!(info.formats[0].format_id, "https://cdn/1080");
        assert_eq!(info.formats[0].bitrate, 4000.0);
        assert_eq!(info.formats[0].filesize, Some(1234));
    }

    #[test]
    fn test_containers() {
        let info = sample_info();
        assert_eq!(info.formats[0].container, "mp4");
        assert_eq!(info.formats[1].container, "webm");
        assert_eq!(info.formats[3].container, "m4a");
        assert!(!info.formats[3].has_video);
    }

    #[test]
    fn test_video_only_mp4_selection() {
        let info = sample_info();
        let qualities = select_best_qualities(&info.formats, |d| FormatFilter::VideoOnlyMp4.matches(d));

        assert_eq!(qualities.len(), 1);
        assert_eq!(qualities[0].resolution_label, "1080p");
        assert_eq!(qualities[0].format_id, "https://cdn/1080");
    }

    #[test]
    fn test_supports_only_youtube_with_id() {
        let piped = PipedInfoExtractor::new();
        assert!(piped.supports("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(!piped.supports("https://www.youtube.com/playlist?list=PL1"));
        assert!(!piped.supports("https://instagram.com/p/abc"));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_request() {
        let piped = PipedInfoExtractor::new();
        let err = piped
            .extract("https://vimeo.com/1", &ExtractorConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::InvalidUrl(_)));
    }
}
