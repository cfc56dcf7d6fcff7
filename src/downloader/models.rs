// Common data models for downloader

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::format_selector::{QualityOption, StandardQuality, StreamDescriptor};
use super::utils::extract_video_id;

/// Supported source platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Instagram,
    Facebook,
    Unknown,
}

impl Platform {
    /// Detect platform from the URL's host; subdomains count, query text does not
    pub fn detect(url: &str) -> Self {
        let Some(host) = Url::parse(url.trim())
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
        else {
            return Self::Unknown;
        };

        let on = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

        if on("youtube.com") || on("youtu.be") {
            Self::YouTube
        } else if on("instagram.com") {
            Self::Instagram
        } else if on("facebook.com") || on("fb.watch") {
            Self::Facebook
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::Unknown => "unknown",
        }
    }

    /// Sub-directory of the download root used for this platform
    pub fn download_subdir(&self) -> Option<&'static str> {
        match self {
            Self::Instagram => Some("instagram"),
            Self::Facebook => Some("facebook"),
            Self::YouTube | Self::Unknown => None,
        }
    }

    /// Options the UI can offer for this platform
    pub fn options(&self) -> &'static [&'static str] {
        match self {
            Self::YouTube => &["video", "audio", "playlist", "subtitles", "thumbnail"],
            Self::Instagram | Self::Facebook => &["post", "audio"],
            Self::Unknown => &[],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check if URL is a playlist
pub fn is_playlist_url(url: &str) -> bool {
    url.contains("list=") || url.contains("/playlist")
}

/// Playlist link that does not point at one video (`/playlist?list=...`).
/// `watch?v=ID&list=...` names a single video inside a list.
pub fn is_playlist_only_url(url: &str) -> bool {
    is_playlist_url(url) && extract_video_id(url).is_none()
}

/// Kind of media behind a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Playlist,
    Reel,
    Story,
    Tv,
    Post,
    Image,
    Album,
    Unknown,
}

impl MediaKind {
    /// Classify from the URL alone
    pub fn from_url(platform: Platform, url: &str) -> Self {
        match platform {
            Platform::YouTube if is_playlist_url(url) => Self::Playlist,
            Platform::YouTube => Self::Video,
            Platform::Instagram => {
                if url.contains("/reel/") || url.contains("/reels/") {
                    Self::Reel
                } else if url.contains("/stories/") {
                    Self::Story
                } else if url.contains("/tv/") || url.to_lowercase().contains("igtv") {
                    Self::Tv
                } else if url.contains("/p/") {
                    Self::Post
                } else {
                    Self::Unknown
                }
            }
            Platform::Facebook | Platform::Unknown => Self::Unknown,
        }
    }

    /// Classify a Facebook item from what the extractor reported
    pub fn from_extracted(info: &MediaInfo) -> Self {
        if info.is_playlist {
            return Self::Album;
        }
        match info.extension.as_deref() {
            Some("jpg" | "jpeg" | "png" | "gif" | "webp") => Self::Image,
            _ => Self::Video,
        }
    }
}

/// Video information reported by an extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub id: String,
    pub title: String,
    pub uploader: String,
    pub duration_seconds: u64,
    pub thumbnail: String,
    pub webpage_url: String,
    pub formats: Vec<StreamDescriptor>,
    pub has_subtitles: bool,
    pub is_playlist: bool,
    pub entry_count: Option<usize>,
    pub extension: Option<String>,
}

impl MediaInfo {
    /// "M:SS" rendering of the duration
    pub fn duration_label(&self) -> String {
        format!("{}:{:02}", self.duration_seconds / 60, self.duration_seconds % 60)
    }

    pub fn summary(&self) -> VideoSummary {
        VideoSummary {
            title: self.title.clone(),
            thumbnail: self.thumbnail.clone(),
        }
    }
}

/// The `video_info` part of a qualities response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub title: String,
    pub thumbnail: String,
}

/// Result of a quality lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub qualities: Vec<QualityOption>,
    pub video_info: VideoSummary,
}

/// Result of platform detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectReport {
    pub platform: Platform,
    pub title: String,
    pub uploader: String,
    pub duration: u64,
    pub thumbnail: String,
    pub media_type: MediaKind,
    pub formats: Vec<StandardQuality>,
    pub has_subtitles: bool,
    pub options: Vec<String>,
    /// Number of entries when the URL is a playlist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_count: Option<usize>,
}

/// Container for merged output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Mp4,
    Webm,
    Mkv,
}

impl Container {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mkv => "mkv",
        }
    }

    /// Menu choice ("1", "2", "3"); anything else is MP4
    pub fn from_menu_choice(choice: &str) -> Self {
        match choice.trim() {
            "2" => Self::Webm,
            "3" => Self::Mkv,
            _ => Self::Mp4,
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Container {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "webm" => Ok(Self::Webm),
            "mkv" => Ok(Self::Mkv),
            other => Err(format!("unknown container '{other}' (mp4, webm, mkv)")),
        }
    }
}

/// What a single yt-dlp invocation should fetch
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadTarget {
    /// Explicit yt-dlp format selector, usually a format id from a quality report
    Format(String),
    /// Best video up to a height, merged with best audio
    MaxHeight(u32),
    /// Best available video and audio
    Best,
    /// Best audio converted to MP3
    AudioMp3,
    ThumbnailOnly,
    SubtitlesOnly,
    /// Whole playlist into a per-playlist folder
    Playlist {
        max_height: Option<u32>,
        audio_only: bool,
    },
}

impl DownloadTarget {
    pub fn is_video(&self) -> bool {
        matches!(
            self,
            Self::Format(_) | Self::MaxHeight(_) | Self::Best | Self::Playlist { audio_only: false, .. }
        )
    }

    /// Quality choice from the fixed playlist/batch menu
    pub fn from_quality_choice(choice: &str) -> Self {
        match choice.trim() {
            "1" => Self::MaxHeight(1080),
            "3" => Self::MaxHeight(480),
            "4" => Self::MaxHeight(360),
            "5" => Self::Best,
            _ => Self::MaxHeight(720),
        }
    }
}

/// One download job
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub target: DownloadTarget,
    pub container: Container,
    /// Overrides the configured download directory
    pub output_dir: Option<PathBuf>,
    pub with_subtitles: bool,
    pub with_thumbnail: bool,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, target: DownloadTarget) -> Self {
        Self {
            url: url.into(),
            target,
            container: Container::default(),
            output_dir: None,
            with_subtitles: false,
            with_thumbnail: false,
        }
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    pub fn with_subtitles(mut self, enabled: bool) -> Self {
        self.with_subtitles = enabled;
        self
    }

    pub fn with_thumbnail(mut self, enabled: bool) -> Self {
        self.with_thumbnail = enabled;
        self
    }

    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }
}

/// How a download request was fulfilled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DownloadOutcome {
    /// yt-dlp wrote files into this directory
    Saved { directory: PathBuf },
    /// The format id already is a direct stream URL
    DirectUrl { url: String },
}

/// Download progress information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub percent: f32,
    pub status: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}
