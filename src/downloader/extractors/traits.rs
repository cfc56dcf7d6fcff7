// InfoExtractor trait and common types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{CookieSource, DownloaderConfig};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::MediaInfo;

/// Extraction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorMode {
    /// yt-dlp binary (all platforms)
    Cli,
    /// Piped API (YouTube only, no local tools needed)
    Piped,
    /// Auto-select: CLI → Piped fallback for YouTube
    #[default]
    Auto,
}

impl fmt::Display for ExtractorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::Piped => write!(f, "piped"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for ExtractorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cli" | "yt-dlp" => Ok(Self::Cli),
            "piped" => Ok(Self::Piped),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown extractor mode '{other}' (cli, piped, auto)")),
        }
    }
}

/// Configuration for info extraction
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub mode: ExtractorMode,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    pub cookies: CookieSource,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// yt-dlp program name or path
    pub ytdlp_program: String,
    /// Base URL of the Piped API instance
    pub piped_api: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self::from(&DownloaderConfig::default())
    }
}

impl From<&DownloaderConfig> for ExtractorConfig {
    fn from(config: &DownloaderConfig) -> Self {
        Self {
            mode: config.extractor,
            proxy: config.proxy.clone(),
            cookies: config.cookies.clone(),
            timeout_seconds: config.timeout_seconds,
            ytdlp_program: config.ytdlp_program(),
            piped_api: config.piped_api.trim_end_matches('/').to_string(),
        }
    }
}

impl ExtractorConfig {
    pub fn with_mode(mut self, mode: ExtractorMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Trait for info extractors
#[async_trait]
pub trait InfoExtractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Check if this extractor can run at all
    fn is_available(&self, config: &ExtractorConfig) -> bool;

    /// Whether this extractor understands the URL
    fn supports(&self, url: &str) -> bool;

    /// Extract metadata and the raw format list
    async fn extract(&self, url: &str, config: &ExtractorConfig) -> Result<MediaInfo, DownloadError>;
}
