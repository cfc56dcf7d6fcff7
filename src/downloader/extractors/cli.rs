// CLI InfoExtractor - uses native `yt-dlp` binary
//
// Works for every platform yt-dlp supports. Cookies and proxy come from the
// extractor config; failures are classified from stderr.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::traits::{ExtractorConfig, InfoExtractor};
use crate::downloader::errors::DownloadError;
use crate::downloader::format_selector::StreamDescriptor;
use crate::downloader::models::{is_playlist_only_url, MediaInfo};
use crate::downloader::utils::{
    get_cookie_args, get_proxy_args, get_timeout_args, run_output_with_timeout,
};

/// Extra seconds on top of the socket timeout for the whole process
const PROCESS_GRACE_SECS: u64 = 30;

/// CLI-based info extractor using yt-dlp binary
#[derive(Debug, Default, Clone, Copy)]
pub struct CliInfoExtractor;

impl CliInfoExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Build command arguments
    pub fn build_args(url: &str, config: &ExtractorConfig) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            "--retries".to_string(),
            "2".to_string(),
        ];

        if is_playlist_only_url(url) {
            // Entries are only counted, not resolved
            args.push("--flat-playlist".to_string());
        } else {
            args.push("--no-playlist".to_string());
        }

        args.extend(get_timeout_args(config.timeout_seconds));
        args.extend(get_cookie_args(&config.cookies));
        args.extend(get_proxy_args(config.proxy.as_deref()));

        args.push(url.to_string());
        args
    }

    /// Parse yt-dlp JSON output
    pub fn parse_json(stdout: &[u8]) -> Result<MediaInfo, DownloadError> {
        let json: Value = serde_json::from_slice(stdout)
            .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {e}")))?;

        let is_playlist = json["_type"].as_str() == Some("playlist");
        let entry_count = json["entries"].as_array().map(Vec::len);

        let formats = json["formats"]
            .as_array()
            .map(|formats| formats.iter().map(Self::parse_format).collect())
            .unwrap_or_default();

        let has_subtitles = json["subtitles"]
            .as_object()
            .is_some_and(|subs| !subs.is_empty());

        Ok(MediaInfo {
            id: json["id"].as_str().unwrap_or("unknown").to_string(),
            title: json["title"].as_str().unwrap_or("Unknown").to_string(),
            uploader: json["uploader"].as_str().unwrap_or("Unknown").to_string(),
            duration_seconds: json["duration"].as_f64().unwrap_or(0.0) as u64,
            thumbnail: json["thumbnail"].as_str().unwrap_or("").to_string(),
            webpage_url: json["webpage_url"].as_str().unwrap_or("").to_string(),
            formats,
            has_subtitles,
            is_playlist,
            entry_count,
            extension: json["ext"].as_str().map(str::to_string),
        })
    }

    fn parse_format(f: &Value) -> StreamDescriptor {
        let format_id = match &f["format_id"] {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        };

        StreamDescriptor::from_codecs(
            format_id,
            f["vcodec"].as_str(),
            f["acodec"].as_str(),
            f["ext"].as_str().unwrap_or(""),
            f["height"].as_u64().and_then(|h| u32::try_from(h).ok()),
            f["tbr"].as_f64(),
        )
        .with_filesize(f["filesize"].as_u64().or_else(|| f["filesize_approx"].as_u64()))
    }
}

#[async_trait]
impl InfoExtractor for CliInfoExtractor {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    fn is_available(&self, config: &ExtractorConfig) -> bool {
        which::which(&config.ytdlp_program).is_ok()
    }

    fn supports(&self, _url: &str) -> bool {
        true
    }

    async fn extract(&self, url: &str, config: &ExtractorConfig) -> Result<MediaInfo, DownloadError> {
        let args = Self::build_args(url, config);
        debug!("[CliExtractor] {} {}", config.ytdlp_program, args.join(" "));

        let out = run_output_with_timeout(
            &config.ytdlp_program,
            &args,
            config.timeout_seconds + PROCESS_GRACE_SECS,
        )
        .await?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            warn!("[CliExtractor] yt-dlp failed: {}", stderr.trim());
            return Err(DownloadError::from_stderr(&stderr));
        }

        let info = Self::parse_json(&out.stdout)?;
        info!(
            "[CliExtractor] '{}' with {} formats",
            info.title,
            info.formats.len()
        );
        Ok(info)
    }
}
