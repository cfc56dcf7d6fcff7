// Error types for extraction and download

use thiserror::Error;

use super::extractors::{diagnose_error, BlockingReason};

#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// Extraction succeeded but no stream survived the quality filter
    #[error("No downloadable formats found")]
    NoFormats,

    /// yt-dlp or ffmpeg not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// URL is empty or malformed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Download asked for a format without naming one
    #[error("Format ID is required")]
    MissingFormatId,

    /// URL does not belong to a supported platform
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The platform refused access (private, geo, bot detection, ...)
    #[error("{}: {message}", reason.description())]
    Blocked {
        reason: BlockingReason,
        message: String,
    },

    /// Process or request exceeded its time budget
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// Failed to parse extractor output
    #[error("Parse error: {0}")]
    ParseError(String),

    /// HTTP request to an extraction service failed
    #[error("Request failed: {0}")]
    Http(String),

    /// Command execution failed
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Filesystem error while preparing output
    #[error("I/O error: {0}")]
    Io(String),
}

impl DownloadError {
    /// Classify raw yt-dlp stderr into a distinct error value.
    pub fn from_stderr(stderr: &str) -> Self {
        let message = summarize_stderr(stderr);
        match diagnose_error(stderr) {
            Some(BlockingReason::FfmpegMissing) => {
                Self::ToolNotFound(format!("ffmpeg ({message})"))
            }
            Some(BlockingReason::UnsupportedUrl) => Self::InvalidUrl(message),
            Some(reason) => Self::Blocked { reason, message },
            None => Self::ExecutionError(message),
        }
    }

    /// User-facing hint, when one exists for this failure.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Blocked { reason, .. } => Some(reason.hint()),
            Self::ToolNotFound(tool) if tool.starts_with("ffmpeg") => {
                Some(BlockingReason::FfmpegMissing.hint())
            }
            Self::ToolNotFound(_) => Some("Install yt-dlp: pip install -U yt-dlp"),
            _ => None,
        }
    }

    pub fn is_no_formats(&self) -> bool {
        matches!(self, Self::NoFormats)
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Http(format!("timeout: {err}"))
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// Keep the lines yt-dlp marks as errors; fall back to the last non-empty line.
fn summarize_stderr(stderr: &str) -> String {
    let important: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ERROR:") || l.contains("HTTP Error"))
        .take(2)
        .collect();

    if !important.is_empty() {
        return important.join(" | ");
    }

    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("yt-dlp exited with an error")
        .chars()
        .take(200)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_video_is_blocked() {
        let err = DownloadError::from_stderr(
            "WARNING: something\nERROR: [youtube] abc: Private video. Sign in if you've been granted access",
        );
        match err {
            DownloadError::Blocked { reason, message } => {
                assert_eq!(reason, BlockingReason::LoginRequired);
                assert!(message.starts_with("ERROR:"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_ffmpeg_is_tool_not_found() {
        let err = DownloadError::from_stderr(
            "ERROR: You have requested merging of multiple formats but ffmpeg is not installed",
        );
        assert!(matches!(err, DownloadError::ToolNotFound(ref t) if t.starts_with("ffmpeg")));
        assert!(err.hint().is_some());
    }

    #[test]
    fn empty_stderr_is_execution_error() {
        let err = DownloadError::from_stderr("");
        assert!(matches!(err, DownloadError::ExecutionError(_)));
    }

    #[test]
    fn no_formats_message() {
        assert_eq!(
            DownloadError::NoFormats.to_string(),
            "No downloadable formats found"
        );
    }
}
