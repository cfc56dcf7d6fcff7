// Blocking diagnostics - identifies why a platform refused a request
//
// Works on raw yt-dlp stderr. Classification happens here, at the extraction
// boundary, so nothing downstream has to interpret failure strings.

use serde::{Deserialize, Serialize};

/// Reasons why extraction or download was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingReason {
    /// Browser holds a lock on its cookie database (browser still running)
    CookieDatabaseLocked,

    /// Private, age-gated or login-only content
    LoginRequired,

    /// Deleted or otherwise unavailable
    VideoUnavailable,

    /// Geographic restriction
    GeoBlocked,

    /// Rate limiting (429 or similar)
    RateLimited,

    /// Bot detection triggered
    BotDetection,

    /// HTTP 403 Forbidden - general access denied
    Http403Forbidden,

    /// Network timeout (soft IP block)
    NetworkTimeout,

    /// DRM-protected content, permanent
    DrmProtected,

    /// ffmpeg is needed to merge audio and video
    FfmpegMissing,

    /// No extractor understands the URL
    UnsupportedUrl,

    /// Generic/unknown failure
    Unknown,
}

impl BlockingReason {
    /// Check if this reason is retryable with different settings
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden
                | Self::NetworkTimeout
                | Self::RateLimited
                | Self::BotDetection
                | Self::CookieDatabaseLocked
        )
    }

    /// Check if cookies might help
    pub fn cookies_might_help(&self) -> bool {
        matches!(
            self,
            Self::LoginRequired | Self::BotDetection | Self::Http403Forbidden
        )
    }

    /// Check if this is a permanent restriction (no workaround)
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::DrmProtected | Self::VideoUnavailable)
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::CookieDatabaseLocked => "Cookie database is locked",
            Self::LoginRequired => "Login required or private content",
            Self::VideoUnavailable => "Content unavailable",
            Self::GeoBlocked => "Geographic restriction",
            Self::RateLimited => "Rate limited",
            Self::BotDetection => "Bot detection triggered",
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::NetworkTimeout => "Network timeout",
            Self::DrmProtected => "DRM-protected content",
            Self::FfmpegMissing => "FFmpeg is not installed",
            Self::UnsupportedUrl => "Unsupported URL",
            Self::Unknown => "Extraction failed",
        }
    }

    /// What the user can do about it
    pub fn hint(&self) -> &'static str {
        match self {
            Self::CookieDatabaseLocked => {
                "Close the browser completely and try again.\n\
                 Browsers lock their cookie database while running.\n\
                 Alternatively disable cookies and download without login."
            }
            Self::LoginRequired => {
                "Enable browser cookies (--cookies-from-browser) from a browser\n\
                 where you are logged in, or export a cookies.txt file."
            }
            Self::VideoUnavailable => {
                "The content has been removed, made private or never existed."
            }
            Self::GeoBlocked => "Use a proxy (--proxy) in a region where the content is available.",
            Self::RateLimited => "Wait 10-15 minutes or switch network/proxy.",
            Self::BotDetection => "Use cookies from a logged-in browser or a fresh proxy.",
            Self::Http403Forbidden => {
                "Update yt-dlp (pip install -U yt-dlp), refresh cookies or use a proxy."
            }
            Self::NetworkTimeout => "Check your connection, raise --timeout or use a proxy.",
            Self::DrmProtected => "DRM-protected content cannot be downloaded.",
            Self::FfmpegMissing => {
                "FFmpeg is required to merge video and audio streams.\n\
                 Install it (winget install ffmpeg, brew install ffmpeg,\n\
                 apt install ffmpeg) and make sure it is on PATH."
            }
            Self::UnsupportedUrl => "Check the URL; only YouTube, Instagram and Facebook are supported.",
            Self::Unknown => "Check the URL and try again later.",
        }
    }
}

/// Analyze error message and return blocking reason
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    let lower = error.to_lowercase();

    if lower.contains("cookie database")
        || (lower.contains("could not copy") && lower.contains("cookie"))
    {
        return Some(BlockingReason::CookieDatabaseLocked);
    }

    if lower.contains("ffmpeg") && (lower.contains("not installed") || lower.contains("not found")) {
        return Some(BlockingReason::FfmpegMissing);
    }

    if lower.contains("drm") || lower.contains("widevine") {
        return Some(BlockingReason::DrmProtected);
    }

    if lower.contains("unsupported url") {
        return Some(BlockingReason::UnsupportedUrl);
    }

    // Checked before login: YouTube phrases bot checks as "sign in to confirm"
    if lower.contains("not a bot")
        || lower.contains("not a robot")
        || lower.contains("captcha")
        || lower.contains("unusual traffic")
    {
        return Some(BlockingReason::BotDetection);
    }

    if lower.contains("private video")
        || lower.contains("video is private")
        || lower.contains("sign in if you've been granted access")
        || lower.contains("sign in to confirm your age")
        || lower.contains("age-restricted")
        || lower.contains("login required")
        || lower.contains("requires authentication")
        || lower.contains("log in")
    {
        return Some(BlockingReason::LoginRequired);
    }

    if lower.contains("video unavailable")
        || lower.contains("video has been removed")
        || lower.contains("no longer available")
        || lower.contains("content isn't available")
    {
        return Some(BlockingReason::VideoUnavailable);
    }

    if lower.contains("not available in your country")
        || lower.contains("blocked in your country")
        || lower.contains("geo restrict")
    {
        return Some(BlockingReason::GeoBlocked);
    }

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(BlockingReason::RateLimited);
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return Some(BlockingReason::Http403Forbidden);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("network unreachable")
    {
        return Some(BlockingReason::NetworkTimeout);
    }

    if !error.trim().is_empty() {
        return Some(BlockingReason::Unknown);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_lock_detection() {
        let error = "ERROR: Could not copy Chrome cookie database. See https://github.com/yt-dlp/yt-dlp/issues/7271";
        assert_eq!(diagnose_error(error), Some(BlockingReason::CookieDatabaseLocked));
    }

    #[test]
    fn test_bot_detection_before_login() {
        let error = "ERROR: [youtube] xyz: Sign in to confirm you're not a bot";
        assert_eq!(diagnose_error(error), Some(BlockingReason::BotDetection));
    }

    #[test]
    fn test_private_detection() {
        let error = "ERROR: [instagram] abc: This content is only available for registered users. login required";
        assert_eq!(diagnose_error(error), Some(BlockingReason::LoginRequired));
    }

    #[test]
    fn test_403_detection() {
        let error = "ERROR: unable to download video data: HTTP Error 403: Forbidden";
        assert_eq!(diagnose_error(error), Some(BlockingReason::Http403Forbidden));
    }

    #[test]
    fn test_timeout_detection() {
        assert_eq!(
            diagnose_error("Timed out after 30s"),
            Some(BlockingReason::NetworkTimeout)
        );
    }

    #[test]
    fn test_geo_detection() {
        let error = "The uploader has not made this video available in your country";
        assert_eq!(diagnose_error(error), Some(BlockingReason::GeoBlocked));
    }

    #[test]
    fn test_unknown_and_empty() {
        assert_eq!(diagnose_error("something odd"), Some(BlockingReason::Unknown));
        assert_eq!(diagnose_error("   "), None);
    }

    #[test]
    fn test_permanent() {
        assert!(BlockingReason::DrmProtected.is_permanent());
        assert!(!BlockingReason::RateLimited.is_permanent());
        assert!(BlockingReason::LoginRequired.cookies_might_help());
    }
}
