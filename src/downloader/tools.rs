// External tool discovery (yt-dlp, ffmpeg)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::config::DownloaderConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version", // ffmpeg uses a single dash
        }
    }

    pub fn install_hint(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "pip install -U yt-dlp (or brew install yt-dlp)",
            ToolType::Ffmpeg => "install ffmpeg from https://ffmpeg.org/download.html",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
    pub is_available: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    ytdlp_override: Option<PathBuf>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DownloaderConfig) -> Self {
        Self {
            ytdlp_override: config.ytdlp_path.clone(),
        }
    }

    pub async fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = self.locate(tool_type);
        let version = match &path {
            Some(p) => get_version(p, tool_type).await,
            None => None,
        };

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            version,
            is_available: path.is_some(),
            path,
        }
    }

    pub async fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlp).await,
            self.get_tool_info(ToolType::Ffmpeg).await,
        ]
    }

    fn locate(&self, tool_type: ToolType) -> Option<PathBuf> {
        if tool_type == ToolType::YtDlp {
            if let Some(path) = &self.ytdlp_override {
                return which::which(path).ok();
            }
        }
        which::which(tool_type.as_str()).ok()
    }
}

async fn get_version(path: &Path, tool_type: ToolType) -> Option<String> {
    let output = Command::new(path)
        .arg(tool_type.version_arg())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        debug!("{} {} failed", path.display(), tool_type.version_arg());
        return None;
    }

    parse_version(tool_type, &String::from_utf8_lossy(&output.stdout))
}

/// First line for yt-dlp; "ffmpeg version X ..." becomes "X"
fn parse_version(tool_type: ToolType, stdout: &str) -> Option<String> {
    let first = stdout.lines().next()?.trim();
    if first.is_empty() {
        return None;
    }
    match tool_type {
        ToolType::YtDlp => Some(first.to_string()),
        ToolType::Ffmpeg => first
            .strip_prefix("ffmpeg version ")
            .and_then(|rest| rest.split_whitespace().next())
            .map(str::to_string)
            .or_else(|| Some(first.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(
            parse_version(ToolType::YtDlp, "2024.08.06\n"),
            Some("2024.08.06".to_string())
        );
        assert_eq!(
            parse_version(
                ToolType::Ffmpeg,
                "ffmpeg version 6.1.1 Copyright (c) 2000-2023 the FFmpeg developers\nbuilt with gcc"
            ),
            Some("6.1.1".to_string())
        );
        assert_eq!(parse_version(ToolType::YtDlp, ""), None);
    }

    #[tokio::test]
    async fn test_missing_override_is_unavailable() {
        let mut config = DownloaderConfig::default();
        config.ytdlp_path = Some(PathBuf::from("/nonexistent/bin/yt-dlp-xyz"));

        let info = ToolManager::from_config(&config)
            .get_tool_info(ToolType::YtDlp)
            .await;

        assert_eq!(info.name, "yt-dlp");
        assert!(!info.is_available);
        assert!(info.path.is_none());
        assert!(info.version.is_none());
    }

    #[test]
    fn test_tool_names_serialize() {
        assert_eq!(serde_json::to_string(&ToolType::YtDlp).unwrap(), "\"yt-dlp\"");
        assert_eq!(serde_json::to_string(&ToolType::Ffmpeg).unwrap(), "\"ffmpeg\"");
    }
}
