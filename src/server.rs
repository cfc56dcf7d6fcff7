//! HTTP API.
//!
//! Thin axum layer over [`Downloader`]. Every failure is answered with a JSON
//! body of the form `{"error": "..."}`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::downloader::{
    DetectReport, DownloadError, DownloadOutcome, DownloadRequest, DownloadTarget, Downloader,
    FormatFilter, LogProgress, QualityReport,
};

#[derive(Clone)]
pub struct AppState {
    pub downloader: Arc<Downloader>,
}

impl AppState {
    pub fn new(downloader: Downloader) -> Self {
        Self {
            downloader: Arc::new(downloader),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Download(DownloadError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self {
            ApiError::BadRequest(msg) => ErrorBody {
                error: msg,
                hint: None,
            },
            ApiError::Download(err) => {
                warn!("Request failed: {}", err);
                ErrorBody {
                    error: err.to_string(),
                    hint: err.hint(),
                }
            }
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<DownloadError> for ApiError {
    fn from(err: DownloadError) -> Self {
        ApiError::Download(err)
    }
}

#[derive(Debug, Deserialize)]
pub struct QualitiesRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub mode: Option<FormatFilter>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadBody {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub mode: Option<FormatFilter>,
}

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OptionDownloadRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub option: Option<String>,
    /// Height for the `video` option, as a number or a string
    #[serde(default, deserialize_with = "string_or_number")]
    pub format_id: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DownloadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl DownloadResponse {
    fn from_outcome(outcome: DownloadOutcome, message: Option<String>) -> Self {
        match outcome {
            DownloadOutcome::DirectUrl { url } => Self {
                success: true,
                message,
                download_url: Some(url),
            },
            DownloadOutcome::Saved { directory } => Self {
                success: true,
                message: Some(message.unwrap_or_else(|| {
                    format!("Saved to {}", directory.display())
                })),
                download_url: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/get_qualities", post(get_qualities))
        .route("/download", post(download))
        .route("/api/detect", post(detect))
        .route("/api/download", post(download_option))
        .route("/api/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> &'static str {
    "UniDownload Backend Running"
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "UniDownload API is running",
    })
}

async fn get_qualities(
    State(state): State<AppState>,
    body: Result<Json<QualitiesRequest>, JsonRejection>,
) -> Result<Json<QualityReport>, ApiError> {
    let Json(body) = body?;
    let url = non_empty(body.url).ok_or_else(|| ApiError::BadRequest("No URL provided".to_string()))?;
    let filter = body.mode.unwrap_or_default();

    let report = state.downloader.fetch_qualities(&url, filter).await?;
    Ok(Json(report))
}

async fn download(
    State(state): State<AppState>,
    body: Result<Json<DownloadBody>, JsonRejection>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let Json(body) = body?;
    let (Some(url), Some(format_id)) = (non_empty(body.url), non_empty(body.format_id)) else {
        return Err(ApiError::BadRequest("Missing URL or format ID".to_string()));
    };

    let outcome = state
        .downloader
        .download_format(&url, &format_id, body.mode.unwrap_or_default(), &LogProgress)
        .await?;

    info!("Download finished for {}", url);
    Ok(Json(DownloadResponse::from_outcome(outcome, None)))
}

async fn detect(
    State(state): State<AppState>,
    body: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<DetectReport>, ApiError> {
    let Json(body) = body?;
    let url = non_empty(body.url).ok_or_else(|| ApiError::BadRequest("URL is required".to_string()))?;
    let report = state.downloader.detect(&url).await?;
    Ok(Json(report))
}

/// Map a UI option onto a download target
fn target_for_option(option: &str, format_id: Option<&str>) -> Result<(DownloadTarget, &'static str), ApiError> {
    let target = match option {
        "" | "video" | "post" => {
            match format_id {
                Some(height) => {
                    let height: u32 = height
                        .trim_end_matches('p')
                        .parse()
                        .map_err(|_| ApiError::BadRequest(format!("Invalid height '{height}'")))?;
                    (DownloadTarget::MaxHeight(height), "Video download finished")
                }
                None if option == "post" => (DownloadTarget::Best, "Post download finished"),
                None => (DownloadTarget::Best, "Video download finished"),
            }
        }
        "audio" => (DownloadTarget::AudioMp3, "Audio download finished"),
        "subtitles" => (DownloadTarget::SubtitlesOnly, "Subtitles download finished"),
        "thumbnail" => (DownloadTarget::ThumbnailOnly, "Thumbnail download finished"),
        "playlist" => (
            DownloadTarget::Playlist {
                max_height: None,
                audio_only: false,
            },
            "Playlist download finished",
        ),
        other => return Err(ApiError::BadRequest(format!("Unknown option '{other}'"))),
    };
    Ok(target)
}

async fn download_option(
    State(state): State<AppState>,
    body: Result<Json<OptionDownloadRequest>, JsonRejection>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let Json(body) = body?;
    let url = non_empty(body.url).ok_or_else(|| ApiError::BadRequest("URL is required".to_string()))?;
    let option = non_empty(body.option).unwrap_or_default();
    let format_id = non_empty(body.format_id);

    let (target, message) = target_for_option(&option, format_id.as_deref())?;
    let outcome = state
        .downloader
        .download(&DownloadRequest::new(url, target), &LogProgress)
        .await?;

    Ok(Json(DownloadResponse::from_outcome(outcome, Some(message.to_string()))))
}

/// Bind and serve until ctrl-c
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("UniDownload API listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_for_option() {
        assert_eq!(
            target_for_option("video", Some("720")).unwrap().0,
            DownloadTarget::MaxHeight(720)
        );
        assert_eq!(
            target_for_option("video", Some("1080p")).unwrap().0,
            DownloadTarget::MaxHeight(1080)
        );
        assert_eq!(target_for_option("", None).unwrap().0, DownloadTarget::Best);
        assert_eq!(target_for_option("audio", None).unwrap().0, DownloadTarget::AudioMp3);
        assert!(target_for_option("video", Some("hd")).is_err());
        assert!(target_for_option("gif", None).is_err());
    }

    #[test]
    fn test_direct_url_response() {
        let response = DownloadResponse::from_outcome(
            DownloadOutcome::DirectUrl {
                url: "https://cdn/x".to_string(),
            },
            None,
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "download_url": "https://cdn/x"}));
    }
}
