//! Live and recorded emotion-analysis routes.

use crate::api::error::ApiResult;
use crate::api::AppState;
use crate::config::EmotionConfig;
use crate::emotion::EmotionError;
use anyhow::Context;
use axum::{
    extract::{
        multipart::{Field, MultipartError},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const MB: u64 = 1024 * 1024;

/// Room for multipart boundaries and the small text fields.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Default, Deserialize)]
pub struct StartAnalysisRequest {
    pub title: Option<String>,
}

pub fn router(config: &EmotionConfig) -> Router<AppState> {
    let frame_limit = config.max_frame_bytes.saturating_add(MULTIPART_OVERHEAD);
    let video_limit = usize::try_from(config.max_video_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route(
            "/:platform/:meeting_id/start-emotion-analysis",
            post(start_analysis),
        )
        .route(
            "/:platform/:meeting_id/process-emotion-frame",
            post(process_frame).layer(DefaultBodyLimit::max(frame_limit)),
        )
        .route(
            "/:platform/:meeting_id/stop-emotion-analysis",
            post(stop_analysis),
        )
        .route(
            "/:platform/:meeting_id/emotion-analysis-status",
            get(analysis_status),
        )
        .route(
            "/:platform/:meeting_id/analyze-video-emotions",
            post(analyze_video).layer(DefaultBodyLimit::max(video_limit)),
        )
}

fn upload_error(err: MultipartError, limit_mb: u64) -> EmotionError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        EmotionError::UploadTooLarge { limit_mb }
    } else {
        EmotionError::InvalidUpload(err.body_text())
    }
}

/// POST /api/meetings/:platform/:meeting_id/start-emotion-analysis
async fn start_analysis(
    State(state): State<AppState>,
    Path((platform, meeting_id)): Path<(String, String)>,
    body: Option<Json<StartAnalysisRequest>>,
) -> ApiResult<Json<Value>> {
    let title = body.and_then(|Json(req)| req.title);
    let outcome = state.emotions.start(&platform, &meeting_id, title).await?;

    let message = if outcome.already_running {
        "Emotion analysis already running"
    } else {
        "Emotion analysis started"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "data": outcome,
    })))
}

/// POST /api/meetings/:platform/:meeting_id/process-emotion-frame
///
/// Multipart fields: `frame` (or `file`) with the encoded image, and an
/// optional `timestamp` in seconds since the analysis started.
async fn process_frame(
    State(state): State<AppState>,
    Path((_platform, meeting_id)): Path<(String, String)>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let limit = state.emotions.config().max_frame_bytes;
    let limit_mb = limit as u64 / MB;

    let mut frame = None;
    let mut timestamp = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, limit_mb))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "frame" | "file" => {
                let bytes = field.bytes().await.map_err(|e| upload_error(e, limit_mb))?;
                if bytes.len() > limit {
                    return Err(EmotionError::UploadTooLarge { limit_mb }.into());
                }
                frame = Some(bytes.to_vec());
            }
            "timestamp" => {
                let text = field.text().await.map_err(|e| upload_error(e, limit_mb))?;
                let value: f64 = text
                    .trim()
                    .parse()
                    .ok()
                    .filter(|t: &f64| t.is_finite() && *t >= 0.0)
                    .ok_or_else(|| {
                        EmotionError::InvalidUpload(format!("Invalid timestamp: {}", text))
                    })?;
                timestamp = Some(value);
            }
            _ => {}
        }
    }

    let frame = frame
        .ok_or_else(|| EmotionError::InvalidUpload("No frame provided".to_string()))?;
    let outcome = state
        .emotions
        .process_frame(&meeting_id, frame, timestamp)
        .await?;

    Ok(Json(json!({ "success": true, "data": outcome })))
}

/// POST /api/meetings/:platform/:meeting_id/stop-emotion-analysis
async fn stop_analysis(
    State(state): State<AppState>,
    Path((_platform, meeting_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let summary = state.emotions.stop(&meeting_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Emotion analysis stopped",
        "data": summary,
    })))
}

/// GET /api/meetings/:platform/:meeting_id/emotion-analysis-status
async fn analysis_status(
    State(state): State<AppState>,
    Path((_platform, meeting_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let status = state.emotions.status(&meeting_id).await;
    Ok(Json(json!({ "success": true, "data": status })))
}

/// Stream an upload field into a temporary file, enforcing `limit` bytes.
async fn save_upload(field: &mut Field<'_>, limit: u64) -> Result<NamedTempFile, EmotionError> {
    let limit_mb = limit / MB;
    let temp = tempfile::Builder::new()
        .prefix("quantum-upload-")
        .tempfile()
        .context("Failed to create upload file")?;
    let mut file = tokio::fs::File::from_std(temp.reopen().context("Failed to open upload file")?);

    let mut written: u64 = 0;
    while let Some(chunk) = field.chunk().await.map_err(|e| upload_error(e, limit_mb))? {
        written += chunk.len() as u64;
        if written > limit {
            return Err(EmotionError::UploadTooLarge { limit_mb });
        }
        file.write_all(&chunk)
            .await
            .context("Failed to write upload file")?;
    }
    file.flush().await.context("Failed to write upload file")?;

    debug!("Saved {} byte upload to {:?}", written, temp.path());
    Ok(temp)
}

/// POST /api/meetings/:platform/:meeting_id/analyze-video-emotions
///
/// Multipart field `file` (or `video`) with a `video/*` content type.
async fn analyze_video(
    State(state): State<AppState>,
    Path((platform, meeting_id)): Path<(String, String)>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    state.emotions.vision().models()?;

    let limit = state.emotions.config().max_video_bytes;
    let mut video = None;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, limit / MB))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name != "file" && name != "video" {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default();
        if !content_type.starts_with("video/") {
            return Err(EmotionError::InvalidUpload("File must be a video".to_string()).into());
        }

        video = Some(save_upload(&mut field, limit).await?);
        break;
    }

    let video = video
        .ok_or_else(|| EmotionError::InvalidUpload("No video file provided".to_string()))?;
    info!("Received video upload for {} meeting {}", platform, meeting_id);

    let summary = state
        .emotions
        .analyze_recording(&platform, &meeting_id, video)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Video emotion analysis completed",
        "data": summary,
    })))
}
