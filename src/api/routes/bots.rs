//! Meeting bot API routes.
//!
//! Thin pass-through to the bot API; upstream failures surface as 500s with
//! the upstream message.

use crate::api::error::{ApiError, ApiResult};
use crate::api::AppState;
use crate::vexa::{extract_meeting_id, BotRequest, DEFAULT_BOT_NAME, DEFAULT_LANGUAGE};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

/// Request body for POST /api/bots/start.
#[derive(Debug, Deserialize)]
pub struct StartBotRequest {
    /// `google_meet` or `teams`
    pub platform: String,
    pub meeting_url: String,
    pub language: Option<String>,
    pub bot_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StopBotRequest {
    pub platform: String,
    pub native_meeting_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    pub language: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_bot))
        .route("/stop", post(stop_bot))
        .route("/status", get(bot_status))
        .route("/:platform/:meeting_id/language", put(update_language))
}

/// POST /api/bots/start - Send a bot into a meeting.
async fn start_bot(
    State(state): State<AppState>,
    Json(req): Json<StartBotRequest>,
) -> ApiResult<Json<Value>> {
    let (native_meeting_id, passcode) = extract_meeting_id(&req.platform, &req.meeting_url)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let request = BotRequest {
        platform: req.platform.clone(),
        native_meeting_id: native_meeting_id.clone(),
        passcode,
        language: req
            .language
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        bot_name: req
            .bot_name
            .unwrap_or_else(|| DEFAULT_BOT_NAME.to_string()),
    };

    info!(
        "Requesting bot for {} meeting {}",
        request.platform, native_meeting_id
    );
    let data = state.bots.request_bot(&request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Bot requested successfully. It will join the meeting in ~10 seconds.",
        "meeting_id": native_meeting_id,
        "platform": req.platform,
        "data": data,
    })))
}

/// POST /api/bots/stop - Remove a bot from a meeting.
async fn stop_bot(
    State(state): State<AppState>,
    Json(req): Json<StopBotRequest>,
) -> ApiResult<Json<Value>> {
    let data = state
        .bots
        .stop_bot(&req.platform, &req.native_meeting_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Bot stopped successfully. API credits freed.",
        "data": data,
    })))
}

/// Number of bots in a status payload, which is either a list or an object
/// holding a `running_bots` list.
fn count_bots(bots: &Value) -> usize {
    bots.as_array()
        .or_else(|| bots.get("running_bots").and_then(Value::as_array))
        .map_or(0, Vec::len)
}

/// GET /api/bots/status - List running bots.
async fn bot_status(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let bots = state.bots.get_bot_status().await?;

    Ok(Json(json!({
        "success": true,
        "active_bots": count_bots(&bots),
        "bots": bots,
    })))
}

/// PUT /api/bots/:platform/:meeting_id/language - Change transcription language.
async fn update_language(
    State(state): State<AppState>,
    Path((platform, meeting_id)): Path<(String, String)>,
    Json(req): Json<LanguageRequest>,
) -> ApiResult<Json<Value>> {
    let data = state
        .bots
        .update_bot_config(&platform, &meeting_id, &req.language)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Bot language updated to {}", req.language),
        "data": data,
    })))
}
