//! Meeting data API routes backed by the bot API.

use crate::api::error::ApiResult;
use crate::api::AppState;
use crate::vexa::MeetingDataUpdate;
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, patch},
    Router,
};
use serde_json::{json, Value};
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_meetings))
        .route("/:platform/:meeting_id/transcript", get(get_transcript))
        .route(
            "/:platform/:meeting_id",
            patch(update_meeting).delete(delete_meeting),
        )
}

/// GET /api/meetings - List meetings known to the bot API.
async fn list_meetings(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let data = state.bots.list_meetings().await?;
    let meetings = match data {
        Value::Object(mut map) => map.remove("meetings").unwrap_or_else(|| json!([])),
        list @ Value::Array(_) => list,
        _ => json!([]),
    };
    let count = meetings.as_array().map_or(0, Vec::len);

    Ok(Json(json!({
        "success": true,
        "count": count,
        "meetings": meetings,
    })))
}

/// GET /api/meetings/:platform/:meeting_id/transcript
async fn get_transcript(
    State(state): State<AppState>,
    Path((platform, meeting_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let transcript = state.bots.get_transcript(&platform, &meeting_id).await?;

    Ok(Json(json!({
        "success": true,
        "platform": platform,
        "meeting_id": meeting_id,
        "transcript": transcript,
    })))
}

/// PATCH /api/meetings/:platform/:meeting_id - Update meeting metadata.
async fn update_meeting(
    State(state): State<AppState>,
    Path((platform, meeting_id)): Path<(String, String)>,
    Json(update): Json<MeetingDataUpdate>,
) -> ApiResult<Json<Value>> {
    let data = state
        .bots
        .update_meeting_data(&platform, &meeting_id, &update)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Meeting updated successfully",
        "data": data,
    })))
}

/// DELETE /api/meetings/:platform/:meeting_id - Delete transcripts upstream.
async fn delete_meeting(
    State(state): State<AppState>,
    Path((platform, meeting_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    info!("Deleting transcripts for {} meeting {}", platform, meeting_id);
    let data = state
        .bots
        .delete_meeting_transcripts(&platform, &meeting_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Meeting transcripts deleted and data anonymized",
        "data": data,
    })))
}
