//! Batch processing routes and stored results.

use crate::api::error::{ApiError, ApiResult};
use crate::api::AppState;
use crate::db::{
    ActionItemRepository, EmotionRepository, MeetingRepository, ParticipantRepository,
    SummaryRepository,
};
use crate::emotion::intensity_score;
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Default, Deserialize)]
pub struct ProcessRequest {
    pub title: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:platform/:meeting_id/process", post(process_meeting))
        .route("/:platform/:meeting_id/summary", get(get_summary))
        .route("/:platform/:meeting_id/action-items", get(get_action_items))
        .route("/:platform/:meeting_id/participants", get(get_participants))
        .route("/:platform/:meeting_id/emotions", get(get_emotions))
        .route("/:platform/:meeting_id/status", get(get_status))
}

/// POST /api/meetings/:platform/:meeting_id/process
async fn process_meeting(
    State(state): State<AppState>,
    Path((platform, meeting_id)): Path<(String, String)>,
    body: Option<Json<ProcessRequest>>,
) -> ApiResult<Json<Value>> {
    let title = body.and_then(|Json(req)| req.title);
    let outcome = state.processor.process(&platform, &meeting_id, title).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Meeting processed successfully",
        "data": outcome,
    })))
}

async fn get_summary(
    State(state): State<AppState>,
    Path((_platform, meeting_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let summary = state
        .db
        .call(move |conn| SummaryRepository::get(conn, &meeting_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Summary not found. Process the meeting first."))?;

    Ok(Json(json!({
        "success": true,
        "summary": summary.summary,
        "key_points": summary.key_points,
        "decisions": summary.decisions,
    })))
}

async fn get_action_items(
    State(state): State<AppState>,
    Path((_platform, meeting_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let items = state
        .db
        .call(move |conn| ActionItemRepository::list_for_meeting(conn, &meeting_id))
        .await?;

    Ok(Json(json!({ "success": true, "action_items": items })))
}

async fn get_participants(
    State(state): State<AppState>,
    Path((_platform, meeting_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let participants = state
        .db
        .call(move |conn| ParticipantRepository::list_for_meeting(conn, &meeting_id))
        .await?;

    Ok(Json(json!({ "success": true, "participants": participants })))
}

/// Stored emotion timeline with its intensity-weighted score.
async fn get_emotions(
    State(state): State<AppState>,
    Path((_platform, meeting_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let timeline = state
        .db
        .call(move |conn| EmotionRepository::list_for_meeting(conn, &meeting_id))
        .await?;
    let overall_score = intensity_score(
        timeline
            .iter()
            .map(|record| (Some(record.emotion.as_str()), record.intensity)),
    );

    Ok(Json(json!({
        "success": true,
        "overall_score": overall_score,
        "timeline": timeline,
    })))
}

async fn get_status(
    State(state): State<AppState>,
    Path((_platform, meeting_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let meeting = state
        .db
        .call(move |conn| MeetingRepository::get(conn, &meeting_id))
        .await?;

    let body = match meeting {
        None => json!({
            "success": true,
            "status": "not_processed",
            "message": "Meeting has not been processed yet",
        }),
        Some(meeting) => json!({
            "success": true,
            "status": meeting.status,
            "title": meeting.title,
            "date": meeting.date,
        }),
    };
    Ok(Json(body))
}
