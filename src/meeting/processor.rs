//! Post-meeting processing of a bot transcript.
//!
//! Fetches the transcript from the bot API, runs the generative analyses
//! and stores every result, replacing whatever a previous run stored.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::ai::{AiService, EmotionPoint, ExtractedActionItem, MeetingSummary};
use crate::db::{
    ActionItemRepository, Database, EmotionRecord, EmotionRepository, MeetingRepository,
    NewActionItem, ParticipantRepository, SummaryRecord, SummaryRepository, TranscriptRecord,
    TranscriptRepository,
};
use crate::emotion::intensity_score;
use crate::vexa::MeetingBotApi;

use super::status::MeetingStatus;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Transcript not found")]
    TranscriptNotFound,

    #[error("Empty transcript")]
    EmptyTranscript,

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub meeting_id: String,
    pub summary: String,
    pub action_items_count: usize,
    pub participants_count: usize,
    pub overall_emotion_score: f64,
}

/// Split a bot transcript payload into stored segments and prompt text.
///
/// A string transcript is one segment. A list is joined as `speaker: text`
/// lines with `Unknown` for missing speakers.
pub fn parse_transcript(payload: &Value) -> Result<(Vec<TranscriptRecord>, String), ProcessError> {
    let transcript = payload
        .get("transcript")
        .ok_or(ProcessError::TranscriptNotFound)?;

    let (segments, text) = match transcript {
        Value::String(text) => (
            vec![TranscriptRecord {
                speaker: None,
                timestamp: None,
                text: text.clone(),
            }],
            text.clone(),
        ),
        Value::Array(items) => {
            let segments: Vec<TranscriptRecord> = items.iter().map(segment_from_json).collect();
            let text = segments
                .iter()
                .map(|s| format!("{}: {}", s.speaker.as_deref().unwrap_or("Unknown"), s.text))
                .collect::<Vec<_>>()
                .join("\n");
            (segments, text)
        }
        _ => (Vec::new(), String::new()),
    };

    if text.is_empty() {
        return Err(ProcessError::EmptyTranscript);
    }
    Ok((segments, text))
}

fn segment_from_json(item: &Value) -> TranscriptRecord {
    let as_text = |key: &str| match item.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    TranscriptRecord {
        speaker: as_text("speaker").filter(|s| !s.is_empty()),
        timestamp: as_text("timestamp"),
        text: as_text("text").unwrap_or_default(),
    }
}

fn action_item_record(item: ExtractedActionItem) -> NewActionItem {
    NewActionItem {
        task: item.task,
        owner: item.owner.unwrap_or_default(),
        due_date: item.due_date.unwrap_or_default(),
        priority: item.priority.unwrap_or_else(|| "medium".to_string()),
    }
}

fn emotion_record(point: &EmotionPoint) -> EmotionRecord {
    EmotionRecord {
        timestamp: point.timestamp.clone().unwrap_or_default(),
        emotion: point
            .emotion
            .clone()
            .unwrap_or_else(|| "neutral".to_string()),
        intensity: point.intensity.unwrap_or(0.5),
    }
}

#[derive(Clone)]
pub struct MeetingProcessor {
    bots: Arc<dyn MeetingBotApi>,
    ai: AiService,
    db: Database,
}

impl MeetingProcessor {
    pub fn new(bots: Arc<dyn MeetingBotApi>, ai: AiService, db: Database) -> Self {
        Self { bots, ai, db }
    }

    pub async fn process(
        &self,
        platform: &str,
        meeting_id: &str,
        title: Option<String>,
    ) -> Result<ProcessOutcome, ProcessError> {
        info!("Processing meeting {}", meeting_id);

        let payload = self.bots.get_transcript(platform, meeting_id).await?;
        let (segments, text) = parse_transcript(&payload)?;

        let platform_owned = platform.to_string();
        let id = meeting_id.to_string();
        self.db
            .call(move |conn| {
                MeetingRepository::upsert_status(
                    conn,
                    &platform_owned,
                    &id,
                    title.as_deref(),
                    MeetingStatus::Processing,
                )
            })
            .await?;

        match self.run(meeting_id, segments, &text).await {
            Ok(outcome) => {
                info!("Meeting {} processed successfully", meeting_id);
                Ok(outcome)
            }
            Err(e) => {
                error!("Failed to process meeting {}: {:#}", meeting_id, e);
                let id = meeting_id.to_string();
                if let Err(mark_err) = self
                    .db
                    .call(move |conn| MeetingRepository::transition(conn, &id, MeetingStatus::Failed))
                    .await
                {
                    error!("Failed to mark meeting {} as failed: {:#}", meeting_id, mark_err);
                }
                Err(ProcessError::Failed(e))
            }
        }
    }

    async fn run(
        &self,
        meeting_id: &str,
        segments: Vec<TranscriptRecord>,
        text: &str,
    ) -> Result<ProcessOutcome> {
        let participants = AiService::detect_participants(&segments);

        let id = meeting_id.to_string();
        self.db
            .call(move |conn| TranscriptRepository::replace_for_meeting(conn, &id, &segments))
            .await?;

        let MeetingSummary {
            summary,
            key_points,
            decisions,
        } = self.ai.generate_summary(text).await;
        let record = SummaryRecord {
            summary: summary.clone(),
            key_points,
            decisions,
        };
        let id = meeting_id.to_string();
        self.db
            .call(move |conn| SummaryRepository::upsert(conn, &id, &record))
            .await?;

        let items: Vec<NewActionItem> = self
            .ai
            .extract_action_items(text)
            .await
            .into_iter()
            .map(action_item_record)
            .collect();
        let action_items_count = items.len();
        let id = meeting_id.to_string();
        self.db
            .call(move |conn| ActionItemRepository::replace_for_meeting(conn, &id, &items))
            .await?;

        let participants_count = participants.len();
        let id = meeting_id.to_string();
        self.db
            .call(move |conn| ParticipantRepository::replace_for_meeting(conn, &id, &participants))
            .await?;

        let points = self.ai.analyze_emotions(text).await;
        let records: Vec<EmotionRecord> = points.iter().map(emotion_record).collect();
        let id = meeting_id.to_string();
        self.db
            .call(move |conn| EmotionRepository::replace_for_meeting(conn, &id, &records))
            .await?;

        let overall_emotion_score = intensity_score(
            points
                .iter()
                .map(|p| (p.emotion.as_deref(), p.intensity.unwrap_or(0.5))),
        );

        let id = meeting_id.to_string();
        self.db
            .call(move |conn| MeetingRepository::transition(conn, &id, MeetingStatus::Completed))
            .await?;

        Ok(ProcessOutcome {
            meeting_id: meeting_id.to_string(),
            summary,
            action_items_count,
            participants_count,
            overall_emotion_score,
        })
    }
}
