//! Live emotion-analysis sessions, one per meeting.
//!
//! Sessions live in a concurrent map keyed by meeting id. Each session has
//! its own async mutex, so frames for different meetings never contend.
//! Map guards are never held across an `.await`.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::EmotionConfig;
use crate::db::{Database, EmotionRepository, InvalidTransition, MeetingRepository};
use crate::meeting::MeetingStatus;

use super::analyzer::{AnalyzerConfig, EmotionAnalyzer, EmotionSummary, FrameOutcome};
use super::error::EmotionError;
use super::frame::decode_frame;
use super::video::analyze_video;
use super::types::FaceReading;
use super::vision::VisionHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Running,
    Stopped,
}

pub struct AnalysisSession {
    pub session_id: String,
    pub meeting_id: String,
    pub platform: String,
    pub started_at: DateTime<Utc>,
    started: Instant,
    phase: SessionPhase,
    analyzer: EmotionAnalyzer,
}

impl AnalysisSession {
    fn new(platform: &str, meeting_id: &str, config: AnalyzerConfig) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            meeting_id: meeting_id.to_string(),
            platform: platform.to_string(),
            started_at: Utc::now(),
            started: Instant::now(),
            phase: SessionPhase::Running,
            analyzer: EmotionAnalyzer::new(config),
        }
    }

    fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    pub meeting_id: String,
    pub session_id: String,
    pub already_running: bool,
    pub frames_processed: u64,
    pub started_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub meeting_id: String,
    pub running: bool,
    pub session_id: Option<String>,
    pub frames_processed: u64,
    pub people_tracked: usize,
    pub elapsed_seconds: f64,
    pub started_at: Option<String>,
}

pub struct EmotionSessionManager {
    sessions: DashMap<String, Arc<Mutex<AnalysisSession>>>,
    db: Database,
    vision: VisionHandle,
    config: EmotionConfig,
}

impl EmotionSessionManager {
    pub fn new(db: Database, vision: VisionHandle, config: EmotionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            db,
            vision,
            config,
        }
    }

    pub fn config(&self) -> &EmotionConfig {
        &self.config
    }

    pub fn vision(&self) -> &VisionHandle {
        &self.vision
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn session(&self, meeting_id: &str) -> Option<Arc<Mutex<AnalysisSession>>> {
        self.sessions
            .get(meeting_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Start analysing a meeting. Starting a running meeting is a no-op.
    pub async fn start(
        &self,
        platform: &str,
        meeting_id: &str,
        title: Option<String>,
    ) -> Result<StartOutcome, EmotionError> {
        self.vision.models()?;

        let (session, created) = match self.sessions.entry(meeting_id.to_string()) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let session = Arc::new(Mutex::new(AnalysisSession::new(
                    platform,
                    meeting_id,
                    AnalyzerConfig::from(&self.config),
                )));
                entry.insert(Arc::clone(&session));
                (session, true)
            }
        };

        if created {
            let platform_owned = platform.to_string();
            let id = meeting_id.to_string();
            let result = self
                .db
                .call(move |conn| {
                    MeetingRepository::upsert_status(
                        conn,
                        &platform_owned,
                        &id,
                        title.as_deref(),
                        MeetingStatus::Active,
                    )
                })
                .await;

            if let Err(e) = result {
                self.sessions
                    .remove_if(meeting_id, |_, existing| Arc::ptr_eq(existing, &session));
                return Err(match e.downcast_ref::<InvalidTransition>() {
                    Some(conflict) => EmotionError::Conflict(conflict.to_string()),
                    None => EmotionError::Upstream(e),
                });
            }
        }

        let guard = session.lock().await;
        if created {
            info!(
                "Started emotion analysis for {} meeting {} (session {})",
                guard.platform, meeting_id, guard.session_id
            );
        } else {
            debug!("Emotion analysis already running for meeting {}", meeting_id);
        }

        Ok(StartOutcome {
            meeting_id: meeting_id.to_string(),
            session_id: guard.session_id.clone(),
            already_running: !created,
            frames_processed: guard.analyzer.frames_processed(),
            started_at: guard.started_at.to_rfc3339(),
        })
    }

    /// Process one encoded frame.
    ///
    /// `timestamp` is the capture time in seconds since the session started;
    /// wall-clock time since start is used when absent.
    pub async fn process_frame(
        &self,
        meeting_id: &str,
        bytes: Vec<u8>,
        timestamp: Option<f64>,
    ) -> Result<FrameOutcome, EmotionError> {
        let session = self
            .session(meeting_id)
            .ok_or_else(|| EmotionError::NotRunning(meeting_id.to_string()))?;
        let models = self.vision.models()?.clone();

        let readings = tokio::task::spawn_blocking(move || -> Result<Vec<FaceReading>, EmotionError> {
            let frame =
                decode_frame(&bytes).map_err(|e| EmotionError::InvalidFrame(format!("{:#}", e)))?;
            models.read_faces(&frame).map_err(EmotionError::from)
        })
        .await
        .map_err(|e| EmotionError::Upstream(anyhow::anyhow!("Frame task failed: {}", e)))??;

        let mut guard = session.lock().await;
        // A stop may have completed while the frame was being read
        if guard.phase != SessionPhase::Running {
            return Err(EmotionError::NotRunning(meeting_id.to_string()));
        }

        let timestamp = timestamp.unwrap_or_else(|| guard.elapsed_secs());
        let outcome = guard.analyzer.ingest(&readings, timestamp);
        debug!(
            "Meeting {} frame {}: {} faces, {} people tracked",
            meeting_id, outcome.frame_index, outcome.faces_detected, outcome.people_tracked
        );

        if guard.analyzer.flush_due() {
            let records = guard.analyzer.live_timeline();
            let id = meeting_id.to_string();
            match self
                .db
                .call(move |conn| EmotionRepository::replace_for_meeting(conn, &id, &records))
                .await
            {
                Ok(written) => {
                    guard.analyzer.mark_flushed();
                    debug!("Flushed {} emotion records for meeting {}", written, meeting_id);
                }
                Err(e) => warn!("Failed to flush emotions for meeting {}: {:#}", meeting_id, e),
            }
        }

        Ok(outcome)
    }

    /// Finish a session: filter, score, persist the final timeline and mark
    /// the meeting completed.
    pub async fn stop(&self, meeting_id: &str) -> Result<EmotionSummary, EmotionError> {
        let session = self
            .session(meeting_id)
            .ok_or_else(|| EmotionError::NotRunning(meeting_id.to_string()))?;

        let mut guard = session.lock().await;
        if guard.phase != SessionPhase::Running {
            return Err(EmotionError::NotRunning(meeting_id.to_string()));
        }

        let duration = guard
            .elapsed_secs()
            .max(guard.analyzer.observed_duration());
        let summary = guard.analyzer.finalize(duration);

        let records = summary.timeline.clone();
        let id = meeting_id.to_string();
        let minutes = (duration / 60.0).round() as i64;
        self.db
            .call(move |conn| EmotionRepository::save_final(conn, &id, &records, minutes))
            .await
            .map_err(|e| {
                error!("Failed to save emotion analysis for meeting {}: {:#}", meeting_id, e);
                EmotionError::Upstream(e)
            })?;

        guard.phase = SessionPhase::Stopped;
        self.sessions
            .remove_if(meeting_id, |_, existing| Arc::ptr_eq(existing, &session));

        info!(
            "Stopped emotion analysis for meeting {}: {} frames, {} people kept, score {:.2}",
            meeting_id,
            summary.frames_processed,
            summary.people.len(),
            summary.overall_score
        );

        Ok(summary)
    }

    /// Analyse an uploaded recording and store its timeline.
    ///
    /// The meeting moves to `processing` for the duration of the analysis,
    /// then to `completed`, or to `failed` when the analysis errors. The
    /// upload is deleted when this returns.
    pub async fn analyze_recording(
        &self,
        platform: &str,
        meeting_id: &str,
        video: NamedTempFile,
    ) -> Result<EmotionSummary, EmotionError> {
        let models = self.vision.models()?.clone();

        let platform_owned = platform.to_string();
        let id = meeting_id.to_string();
        self.db
            .call(move |conn| {
                MeetingRepository::upsert_status(
                    conn,
                    &platform_owned,
                    &id,
                    None,
                    MeetingStatus::Processing,
                )
            })
            .await
            .map_err(|e| match e.downcast_ref::<InvalidTransition>() {
                Some(conflict) => EmotionError::Conflict(conflict.to_string()),
                None => EmotionError::Upstream(e),
            })?;

        info!("Analysing uploaded video for meeting {}", meeting_id);
        let config = self.config.clone();
        let analysis = tokio::task::spawn_blocking(move || {
            let summary = analyze_video(video.path(), &models, &config);
            drop(video);
            summary
        })
        .await
        .map_err(|e| anyhow::anyhow!("Video analysis task failed: {}", e))
        .and_then(|summary| summary);

        self.finish_recording(meeting_id, analysis).await
    }

    /// Persist a recording's result, or mark the meeting failed when either
    /// the analysis or the final save errors.
    async fn finish_recording(
        &self,
        meeting_id: &str,
        analysis: anyhow::Result<EmotionSummary>,
    ) -> Result<EmotionSummary, EmotionError> {
        let saved = match analysis {
            Ok(summary) => {
                let records = summary.timeline.clone();
                let id = meeting_id.to_string();
                let minutes = (summary.duration_seconds / 60.0).round() as i64;
                self.db
                    .call(move |conn| EmotionRepository::save_final(conn, &id, &records, minutes))
                    .await
                    .map(|_| summary)
            }
            Err(e) => Err(e),
        };

        match saved {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!("Video analysis failed for meeting {}: {:#}", meeting_id, e);
                let id = meeting_id.to_string();
                if let Err(mark_err) = self
                    .db
                    .call(move |conn| MeetingRepository::transition(conn, &id, MeetingStatus::Failed))
                    .await
                {
                    error!("Failed to mark meeting {} as failed: {:#}", meeting_id, mark_err);
                }
                Err(EmotionError::Upstream(e))
            }
        }
    }

    pub async fn status(&self, meeting_id: &str) -> SessionStatus {
        let Some(session) = self.session(meeting_id) else {
            return SessionStatus {
                meeting_id: meeting_id.to_string(),
                running: false,
                session_id: None,
                frames_processed: 0,
                people_tracked: 0,
                elapsed_seconds: 0.0,
                started_at: None,
            };
        };

        let guard = session.lock().await;
        SessionStatus {
            meeting_id: meeting_id.to_string(),
            running: guard.phase == SessionPhase::Running,
            session_id: Some(guard.session_id.clone()),
            frames_processed: guard.analyzer.frames_processed(),
            people_tracked: guard.analyzer.people_tracked(),
            elapsed_seconds: guard.elapsed_secs(),
            started_at: Some(guard.started_at.to_rfc3339()),
        }
    }
}
