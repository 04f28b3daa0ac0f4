//! Per-session analysis state: tracking, per-person observations, flush
//! bookkeeping and the final summary.
//!
//! The analyzer is synchronous and does no I/O. Callers feed it the faces
//! read from each frame and decide what to do when a flush is due.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::EmotionConfig;
use crate::db::EmotionRecord;

use super::filter::{filter_false_positives, FilterConfig};
use super::scoring::distribution_score;
use super::sessions::{Observation, SpeakingSession, TrackedPerson};
use super::timeline::build_timeline;
use super::tracker::{PersonTracker, TrackerConfig};
use super::types::{FaceBox, FaceReading};

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub tracker: TrackerConfig,
    pub filter: FilterConfig,
    pub max_gap_frames: u64,
    pub flush_every_frames: u64,
    pub flush_interval_secs: f64,
    /// Duration credited to a frame with no predecessor
    pub nominal_frame_interval_secs: f64,
}

impl From<&EmotionConfig> for AnalyzerConfig {
    fn from(config: &EmotionConfig) -> Self {
        Self {
            tracker: TrackerConfig::from(config),
            filter: FilterConfig::from(config),
            max_gap_frames: config.max_gap_frames,
            flush_every_frames: config.flush_every_frames,
            flush_interval_secs: config.flush_interval_secs,
            nominal_frame_interval_secs: config.nominal_frame_interval_secs,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::from(&EmotionConfig::default())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonDetection {
    pub person_id: u32,
    pub emotion: String,
    pub confidence: f32,
    pub face: FaceBox,
}

/// What one processed frame produced.
#[derive(Debug, Clone, Serialize)]
pub struct FrameOutcome {
    pub frame_index: u64,
    pub timestamp: f64,
    pub faces_detected: usize,
    pub detections: Vec<PersonDetection>,
    pub people_tracked: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonSummary {
    pub person_id: u32,
    pub name: String,
    pub frame_count: usize,
    pub duration_seconds: f64,
    pub dominant_emotion: Option<String>,
    pub average_confidence: f32,
    pub emotion_distribution: BTreeMap<String, usize>,
    pub speaking_sessions: Vec<SpeakingSession>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmotionSummary {
    pub duration_seconds: f64,
    pub frames_processed: u64,
    /// People identified before false-positive filtering
    pub people_detected: usize,
    pub people: Vec<PersonSummary>,
    pub emotion_distribution: BTreeMap<String, usize>,
    /// 0..=10, see [`distribution_score`]
    pub overall_score: f64,
    pub timeline: Vec<EmotionRecord>,
}

#[derive(Debug)]
pub struct EmotionAnalyzer {
    config: AnalyzerConfig,
    tracker: PersonTracker,
    people: Vec<TrackedPerson>,
    frames_processed: u64,
    last_timestamp: Option<f64>,
    last_frame_duration: f64,
    frames_since_flush: u64,
    last_flush_at: f64,
}

impl EmotionAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            tracker: PersonTracker::new(config.tracker.clone()),
            config,
            people: Vec::new(),
            frames_processed: 0,
            last_timestamp: None,
            last_frame_duration: 0.0,
            frames_since_flush: 0,
            last_flush_at: 0.0,
        }
    }

    /// Record the faces read from one frame taken at `timestamp` seconds.
    ///
    /// Timestamps never move backwards; an earlier timestamp is treated as
    /// the previous one.
    pub fn ingest(&mut self, readings: &[FaceReading], timestamp: f64) -> FrameOutcome {
        let nominal = self.config.nominal_frame_interval_secs;
        let (timestamp, duration) = match self.last_timestamp {
            Some(last) if timestamp > last => (timestamp, timestamp - last),
            Some(last) => (last, nominal),
            None => (timestamp.max(0.0), nominal),
        };

        let frame_index = self.frames_processed;
        let faces: Vec<FaceBox> = readings.iter().map(|r| r.face).collect();
        let ids = self.tracker.assign(frame_index, &faces);

        let mut detections = Vec::new();
        for (reading, id) in readings.iter().zip(ids) {
            let Some(person_id) = id else {
                continue;
            };

            self.person_mut(person_id).record(Observation {
                frame_index,
                timestamp,
                duration,
                emotion: reading.emotion.clone(),
                confidence: reading.confidence,
            });
            detections.push(PersonDetection {
                person_id,
                emotion: reading.emotion.clone(),
                confidence: reading.confidence,
                face: reading.face,
            });
        }

        self.frames_processed += 1;
        self.frames_since_flush += 1;
        self.last_timestamp = Some(timestamp);
        self.last_frame_duration = duration;

        FrameOutcome {
            frame_index,
            timestamp,
            faces_detected: readings.len(),
            detections,
            people_tracked: self.tracker.active_count(frame_index),
        }
    }

    fn person_mut(&mut self, id: u32) -> &mut TrackedPerson {
        let index = match self.people.iter().position(|p| p.id == id) {
            Some(index) => index,
            None => {
                self.people
                    .push(TrackedPerson::new(id, self.config.max_gap_frames));
                self.people.len() - 1
            }
        };
        &mut self.people[index]
    }

    /// Whether enough frames or time have passed since the last flush.
    pub fn flush_due(&self) -> bool {
        if self.frames_since_flush == 0 {
            return false;
        }
        let now = self.last_timestamp.unwrap_or(0.0);
        self.frames_since_flush >= self.config.flush_every_frames
            || now - self.last_flush_at >= self.config.flush_interval_secs
    }

    pub fn mark_flushed(&mut self) {
        self.frames_since_flush = 0;
        self.last_flush_at = self.last_timestamp.unwrap_or(0.0);
    }

    /// Timeline over every person seen so far, before filtering.
    pub fn live_timeline(&self) -> Vec<EmotionRecord> {
        build_timeline(self.people.iter().flat_map(|p| p.observations()))
    }

    /// Seconds from session start to the end of the last processed frame.
    pub fn observed_duration(&self) -> f64 {
        self.last_timestamp
            .map(|t| t + self.last_frame_duration)
            .unwrap_or(0.0)
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// People active around the most recent frame.
    pub fn people_tracked(&self) -> usize {
        match self.frames_processed {
            0 => 0,
            n => self.tracker.active_count(n - 1),
        }
    }

    /// Filter, score and summarise a meeting of `duration` seconds.
    pub fn finalize(&self, duration: f64) -> EmotionSummary {
        let survivors = filter_false_positives(&self.people, duration, &self.config.filter);

        let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
        let mut people = Vec::with_capacity(survivors.len());

        for survivor in &survivors {
            let person = survivor.person;
            let mut histogram: BTreeMap<String, usize> = BTreeMap::new();
            for observation in person.observations() {
                *histogram.entry(observation.emotion.clone()).or_default() += 1;
                *distribution.entry(observation.emotion.clone()).or_default() += 1;
            }

            people.push(PersonSummary {
                person_id: survivor.person_id,
                name: survivor.name.clone(),
                frame_count: person.frame_count(),
                duration_seconds: person.total_duration(),
                dominant_emotion: person.dominant_emotion(),
                average_confidence: person.average_confidence(),
                emotion_distribution: histogram,
                speaking_sessions: person.speaking_sessions(),
            });
        }

        let timeline = build_timeline(survivors.iter().flat_map(|s| s.person.observations()));
        let overall_score = (distribution_score(&distribution) * 100.0).round() / 100.0;

        EmotionSummary {
            duration_seconds: duration,
            frames_processed: self.frames_processed,
            people_detected: self.people.len(),
            people,
            emotion_distribution: distribution,
            overall_score,
            timeline,
        }
    }
}
