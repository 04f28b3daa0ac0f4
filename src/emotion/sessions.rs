//! Per-person observations grouped into speaking sessions.
//!
//! A speaking session is a run of observations without a detection gap
//! longer than `max_gap_frames`. Face-tracking continuity stands in for
//! actual speech detection.

use serde::Serialize;

/// One classified sighting of a person.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub frame_index: u64,
    /// Seconds since the session started
    pub timestamp: f64,
    /// Seconds of meeting time this frame stands for
    pub duration: f64,
    pub emotion: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakingSession {
    pub start_time: f64,
    pub end_time: f64,
    pub dominant_emotion: String,
    pub average_confidence: f32,
    pub frame_count: usize,
}

impl SpeakingSession {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Most frequent label; ties go to the label seen first.
pub fn dominant_label<'a, I>(labels: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (label, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label.to_string())
}

fn build_session(observations: &[Observation]) -> Option<SpeakingSession> {
    let first = observations.first()?;
    let last = observations.last()?;

    let confidence_sum: f32 = observations.iter().map(|o| o.confidence).sum();

    Some(SpeakingSession {
        start_time: first.timestamp,
        end_time: last.timestamp + last.duration,
        dominant_emotion: dominant_label(observations.iter().map(|o| o.emotion.as_str()))?,
        average_confidence: confidence_sum / observations.len() as f32,
        frame_count: observations.len(),
    })
}

/// A person followed through one analysis session.
#[derive(Debug, Clone)]
pub struct TrackedPerson {
    pub id: u32,
    observations: Vec<Observation>,
    /// Start index into `observations` of each speaking session
    session_starts: Vec<usize>,
    max_gap_frames: u64,
}

impl TrackedPerson {
    pub fn new(id: u32, max_gap_frames: u64) -> Self {
        Self {
            id,
            observations: Vec::new(),
            session_starts: Vec::new(),
            max_gap_frames,
        }
    }

    pub fn record(&mut self, observation: Observation) {
        let continues = self.observations.last().is_some_and(|last| {
            observation.frame_index.saturating_sub(last.frame_index) <= self.max_gap_frames
        });
        if !continues {
            self.session_starts.push(self.observations.len());
        }
        self.observations.push(observation);
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn frame_count(&self) -> usize {
        self.observations.len()
    }

    /// Sessions in start order, the last one possibly still open.
    pub fn speaking_sessions(&self) -> Vec<SpeakingSession> {
        self.session_starts
            .iter()
            .enumerate()
            .filter_map(|(i, &start)| {
                let end = self
                    .session_starts
                    .get(i + 1)
                    .copied()
                    .unwrap_or(self.observations.len());
                build_session(&self.observations[start..end])
            })
            .collect()
    }

    /// Total seconds covered by this person's speaking sessions.
    pub fn total_duration(&self) -> f64 {
        self.speaking_sessions().iter().map(|s| s.duration()).sum()
    }

    pub fn dominant_emotion(&self) -> Option<String> {
        dominant_label(self.observations.iter().map(|o| o.emotion.as_str()))
    }

    pub fn average_confidence(&self) -> f32 {
        if self.observations.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.observations.iter().map(|o| o.confidence).sum();
        sum / self.observations.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(frame_index: u64, timestamp: f64, emotion: &str, confidence: f32) -> Observation {
        Observation {
            frame_index,
            timestamp,
            duration: 0.5,
            emotion: emotion.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_dominant_label_mode_and_ties() {
        assert_eq!(
            dominant_label(["sad", "happy", "happy"]),
            Some("happy".to_string())
        );
        assert_eq!(
            dominant_label(["neutral", "happy", "happy", "neutral"]),
            Some("neutral".to_string())
        );
        assert_eq!(dominant_label(Vec::<&str>::new()), None);
    }

    #[test]
    fn test_contiguous_frames_form_one_session() {
        let mut person = TrackedPerson::new(1, 2);
        person.record(obs(0, 0.0, "happy", 0.8));
        person.record(obs(1, 0.5, "happy", 0.6));
        person.record(obs(3, 1.5, "sad", 0.4));

        let sessions = person.speaking_sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].start_time, 0.0);
        assert_eq!(sessions[0].end_time, 2.0);
        assert_eq!(sessions[0].dominant_emotion, "happy");
        assert!((sessions[0].average_confidence - 0.6).abs() < 1e-6);
        assert_eq!(sessions[0].frame_count, 3);
    }

    #[test]
    fn test_gap_splits_sessions() {
        let mut person = TrackedPerson::new(1, 2);
        person.record(obs(0, 0.0, "happy", 0.9));
        person.record(obs(1, 0.5, "happy", 0.9));
        person.record(obs(4, 2.0, "sad", 0.5));
        person.record(obs(5, 2.5, "sad", 0.5));

        let sessions = person.speaking_sessions();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].end_time, 1.0);
        assert_eq!(sessions[1].start_time, 2.0);
        assert_eq!(sessions[1].dominant_emotion, "sad");

        // Non-overlapping and ordered
        assert!(sessions[0].end_time <= sessions[1].start_time);
        assert!((person.total_duration() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_end_time_uses_last_frame_duration() {
        let mut person = TrackedPerson::new(1, 2);
        person.record(Observation {
            duration: 0.2,
            ..obs(0, 1.0, "neutral", 0.5)
        });
        assert!((person.speaking_sessions()[0].end_time - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_person_aggregates() {
        let mut person = TrackedPerson::new(7, 2);
        assert_eq!(person.dominant_emotion(), None);
        assert_eq!(person.average_confidence(), 0.0);

        person.record(obs(0, 0.0, "surprise", 1.0));
        person.record(obs(1, 0.5, "happy", 0.5));
        assert_eq!(person.frame_count(), 2);
        assert_eq!(person.dominant_emotion(), Some("surprise".to_string()));
        assert!((person.average_confidence() - 0.75).abs() < 1e-6);
    }
}
