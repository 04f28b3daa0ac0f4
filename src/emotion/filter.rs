//! Drops people that were only briefly or sporadically detected.

use tracing::debug;

use crate::config::EmotionConfig;

use super::sessions::TrackedPerson;

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub min_frames: usize,
    /// Absolute floor in seconds
    pub min_duration_secs: f64,
    /// Fraction of the meeting duration
    pub min_duration_ratio: f64,
}

impl From<&EmotionConfig> for FilterConfig {
    fn from(config: &EmotionConfig) -> Self {
        Self {
            min_frames: config.min_frames,
            min_duration_secs: config.min_duration_secs,
            min_duration_ratio: config.min_duration_ratio,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::from(&EmotionConfig::default())
    }
}

impl FilterConfig {
    pub fn min_duration(&self, meeting_duration: f64) -> f64 {
        (self.min_duration_ratio * meeting_duration).max(self.min_duration_secs)
    }
}

/// A person kept by the filter, renumbered for presentation.
#[derive(Debug)]
pub struct Survivor<'a> {
    pub person_id: u32,
    pub name: String,
    pub person: &'a TrackedPerson,
}

/// Keep people with enough frames and enough speaking time.
///
/// Survivors keep their relative order and are numbered from 1.
pub fn filter_false_positives<'a>(
    people: &'a [TrackedPerson],
    meeting_duration: f64,
    config: &FilterConfig,
) -> Vec<Survivor<'a>> {
    let min_duration = config.min_duration(meeting_duration);

    people
        .iter()
        .filter(|person| {
            let frames = person.frame_count();
            let duration = person.total_duration();
            let keep = frames >= config.min_frames && duration >= min_duration;
            if !keep {
                debug!(
                    "Dropping person {}: {} frames, {:.1}s (need {} frames, {:.1}s)",
                    person.id, frames, duration, config.min_frames, min_duration
                );
            }
            keep
        })
        .enumerate()
        .map(|(i, person)| {
            let person_id = i as u32 + 1;
            Survivor {
                person_id,
                name: format!("Person {}", person_id),
                person,
            }
        })
        .collect()
}
