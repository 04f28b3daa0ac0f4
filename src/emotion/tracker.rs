//! Frame-to-frame person association.
//!
//! Faces are matched to people seen in the last few processed frames by
//! overlap or centroid proximity. Identifiers are only stable inside one
//! analysis session.

use std::collections::HashSet;

use crate::config::EmotionConfig;

use super::types::FaceBox;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub max_people: usize,
    pub min_face_size: u32,
    pub iou_threshold: f32,
    /// Multiple of the face diagonal
    pub max_centroid_distance: f32,
    pub lookback_frames: u64,
}

impl From<&EmotionConfig> for TrackerConfig {
    fn from(config: &EmotionConfig) -> Self {
        Self {
            max_people: config.max_people,
            min_face_size: config.min_face_size,
            iou_threshold: config.iou_threshold,
            max_centroid_distance: config.max_centroid_distance,
            lookback_frames: config.lookback_frames,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::from(&EmotionConfig::default())
    }
}

#[derive(Debug, Clone)]
struct Track {
    id: u32,
    last_box: FaceBox,
    last_frame: u64,
}

#[derive(Debug)]
pub struct PersonTracker {
    config: TrackerConfig,
    tracks: Vec<Track>,
    next_id: u32,
}

impl PersonTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            next_id: 1,
        }
    }

    /// Assign person ids to the faces of frame `frame_index`.
    ///
    /// Returns one entry per input face, `None` for faces that were too small
    /// or arrived while the active-person cap was reached.
    pub fn assign(&mut self, frame_index: u64, faces: &[FaceBox]) -> Vec<Option<u32>> {
        let mut assigned = vec![None; faces.len()];

        let mut order: Vec<usize> = (0..faces.len())
            .filter(|&i| faces[i].is_at_least(self.config.min_face_size))
            .collect();
        order.sort_by(|&a, &b| faces[b].area().total_cmp(&faces[a].area()));

        let mut claimed: HashSet<u32> = HashSet::new();

        for index in order {
            let face = faces[index];

            match self.best_match(frame_index, &face, &claimed) {
                Some(track_index) => {
                    let track = &mut self.tracks[track_index];
                    track.last_box = face;
                    track.last_frame = frame_index;
                    claimed.insert(track.id);
                    assigned[index] = Some(track.id);
                }
                None => {
                    if self.active_count(frame_index) >= self.config.max_people {
                        continue;
                    }
                    let id = self.next_id;
                    self.next_id += 1;
                    self.tracks.push(Track {
                        id,
                        last_box: face,
                        last_frame: frame_index,
                    });
                    claimed.insert(id);
                    assigned[index] = Some(id);
                }
            }
        }

        assigned
    }

    fn best_match(&self, frame_index: u64, face: &FaceBox, claimed: &HashSet<u32>) -> Option<usize> {
        let limit = self.config.max_centroid_distance * face.diagonal();

        self.tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| !claimed.contains(&track.id))
            .filter(|(_, track)| self.is_active(track, frame_index))
            .filter_map(|(i, track)| {
                let distance = track.last_box.centroid_distance(face);
                let overlaps = track.last_box.iou(face) >= self.config.iou_threshold;
                (overlaps || distance <= limit).then_some((i, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    fn is_active(&self, track: &Track, frame_index: u64) -> bool {
        frame_index.saturating_sub(track.last_frame) <= self.config.lookback_frames
    }

    /// People seen within the lookback window of `frame_index`.
    pub fn active_count(&self, frame_index: u64) -> usize {
        self.tracks
            .iter()
            .filter(|track| self.is_active(track, frame_index))
            .count()
    }

    /// Every person ever identified, active or not.
    pub fn people_seen(&self) -> usize {
        self.tracks.len()
    }
}
