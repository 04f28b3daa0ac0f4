//! Ten-second emotion timeline used for persistence.

use std::collections::BTreeMap;

use crate::db::EmotionRecord;

use super::sessions::{dominant_label, Observation};

pub const BUCKET_SECONDS: f64 = 10.0;

/// `MM:SS` for an offset in seconds. Minutes are not wrapped at 60.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// One record per 10-second window, sorted by window start.
///
/// Each record carries the window's dominant label and the mean confidence
/// of all observations in it.
pub fn build_timeline<'a, I>(observations: I) -> Vec<EmotionRecord>
where
    I: IntoIterator<Item = &'a Observation>,
{
    let mut buckets: BTreeMap<u64, Vec<&Observation>> = BTreeMap::new();
    for observation in observations {
        let bucket = (observation.timestamp.max(0.0) / BUCKET_SECONDS).floor() as u64;
        buckets.entry(bucket).or_default().push(observation);
    }

    buckets
        .into_iter()
        .filter_map(|(bucket, mut entries)| {
            entries.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

            let emotion = dominant_label(entries.iter().map(|o| o.emotion.as_str()))?;
            let mean = entries.iter().map(|o| o.confidence as f64).sum::<f64>()
                / entries.len() as f64;

            Some(EmotionRecord {
                timestamp: format_timestamp(bucket as f64 * BUCKET_SECONDS),
                emotion,
                intensity: (mean * 1000.0).round() / 1000.0,
            })
        })
        .collect()
}
