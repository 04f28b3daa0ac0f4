//! Engagement scores.
//!
//! Two separate scales exist and must not be mixed:
//! [`distribution_score`] rates the label distribution of a video analysis
//! on 0..=10, [`intensity_score`] rates transcript-derived emotion points
//! weighted by their intensity.

use std::collections::BTreeMap;

fn distribution_weight(label: &str) -> f64 {
    match label {
        "happy" => 0.9,
        "neutral" => 0.6,
        "sad" => 0.3,
        "angry" => 0.2,
        "fear" => 0.3,
        "surprise" => 0.7,
        "disgust" => 0.2,
        _ => 0.5,
    }
}

fn intensity_weight(label: &str) -> f64 {
    match label {
        "happy" => 9.0,
        "neutral" => 7.0,
        "concerned" => 5.0,
        "frustrated" => 3.0,
        _ => 7.0,
    }
}

/// Score a label histogram on 0..=10. An empty histogram scores 5.0.
pub fn distribution_score(counts: &BTreeMap<String, usize>) -> f64 {
    let total: usize = counts.values().sum();
    if total == 0 {
        return 5.0;
    }

    let weighted: f64 = counts
        .iter()
        .map(|(label, &count)| distribution_weight(label) * count as f64)
        .sum();

    (weighted / total as f64 * 10.0).clamp(0.0, 10.0)
}

/// Intensity-weighted mean of `(label, intensity)` points, one decimal.
///
/// `None` labels count as neutral. No points, or a zero total intensity,
/// score 7.0.
pub fn intensity_score<'a, I>(points: I) -> f64
where
    I: IntoIterator<Item = (Option<&'a str>, f64)>,
{
    let mut weighted = 0.0;
    let mut total_intensity = 0.0;

    for (label, intensity) in points {
        weighted += intensity_weight(label.unwrap_or("neutral")) * intensity;
        total_intensity += intensity;
    }

    if total_intensity == 0.0 {
        return 7.0;
    }

    (weighted / total_intensity * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram(entries: &[(&str, usize)]) -> BTreeMap<String, usize> {
        entries
            .iter()
            .map(|(label, count)| (label.to_string(), *count))
            .collect()
    }

    #[test]
    fn test_distribution_empty_is_neutral_midpoint() {
        assert_eq!(distribution_score(&BTreeMap::new()), 5.0);
        assert_eq!(distribution_score(&histogram(&[("happy", 0)])), 5.0);
    }

    #[test]
    fn test_distribution_weighted_mean() {
        assert!((distribution_score(&histogram(&[("happy", 10)])) - 9.0).abs() < 1e-9);
        // (0.9 * 1 + 0.2 * 1) / 2 * 10
        let score = distribution_score(&histogram(&[("happy", 1), ("angry", 1)]));
        assert!((score - 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_unknown_label() {
        let score = distribution_score(&histogram(&[("contempt", 4)]));
        assert!((score - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_always_in_range() {
        let labels = [
            "happy", "neutral", "sad", "angry", "fear", "surprise", "disgust", "other",
        ];
        for (i, label) in labels.iter().enumerate() {
            for (j, other) in labels.iter().enumerate() {
                let score = distribution_score(&histogram(&[(*label, i + 1), (*other, j * 7)]));
                assert!((0.0..=10.0).contains(&score), "{label}/{other}: {score}");
            }
        }
    }

    #[test]
    fn test_intensity_defaults() {
        assert_eq!(intensity_score(Vec::new()), 7.0);
        assert_eq!(intensity_score([(Some("happy"), 0.0)]), 7.0);
    }

    #[test]
    fn test_intensity_single_point() {
        assert_eq!(intensity_score([(Some("happy"), 1.0)]), 9.0);
        assert_eq!(intensity_score([(None, 0.3)]), 7.0);
        assert_eq!(intensity_score([(Some("excited"), 0.3)]), 7.0);
    }

    #[test]
    fn test_intensity_weighted_and_rounded() {
        // (9 * 0.5 + 3 * 0.25) / 0.75 = 7.0
        assert_eq!(
            intensity_score([(Some("happy"), 0.5), (Some("frustrated"), 0.25)]),
            7.0
        );
        // (5 * 0.2 + 9 * 0.1) / 0.3 = 6.333..
        assert_eq!(
            intensity_score([(Some("concerned"), 0.2), (Some("happy"), 0.1)]),
            6.3
        );
    }
}
