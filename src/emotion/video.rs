//! Stateless emotion analysis of a recorded video.
//!
//! FFmpeg samples frames into a temporary directory which is removed when
//! the analysis returns, whatever the outcome.

use anyhow::{bail, Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

use crate::config::EmotionConfig;

use super::analyzer::{AnalyzerConfig, EmotionAnalyzer, EmotionSummary};
use super::frame::decode_frame;
use super::vision::VisionModels;

/// Check if FFmpeg is available on the system.
pub fn check_ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Sample `fps` frames per second of `input` as PNG files into `out_dir`.
///
/// Returns the frame paths in playback order.
pub fn extract_frames(input: &Path, fps: f64, out_dir: &Path) -> Result<Vec<PathBuf>> {
    if !check_ffmpeg_available() {
        bail!(
            "FFmpeg is required for video analysis but was not found.\n\
             Install FFmpeg:\n\
             - macOS: brew install ffmpeg\n\
             - Ubuntu/Debian: sudo apt install ffmpeg\n\
             - Arch: sudo pacman -S ffmpeg"
        );
    }
    if fps <= 0.0 {
        bail!("Sample rate must be positive, got {}", fps);
    }

    // -vf fps=N: resample to N frames per second
    // -vsync vfr: do not duplicate frames to fill gaps
    let output = Command::new("ffmpeg")
        .arg("-i")
        .arg(input)
        .args(["-vf", &format!("fps={}", fps)])
        .args(["-vsync", "vfr"])
        .args(["-loglevel", "error"])
        .args(["-y"])
        .arg(out_dir.join("frame_%06d.png"))
        .output()
        .context("Failed to run FFmpeg")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("FFmpeg frame extraction failed: {}", stderr.trim());
    }

    let mut frames: Vec<PathBuf> = std::fs::read_dir(out_dir)
        .context("Failed to list extracted frames")?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .collect();
    frames.sort();

    debug!("Extracted {} frames from {:?}", frames.len(), input);
    Ok(frames)
}

/// Run decoded frames sampled at `fps` through a fresh analyzer.
pub fn analyze_frames<I>(
    frames: I,
    fps: f64,
    models: &VisionModels,
    config: &EmotionConfig,
) -> Result<EmotionSummary>
where
    I: IntoIterator<Item = RgbImage>,
{
    let mut analyzer_config = AnalyzerConfig::from(config);
    analyzer_config.nominal_frame_interval_secs = 1.0 / fps;
    let mut analyzer = EmotionAnalyzer::new(analyzer_config);

    let mut count = 0u64;
    for (index, frame) in frames.into_iter().enumerate() {
        let readings = models
            .read_faces(&frame)
            .with_context(|| format!("Failed to analyse frame {}", index))?;
        analyzer.ingest(&readings, index as f64 / fps);
        count += 1;
    }

    let duration = count as f64 / fps;
    Ok(analyzer.finalize(duration))
}

/// Analyse a video file end to end.
pub fn analyze_video(
    input: &Path,
    models: &VisionModels,
    config: &EmotionConfig,
) -> Result<EmotionSummary> {
    let fps = config.video_sample_fps;
    let work_dir = tempfile::Builder::new()
        .prefix("quantum-frames-")
        .tempdir()
        .context("Failed to create frame directory")?;

    let paths = extract_frames(input, fps, work_dir.path())?;
    if paths.is_empty() {
        bail!("No frames could be extracted from the video");
    }

    let frames = paths.iter().filter_map(|path| {
        let decoded = std::fs::read(path)
            .context("Failed to read frame")
            .and_then(|bytes| decode_frame(&bytes));
        match decoded {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Skipping unreadable frame {:?}: {:#}", path, e);
                None
            }
        }
    });

    let summary = analyze_frames(frames, fps, models, config)?;
    info!(
        "Analysed {:?}: {} frames, {:.1}s, {} people, score {:.2}",
        input,
        summary.frames_processed,
        summary.duration_seconds,
        summary.people.len(),
        summary.overall_score
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::types::{Classification, FaceBox};
    use crate::emotion::vision::{EmotionClassifier, FaceDetector};
    use image::Rgb;
    use std::sync::Arc;

    /// Finds a face wherever the frame has a bright pixel at the origin.
    struct MarkerDetector;

    impl FaceDetector for MarkerDetector {
        fn detect(&self, frame: &RgbImage) -> Result<Vec<FaceBox>> {
            if frame.get_pixel(0, 0)[0] > 128 {
                Ok(vec![FaceBox::new(0, 0, 64, 64)])
            } else {
                Ok(vec![])
            }
        }
    }

    struct Neutral;

    impl EmotionClassifier for Neutral {
        fn classify(&self, _face: &RgbImage) -> Result<Classification> {
            Ok(Classification {
                emotion: "neutral".to_string(),
                confidence: 0.6,
            })
        }
    }

    fn models() -> VisionModels {
        VisionModels::new(Arc::new(MarkerDetector), Arc::new(Neutral))
    }

    fn frames(with_face: usize, without_face: usize) -> Vec<RgbImage> {
        let bright = RgbImage::from_pixel(128, 128, Rgb([255, 255, 255]));
        let dark = RgbImage::new(128, 128);
        std::iter::repeat(bright)
            .take(with_face)
            .chain(std::iter::repeat(dark).take(without_face))
            .collect()
    }

    #[test]
    fn test_analyze_frames_duration_from_sample_rate() {
        let summary = analyze_frames(frames(40, 10), 5.0, &models(), &EmotionConfig::default())
            .unwrap();

        assert_eq!(summary.frames_processed, 50);
        assert!((summary.duration_seconds - 10.0).abs() < 1e-9);
        assert_eq!(summary.people.len(), 1);
        assert_eq!(summary.people[0].frame_count, 40);
        assert!((summary.people[0].duration_seconds - 8.0).abs() < 1e-9);
        assert_eq!(summary.overall_score, 6.0);
    }

    #[test]
    fn test_analyze_frames_drops_brief_faces() {
        let summary = analyze_frames(frames(10, 40), 5.0, &models(), &EmotionConfig::default())
            .unwrap();
        assert_eq!(summary.people_detected, 1);
        assert!(summary.people.is_empty());
        assert_eq!(summary.overall_score, 5.0);
    }

    #[test]
    fn test_analyze_frames_empty_input() {
        let summary =
            analyze_frames(Vec::new(), 5.0, &models(), &EmotionConfig::default()).unwrap();
        assert_eq!(summary.frames_processed, 0);
        assert_eq!(summary.duration_seconds, 0.0);
        assert!(summary.timeline.is_empty());
    }

    #[test]
    fn test_extract_frames_rejects_missing_input() {
        if !check_ffmpeg_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let result = extract_frames(Path::new("/nonexistent/video.mp4"), 5.0, dir.path());
        assert!(result.is_err());
    }
}
