//! `quantum analyze-video`: one-shot emotion analysis of a local file.

use anyhow::{bail, Context, Result};
use tracing::info;

use super::AnalyzeVideoArgs;
use crate::config::Config;
use crate::emotion::video::analyze_video;
use crate::emotion::{describe_failure, VisionModels};

pub async fn handle_analyze_video_command(args: AnalyzeVideoArgs) -> Result<()> {
    if !args.path.is_file() {
        bail!("Video file not found: {}", args.path.display());
    }

    let mut config = Config::load()?;
    if let Some(fps) = args.fps {
        config.emotion.video_sample_fps = fps;
    }

    let models = VisionModels::load(&config.emotion)
        .map_err(|e| anyhow::anyhow!(describe_failure(&format!("{:#}", e))))?;

    info!("Analysing {}", args.path.display());
    let path = args.path.clone();
    let emotion_config = config.emotion.clone();
    let summary = tokio::task::spawn_blocking(move || analyze_video(&path, &models, &emotion_config))
        .await
        .context("Video analysis task failed")?
        .map_err(|e| anyhow::anyhow!(describe_failure(&format!("{:#}", e))))?;

    let output = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
    println!("{}", output);
    Ok(())
}
