use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmotionError {
    #[error("Emotion analysis is not running for meeting {0}")]
    NotRunning(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("File too large. Maximum size is {limit_mb}MB")]
    UploadTooLarge { limit_mb: u64 },

    #[error("Emotion analysis unavailable: {0}")]
    ModelUnavailable(String),

    /// The meeting is in a status that does not allow this operation.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl EmotionError {
    /// Message for API clients, with known failure causes spelled out.
    pub fn user_message(&self) -> String {
        match self {
            Self::ModelUnavailable(reason) => describe_failure(reason),
            Self::Upstream(e) => describe_failure(&format!("{:#}", e)),
            other => other.to_string(),
        }
    }
}

/// Rewrite low-level failure text into an actionable message.
pub fn describe_failure(message: &str) -> String {
    let lower = message.to_lowercase();

    if lower.contains("model file not found")
        || (lower.contains("no such file") && lower.contains("model"))
    {
        return format!(
            "Emotion model file not found. Set emotion.model_path or {} to a valid model artifact. ({})",
            crate::config::env_keys::EMOTION_MODEL_PATH,
            message
        );
    }

    if lower.contains("ffmpeg") && (lower.contains("not found") || lower.contains("no such file")) {
        return "FFmpeg is required for video analysis but was not found. Install FFmpeg and make sure it is in PATH.".to_string();
    }

    if lower.contains("vision command") && lower.contains("not found") {
        return format!(
            "Vision library not available. Install the vision command or set emotion.vision_command. ({})",
            message
        );
    }

    if lower.contains("too large") {
        return format!("File too large. {}", message);
    }

    message.to_string()
}
