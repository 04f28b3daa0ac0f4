//! API error handling for consistent JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::emotion::EmotionError;
use crate::meeting::ProcessError;

/// API error type that converts to JSON responses.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed ({}): {}", self.status, self.message);
        }
        let body = Json(json!({
            "error": true,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<EmotionError> for ApiError {
    fn from(err: EmotionError) -> Self {
        let status = match &err {
            EmotionError::NotRunning(_)
            | EmotionError::InvalidFrame(_)
            | EmotionError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            EmotionError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            EmotionError::Conflict(_) => StatusCode::CONFLICT,
            EmotionError::ModelUnavailable(_) | EmotionError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.user_message())
    }
}

impl From<ProcessError> for ApiError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::TranscriptNotFound => Self::not_found(err.to_string()),
            ProcessError::EmptyTranscript => Self::bad_request(err.to_string()),
            ProcessError::Failed(e) => Self::internal(format!("{:#}", e)),
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
