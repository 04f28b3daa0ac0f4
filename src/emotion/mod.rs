//! Real-time emotion analysis.
//!
//! Frames flow through decode, face detection and classification
//! ([`vision`]), person tracking ([`tracker`]), per-person speaking sessions
//! ([`sessions`]) and finally filtering, scoring and the persisted timeline
//! ([`analyzer`]). [`manager`] owns the live per-meeting sessions and
//! [`video`] runs the same pipeline over a recorded file.

pub mod analyzer;
pub mod error;
pub mod filter;
pub mod frame;
pub mod manager;
pub mod scoring;
pub mod sessions;
pub mod timeline;
pub mod tracker;
pub mod types;
pub mod video;
pub mod vision;

pub use analyzer::{EmotionAnalyzer, EmotionSummary, FrameOutcome, PersonSummary};
pub use error::{describe_failure, EmotionError};
pub use manager::{EmotionSessionManager, SessionStatus, StartOutcome};
pub use scoring::{distribution_score, intensity_score};
pub use types::{Classification, FaceBox, FaceReading};
pub use vision::{EmotionClassifier, FaceDetector, SidecarVision, VisionHandle, VisionModels};
