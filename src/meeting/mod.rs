//! Meeting lifecycle and post-meeting processing.

pub mod processor;
pub mod status;

pub use processor::{parse_transcript, MeetingProcessor, ProcessError, ProcessOutcome};
pub use status::MeetingStatus;
