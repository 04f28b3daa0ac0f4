//! Meeting status values and the transitions allowed between them.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Persisted processing status of a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Active,
    Processing,
    Completed,
    Failed,
    /// Reported for meetings without a stored row; never written.
    NotProcessed,
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::NotProcessed => "not_processed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(Self::Active),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "not_processed" => Ok(Self::NotProcessed),
            _ => bail!("Invalid meeting status: {}", s),
        }
    }

    /// Whether a stored meeting may move from `self` to `next`.
    ///
    /// Re-setting the current status is always allowed. Finished meetings may
    /// be restarted (live analysis) or reprocessed (batch), but a meeting in
    /// batch processing can only finish.
    pub fn can_transition_to(&self, next: MeetingStatus) -> bool {
        use MeetingStatus::*;

        if *self == next {
            return next != NotProcessed;
        }

        match (self, next) {
            (NotProcessed, Active | Processing) => true,
            (Active, Processing | Completed | Failed) => true,
            (Processing, Completed | Failed) => true,
            (Completed | Failed, Active | Processing) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meeting_status_as_str() {
        assert_eq!(MeetingStatus::Active.as_str(), "active");
        assert_eq!(MeetingStatus::Processing.as_str(), "processing");
        assert_eq!(MeetingStatus::Completed.as_str(), "completed");
        assert_eq!(MeetingStatus::Failed.as_str(), "failed");
        assert_eq!(MeetingStatus::NotProcessed.as_str(), "not_processed");
    }

    #[test]
    fn test_meeting_status_parse() {
        assert_eq!(
            MeetingStatus::parse("processing").unwrap(),
            MeetingStatus::Processing
        );
        assert!(MeetingStatus::parse("recording").is_err());
    }

    #[test]
    fn test_meeting_status_serialization() {
        let json = serde_json::to_string(&MeetingStatus::NotProcessed).unwrap();
        assert_eq!(json, "\"not_processed\"");

        let parsed: MeetingStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, MeetingStatus::Completed);
    }

    #[test]
    fn test_live_analysis_transitions() {
        assert!(MeetingStatus::NotProcessed.can_transition_to(MeetingStatus::Active));
        assert!(MeetingStatus::Active.can_transition_to(MeetingStatus::Completed));
        assert!(MeetingStatus::Completed.can_transition_to(MeetingStatus::Active));
    }

    #[test]
    fn test_batch_transitions() {
        assert!(MeetingStatus::Completed.can_transition_to(MeetingStatus::Processing));
        assert!(MeetingStatus::Processing.can_transition_to(MeetingStatus::Failed));
        assert!(MeetingStatus::Processing.can_transition_to(MeetingStatus::Processing));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!MeetingStatus::Processing.can_transition_to(MeetingStatus::Active));
        assert!(!MeetingStatus::Completed.can_transition_to(MeetingStatus::Failed));
        assert!(!MeetingStatus::NotProcessed.can_transition_to(MeetingStatus::Completed));
        assert!(!MeetingStatus::Active.can_transition_to(MeetingStatus::NotProcessed));
        assert!(!MeetingStatus::NotProcessed.can_transition_to(MeetingStatus::NotProcessed));
    }
}
