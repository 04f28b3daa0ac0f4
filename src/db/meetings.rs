//! Meeting record persistence.
//!
//! CRUD operations for the `meetings` table. Status changes go through
//! [`MeetingRepository::transition`], which rejects moves that
//! [`MeetingStatus::can_transition_to`] does not allow.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::meeting::status::MeetingStatus;

/// A meeting record from the database.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingRecord {
    pub id: i64,
    pub platform: String,
    pub meeting_id: String,
    pub title: Option<String>,
    pub date: Option<String>,
    /// Duration in minutes
    pub duration: Option<i64>,
    pub status: MeetingStatus,
    pub created_at: Option<String>,
}

/// Raised when a status change is not allowed.
#[derive(Debug, thiserror::Error)]
#[error("Meeting {meeting_id} cannot move from '{from}' to '{to}'")]
pub struct InvalidTransition {
    pub meeting_id: String,
    pub from: MeetingStatus,
    pub to: MeetingStatus,
}

/// Repository for meeting records.
pub struct MeetingRepository;

impl MeetingRepository {
    /// Insert a new meeting. Returns the row id.
    pub fn create(
        conn: &Connection,
        platform: &str,
        meeting_id: &str,
        title: Option<&str>,
        status: MeetingStatus,
    ) -> Result<i64> {
        conn.execute(
            "INSERT INTO meetings (platform, meeting_id, title, status) VALUES (?1, ?2, ?3, ?4)",
            params![platform, meeting_id, title, status.as_str()],
        )
        .context("Failed to insert meeting")?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a meeting by its external identifier.
    pub fn get(conn: &Connection, meeting_id: &str) -> Result<Option<MeetingRecord>> {
        let row = conn
            .query_row(
                "SELECT id, platform, meeting_id, title, date, duration, status, created_at \
                 FROM meetings WHERE meeting_id = ?1",
                params![meeting_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, Option<String>>(7)?,
                    ))
                },
            )
            .optional()
            .context("Failed to query meeting")?;

        let Some((id, platform, meeting_id, title, date, duration, status, created_at)) = row
        else {
            return Ok(None);
        };

        Ok(Some(MeetingRecord {
            id,
            platform,
            meeting_id,
            title,
            date,
            duration,
            status: MeetingStatus::parse(&status)?,
            created_at,
        }))
    }

    /// Current status, `NotProcessed` when the meeting is unknown.
    pub fn status(conn: &Connection, meeting_id: &str) -> Result<MeetingStatus> {
        Ok(Self::get(conn, meeting_id)?
            .map(|m| m.status)
            .unwrap_or(MeetingStatus::NotProcessed))
    }

    /// Move an existing meeting to `next`. Returns the previous status.
    pub fn transition(
        conn: &Connection,
        meeting_id: &str,
        next: MeetingStatus,
    ) -> Result<MeetingStatus> {
        let current = Self::status(conn, meeting_id)?;
        if !current.can_transition_to(next) || current == MeetingStatus::NotProcessed {
            return Err(InvalidTransition {
                meeting_id: meeting_id.to_string(),
                from: current,
                to: next,
            }
            .into());
        }

        conn.execute(
            "UPDATE meetings SET status = ?1 WHERE meeting_id = ?2",
            params![next.as_str(), meeting_id],
        )
        .context("Failed to update meeting status")?;

        Ok(current)
    }

    /// Move a meeting to `next`, creating it first when it does not exist.
    pub fn upsert_status(
        conn: &Connection,
        platform: &str,
        meeting_id: &str,
        title: Option<&str>,
        next: MeetingStatus,
    ) -> Result<MeetingStatus> {
        if Self::get(conn, meeting_id)?.is_none() {
            if !MeetingStatus::NotProcessed.can_transition_to(next) {
                return Err(InvalidTransition {
                    meeting_id: meeting_id.to_string(),
                    from: MeetingStatus::NotProcessed,
                    to: next,
                }
                .into());
            }
            let default_title = format!("Meeting {}", meeting_id);
            Self::create(
                conn,
                platform,
                meeting_id,
                Some(title.unwrap_or(&default_title)),
                next,
            )?;
            return Ok(MeetingStatus::NotProcessed);
        }

        Self::transition(conn, meeting_id, next)
    }

    /// Mark the meeting completed and record its duration in minutes.
    ///
    /// Finishing a live or recorded analysis always succeeds for a stored
    /// meeting, whatever its current status.
    pub fn complete(conn: &Connection, meeting_id: &str, duration_minutes: i64) -> Result<()> {
        let updated = conn
            .execute(
                "UPDATE meetings SET status = ?1, duration = ?2 WHERE meeting_id = ?3",
                params![MeetingStatus::Completed.as_str(), duration_minutes, meeting_id],
            )
            .context("Failed to complete meeting")?;

        if updated == 0 {
            bail!("Meeting {} not found", meeting_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_create_and_get_meeting() {
        let conn = setup_db();
        let id = MeetingRepository::create(
            &conn,
            "google_meet",
            "abc-defg-hij",
            Some("Standup"),
            MeetingStatus::Active,
        )
        .unwrap();
        assert!(id > 0);

        let meeting = MeetingRepository::get(&conn, "abc-defg-hij").unwrap().unwrap();
        assert_eq!(meeting.platform, "google_meet");
        assert_eq!(meeting.title, Some("Standup".to_string()));
        assert_eq!(meeting.status, MeetingStatus::Active);
        assert!(meeting.duration.is_none());
    }

    #[test]
    fn test_get_nonexistent_meeting() {
        let conn = setup_db();
        assert!(MeetingRepository::get(&conn, "missing").unwrap().is_none());
        assert_eq!(
            MeetingRepository::status(&conn, "missing").unwrap(),
            MeetingStatus::NotProcessed
        );
    }

    #[test]
    fn test_duplicate_meeting_id_rejected() {
        let conn = setup_db();
        MeetingRepository::create(&conn, "teams", "123", None, MeetingStatus::Active).unwrap();
        assert!(
            MeetingRepository::create(&conn, "teams", "123", None, MeetingStatus::Active).is_err()
        );
    }

    #[test]
    fn test_upsert_creates_with_default_title() {
        let conn = setup_db();
        let previous = MeetingRepository::upsert_status(
            &conn,
            "google_meet",
            "xyz",
            None,
            MeetingStatus::Processing,
        )
        .unwrap();
        assert_eq!(previous, MeetingStatus::NotProcessed);

        let meeting = MeetingRepository::get(&conn, "xyz").unwrap().unwrap();
        assert_eq!(meeting.title, Some("Meeting xyz".to_string()));
        assert_eq!(meeting.status, MeetingStatus::Processing);
    }

    #[test]
    fn test_upsert_transitions_existing() {
        let conn = setup_db();
        MeetingRepository::create(&conn, "teams", "m1", None, MeetingStatus::Completed).unwrap();

        let previous =
            MeetingRepository::upsert_status(&conn, "teams", "m1", None, MeetingStatus::Active)
                .unwrap();
        assert_eq!(previous, MeetingStatus::Completed);
        assert_eq!(
            MeetingRepository::status(&conn, "m1").unwrap(),
            MeetingStatus::Active
        );
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let conn = setup_db();
        MeetingRepository::create(&conn, "teams", "m1", None, MeetingStatus::Processing).unwrap();

        let err = MeetingRepository::transition(&conn, "m1", MeetingStatus::Active).unwrap_err();
        assert!(err.downcast_ref::<InvalidTransition>().is_some());
        assert_eq!(
            MeetingRepository::status(&conn, "m1").unwrap(),
            MeetingStatus::Processing
        );
    }

    #[test]
    fn test_transition_unknown_meeting_rejected() {
        let conn = setup_db();
        assert!(MeetingRepository::transition(&conn, "nope", MeetingStatus::Completed).is_err());
    }

    #[test]
    fn test_complete_records_duration() {
        let conn = setup_db();
        MeetingRepository::create(&conn, "teams", "m1", None, MeetingStatus::Active).unwrap();

        MeetingRepository::complete(&conn, "m1", 42).unwrap();

        let meeting = MeetingRepository::get(&conn, "m1").unwrap().unwrap();
        assert_eq!(meeting.status, MeetingStatus::Completed);
        assert_eq!(meeting.duration, Some(42));
    }

    #[test]
    fn test_complete_from_failed() {
        let conn = setup_db();
        MeetingRepository::create(&conn, "teams", "m1", None, MeetingStatus::Failed).unwrap();

        MeetingRepository::complete(&conn, "m1", 5).unwrap();

        let meeting = MeetingRepository::get(&conn, "m1").unwrap().unwrap();
        assert_eq!(meeting.status, MeetingStatus::Completed);
        assert_eq!(meeting.duration, Some(5));
    }

    #[test]
    fn test_complete_unknown_meeting_rejected() {
        let conn = setup_db();
        assert!(MeetingRepository::complete(&conn, "nope", 1).is_err());
    }
}
