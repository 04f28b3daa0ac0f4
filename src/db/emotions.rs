//! Emotion timeline persistence.
//!
//! Records are never appended: every save replaces the full set for a
//! meeting inside a single transaction.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::meetings::MeetingRepository;

/// One persisted emotion data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRecord {
    /// `MM:SS` offset from the start of the meeting
    pub timestamp: String,
    pub emotion: String,
    /// 0.0 to 1.0
    pub intensity: f64,
}

pub struct EmotionRepository;

impl EmotionRepository {
    /// Replace all emotion records of a meeting. Returns the number written.
    pub fn replace_for_meeting(
        conn: &Connection,
        meeting_id: &str,
        records: &[EmotionRecord],
    ) -> Result<usize> {
        let tx = conn
            .unchecked_transaction()
            .context("Failed to begin emotion transaction")?;
        let written = Self::write_records(&tx, meeting_id, records)?;
        tx.commit().context("Failed to commit emotions")?;
        Ok(written)
    }

    /// Store the final timeline and mark the meeting completed in one
    /// transaction. On error nothing is written.
    pub fn save_final(
        conn: &Connection,
        meeting_id: &str,
        records: &[EmotionRecord],
        duration_minutes: i64,
    ) -> Result<usize> {
        let tx = conn
            .unchecked_transaction()
            .context("Failed to begin emotion transaction")?;
        let written = Self::write_records(&tx, meeting_id, records)?;
        MeetingRepository::complete(&tx, meeting_id, duration_minutes)?;
        tx.commit().context("Failed to commit final emotions")?;
        Ok(written)
    }

    fn write_records(conn: &Connection, meeting_id: &str, records: &[EmotionRecord]) -> Result<usize> {
        conn.execute(
            "DELETE FROM emotions WHERE meeting_id = ?1",
            params![meeting_id],
        )
        .context("Failed to clear emotions")?;

        let mut stmt = conn
            .prepare(
                "INSERT INTO emotions (meeting_id, timestamp, emotion, intensity) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .context("Failed to prepare emotion insert")?;

        for record in records {
            stmt.execute(params![
                meeting_id,
                record.timestamp,
                record.emotion,
                record.intensity
            ])
            .context("Failed to insert emotion")?;
        }

        Ok(records.len())
    }

    /// All emotion records of a meeting in insertion order.
    pub fn list_for_meeting(conn: &Connection, meeting_id: &str) -> Result<Vec<EmotionRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT timestamp, emotion, intensity FROM emotions \
                 WHERE meeting_id = ?1 ORDER BY id ASC",
            )
            .context("Failed to prepare emotions query")?;

        let records = stmt
            .query_map(params![meeting_id], |row| {
                Ok(EmotionRecord {
                    timestamp: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    emotion: row
                        .get::<_, Option<String>>(1)?
                        .unwrap_or_else(|| "neutral".to_string()),
                    intensity: row.get::<_, Option<f64>>(2)?.unwrap_or(0.5),
                })
            })
            .context("Failed to query emotions")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to map emotions")?;

        Ok(records)
    }
}
