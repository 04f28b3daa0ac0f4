//! Persistence for the batch-processing outputs: transcript segments,
//! summaries, action items and participants.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptRecord {
    pub speaker: Option<String>,
    pub timestamp: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub summary: String,
    pub key_points: Vec<String>,
    pub decisions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionItemRecord {
    pub id: i64,
    pub task: String,
    pub owner: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantRecord {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

pub struct TranscriptRepository;

impl TranscriptRepository {
    pub fn replace_for_meeting(
        conn: &Connection,
        meeting_id: &str,
        segments: &[TranscriptRecord],
    ) -> Result<()> {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM transcripts WHERE meeting_id = ?1",
            params![meeting_id],
        )
        .context("Failed to clear transcripts")?;

        for segment in segments {
            tx.execute(
                "INSERT INTO transcripts (meeting_id, speaker, timestamp, text) VALUES (?1, ?2, ?3, ?4)",
                params![meeting_id, segment.speaker, segment.timestamp, segment.text],
            )
            .context("Failed to insert transcript segment")?;
        }

        tx.commit().context("Failed to commit transcripts")?;
        Ok(())
    }

    pub fn list_for_meeting(conn: &Connection, meeting_id: &str) -> Result<Vec<TranscriptRecord>> {
        let mut stmt = conn.prepare(
            "SELECT speaker, timestamp, text FROM transcripts WHERE meeting_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![meeting_id], |row| {
                Ok(TranscriptRecord {
                    speaker: row.get(0)?,
                    timestamp: row.get(1)?,
                    text: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to list transcripts")?;
        Ok(rows)
    }
}

pub struct SummaryRepository;

impl SummaryRepository {
    /// Insert or update the single summary row of a meeting.
    pub fn upsert(conn: &Connection, meeting_id: &str, summary: &SummaryRecord) -> Result<()> {
        conn.execute(
            "INSERT INTO summaries (meeting_id, summary, key_points, decisions) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(meeting_id) DO UPDATE SET \
             summary = excluded.summary, key_points = excluded.key_points, decisions = excluded.decisions",
            params![
                meeting_id,
                summary.summary,
                serde_json::to_string(&summary.key_points)?,
                serde_json::to_string(&summary.decisions)?,
            ],
        )
        .context("Failed to save summary")?;
        Ok(())
    }

    pub fn get(conn: &Connection, meeting_id: &str) -> Result<Option<SummaryRecord>> {
        let row = conn
            .query_row(
                "SELECT summary, key_points, decisions FROM summaries WHERE meeting_id = ?1",
                params![meeting_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()
            .context("Failed to query summary")?;

        let Some((summary, key_points, decisions)) = row else {
            return Ok(None);
        };

        Ok(Some(SummaryRecord {
            summary: summary.unwrap_or_default(),
            key_points: parse_string_list(key_points.as_deref())?,
            decisions: parse_string_list(decisions.as_deref())?,
        }))
    }
}

fn parse_string_list(raw: Option<&str>) -> Result<Vec<String>> {
    match raw {
        Some(text) if !text.is_empty() => {
            serde_json::from_str(text).context("Stored list is not valid JSON")
        }
        _ => Ok(Vec::new()),
    }
}

/// New action item to store. Status always starts as `todo`.
#[derive(Debug, Clone)]
pub struct NewActionItem {
    pub task: String,
    pub owner: String,
    pub due_date: String,
    pub priority: String,
}

pub struct ActionItemRepository;

impl ActionItemRepository {
    pub fn replace_for_meeting(
        conn: &Connection,
        meeting_id: &str,
        items: &[NewActionItem],
    ) -> Result<()> {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM action_items WHERE meeting_id = ?1",
            params![meeting_id],
        )
        .context("Failed to clear action items")?;

        for item in items {
            tx.execute(
                "INSERT INTO action_items (meeting_id, task, owner, due_date, priority, status) \
                 VALUES (?1, ?2, ?3, ?4, ?5, 'todo')",
                params![meeting_id, item.task, item.owner, item.due_date, item.priority],
            )
            .context("Failed to insert action item")?;
        }

        tx.commit().context("Failed to commit action items")?;
        Ok(())
    }

    pub fn list_for_meeting(conn: &Connection, meeting_id: &str) -> Result<Vec<ActionItemRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, task, owner, due_date, priority, status FROM action_items \
             WHERE meeting_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![meeting_id], |row| {
                Ok(ActionItemRecord {
                    id: row.get(0)?,
                    task: row.get(1)?,
                    owner: row.get(2)?,
                    due_date: row.get(3)?,
                    priority: row.get(4)?,
                    status: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to list action items")?;
        Ok(rows)
    }
}

pub struct ParticipantRepository;

impl ParticipantRepository {
    pub fn replace_for_meeting(conn: &Connection, meeting_id: &str, names: &[String]) -> Result<()> {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM participants WHERE meeting_id = ?1",
            params![meeting_id],
        )
        .context("Failed to clear participants")?;

        for name in names {
            tx.execute(
                "INSERT INTO participants (meeting_id, name) VALUES (?1, ?2)",
                params![meeting_id, name],
            )
            .context("Failed to insert participant")?;
        }

        tx.commit().context("Failed to commit participants")?;
        Ok(())
    }

    pub fn list_for_meeting(conn: &Connection, meeting_id: &str) -> Result<Vec<ParticipantRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, email FROM participants WHERE meeting_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![meeting_id], |row| {
                Ok(ParticipantRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to list participants")?;
        Ok(rows)
    }
}
