use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

pub fn open_db(db_path: &Path) -> Result<Connection> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(db_path).context("Failed to open database connection")?;

    migrate(&conn)?;

    Ok(conn)
}

/// Create all tables if they do not exist yet. Every child table refers to
/// the meeting by its external identifier, not the row id.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .context("Failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS meetings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            platform TEXT NOT NULL,
            meeting_id TEXT NOT NULL UNIQUE,
            title TEXT,
            date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            duration INTEGER,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create meetings table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transcripts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meeting_id TEXT NOT NULL REFERENCES meetings(meeting_id) ON DELETE CASCADE,
            speaker TEXT,
            timestamp TEXT,
            text TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create transcripts table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS summaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meeting_id TEXT NOT NULL UNIQUE REFERENCES meetings(meeting_id) ON DELETE CASCADE,
            summary TEXT,
            key_points TEXT,
            decisions TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create summaries table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS action_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meeting_id TEXT NOT NULL REFERENCES meetings(meeting_id) ON DELETE CASCADE,
            task TEXT NOT NULL,
            owner TEXT,
            due_date TEXT,
            priority TEXT,
            status TEXT NOT NULL DEFAULT 'todo'
        )",
        [],
    )
    .context("Failed to create action_items table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS participants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meeting_id TEXT NOT NULL REFERENCES meetings(meeting_id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            email TEXT
        )",
        [],
    )
    .context("Failed to create participants table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS emotions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meeting_id TEXT NOT NULL REFERENCES meetings(meeting_id) ON DELETE CASCADE,
            timestamp TEXT,
            emotion TEXT,
            intensity REAL
        )",
        [],
    )
    .context("Failed to create emotions table")?;

    for (table, index) in [
        ("transcripts", "idx_transcripts_meeting_id"),
        ("action_items", "idx_action_items_meeting_id"),
        ("participants", "idx_participants_meeting_id"),
        ("emotions", "idx_emotions_meeting_id"),
    ] {
        conn.execute(
            &format!("CREATE INDEX IF NOT EXISTS {index} ON {table}(meeting_id)"),
            [],
        )
        .with_context(|| format!("Failed to create {} meeting_id index", table))?;
    }

    Ok(())
}
