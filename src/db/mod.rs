//! SQLite persistence.
//!
//! Raw SQL with rusqlite, no ORM. Repositories take a `&Connection`; the
//! [`Database`] handle owns the single shared connection and runs repository
//! closures on the blocking thread pool.

pub mod emotions;
pub mod init;
pub mod insights;
pub mod meetings;

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub use emotions::{EmotionRecord, EmotionRepository};
pub use init::{migrate, open_db};
pub use insights::{
    ActionItemRecord, ActionItemRepository, NewActionItem, ParticipantRecord,
    ParticipantRepository, SummaryRecord, SummaryRepository, TranscriptRecord,
    TranscriptRepository,
};
pub use meetings::{InvalidTransition, MeetingRecord, MeetingRepository};

/// Cloneable handle to the application database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = open_db(path)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        migrate(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` against the connection without blocking the async runtime.
    pub async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| anyhow!("Database connection lock poisoned"))?;
            f(&guard)
        })
        .await
        .context("Database task panicked")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_runs_on_shared_connection() {
        let db = Database::open_in_memory().unwrap();

        db.call(|conn| {
            MeetingRepository::create(
                conn,
                "google_meet",
                "abc-defg-hij",
                None,
                crate::meeting::MeetingStatus::Active,
            )
        })
        .await
        .unwrap();

        let meeting = db
            .call(|conn| MeetingRepository::get(conn, "abc-defg-hij"))
            .await
            .unwrap();
        assert!(meeting.is_some());
    }

    #[tokio::test]
    async fn test_call_propagates_errors() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.call(|_| Err(anyhow!("boom"))).await;
        assert_eq!(result.unwrap_err().to_string(), "boom");
    }
}
