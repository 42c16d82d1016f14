//! SQLite ratings log
//!
//! Holds the `reviews` table: one row per rating given in learning mode.
//! The table is always created at startup; rows are only written when
//! `ratings.persist` is enabled.

use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

use crate::error::ChatError;
use crate::types::Rating;

/// A stored rating
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingRecord {
    pub question: String,
    pub answer: String,
    pub review: u8,
}

/// SQLite-backed rating store
pub struct RatingStore {
    conn: Connection,
}

impl RatingStore {
    /// Open (or create) the database at `path` and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ChatError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let _ = std::fs::create_dir_all(parent);
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        info!(path = %path.display(), "Opened ratings database");
        Ok(Self { conn })
    }

    /// In-memory store, for tests and dry runs
    pub fn in_memory() -> Result<Self, ChatError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<(), ChatError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS reviews (
                question TEXT,
                answer TEXT,
                review INTEGER
            );
            "#,
        )?;
        Ok(())
    }

    /// Record a rating for a question/answer pair
    pub fn record(&self, question: &str, answer: &str, rating: Rating) -> Result<(), ChatError> {
        self.conn.execute(
            "INSERT INTO reviews (question, answer, review) VALUES (?1, ?2, ?3)",
            params![question, answer, rating.value()],
        )?;
        debug!(rating = rating.value(), "Recorded rating");
        Ok(())
    }

    /// Number of stored ratings
    pub fn count(&self) -> Result<usize, ChatError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Most recent ratings, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<RatingRecord>, ChatError> {
        let mut stmt = self.conn.prepare(
            "SELECT question, answer, review FROM reviews ORDER BY rowid DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(RatingRecord {
                question: row.get(0)?,
                answer: row.get(1)?,
                review: row.get(2)?,
            })
        })?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Average of all ratings, if any
    pub fn average(&self) -> Result<Option<f64>, ChatError> {
        let avg: Option<f64> = self
            .conn
            .query_row("SELECT AVG(review) FROM reviews", [], |row| row.get(0))?;
        Ok(avg)
    }
}
