use std::path::Path;

use rusqlite::{params, Connection, OpenFlags};

use crate::memory::{CardId, ReviewRow};

use super::Result;

/// Read-only handle on an Anki collection database.
pub struct Collection {
    conn: Connection,
}

impl Collection {
    /// Open the collection at `path`. The connection is read-only; nothing
    /// in the replay ever writes back to the deck.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Collection { conn })
    }

    /// Every card id in the collection.
    pub fn card_ids(&self) -> Result<Vec<CardId>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT id FROM cards")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<CardId>>>()?;
        Ok(ids)
    }

    /// Raw review-log rows for one card, as (epoch-millisecond timestamp,
    /// grade) pairs. The revlog primary key doubles as the timestamp.
    pub fn review_rows(&self, card_id: CardId) -> Result<Vec<ReviewRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, ease FROM revlog WHERE cid = ?1")?;
        let rows = stmt
            .query_map(params![card_id], |row| {
                Ok(ReviewRow {
                    timestamp_ms: row.get(0)?,
                    grade: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<ReviewRow>>>()?;
        Ok(rows)
    }
}
