//! Durable memory of which promotions have already been announced.
//!
//! One SQLite table maps `(source, entry_key)` to the date the entry was last
//! notified.  The store only offers point lookups and upserts; what a stored
//! date *means* is decided by each [`GameSource`](crate::source::GameSource).
//!
//! Every failure is returned as a [`StoreError`].  A write that silently
//! vanished would make the next cycle announce the same promotion again, so
//! nothing here swallows errors.

mod schema;

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;

/// File name of the database inside the working directory.
pub const DB_FILE_NAME: &str = "data.db";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct NotificationStore {
    conn: Connection,
}

impl NotificationStore {
    /// Open (creating if needed) the database at `path` and bring its schema
    /// up to date, importing tables left behind by older releases.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory store, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, StoreError> {
        schema::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    /// Date `key` was last notified for `source`, or `None` if never.
    pub fn get(&self, source: &str, key: &str) -> Result<Option<NaiveDate>, StoreError> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT last_notified FROM notification WHERE source = ?1 AND entry_key = ?2",
                params![source, key],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|value| {
                NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|_| {
                    StoreError::CorruptDate {
                        source_id: source.to_string(),
                        key: key.to_string(),
                        value,
                    }
                })
            })
            .transpose()
    }

    /// Record that `key` was notified on `date`.
    ///
    /// Creates the record or moves its date forward.  An older `date` than the
    /// stored one leaves the record untouched, so `last_notified` never goes
    /// backwards.  `YYYY-MM-DD` strings order the same as the dates they
    /// encode, which is what lets `max()` compare them as text.
    pub fn set(&self, source: &str, key: &str, date: NaiveDate) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO notification (source, entry_key, last_notified) VALUES (?1, ?2, ?3)
             ON CONFLICT (source, entry_key)
             DO UPDATE SET last_notified = max(last_notified, excluded.last_notified)",
            params![source, key, date.format(DATE_FORMAT).to_string()],
        )?;
        Ok(())
    }

    /// All records as `(source, entry_key, last_notified)`, ordered by key.
    #[cfg(test)]
    pub fn records(&self) -> Result<Vec<(String, String, String)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT source, entry_key, last_notified FROM notification ORDER BY source, entry_key",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
