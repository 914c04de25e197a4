//! Table definitions and the one-time import of the pre-unified layout.
//!
//! Older releases kept one table per storefront (`SteamSale`,
//! `EpicNotification`).  Version 1 folds both into the single keyed
//! `notification` table.  [`migrate`] brings any database up to
//! [`CURRENT_VERSION`] and can be run on every start.

use rusqlite::{Connection, OptionalExtension};

use crate::error::StoreError;

pub const CURRENT_VERSION: i64 = 1;

pub const NOTIFICATION_TABLE: &str = "CREATE TABLE IF NOT EXISTS notification (
    source TEXT NOT NULL,
    entry_key TEXT NOT NULL,
    last_notified TEXT NOT NULL,
    PRIMARY KEY (source, entry_key)
);";

/// Imported with this date when a legacy row carries no date, so the key
/// survives the import.
pub const LEGACY_MISSING_DATE: &str = "1970-01-01";

/// A per-source table from before the unified layout.
struct LegacyTable {
    name: &'static str,
    source: &'static str,
    import: &'static str,
}

const LEGACY_TABLES: &[LegacyTable] = &[
    LegacyTable {
        name: "SteamSale",
        source: "steam",
        import: "INSERT OR IGNORE INTO notification (source, entry_key, last_notified)
                 SELECT ?1, CAST(game_id AS TEXT), COALESCE(last_notified, ?2) FROM SteamSale",
    },
    LegacyTable {
        name: "EpicNotification",
        source: "epic",
        import: "INSERT OR IGNORE INTO notification (source, entry_key, last_notified)
                 SELECT ?1, title, COALESCE(date_notified, ?2) FROM EpicNotification",
    },
];

/// Create the unified table, import legacy rows and stamp the version.
///
/// Every step is guarded: the table is created only if missing, legacy
/// tables are read only if present and rows already in the unified table
/// are never overwritten, so a second run changes nothing.
pub fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
    let version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if version > CURRENT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: version,
            supported: CURRENT_VERSION,
        });
    }

    let tx = conn.transaction()?;
    tx.execute_batch(NOTIFICATION_TABLE)?;

    for legacy in LEGACY_TABLES {
        if !table_exists(&tx, legacy.name)? {
            continue;
        }
        let imported = tx.execute(legacy.import, [legacy.source, LEGACY_MISSING_DATE])?;
        if imported > 0 {
            tracing::info!(
                table = legacy.name,
                source = legacy.source,
                imported,
                "imported legacy notification records"
            );
        }
    }

    tx.execute_batch(&format!("PRAGMA user_version = {CURRENT_VERSION};"))?;
    tx.commit()?;
    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, StoreError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}
