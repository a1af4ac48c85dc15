//! SQLite schema for committed state.
//!
//! Versions are applied in order inside one transaction and recorded in
//! `schema_migrations`, so reopening an existing database is a no-op.

use rusqlite::{Connection, Transaction};

use crate::error::{Result, StoreError};

/// Schema version this build expects.
pub const CURRENT_VERSION: u32 = 1;

/// Bring `conn` up to [`CURRENT_VERSION`].
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let applied: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    if applied > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database is at version {applied}, newer than {CURRENT_VERSION}"
        )));
    }
    if applied == CURRENT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for version in (applied + 1)..=CURRENT_VERSION {
        apply(&tx, version)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![version, unix_millis()],
        )?;
    }
    tx.commit()?;
    tracing::debug!("state schema migrated from v{} to v{}", applied, CURRENT_VERSION);
    Ok(())
}

fn apply(tx: &Transaction<'_>, version: u32) -> Result<()> {
    match version {
        // Keys are a prefix byte followed by the logical key.
        1 => tx.execute_batch(
            "CREATE TABLE kv (
                key BLOB PRIMARY KEY,
                value BLOB NOT NULL
            ) WITHOUT ROWID;",
        )?,
        _ => return Err(StoreError::Migration(format!("no migration to version {version}"))),
    }
    Ok(())
}

fn unix_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
