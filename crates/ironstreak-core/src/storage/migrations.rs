//! Database schema migrations for ironstreak.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i32>>(0)
    }) {
        Ok(version) => Ok(version.unwrap_or(0)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: targets and the check-in ledger.
///
/// `check_ins` is keyed by `(target_id, date)`, which is what makes a second
/// check-in on the same day a no-op.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS targets (
            id               TEXT PRIMARY KEY,
            owner            TEXT NOT NULL,
            target_text      TEXT NOT NULL,
            start_date       TEXT NOT NULL,
            end_date         TEXT NOT NULL,
            duration_in_days INTEGER NOT NULL CHECK (duration_in_days BETWEEN 1 AND 365),
            status           TEXT NOT NULL DEFAULT 'ACTIVE'
                             CHECK (status IN ('ACTIVE', 'SUCCESS', 'FAILED')),
            created_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS check_ins (
            target_id   TEXT NOT NULL REFERENCES targets(id),
            date        TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            PRIMARY KEY (target_id, date)
        );

        CREATE INDEX IF NOT EXISTS idx_targets_owner_status ON targets(owner, status);
        CREATE INDEX IF NOT EXISTS idx_targets_status ON targets(status);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: lock triggers.
///
/// Targets are locked once written: only `status` may change, and only away
/// from `ACTIVE`. Ledger rows can never be updated or removed.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TRIGGER IF NOT EXISTS targets_locked
         BEFORE UPDATE OF id, owner, target_text, start_date, end_date, duration_in_days, created_at
         ON targets
         BEGIN
             SELECT RAISE(ABORT, 'target is locked');
         END;

         CREATE TRIGGER IF NOT EXISTS targets_status_terminal
         BEFORE UPDATE OF status ON targets
         WHEN OLD.status != 'ACTIVE' AND NEW.status != OLD.status
         BEGIN
             SELECT RAISE(ABORT, 'target status is terminal');
         END;

         CREATE TRIGGER IF NOT EXISTS check_ins_no_update
         BEFORE UPDATE ON check_ins
         BEGIN
             SELECT RAISE(ABORT, 'check-ins are append-only');
         END;

         CREATE TRIGGER IF NOT EXISTS check_ins_no_delete
         BEFORE DELETE ON check_ins
         BEGIN
             SELECT RAISE(ABORT, 'check-ins are append-only');
         END;",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}
