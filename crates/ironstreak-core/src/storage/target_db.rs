//! SQLite-backed target store and check-in ledger.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use super::migrations;
use super::store::TargetStore;
use crate::calendar::{self, DATE_FORMAT};
use crate::error::{CoreError, DatabaseError, Result};
use crate::target::{Target, TargetStatus};

const TARGET_COLUMNS: &str =
    "id, owner, target_text, start_date, end_date, duration_in_days, status, created_at";

/// How long a writer waits on another connection's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn parse_stored_date(table: &'static str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| {
        DatabaseError::Corrupt {
            table,
            message: format!("bad date '{value}': {e}"),
        }
        .into()
    })
}

/// Raw `targets` row, decoded into a [`Target`] outside the rusqlite closure.
struct TargetRow {
    id: String,
    owner: String,
    target_text: String,
    start_date: String,
    end_date: String,
    duration_in_days: u32,
    status: String,
    created_at: String,
}

impl TargetRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            target_text: row.get(2)?,
            start_date: row.get(3)?,
            end_date: row.get(4)?,
            duration_in_days: row.get(5)?,
            status: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_target(self) -> Result<Target> {
        let status = self.status.parse::<TargetStatus>().map_err(|message| {
            CoreError::from(DatabaseError::Corrupt {
                table: "targets",
                message,
            })
        })?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DatabaseError::Corrupt {
                table: "targets",
                message: format!("bad created_at '{}': {e}", self.created_at),
            })?;
        Ok(Target {
            start_date: parse_stored_date("targets", &self.start_date)?,
            end_date: parse_stored_date("targets", &self.end_date)?,
            id: self.id,
            owner: self.owner,
            target_text: self.target_text,
            duration_in_days: self.duration_in_days,
            status,
            created_at,
        })
    }
}

/// SQLite database holding targets and the check-in ledger.
///
/// The connection sits behind a mutex so one store can be shared across
/// threads. Several stores (or processes) may open the same file; SQLite's
/// own locking plus the busy timeout serializes their writes.
pub struct TargetDb {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl TargetDb {
    /// Open the database at `<data_dir>/ironstreak.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("ironstreak.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        tracing::debug!(path = ?path, "target database ready");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// File backing this store; `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves SQLite itself consistent, so a
        // poisoned guard is still usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn query_targets(&self, sql: &str, owner: Option<&str>) -> Result<Vec<Target>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = match owner {
            Some(owner) => stmt
                .query_map(params![owner], TargetRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map([], TargetRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        rows.into_iter().map(TargetRow::into_target).collect()
    }
}

impl TargetStore for TargetDb {
    fn save_target(&self, target: &Target) -> Result<()> {
        self.conn().execute(
            "INSERT INTO targets (id, owner, target_text, start_date, end_date, duration_in_days, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                target.id,
                target.owner,
                target.target_text,
                calendar::format_date(target.start_date),
                calendar::format_date(target.end_date),
                target.duration_in_days,
                target.status.as_str(),
                target.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_target(&self, id: &str) -> Result<Option<Target>> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {TARGET_COLUMNS} FROM targets WHERE id = ?1"),
                params![id],
                TargetRow::from_row,
            )
            .optional()?;
        row.map(TargetRow::into_target).transpose()
    }

    fn list_active_targets_for_user(&self, owner: &str) -> Result<Vec<Target>> {
        self.query_targets(
            &format!(
                "SELECT {TARGET_COLUMNS} FROM targets
                 WHERE owner = ?1 AND status = 'ACTIVE'
                 ORDER BY start_date ASC, created_at ASC"
            ),
            Some(owner),
        )
    }

    fn list_finished_targets_for_user(&self, owner: &str) -> Result<Vec<Target>> {
        self.query_targets(
            &format!(
                "SELECT {TARGET_COLUMNS} FROM targets
                 WHERE owner = ?1 AND status != 'ACTIVE'
                 ORDER BY created_at DESC"
            ),
            Some(owner),
        )
    }

    fn list_all_active_targets(&self) -> Result<Vec<Target>> {
        self.query_targets(
            &format!(
                "SELECT {TARGET_COLUMNS} FROM targets
                 WHERE status = 'ACTIVE'
                 ORDER BY owner ASC, start_date ASC"
            ),
            None,
        )
    }

    fn record_status(&self, id: &str, status: TargetStatus) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE targets SET status = ?2 WHERE id = ?1 AND status = 'ACTIVE'",
            params![id, status.as_str()],
        )?;
        Ok(changed == 1)
    }

    fn append_check_in(&self, target_id: &str, date: NaiveDate) -> Result<()> {
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO check_ins (target_id, date, recorded_at) VALUES (?1, ?2, ?3)",
            params![target_id, calendar::format_date(date), Utc::now().to_rfc3339()],
        )?;
        if inserted == 0 {
            return Err(CoreError::Duplicate {
                target_id: target_id.to_string(),
                date,
            });
        }
        Ok(())
    }

    fn list_check_ins(&self, target_id: &str) -> Result<Vec<NaiveDate>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT date FROM check_ins WHERE target_id = ?1 ORDER BY date ASC")?;
        let dates = stmt
            .query_map(params![target_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        dates
            .iter()
            .map(|value| parse_stored_date("check_ins", value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{TargetDraft, TargetPolicy};

    fn d(s: &str) -> NaiveDate {
        calendar::parse_date(s).unwrap()
    }

    fn locked(owner: &str, start: &str, days: i64) -> Target {
        TargetPolicy::default()
            .lock(&TargetDraft::new("meditate", start, days), owner, d(start))
            .unwrap()
    }

    #[test]
    fn save_and_get() {
        let db = TargetDb::open_memory().unwrap();
        let target = locked("alice", "2024-01-01", 3);
        db.save_target(&target).unwrap();

        let loaded = db.get_target(&target.id).unwrap().unwrap();
        assert_eq!(loaded.id, target.id);
        assert_eq!(loaded.end_date, d("2024-01-03"));
        assert_eq!(loaded.status, TargetStatus::Active);
        assert_eq!(loaded.created_at.timestamp(), target.created_at.timestamp());
        assert!(db.get_target("missing").unwrap().is_none());
    }

    #[test]
    fn duplicate_check_in_is_reported() {
        let db = TargetDb::open_memory().unwrap();
        let target = locked("alice", "2024-01-01", 3);
        db.save_target(&target).unwrap();

        db.append_check_in(&target.id, d("2024-01-01")).unwrap();
        let err = db.append_check_in(&target.id, d("2024-01-01")).unwrap_err();
        assert!(matches!(err, CoreError::Duplicate { .. }));
        assert_eq!(db.list_check_ins(&target.id).unwrap(), vec![d("2024-01-01")]);
    }

    #[test]
    fn check_in_for_unknown_target_fails() {
        let db = TargetDb::open_memory().unwrap();
        let err = db.append_check_in("nope", d("2024-01-01")).unwrap_err();
        assert!(matches!(err, CoreError::Database(_)));
    }

    #[test]
    fn check_ins_come_back_sorted() {
        let db = TargetDb::open_memory().unwrap();
        let target = locked("alice", "2024-01-01", 5);
        db.save_target(&target).unwrap();
        for day in ["2024-01-03", "2024-01-01", "2024-01-02"] {
            db.append_check_in(&target.id, d(day)).unwrap();
        }
        assert_eq!(
            db.list_check_ins(&target.id).unwrap(),
            vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03")]
        );
    }

    #[test]
    fn record_status_only_leaves_active_once() {
        let db = TargetDb::open_memory().unwrap();
        let target = locked("alice", "2024-01-01", 3);
        db.save_target(&target).unwrap();

        assert!(db.record_status(&target.id, TargetStatus::Failed).unwrap());
        assert!(!db.record_status(&target.id, TargetStatus::Success).unwrap());
        assert_eq!(
            db.get_target(&target.id).unwrap().unwrap().status,
            TargetStatus::Failed
        );
    }

    #[test]
    fn listings_split_by_owner_and_status() {
        let db = TargetDb::open_memory().unwrap();
        let a1 = locked("alice", "2024-01-01", 3);
        let a2 = locked("alice", "2024-01-02", 3);
        let b1 = locked("bob", "2024-01-01", 3);
        for t in [&a1, &a2, &b1] {
            db.save_target(t).unwrap();
        }
        db.record_status(&a2.id, TargetStatus::Success).unwrap();

        let active: Vec<_> = db
            .list_active_targets_for_user("alice")
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(active, vec![a1.id.clone()]);

        let finished = db.list_finished_targets_for_user("alice").unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].id, a2.id);

        assert_eq!(db.list_all_active_targets().unwrap().len(), 2);
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streaks.db");
        let target = locked("alice", "2024-01-01", 3);
        {
            let db = TargetDb::open_at(&path).unwrap();
            db.save_target(&target).unwrap();
            db.append_check_in(&target.id, d("2024-01-01")).unwrap();
        }
        let db = TargetDb::open_at(&path).unwrap();
        assert_eq!(db.path(), Some(path.as_path()));
        assert_eq!(db.get_target(&target.id).unwrap().unwrap(), target);
        assert_eq!(db.list_check_ins(&target.id).unwrap(), vec![d("2024-01-01")]);
    }
}
