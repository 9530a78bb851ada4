// Database connection management and statement execution
use parking_lot::{Mutex, MutexGuard};
use rusqlite::types::Value;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Params, Row, Transaction};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

use super::schema::{Schema, LIBRARY_SCHEMA};
use crate::error::{LibraryError, Result};

/// One result row keyed by column name.
pub type Record = HashMap<String, Value>;

/// Broad classification of a failed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Constraint,
    Busy,
    ReadOnly,
    Io,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for StorageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for StorageFailure {}

impl From<&rusqlite::Error> for StorageFailure {
    fn from(err: &rusqlite::Error) -> Self {
        let kind = match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => FailureKind::Constraint,
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => FailureKind::Busy,
            Some(ErrorCode::ReadOnly) => FailureKind::ReadOnly,
            Some(ErrorCode::SystemIoFailure)
            | Some(ErrorCode::CannotOpen)
            | Some(ErrorCode::DiskFull) => FailureKind::Io,
            _ => FailureKind::Other,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Result of a single statement run through [`DatabaseConnection::execute`].
#[derive(Debug)]
pub enum StatementOutcome {
    /// Rows produced by a read statement, in the order the store returned them.
    Rows(Vec<Record>),
    /// Rows changed by a write statement that did not create a new row id.
    Affected(usize),
    /// Row id generated by an insert.
    Inserted(i64),
    /// The statement failed and its transaction was rolled back.
    Failure(StorageFailure),
}

impl StatementOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StatementOutcome::Failure(_))
    }

    pub fn into_rows(self) -> Result<Vec<Record>> {
        match self {
            StatementOutcome::Rows(rows) => Ok(rows),
            StatementOutcome::Failure(failure) => Err(failure.into()),
            other => Err(LibraryError::UnexpectedOutcome(format!(
                "expected rows, got {:?}",
                other
            ))),
        }
    }

    /// Number of rows touched. An insert counts as one.
    pub fn into_affected(self) -> Result<usize> {
        match self {
            StatementOutcome::Affected(count) => Ok(count),
            StatementOutcome::Inserted(_) => Ok(1),
            StatementOutcome::Failure(failure) => Err(failure.into()),
            StatementOutcome::Rows(rows) => Err(LibraryError::UnexpectedOutcome(format!(
                "expected a write, got {} rows",
                rows.len()
            ))),
        }
    }

    /// New row id, or `None` when the insert was ignored.
    pub fn into_inserted_id(self) -> Result<Option<i64>> {
        match self {
            StatementOutcome::Inserted(id) => Ok(Some(id)),
            StatementOutcome::Affected(0) => Ok(None),
            StatementOutcome::Failure(failure) => Err(failure.into()),
            other => Err(LibraryError::UnexpectedOutcome(format!(
                "expected an insert, got {:?}",
                other
            ))),
        }
    }

    /// Row id of a freshly created `entity`. An insert that created no row is an error.
    pub fn into_new_id(self, entity: &str) -> Result<i64> {
        self.into_inserted_id()?.ok_or_else(|| {
            LibraryError::UnexpectedOutcome(format!("{} insert created no row", entity))
        })
    }
}

/// Shared handle to the library database.
///
/// Every call to [`execute`](Self::execute) runs exactly one statement in its
/// own transaction. Multi-statement units go through
/// [`transaction`](Self::transaction) instead.
pub struct DatabaseConnection {
    conn: Arc<Mutex<Connection>>,
    db_path: Arc<PathBuf>,
}

impl DatabaseConnection {
    /// Open (or create) the database at `db_path` with the library schema.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_schema(db_path, &LIBRARY_SCHEMA)
    }

    pub fn with_schema(db_path: impl Into<PathBuf>, schema: &Schema) -> Result<Self> {
        let db_path = db_path.into();

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LibraryError::io(parent, e))?;
            }
        }

        let conn = open_configured(&db_path)?;
        schema.create(&conn)?;
        debug!(path = %db_path.display(), version = schema.version, "database opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// Run one statement in its own transaction.
    ///
    /// Failures are logged, rolled back and returned as
    /// [`StatementOutcome::Failure`]; this never panics or returns `Err`.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> StatementOutcome {
        let mut conn = self.lock();
        match run_statement(&mut conn, sql, params) {
            Ok(outcome) => outcome,
            Err(err) => {
                let failure = StorageFailure::from(&err);
                error!(
                    sql = sql.trim(),
                    kind = ?failure.kind,
                    "statement rolled back: {}",
                    failure.message
                );
                StatementOutcome::Failure(failure)
            }
        }
    }

    /// Run a read statement and map every row.
    pub fn query<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.lock();
        collect_rows(&conn, sql, params, map).map_err(|err| report(sql, err))
    }

    /// Run a read statement expected to produce at most one row.
    pub fn query_optional<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.lock();
        conn.query_row(sql, params, map)
            .optional()
            .map_err(|err| report(sql, err))
    }

    /// Run `f` inside a single transaction, committing only if it succeeds.
    ///
    /// `f` must use the transaction it is given; calling back into this
    /// handle from inside `f` would deadlock on the connection lock.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                error!("transaction rolled back: {}", err);
                Err(err)
            }
        }
    }
}

impl Clone for DatabaseConnection {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            db_path: Arc::clone(&self.db_path),
        }
    }
}

impl fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConnection")
            .field("db_path", &self.db_path)
            .finish()
    }
}

pub(crate) fn open_configured(db_path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

fn run_statement<P: Params>(
    conn: &mut Connection,
    sql: &str,
    params: P,
) -> rusqlite::Result<StatementOutcome> {
    let tx = conn.transaction()?;
    let outcome = {
        let mut stmt = tx.prepare(sql)?;
        if stmt.column_count() > 0 {
            let names: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(String::from)
                .collect();
            let mut rows = stmt.query(params)?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = Record::with_capacity(names.len());
                for (index, name) in names.iter().enumerate() {
                    record.insert(name.clone(), row.get::<_, Value>(index)?);
                }
                records.push(record);
            }
            StatementOutcome::Rows(records)
        } else {
            let changed = stmt.execute(params)?;
            if is_insert(sql) && changed > 0 {
                StatementOutcome::Inserted(tx.last_insert_rowid())
            } else {
                StatementOutcome::Affected(changed)
            }
        }
    };
    tx.commit()?;
    Ok(outcome)
}

fn collect_rows<T, P, F>(conn: &Connection, sql: &str, params: P, map: F) -> rusqlite::Result<Vec<T>>
where
    P: Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let items = stmt
        .query_map(params, map)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

fn is_insert(sql: &str) -> bool {
    let head = sql.trim_start();
    ["INSERT", "REPLACE"].iter().any(|keyword| {
        head.get(..keyword.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
    })
}

fn report(sql: &str, err: rusqlite::Error) -> LibraryError {
    let failure = StorageFailure::from(&err);
    error!(sql = sql.trim(), kind = ?failure.kind, "query failed: {}", failure.message);
    LibraryError::Storage(failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use tempfile::TempDir;

    fn create_test_db() -> (DatabaseConnection, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = DatabaseConnection::new(temp_dir.path().join("library.sqlite")).unwrap();
        (db, temp_dir)
    }

    #[test]
    fn test_insert_returns_new_id() {
        let (db, _dir) = create_test_db();

        let first = db.execute("INSERT INTO artists (name) VALUES (?1)", params!["Nina"]);
        let second = db.execute("INSERT INTO artists (name) VALUES (?1)", params!["Miles"]);

        assert!(matches!(first, StatementOutcome::Inserted(1)));
        assert!(matches!(second, StatementOutcome::Inserted(2)));
    }

    #[test]
    fn test_select_returns_records_by_column_name() {
        let (db, _dir) = create_test_db();
        db.execute("INSERT INTO artists (name) VALUES (?1)", params!["Nina"]);

        let rows = db
            .execute("SELECT id, name FROM artists", [])
            .into_rows()
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::Text("Nina".to_string())));
        assert_eq!(rows[0].get("id"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_update_returns_affected_count() {
        let (db, _dir) = create_test_db();
        db.execute("INSERT INTO artists (name) VALUES (?1)", params!["Nina"]);

        let outcome = db.execute("UPDATE artists SET name = ?1 WHERE id = ?2", params!["N", 1]);
        let missing = db.execute("UPDATE artists SET name = ?1 WHERE id = ?2", params!["N", 99]);

        assert!(matches!(outcome, StatementOutcome::Affected(1)));
        assert!(matches!(missing, StatementOutcome::Affected(0)));
    }

    #[test]
    fn test_constraint_violation_is_reported_as_failure() {
        let (db, _dir) = create_test_db();
        db.execute("INSERT INTO artists (name) VALUES (?1)", params!["Nina"]);

        let outcome = db.execute("INSERT INTO artists (name) VALUES (?1)", params!["Nina"]);

        match outcome {
            StatementOutcome::Failure(failure) => assert_eq!(failure.kind, FailureKind::Constraint),
            other => panic!("expected failure, got {:?}", other),
        }
        let count: i64 = db
            .query_optional("SELECT COUNT(*) FROM artists", [], |row| row.get(0))
            .unwrap()
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_empty_select_is_distinct_from_failure() {
        let (db, _dir) = create_test_db();

        let empty = db.execute("SELECT * FROM artists WHERE id = ?1", params![42]);
        let broken = db.execute("SELECT * FROM no_such_table", []);

        assert!(matches!(empty, StatementOutcome::Rows(ref rows) if rows.is_empty()));
        assert!(broken.is_failure());
    }

    #[test]
    fn test_ignored_insert_has_no_id() {
        let (db, _dir) = create_test_db();
        db.execute("INSERT INTO artists (name) VALUES (?1)", params!["Nina"]);

        let outcome = db
            .execute("INSERT OR IGNORE INTO artists (name) VALUES (?1)", params!["Nina"])
            .into_inserted_id()
            .unwrap();

        assert_eq!(outcome, None);
        let required = db
            .execute("INSERT OR IGNORE INTO artists (name) VALUES (?1)", params!["Nina"])
            .into_new_id("artist");
        assert!(matches!(required, Err(LibraryError::UnexpectedOutcome(_))));
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let (db, _dir) = create_test_db();

        let result: Result<()> = db.transaction(|tx| {
            tx.execute("INSERT INTO artists (name) VALUES (?1)", params!["Nina"])?;
            tx.execute("INSERT INTO artists (name) VALUES (?1)", params!["Nina"])?;
            Ok(())
        });

        assert!(result.is_err());
        let names = db
            .query("SELECT name FROM artists", [], |row| row.get::<_, String>(0))
            .unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_foreign_keys_are_enforced() {
        let (db, _dir) = create_test_db();

        let outcome = db.execute(
            "INSERT INTO playlist_tracks (playlist_id, track_id, position) VALUES (?1, ?2, 1)",
            params![7, 9],
        );

        assert!(outcome.is_failure());
    }

    #[test]
    fn test_is_insert_detection() {
        assert!(is_insert("  insert into artists (name) values ('x')"));
        assert!(is_insert("INSERT OR IGNORE INTO t VALUES (1)"));
        assert!(is_insert("REPLACE INTO t VALUES (1)"));
        assert!(!is_insert("UPDATE t SET a = 1"));
        assert!(!is_insert("DELETE FROM t"));
    }
}
