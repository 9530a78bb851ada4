// Database backup, column management and full schema migration
use chrono::Local;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OpenFlags};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::connection::{open_configured, DatabaseConnection, StatementOutcome};
use super::schema::{Schema, LIBRARY_SCHEMA};
use crate::error::{LibraryError, Result};

/// Row counts for one table after a migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    pub rows: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// Backup taken before the rebuild. It is deleted once the migration is verified.
    pub backup_path: PathBuf,
    pub schema_version: u32,
    pub tables: Vec<TableReport>,
}

impl DatabaseConnection {
    /// Column names of `table`, in declaration order.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        validate_identifier(table)?;
        let rows = self
            .execute(&format!("PRAGMA table_info({})", table), [])
            .into_rows()?;
        Ok(rows
            .into_iter()
            .filter_map(|mut row| match row.remove("name") {
                Some(Value::Text(name)) => Some(name),
                _ => None,
            })
            .collect())
    }

    /// Add a column; a column that already exists is not an error.
    ///
    /// Returns whether the column was actually added.
    pub fn add_column(&self, table: &str, column: &str, sql_type: &str) -> Result<bool> {
        validate_identifier(table)?;
        validate_identifier(column)?;
        let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, sql_type);
        match self.execute(&sql, []) {
            StatementOutcome::Failure(failure) if failure.message.contains("duplicate column") => {
                debug!(table, column, "column already exists");
                Ok(false)
            }
            outcome => outcome.into_affected().map(|_| true),
        }
    }

    /// Add `column` to `table` unless it is already there.
    pub fn ensure_column_exists(&self, table: &str, column: &str, sql_type: &str) -> Result<bool> {
        if self.table_columns(table)?.iter().any(|name| name == column) {
            return Ok(false);
        }
        let added = self.add_column(table, column, sql_type)?;
        if added {
            info!(table, column, sql_type, "added column");
        }
        Ok(added)
    }

    pub fn schema_version(&self) -> Result<u32> {
        let conn = self.lock();
        Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    /// Copy the database file to `<path>.backup_<YYYYMMDD_HHMMSS>`, adding a
    /// `_N` suffix when that name is already taken.
    pub fn backup(&self) -> Result<PathBuf> {
        let _conn = self.lock();
        backup_file(self.path())
    }

    /// Rebuild the database with the current library schema.
    pub fn migrate(&self) -> Result<MigrationReport> {
        self.migrate_to(&LIBRARY_SCHEMA)
    }

    /// Rebuild the database with `schema`, carrying over every row.
    ///
    /// Only columns present in both the old and the new layout are copied.
    /// Any failure, including a row count mismatch, restores the backup and
    /// returns [`LibraryError::Migration`].
    pub fn migrate_to(&self, schema: &Schema) -> Result<MigrationReport> {
        let mut conn = self.lock();
        let db_path = self.path().to_path_buf();

        let backup_path = backup_file(&db_path)?;
        info!(backup = %backup_path.display(), "backup created, starting migration");

        match rebuild(&mut conn, &db_path, &backup_path, schema) {
            Ok(tables) => {
                fs::remove_file(&backup_path).map_err(|e| LibraryError::io(&backup_path, e))?;
                info!(
                    version = schema.version,
                    "migration completed, backup removed: {}",
                    backup_path.display()
                );
                Ok(MigrationReport {
                    backup_path,
                    schema_version: schema.version,
                    tables,
                })
            }
            Err(err) => {
                error!("migration failed, restoring from backup: {}", err);
                let message = match restore(&mut conn, &db_path, &backup_path) {
                    Ok(()) => {
                        info!("database restored from {}", backup_path.display());
                        err.to_string()
                    }
                    Err(restore_err) => {
                        error!("restore from backup failed: {}", restore_err);
                        let mut message = format!("{}; restore also failed: {}", err, restore_err);
                        match attach_backup_read_only(&mut conn, &backup_path) {
                            Ok(()) => {
                                warn!("serving {} read-only", backup_path.display());
                                message.push_str("; the backup is attached read-only");
                            }
                            Err(attach_err) => {
                                error!("could not attach the backup: {}", attach_err);
                                message.push_str("; the handle has no database attached");
                            }
                        }
                        message
                    }
                };
                Err(LibraryError::Migration {
                    message,
                    backup_path,
                    source: Some(Box::new(err)),
                })
            }
        }
    }
}

/// Copy the database next to itself. An existing backup is never overwritten:
/// a second backup within the same second gets a `_N` suffix.
fn backup_file(db_path: &Path) -> Result<PathBuf> {
    let mut source = File::open(db_path).map_err(|e| LibraryError::io(db_path, e))?;
    let (backup_path, mut target) = create_backup_target(db_path)?;

    io::copy(&mut source, &mut target).map_err(|e| LibraryError::io(&backup_path, e))?;
    target.sync_all().map_err(|e| LibraryError::io(&backup_path, e))?;
    debug!(from = %db_path.display(), to = %backup_path.display(), "database copied");
    Ok(backup_path)
}

fn create_backup_target(db_path: &Path) -> Result<(PathBuf, File)> {
    let mut stem = db_path.as_os_str().to_owned();
    stem.push(format!(".backup_{}", Local::now().format("%Y%m%d_%H%M%S")));

    for attempt in 0u32.. {
        let mut name = stem.clone();
        if attempt > 0 {
            name.push(format!("_{}", attempt));
        }
        let candidate = PathBuf::from(name);
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(LibraryError::io(candidate, e)),
        }
    }
    Err(LibraryError::io(
        db_path,
        io::Error::new(io::ErrorKind::AlreadyExists, "no free backup name"),
    ))
}

/// Close the live connection so the file underneath can be replaced.
fn release(conn: &mut Connection) -> Result<()> {
    let live = std::mem::replace(conn, Connection::open_in_memory()?);
    live.close().map_err(|(_, err)| LibraryError::from(err))
}

fn remove_database(db_path: &Path) -> Result<()> {
    if db_path.exists() {
        fs::remove_file(db_path).map_err(|e| LibraryError::io(db_path, e))?;
    }
    Ok(())
}

fn rebuild(
    conn: &mut Connection,
    db_path: &Path,
    backup_path: &Path,
    schema: &Schema,
) -> Result<Vec<TableReport>> {
    release(conn)?;
    remove_database(db_path)?;
    *conn = open_configured(db_path)?;
    schema.create(conn)?;
    conn.pragma_update(None, "user_version", schema.version)?;
    debug!("new database created");

    let old = Connection::open_with_flags(backup_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    // Rows are copied verbatim, so references are checked by the count
    // verification rather than row by row.
    conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
    let transferred = transfer_tables(conn, &old, schema);
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    transferred
}

fn transfer_tables(conn: &mut Connection, old: &Connection, schema: &Schema) -> Result<Vec<TableReport>> {
    let mut reports = Vec::with_capacity(schema.tables.len());

    for table in schema.table_names() {
        if !table_exists(old, table)? {
            warn!(table, "table missing from the old database, left empty");
            reports.push(TableReport {
                table: table.to_string(),
                rows: count_rows(conn, table)?,
            });
            continue;
        }

        let new_columns = column_names(conn, table)?;
        let shared: Vec<String> = column_names(old, table)?
            .into_iter()
            .filter(|column| new_columns.contains(column))
            .collect();
        let expected = count_rows(old, table)?;

        if !shared.is_empty() {
            copy_rows(conn, old, table, &shared)?;
        }

        let actual = count_rows(conn, table)?;
        if actual != expected {
            return Err(LibraryError::RowCountMismatch {
                table: table.to_string(),
                expected,
                actual,
            });
        }
        info!(table, rows = actual, "transferred table");
        reports.push(TableReport {
            table: table.to_string(),
            rows: actual,
        });
    }

    Ok(reports)
}

fn copy_rows(conn: &mut Connection, old: &Connection, table: &str, columns: &[String]) -> Result<()> {
    let column_list = columns.join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");
    let select = format!("SELECT {} FROM {}", column_list, table);
    let insert = format!(
        "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
        table, column_list, placeholders
    );

    let tx = conn.transaction()?;
    {
        let mut read = old.prepare(&select)?;
        let mut write = tx.prepare(&insert)?;
        let mut rows = read.query([])?;
        while let Some(row) = rows.next()? {
            let values = (0..columns.len())
                .map(|index| row.get::<_, Value>(index))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            write.execute(params_from_iter(values))?;
        }
    }
    tx.commit()?;
    Ok(())
}

fn restore(conn: &mut Connection, db_path: &Path, backup_path: &Path) -> Result<()> {
    release(conn)?;
    remove_database(db_path)?;
    fs::copy(backup_path, db_path).map_err(|e| LibraryError::io(backup_path, e))?;
    *conn = open_configured(db_path)?;
    Ok(())
}

/// Point the handle at the backup so it never stays on the placeholder
/// connection. Reads see the pre-migration data; writes fail as read-only.
fn attach_backup_read_only(conn: &mut Connection, backup_path: &Path) -> Result<()> {
    *conn = Connection::open_with_flags(backup_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?)
}

fn validate_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(LibraryError::InvalidIdentifier(name.to_string()))
    }
}
