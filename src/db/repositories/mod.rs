// Entity repositories built on the storage gateway

pub mod albums;
pub mod artists;
pub mod playlists;
pub mod tracks;

pub use albums::AlbumRepository;
pub use artists::ArtistRepository;
pub use playlists::PlaylistRepository;
pub use tracks::TrackRepository;

use rusqlite::params_from_iter;
use rusqlite::types::Value;

use super::connection::DatabaseConnection;
use crate::error::Result;

/// Collects `column = ?` assignments for a partial update.
#[derive(Debug, Default)]
pub(crate) struct UpdateBuilder {
    assignments: Vec<String>,
    values: Vec<Value>,
}

impl UpdateBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set<V: Into<Value>>(&mut self, column: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.assignments.push(format!("{} = ?", column));
            self.values.push(value.into());
        }
        self
    }

    /// Run `UPDATE <table> ... WHERE id = ?`. Nothing to write means zero rows.
    pub(crate) fn execute(self, db: &DatabaseConnection, table: &str, id: i64) -> Result<usize> {
        if self.assignments.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            table,
            self.assignments.join(", ")
        );
        let mut values = self.values;
        values.push(Value::Integer(id));
        db.execute(&sql, params_from_iter(values)).into_affected()
    }
}
