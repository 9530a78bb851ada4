// Library schema definition
use rusqlite::Connection;

/// A table in a [`Schema`]: its name, column definitions and indexes.
#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    /// Everything between the parentheses of `CREATE TABLE`.
    pub definition: &'static str,
    /// `(index name, indexed columns)` pairs.
    pub indices: &'static [(&'static str, &'static str)],
}

impl TableSchema {
    pub fn create_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name, self.definition
        )
    }
}

/// Ordered table list plus the `user_version` stamped on creation.
///
/// Tables are created and migrated in declaration order, so referenced
/// tables must come before the tables that point at them.
#[derive(Debug)]
pub struct Schema {
    pub version: u32,
    pub tables: &'static [TableSchema],
}

pub const LIBRARY_SCHEMA: Schema = Schema {
    version: 1,
    tables: &[
        TableSchema {
            name: "artists",
            definition: "id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL",
            indices: &[],
        },
        TableSchema {
            name: "albums",
            definition: "id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                artist_id INTEGER,
                year INTEGER,
                FOREIGN KEY (artist_id) REFERENCES artists(id) ON DELETE SET NULL",
            indices: &[("idx_albums_artist", "artist_id")],
        },
        TableSchema {
            name: "tracks",
            definition: "id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                artist_id INTEGER,
                album_id INTEGER,
                duration INTEGER,
                file_path TEXT UNIQUE NOT NULL,
                cover_path TEXT,
                lyrics TEXT,
                FOREIGN KEY (artist_id) REFERENCES artists(id) ON DELETE SET NULL,
                FOREIGN KEY (album_id) REFERENCES albums(id) ON DELETE SET NULL",
            indices: &[
                ("idx_tracks_artist", "artist_id"),
                ("idx_tracks_album", "album_id"),
            ],
        },
        TableSchema {
            name: "playlists",
            definition: "id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL",
            indices: &[],
        },
        TableSchema {
            name: "playlist_tracks",
            definition: "playlist_id INTEGER NOT NULL,
                track_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (playlist_id, track_id),
                FOREIGN KEY (playlist_id) REFERENCES playlists(id) ON DELETE CASCADE,
                FOREIGN KEY (track_id) REFERENCES tracks(id) ON DELETE CASCADE",
            indices: &[("idx_playlist_tracks_position", "playlist_id, position")],
        },
    ],
};

impl Schema {
    /// Create every missing table and index.
    ///
    /// `user_version` is only stamped on a fresh database; an existing store
    /// keeps its version until it is migrated.
    pub fn create(&self, conn: &Connection) -> rusqlite::Result<()> {
        for table in self.tables {
            conn.execute(&table.create_sql(), [])?;
            for (index_name, columns) in table.indices {
                conn.execute(
                    &format!(
                        "CREATE INDEX IF NOT EXISTS {} ON {}({})",
                        index_name, table.name, columns
                    ),
                    [],
                )?;
            }
        }

        let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if current == 0 {
            conn.pragma_update(None, "user_version", self.version)?;
        }
        Ok(())
    }

    pub fn table_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tables.iter().map(|table| table.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<String>>>()
            .unwrap()
    }

    #[test]
    fn test_create_builds_all_tables() {
        let conn = Connection::open_in_memory().unwrap();

        LIBRARY_SCHEMA.create(&conn).unwrap();

        assert_eq!(
            table_names(&conn),
            vec!["albums", "artists", "playlist_tracks", "playlists", "tracks"]
        );
    }

    #[test]
    fn test_create_is_idempotent_and_stamps_version_once() {
        let conn = Connection::open_in_memory().unwrap();
        LIBRARY_SCHEMA.create(&conn).unwrap();
        conn.pragma_update(None, "user_version", 7).unwrap();

        LIBRARY_SCHEMA.create(&conn).unwrap();

        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, 7);
    }

    #[test]
    fn test_tables_are_ordered_parents_first() {
        let names: Vec<_> = LIBRARY_SCHEMA.table_names().collect();
        let position = |name: &str| names.iter().position(|n| *n == name).unwrap();

        assert!(position("artists") < position("albums"));
        assert!(position("albums") < position("tracks"));
        assert!(position("tracks") < position("playlist_tracks"));
        assert!(position("playlists") < position("playlist_tracks"));
    }
}
