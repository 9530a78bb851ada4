use rusqlite::params;

use crate::db::connection::DatabaseConnection;
use crate::db::models::{Album, Artist, ArtistInfo, ArtistPatch, Track};
use crate::db::repositories::UpdateBuilder;
use crate::error::Result;

use super::tracks::TRACK_SELECT;

pub struct ArtistRepository {
    db: DatabaseConnection,
}

impl ArtistRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a new artist and return its id. Names are unique.
    pub fn add(&self, name: &str) -> Result<i64> {
        self.db
            .execute("INSERT INTO artists (name) VALUES (?1)", params![name])
            .into_new_id("artist")
    }

    pub fn get(&self, artist_id: i64) -> Result<Option<Artist>> {
        self.db.query_optional(
            "SELECT id, name FROM artists WHERE id = ?1",
            params![artist_id],
            Artist::from_row,
        )
    }

    pub fn get_by_name(&self, name: &str) -> Result<Option<Artist>> {
        self.db.query_optional(
            "SELECT id, name FROM artists WHERE name = ?1",
            params![name],
            Artist::from_row,
        )
    }

    pub fn update(&self, artist_id: i64, patch: &ArtistPatch) -> Result<usize> {
        let mut update = UpdateBuilder::new();
        update.set("name", patch.name.clone());
        update.execute(&self.db, "artists", artist_id)
    }

    /// Albums and tracks keep existing with their artist reference cleared.
    pub fn delete(&self, artist_id: i64) -> Result<usize> {
        self.db
            .execute("DELETE FROM artists WHERE id = ?1", params![artist_id])
            .into_affected()
    }

    pub fn get_all(&self) -> Result<Vec<Artist>> {
        self.db
            .query("SELECT id, name FROM artists ORDER BY name", [], Artist::from_row)
    }

    pub fn get_albums(&self, artist_id: i64) -> Result<Vec<Album>> {
        self.db.query(
            "SELECT id, title, artist_id, year FROM albums WHERE artist_id = ?1 ORDER BY year, title",
            params![artist_id],
            Album::from_row,
        )
    }

    pub fn get_tracks(&self, artist_id: i64) -> Result<Vec<Track>> {
        self.db.query(
            &format!("{} WHERE t.artist_id = ?1 ORDER BY t.title", TRACK_SELECT),
            params![artist_id],
            Track::from_row,
        )
    }

    pub fn get_info(&self, artist_id: i64) -> Result<Option<ArtistInfo>> {
        self.db.query_optional(
            "SELECT a.id, a.name,
                    (SELECT COUNT(*) FROM albums al WHERE al.artist_id = a.id) AS albums_count,
                    (SELECT COUNT(*) FROM tracks t WHERE t.artist_id = a.id) AS tracks_count
             FROM artists a
             WHERE a.id = ?1",
            params![artist_id],
            |row| {
                Ok(ArtistInfo {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    albums_count: row.get("albums_count")?,
                    tracks_count: row.get("tracks_count")?,
                })
            },
        )
    }
}
