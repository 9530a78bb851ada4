use rusqlite::params;

use crate::db::connection::DatabaseConnection;
use crate::db::models::{Album, AlbumInfo, AlbumPatch, Track, UNKNOWN_ARTIST, UNKNOWN_YEAR};
use crate::db::repositories::UpdateBuilder;
use crate::error::Result;

use super::tracks::TRACK_SELECT;

const ALBUM_COLUMNS: &str = "SELECT id, title, artist_id, year FROM albums";

pub struct AlbumRepository {
    db: DatabaseConnection,
}

impl AlbumRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn add(&self, title: &str, artist_id: Option<i64>, year: Option<i32>) -> Result<i64> {
        self.db
            .execute(
                "INSERT INTO albums (title, artist_id, year) VALUES (?1, ?2, ?3)",
                params![title, artist_id, year],
            )
            .into_new_id("album")
    }

    pub fn get(&self, album_id: i64) -> Result<Option<Album>> {
        self.db.query_optional(
            &format!("{} WHERE id = ?1", ALBUM_COLUMNS),
            params![album_id],
            Album::from_row,
        )
    }

    /// Natural-key lookup. A `None` artist only matches albums without one.
    pub fn get_by_title_and_artist(
        &self,
        title: &str,
        artist_id: Option<i64>,
    ) -> Result<Option<Album>> {
        self.db.query_optional(
            &format!(
                "{} WHERE title = ?1 AND artist_id IS ?2 ORDER BY id LIMIT 1",
                ALBUM_COLUMNS
            ),
            params![title, artist_id],
            Album::from_row,
        )
    }

    pub fn update(&self, album_id: i64, patch: &AlbumPatch) -> Result<usize> {
        let mut update = UpdateBuilder::new();
        update
            .set("title", patch.title.clone())
            .set("artist_id", patch.artist_id)
            .set("year", patch.year);
        update.execute(&self.db, "albums", album_id)
    }

    pub fn delete(&self, album_id: i64) -> Result<usize> {
        self.db
            .execute("DELETE FROM albums WHERE id = ?1", params![album_id])
            .into_affected()
    }

    pub fn get_all(&self) -> Result<Vec<Album>> {
        self.db.query(
            &format!("{} ORDER BY title", ALBUM_COLUMNS),
            [],
            Album::from_row,
        )
    }

    pub fn get_by_artist(&self, artist_id: i64) -> Result<Vec<Album>> {
        self.db.query(
            &format!("{} WHERE artist_id = ?1 ORDER BY year, title", ALBUM_COLUMNS),
            params![artist_id],
            Album::from_row,
        )
    }

    pub fn get_tracks(&self, album_id: i64) -> Result<Vec<Track>> {
        self.db.query(
            &format!("{} WHERE t.album_id = ?1 ORDER BY t.id", TRACK_SELECT),
            params![album_id],
            Track::from_row,
        )
    }

    pub fn get_info(&self, album_id: i64) -> Result<Option<AlbumInfo>> {
        self.db.query_optional(
            "SELECT al.id, al.title, al.year, a.name AS artist_name,
                    (SELECT COUNT(*) FROM tracks t WHERE t.album_id = al.id) AS track_count
             FROM albums al
             LEFT JOIN artists a ON a.id = al.artist_id
             WHERE al.id = ?1",
            params![album_id],
            |row| {
                let artist: Option<String> = row.get("artist_name")?;
                let year: Option<i32> = row.get("year")?;
                Ok(AlbumInfo {
                    id: row.get("id")?,
                    title: row.get("title")?,
                    artist: artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
                    year: year.map_or_else(|| UNKNOWN_YEAR.to_string(), |y| y.to_string()),
                    track_count: row.get("track_count")?,
                })
            },
        )
    }
}
