use rusqlite::{params, Transaction};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::db::connection::DatabaseConnection;
use crate::db::models::{NewTrack, Track, TrackInfo, TrackPatch, NO_LYRICS, UNKNOWN_ALBUM, UNKNOWN_ARTIST};
use crate::db::ordering::removal_shift;
use crate::db::repositories::playlists::apply_shift;
use crate::db::repositories::UpdateBuilder;
use crate::error::{LibraryError, Result};
use crate::format::format_duration;
use crate::library::media::MediaFileManager;

/// Track columns joined with the artist name and album title.
pub(crate) const TRACK_SELECT: &str = "SELECT t.id, t.title, t.artist_id, t.album_id, t.duration,
        t.file_path, t.cover_path, t.lyrics,
        a.name AS artist_name, al.title AS album_title
    FROM tracks t
    LEFT JOIN artists a ON a.id = t.artist_id
    LEFT JOIN albums al ON al.id = t.album_id";

/// Tracks plus the managed audio and cover files they own.
pub struct TrackRepository {
    db: DatabaseConnection,
    media: MediaFileManager,
}

impl TrackRepository {
    pub fn new(db: DatabaseConnection, media: MediaFileManager) -> Self {
        Self { db, media }
    }

    pub fn media(&self) -> &MediaFileManager {
        &self.media
    }

    /// Copy the source files into managed storage, then insert the row.
    ///
    /// The row only references the managed copies. If the insert fails the
    /// copies are removed again.
    pub fn add(&self, track: &NewTrack) -> Result<i64> {
        let file_path = self.media.import_audio(&track.source_path)?;
        let cover_path = match &track.cover_source {
            Some(cover) => match self.media.import_cover(cover) {
                Ok(path) => Some(path),
                Err(e) => {
                    self.discard(&[Some(file_path)]);
                    return Err(e);
                }
            },
            None => None,
        };

        let inserted = self
            .db
            .execute(
                "INSERT INTO tracks (title, artist_id, album_id, duration, file_path, cover_path, lyrics)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    track.title,
                    track.artist_id,
                    track.album_id,
                    track.duration,
                    file_path.to_string_lossy().into_owned(),
                    cover_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
                    track.lyrics,
                ],
            )
            .into_inserted_id();

        match inserted {
            Ok(Some(id)) => {
                info!(track_id = id, title = %track.title, "added track");
                Ok(id)
            }
            Ok(None) => {
                self.discard(&[Some(file_path), cover_path]);
                Err(LibraryError::UnexpectedOutcome(
                    "track insert created no row".to_string(),
                ))
            }
            Err(e) => {
                self.discard(&[Some(file_path), cover_path]);
                Err(e)
            }
        }
    }

    pub fn get(&self, track_id: i64) -> Result<Option<Track>> {
        self.db.query_optional(
            &format!("{} WHERE t.id = ?1", TRACK_SELECT),
            params![track_id],
            Track::from_row,
        )
    }

    pub fn get_by_file_path(&self, file_path: &str) -> Result<Option<Track>> {
        self.db.query_optional(
            &format!("{} WHERE t.file_path = ?1", TRACK_SELECT),
            params![file_path],
            Track::from_row,
        )
    }

    pub fn get_all(&self) -> Result<Vec<Track>> {
        self.db.query(
            &format!("{} ORDER BY t.title", TRACK_SELECT),
            [],
            Track::from_row,
        )
    }

    pub fn update(&self, track_id: i64, patch: &TrackPatch) -> Result<usize> {
        let mut update = UpdateBuilder::new();
        update
            .set("title", patch.title.clone())
            .set("artist_id", patch.artist_id)
            .set("album_id", patch.album_id)
            .set("duration", patch.duration)
            .set("lyrics", patch.lyrics.clone());
        update.execute(&self.db, "tracks", track_id)
    }

    /// Remove the managed files, then the row.
    ///
    /// Every playlist containing the track is compacted in the same
    /// transaction as the row delete. Returns 0 when the track is unknown.
    pub fn delete(&self, track_id: i64) -> Result<usize> {
        let Some(track) = self.get(track_id)? else {
            return Ok(0);
        };

        self.media.remove(Path::new(&track.file_path))?;
        if let Some(cover) = &track.cover_path {
            self.media.remove(Path::new(cover))?;
        }

        let removed = self.db.transaction(|tx| {
            close_playlist_gaps(tx, track_id)?;
            Ok(tx.execute("DELETE FROM tracks WHERE id = ?1", params![track_id])?)
        })?;
        info!(track_id, "deleted track");
        Ok(removed)
    }

    pub fn get_info(&self, track_id: i64) -> Result<Option<TrackInfo>> {
        let Some(track) = self.get(track_id)? else {
            return Ok(None);
        };
        Ok(Some(TrackInfo {
            id: track.id,
            title: track.title,
            artist: track.artist_name.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: track.album_title.unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            duration: format_duration(track.duration.unwrap_or(0)),
            file_path: track.file_path,
            cover_path: track.cover_path,
            lyrics: track.lyrics.unwrap_or_else(|| NO_LYRICS.to_string()),
        }))
    }

    fn discard(&self, paths: &[Option<PathBuf>]) {
        for path in paths.iter().flatten() {
            if let Err(e) = self.media.remove(path) {
                warn!(path = %path.display(), "failed to discard managed copy: {}", e);
            }
        }
    }
}

/// Pull every later member back by one in each playlist holding `track_id`.
fn close_playlist_gaps(tx: &Transaction<'_>, track_id: i64) -> Result<()> {
    let mut stmt =
        tx.prepare("SELECT playlist_id, position FROM playlist_tracks WHERE track_id = ?1")?;
    let memberships = stmt
        .query_map(params![track_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for (playlist_id, position) in memberships {
        tx.execute(
            "DELETE FROM playlist_tracks WHERE playlist_id = ?1 AND track_id = ?2",
            params![playlist_id, track_id],
        )?;
        apply_shift(tx, playlist_id, removal_shift(position))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::create_test_db;
    use std::fs;
    use tempfile::TempDir;

    fn create_repo() -> (TrackRepository, DatabaseConnection, TempDir) {
        let (db, dir) = create_test_db();
        let media = MediaFileManager::new(dir.path().join("media")).unwrap();
        (TrackRepository::new(db.clone(), media), db, dir)
    }

    fn source_file(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"audio bytes").unwrap();
        path
    }

    #[test]
    fn test_add_references_managed_copy() {
        let (tracks, _db, dir) = create_repo();
        let source = source_file(&dir, "song.mp3");
        let cover = source_file(&dir, "cover.png");
        let mut new_track = NewTrack::new("Song", &source);
        new_track.cover_source = Some(cover.clone());

        let id = tracks.add(&new_track).unwrap();

        let track = tracks.get(id).unwrap().unwrap();
        assert_ne!(track.file_path, source.to_string_lossy());
        assert!(track.file_path.ends_with(".mp3"));
        assert!(Path::new(&track.file_path).starts_with(tracks.media().root()));
        assert!(Path::new(track.cover_path.as_ref().unwrap()).exists());
        assert_eq!(tracks.get_by_file_path(&track.file_path).unwrap(), Some(track));
    }

    #[test]
    fn test_same_source_twice_creates_two_tracks() {
        let (tracks, _db, dir) = create_repo();
        let source = source_file(&dir, "song.mp3");

        let first = tracks.add(&NewTrack::new("Song", &source)).unwrap();
        let second = tracks.add(&NewTrack::new("Song", &source)).unwrap();

        assert_ne!(first, second);
        assert_eq!(tracks.get_all().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_insert_discards_copies() {
        let (tracks, _db, dir) = create_repo();
        let source = source_file(&dir, "song.mp3");
        let mut new_track = NewTrack::new("Song", &source);
        new_track.artist_id = Some(404);

        let result = tracks.add(&new_track);

        assert!(matches!(result, Err(LibraryError::Storage(_))));
        let leftovers = fs::read_dir(tracks.media().folder(crate::library::media::MediaKind::Audio))
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_delete_removes_files_and_row() {
        let (tracks, _db, dir) = create_repo();
        let source = source_file(&dir, "song.mp3");
        let cover = source_file(&dir, "cover.jpg");
        let mut new_track = NewTrack::new("Song", &source);
        new_track.cover_source = Some(cover);
        let id = tracks.add(&new_track).unwrap();
        let track = tracks.get(id).unwrap().unwrap();

        assert_eq!(tracks.delete(id).unwrap(), 1);

        assert!(!Path::new(&track.file_path).exists());
        assert!(!Path::new(track.cover_path.as_ref().unwrap()).exists());
        assert_eq!(tracks.get(id).unwrap(), None);
        assert!(source.exists());
    }

    #[test]
    fn test_delete_with_missing_file_still_deletes_row() {
        let (tracks, _db, dir) = create_repo();
        let id = tracks.add(&NewTrack::new("Song", source_file(&dir, "a.mp3"))).unwrap();
        let track = tracks.get(id).unwrap().unwrap();
        fs::remove_file(&track.file_path).unwrap();

        assert_eq!(tracks.delete(id).unwrap(), 1);
        assert_eq!(tracks.delete(id).unwrap(), 0);
    }

    #[test]
    fn test_delete_compacts_playlists() {
        let (tracks, db, dir) = create_repo();
        let ids: Vec<i64> = (0..3)
            .map(|i| {
                tracks
                    .add(&NewTrack::new(format!("T{}", i), source_file(&dir, &format!("{}.mp3", i))))
                    .unwrap()
            })
            .collect();
        db.execute("INSERT INTO playlists (name) VALUES ('Mix')", []);
        for (position, track_id) in ids.iter().enumerate() {
            db.execute(
                "INSERT INTO playlist_tracks (playlist_id, track_id, position) VALUES (1, ?1, ?2)",
                params![track_id, position as i64 + 1],
            );
        }

        tracks.delete(ids[0]).unwrap();

        let positions = db
            .query(
                "SELECT track_id, position FROM playlist_tracks ORDER BY position",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .unwrap();
        assert_eq!(positions, vec![(ids[1], 1), (ids[2], 2)]);
    }

    #[test]
    fn test_info_defaults() {
        let (tracks, _db, dir) = create_repo();
        let id = tracks.add(&NewTrack::new("Song", source_file(&dir, "a.mp3"))).unwrap();

        let info = tracks.get_info(id).unwrap().unwrap();

        assert_eq!(info.artist, "Unknown Artist");
        assert_eq!(info.album, "Unknown Album");
        assert_eq!(info.duration, "00:00");
        assert_eq!(info.lyrics, "No lyrics provided");
        assert_eq!(tracks.get_info(id + 1).unwrap(), None);
    }

    #[test]
    fn test_update_and_info_duration() {
        let (tracks, _db, dir) = create_repo();
        let id = tracks.add(&NewTrack::new("Song", source_file(&dir, "a.mp3"))).unwrap();

        assert_eq!(tracks.update(id, &TrackPatch::default()).unwrap(), 0);
        let patch = TrackPatch {
            duration: Some(125),
            lyrics: Some("la la".to_string()),
            ..Default::default()
        };
        assert_eq!(tracks.update(id, &patch).unwrap(), 1);

        let info = tracks.get_info(id).unwrap().unwrap();
        assert_eq!(info.duration, "02:05");
        assert_eq!(info.lyrics, "la la");
        assert_eq!(info.title, "Song");
    }
}
