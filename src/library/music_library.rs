//! The library façade.
//!
//! [`MusicLibrary`] owns one [`DatabaseConnection`] and one
//! [`MediaFileManager`] and hands out the four repositories built on them.
//! It adds the get-or-create helpers used when ingesting tracks that only
//! carry textual artist and album names.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::db::connection::DatabaseConnection;
use crate::db::migrations::MigrationReport;
use crate::db::models::{Album, Artist, NewTrack};
use crate::db::repositories::{AlbumRepository, ArtistRepository, PlaylistRepository, TrackRepository};
use crate::error::Result;
use crate::format;
use crate::library::media::MediaFileManager;
use crate::metadata::TrackMetadata;
use crate::settings::LibrarySettings;

pub struct MusicLibrary {
    db: DatabaseConnection,
    artists: ArtistRepository,
    albums: AlbumRepository,
    tracks: TrackRepository,
    playlists: PlaylistRepository,
}

impl MusicLibrary {
    /// Open the database at `db_path` and the media folders under `media_root`,
    /// creating both if missing.
    pub fn new(db_path: impl Into<PathBuf>, media_root: impl Into<PathBuf>) -> Result<Self> {
        let db = DatabaseConnection::new(db_path)?;
        let media = MediaFileManager::new(media_root)?;
        info!(
            database = %db.path().display(),
            media_root = %media.root().display(),
            "opened music library"
        );
        Ok(Self {
            artists: ArtistRepository::new(db.clone()),
            albums: AlbumRepository::new(db.clone()),
            tracks: TrackRepository::new(db.clone(), media),
            playlists: PlaylistRepository::new(db.clone()),
            db,
        })
    }

    pub fn open(settings: &LibrarySettings) -> Result<Self> {
        Self::new(&settings.database_path, &settings.media_root)
    }

    pub fn database(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn media(&self) -> &MediaFileManager {
        self.tracks.media()
    }

    pub fn artists(&self) -> &ArtistRepository {
        &self.artists
    }

    pub fn albums(&self) -> &AlbumRepository {
        &self.albums
    }

    pub fn tracks(&self) -> &TrackRepository {
        &self.tracks
    }

    pub fn playlists(&self) -> &PlaylistRepository {
        &self.playlists
    }

    /// Copy the database file to a timestamped sibling.
    pub fn backup(&self) -> Result<PathBuf> {
        self.db.backup()
    }

    /// Rebuild the store with the current schema, carrying every row over.
    pub fn update_db(&self) -> Result<MigrationReport> {
        self.db.migrate()
    }

    /// Look up an artist by name, inserting it when absent.
    pub fn add_artist(&self, name: &str) -> Result<Artist> {
        if let Some(artist) = self.artists.get_by_name(name)? {
            return Ok(artist);
        }
        let id = self.artists.add(name)?;
        debug!(artist_id = id, name, "created artist");
        Ok(Artist {
            id,
            name: name.to_string(),
        })
    }

    /// Look up an album by title and artist, inserting it when absent.
    ///
    /// `year` is only used for a newly created album.
    pub fn add_album(&self, title: &str, artist_id: Option<i64>, year: Option<i32>) -> Result<Album> {
        if let Some(album) = self.albums.get_by_title_and_artist(title, artist_id)? {
            return Ok(album);
        }
        let id = self.albums.add(title, artist_id, year)?;
        debug!(album_id = id, title, "created album");
        Ok(Album {
            id,
            title: title.to_string(),
            artist_id,
            year,
        })
    }

    /// Ingest `source` using textual metadata: resolve (or create) the artist
    /// and album, then add the track with managed copies of its files.
    pub fn import_track(
        &self,
        source: &Path,
        metadata: &TrackMetadata,
        cover: Option<&Path>,
    ) -> Result<i64> {
        let artist = match metadata.artist.as_deref() {
            Some(name) => Some(self.add_artist(name)?),
            None => None,
        };
        let artist_id = artist.as_ref().map(|a| a.id);
        let album = match metadata.album.as_deref() {
            Some(title) => Some(self.add_album(title, artist_id, metadata.year)?),
            None => None,
        };

        let track = NewTrack {
            title: metadata.title.clone(),
            source_path: source.to_path_buf(),
            cover_source: cover.map(Path::to_path_buf),
            artist_id,
            album_id: album.map(|a| a.id),
            duration: metadata.duration,
            lyrics: metadata.lyrics.clone(),
        };
        self.tracks.add(&track)
    }

    /// `MM:SS`. Playlist totals use [`format::format_playlist_duration`] instead.
    pub fn format_duration(seconds: i64) -> String {
        format::format_duration(seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_library() -> (MusicLibrary, TempDir) {
        let dir = TempDir::new().unwrap();
        let library =
            MusicLibrary::new(dir.path().join("library.sqlite"), dir.path().join("media")).unwrap();
        (library, dir)
    }

    #[test]
    fn test_get_or_create_artist_is_idempotent() {
        let (library, _dir) = create_library();

        let first = library.add_artist("Nina Simone").unwrap();
        let second = library.add_artist("Nina Simone").unwrap();

        assert_eq!(first, second);
        assert_eq!(library.artists().get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_get_or_create_album_is_idempotent_without_artist() {
        let (library, _dir) = create_library();

        let first = library.add_album("Mixtape", None, Some(2001)).unwrap();
        let second = library.add_album("Mixtape", None, None).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.year, Some(2001));
        assert_eq!(library.albums().get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_import_track_links_artist_and_album() {
        let (library, dir) = create_library();
        let source = dir.path().join("sinnerman.mp3");
        fs::write(&source, b"audio").unwrap();
        let metadata = TrackMetadata {
            title: "Sinnerman".to_string(),
            artist: Some("Nina Simone".to_string()),
            album: Some("Pastel Blues".to_string()),
            year: Some(1965),
            duration: Some(622),
            lyrics: None,
        };

        let id = library.import_track(&source, &metadata, None).unwrap();
        let again = library.import_track(&source, &metadata, None).unwrap();

        assert_ne!(id, again);
        let info = library.tracks().get_info(id).unwrap().unwrap();
        assert_eq!(info.artist, "Nina Simone");
        assert_eq!(info.album, "Pastel Blues");
        assert_eq!(info.duration, "10:22");
        assert_eq!(library.albums().get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_format_duration_has_no_hour_segment() {
        assert_eq!(MusicLibrary::format_duration(3725), "62:05");
        assert_eq!(MusicLibrary::format_duration(125), "02:05");
    }
}
