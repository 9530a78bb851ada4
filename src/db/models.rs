// Data models
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_YEAR: &str = "Unknown Year";
pub const NO_LYRICS: &str = "No lyrics provided";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
}

impl Artist {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: i64,
    pub title: String,
    pub artist_id: Option<i64>,
    pub year: Option<i32>,
}

impl Album {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            artist_id: row.get("artist_id")?,
            year: row.get("year")?,
        })
    }
}

/// A track row joined with its artist name and album title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub title: String,
    pub artist_id: Option<i64>,
    pub album_id: Option<i64>,
    /// Length in seconds
    pub duration: Option<i64>,
    /// Managed copy of the audio file
    pub file_path: String,
    pub cover_path: Option<String>,
    pub lyrics: Option<String>,
    pub artist_name: Option<String>,
    pub album_title: Option<String>,
}

impl Track {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            artist_id: row.get("artist_id")?,
            album_id: row.get("album_id")?,
            duration: row.get("duration")?,
            file_path: row.get("file_path")?,
            cover_path: row.get("cover_path")?,
            lyrics: row.get("lyrics")?,
            artist_name: row.get("artist_name")?,
            album_title: row.get("album_title")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
}

impl Playlist {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }
}

/// A playlist member as listed in playlist order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    pub track_id: i64,
    pub title: String,
    pub duration: Option<i64>,
    pub artist_name: Option<String>,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistInfo {
    pub id: i64,
    pub name: String,
    pub albums_count: i64,
    pub tracks_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumInfo {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub year: String,
    pub track_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackInfo {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: String,
    pub file_path: String,
    pub cover_path: Option<String>,
    pub lyrics: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistInfo {
    pub id: i64,
    pub name: String,
    pub track_count: i64,
    pub total_duration: String,
}

/// Everything needed to add a track. The source files are copied into
/// managed storage; the row only ever references the copies.
#[derive(Debug, Clone, Default)]
pub struct NewTrack {
    pub title: String,
    pub source_path: PathBuf,
    pub cover_source: Option<PathBuf>,
    pub artist_id: Option<i64>,
    pub album_id: Option<i64>,
    pub duration: Option<i64>,
    pub lyrics: Option<String>,
}

impl NewTrack {
    pub fn new(title: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            title: title.into(),
            source_path: source_path.into(),
            ..Default::default()
        }
    }
}

// Partial updates: only `Some` fields are written.

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArtistPatch {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AlbumPatch {
    pub title: Option<String>,
    pub artist_id: Option<i64>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TrackPatch {
    pub title: Option<String>,
    pub artist_id: Option<i64>,
    pub album_id: Option<i64>,
    pub duration: Option<i64>,
    pub lyrics: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlaylistPatch {
    pub name: Option<String>,
}
