// Metadata extractor using lofty with id3 fallback for problematic MP3 files
use id3::TagLike;
use lofty::prelude::{Accessor, AudioFile, ItemKey, TaggedFileExt};
use lofty::probe::Probe;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{LibraryError, Result};

/// Textual metadata read from an audio file, ready for ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    /// Whole seconds
    pub duration: Option<i64>,
    pub lyrics: Option<String>,
}

pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn extract_from_file(file_path: &Path) -> Result<TrackMetadata> {
        if !file_path.is_file() {
            return Err(LibraryError::Metadata {
                path: file_path.to_path_buf(),
                message: "not a readable file".to_string(),
            });
        }

        let probed = Probe::open(file_path)
            .and_then(|probe| probe.guess_file_type().map_err(Into::into))
            .and_then(|probe| probe.read());
        let tagged_file = match probed {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %file_path.display(), "lofty could not read file: {}", e);
                return Ok(Self::extract_with_fallback(file_path));
            }
        };

        let tag = tagged_file.primary_tag().or(tagged_file.first_tag());
        let properties = tagged_file.properties();

        let title = tag
            .and_then(|t| t.title().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| file_stem(file_path));
        let artist = tag.and_then(|t| non_empty(t.artist().as_deref()));
        let album = tag.and_then(|t| non_empty(t.album().as_deref()));

        // Malformed year frames: fall back to the first four digits of the raw date
        let year = tag.and_then(|t| {
            t.year().map(|y| y as i32).or_else(|| {
                t.get_string(&ItemKey::Year)
                    .or_else(|| t.get_string(&ItemKey::RecordingDate))
                    .and_then(|raw| raw.chars().take(4).collect::<String>().parse::<i32>().ok())
            })
        });
        let lyrics = tag.and_then(|t| non_empty(t.get_string(&ItemKey::Lyrics)));

        let seconds = properties.duration().as_secs() as i64;
        let duration = (seconds > 0).then_some(seconds);

        Ok(TrackMetadata {
            title,
            artist,
            album,
            year,
            duration,
            lyrics,
        })
    }

    /// id3 for MP3 files, minimal info for everything else
    fn extract_with_fallback(file_path: &Path) -> TrackMetadata {
        let extension = file_path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        if extension.as_deref() == Some("mp3") {
            match Self::extract_with_id3(file_path) {
                Ok(metadata) => {
                    debug!(path = %file_path.display(), "extracted metadata with id3 fallback");
                    return metadata;
                }
                Err(e) => debug!(path = %file_path.display(), "id3 fallback failed: {}", e),
            }
        }

        Self::minimal(file_path)
    }

    /// The id3 crate is more lenient with malformed tags
    fn extract_with_id3(file_path: &Path) -> std::result::Result<TrackMetadata, id3::Error> {
        let tag = id3::Tag::read_from_path(file_path)?;

        let title = non_empty(tag.title()).unwrap_or_else(|| file_stem(file_path));
        // TLEN is stored in milliseconds
        let duration = tag.duration().map(|ms| ms as i64 / 1000).filter(|s| *s > 0);
        let lyrics = tag.lyrics().next().and_then(|l| non_empty(Some(l.text.as_str())));

        Ok(TrackMetadata {
            title,
            artist: non_empty(tag.artist()),
            album: non_empty(tag.album()),
            year: tag.year(),
            duration,
            lyrics,
        })
    }

    fn minimal(file_path: &Path) -> TrackMetadata {
        TrackMetadata {
            title: file_stem(file_path),
            ..Default::default()
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown")
        .to_string()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
