use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::error::Result;
use crate::library::music_library::MusicLibrary;
use crate::library::scanner::DirectoryScanner;
use crate::metadata::extractor::MetadataExtractor;
use crate::metadata::parser::primary_artist;

/// Result of an import run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResult {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub track_ids: Vec<i64>,
    pub errors: Vec<String>,
}

/// Progress update for importing
#[derive(Debug, Clone, Serialize)]
pub struct ImportProgress {
    pub current: usize,
    pub total: usize,
    pub current_file: String,
}

/// Feeds audio files through the library façade
pub struct LibraryIndexer;

impl LibraryIndexer {
    /// Import each file: read its tags, resolve artist and album, and add a
    /// managed copy. A failing file is recorded and the run continues.
    pub fn import_files_with_progress<P: AsRef<Path>, F>(
        paths: &[P],
        library: &MusicLibrary,
        mut progress_callback: F,
    ) -> ImportResult
    where
        F: FnMut(ImportProgress),
    {
        let mut result = ImportResult {
            total_files: paths.len(),
            ..Default::default()
        };

        for (index, path) in paths.iter().enumerate() {
            let path = path.as_ref();

            progress_callback(ImportProgress {
                current: index + 1,
                total: result.total_files,
                current_file: path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            });

            match Self::import_single_file(path, library) {
                Ok(track_id) => {
                    result.successful += 1;
                    result.track_ids.push(track_id);
                }
                Err(e) => {
                    warn!(path = %path.display(), "failed to import: {}", e);
                    result.failed += 1;
                    result.errors.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        info!(
            total = result.total_files,
            successful = result.successful,
            failed = result.failed,
            "import finished"
        );
        result
    }

    /// Scan `directory` for supported files and import them.
    pub fn import_directory<F>(
        directory: &Path,
        extensions: &[String],
        library: &MusicLibrary,
        progress_callback: F,
    ) -> Result<ImportResult>
    where
        F: FnMut(ImportProgress),
    {
        let files = DirectoryScanner::scan(directory, extensions)?;
        Ok(Self::import_files_with_progress(&files, library, progress_callback))
    }

    fn import_single_file(path: &Path, library: &MusicLibrary) -> Result<i64> {
        let mut metadata = MetadataExtractor::extract_from_file(path)?;
        // A featured guest does not own the track
        metadata.artist = metadata.artist.as_deref().and_then(primary_artist);
        library.import_track(path, &metadata, None)
    }
}
