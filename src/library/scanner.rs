use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{LibraryError, Result};

/// Scanner for finding audio files in a directory tree
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// Walk `directory` recursively and return every file whose lower-cased
    /// extension is in `extensions`, sorted by path.
    ///
    /// Unreadable entries below the root are skipped with a warning.
    pub fn scan<P: AsRef<Path>>(directory: P, extensions: &[String]) -> Result<Vec<PathBuf>> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(LibraryError::io(
                directory,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let mut audio_files = Vec::new();
        for entry in WalkDir::new(directory).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %directory.display(), "skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let supported = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| extensions.iter().any(|allowed| *allowed == ext));
            if supported {
                audio_files.push(path.to_path_buf());
            }
        }

        debug!(root = %directory.display(), found = audio_files.len(), "scanned directory");
        Ok(audio_files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn extensions() -> Vec<String> {
        vec!["mp3".to_string(), "flac".to_string()]
    }

    #[test]
    fn test_scan_filters_by_extension_recursively() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        for name in ["one.mp3", "a/two.FLAC", "a/b/three.mp3", "a/notes.txt", "cover.jpg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let files = DirectoryScanner::scan(dir.path(), &extensions()).unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a/b/three.mp3", "a/two.FLAC", "one.mp3"]);
    }

    #[test]
    fn test_scan_missing_directory_fails() {
        let dir = TempDir::new().unwrap();

        let result = DirectoryScanner::scan(dir.path().join("nope"), &extensions());

        assert!(matches!(result, Err(LibraryError::Io { .. })));
    }
}
