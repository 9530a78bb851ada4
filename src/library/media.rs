// Managed media storage: audio and cover copies under the media root
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{LibraryError, Result};

pub const AUDIO_FOLDER: &str = "audio";
pub const COVERS_FOLDER: &str = "covers";

/// Which managed subfolder a file goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Cover,
}

/// Copies incoming files into `<root>/audio` and `<root>/covers` under
/// freshly generated names. Identical content imported twice yields two
/// distinct managed files.
#[derive(Debug, Clone)]
pub struct MediaFileManager {
    root: PathBuf,
    audio_folder: PathBuf,
    covers_folder: PathBuf,
}

impl MediaFileManager {
    /// Create the folder structure under `root` if it is missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let manager = Self {
            audio_folder: root.join(AUDIO_FOLDER),
            covers_folder: root.join(COVERS_FOLDER),
            root,
        };
        for folder in [&manager.audio_folder, &manager.covers_folder] {
            fs::create_dir_all(folder).map_err(|e| LibraryError::io(folder, e))?;
        }
        debug!(root = %manager.root.display(), "media folders ready");
        Ok(manager)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn folder(&self, kind: MediaKind) -> &Path {
        match kind {
            MediaKind::Audio => &self.audio_folder,
            MediaKind::Cover => &self.covers_folder,
        }
    }

    /// Copy `source` into managed storage and return the managed path.
    pub fn import(&self, source: &Path, kind: MediaKind) -> Result<PathBuf> {
        let destination = self.folder(kind).join(managed_file_name(source));
        fs::copy(source, &destination).map_err(|e| LibraryError::io(source, e))?;
        info!(
            source = %source.display(),
            managed = %destination.display(),
            "copied {:?} file",
            kind
        );
        Ok(destination)
    }

    pub fn import_audio(&self, source: &Path) -> Result<PathBuf> {
        self.import(source, MediaKind::Audio)
    }

    pub fn import_cover(&self, source: &Path) -> Result<PathBuf> {
        self.import(source, MediaKind::Cover)
    }

    /// Delete a managed file. A file that is already gone is skipped.
    ///
    /// Returns whether a file was removed.
    pub fn remove(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => {
                info!(path = %path.display(), "removed managed file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "managed file already missing");
                Ok(false)
            }
            Err(e) => Err(LibraryError::io(path, e)),
        }
    }
}

/// `<uuid>.<original extension>`, or just `<uuid>` when there is no extension.
fn managed_file_name(source: &Path) -> String {
    let id = Uuid::new_v4();
    match source.extension() {
        Some(ext) => format!("{}.{}", id, ext.to_string_lossy()),
        None => id.to_string(),
    }
}
