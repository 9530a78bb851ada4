// Settings management and persistence
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{LibraryError, Result};

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_DATABASE: &str = "music_library.sqlite";
pub const DEFAULT_MEDIA_ROOT: &str = "media";

/// Import settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Lower-case extensions picked up when importing a directory
    pub supported_extensions: Vec<String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            supported_extensions: ["mp3", "flac", "ogg", "wav", "m4a", "aac", "opus", "wma"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// Where the library lives on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    pub version: i32, // Settings schema version for future migrations
    pub database_path: PathBuf,
    pub media_root: PathBuf,
    pub import: ImportSettings,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            version: 1,
            database_path: PathBuf::from(DEFAULT_DATABASE),
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
            import: ImportSettings::default(),
        }
    }
}

impl LibrarySettings {
    /// Settings file inside an application directory
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join(SETTINGS_FILE)
    }

    /// Load settings from `path`, or return defaults if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| LibraryError::io(path, e))?;
        let settings: LibrarySettings = serde_json::from_str(&content)
            .map_err(|e| LibraryError::Settings(format!("failed to parse {}: {}", path.display(), e)))?;

        info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| LibraryError::io(parent, e))?;
            }
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| LibraryError::Settings(format!("failed to serialize settings: {}", e)))?;
        fs::write(path, content).map_err(|e| LibraryError::io(path, e))?;

        info!(path = %path.display(), "saved settings");
        Ok(())
    }

    /// Relative paths are taken relative to `base` (usually the settings file's directory).
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        if self.database_path.is_relative() {
            self.database_path = base.join(&self.database_path);
        }
        if self.media_root.is_relative() {
            self.media_root = base.join(&self.media_root);
        }
        self
    }
}
