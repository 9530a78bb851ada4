// Musicsloth - music library data access
// Module declarations
pub mod db;
pub mod error;
pub mod format;
pub mod library;
pub mod metadata;
pub mod settings;

pub use db::connection::{DatabaseConnection, StatementOutcome};
pub use db::models::*;
pub use error::{LibraryError, Result};
pub use format::{format_duration, format_playlist_duration};
pub use library::{LibraryIndexer, MediaFileManager, MusicLibrary};
pub use settings::LibrarySettings;
