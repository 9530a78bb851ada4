// Library management module
// This module handles managed media storage, importing and the library façade

pub mod indexer;
pub mod media;
pub mod music_library;
pub mod scanner;

pub use indexer::{ImportProgress, ImportResult, LibraryIndexer};
pub use media::{MediaFileManager, MediaKind};
pub use music_library::MusicLibrary;
pub use scanner::DirectoryScanner;
