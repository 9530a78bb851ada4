// Settings module

pub mod settings;

pub use settings::{ImportSettings, LibrarySettings};
