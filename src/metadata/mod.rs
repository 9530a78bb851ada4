// Metadata module
// Reads tags from audio files and parses artist credits

pub mod extractor;
pub mod parser;

pub use extractor::{MetadataExtractor, TrackMetadata};
pub use parser::{parse_artist_credit, primary_artist, ArtistCredit};
