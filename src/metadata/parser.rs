//! Artist credits read from tags.
//!
//! A track has exactly one artist row, so the tag value is kept whole.
//! Punctuation such as `/`, `&` or `,` belongs to names like "AC/DC" or
//! "Earth, Wind & Fire". Only an explicit featuring credit is split off.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

fn featuring_credit() -> &'static Regex {
    static FEATURING: OnceLock<Regex> = OnceLock::new();
    FEATURING.get_or_init(|| {
        Regex::new(r"(?i)\s+(?:ft\.?|feat\.?|featuring)\s+").expect("featuring pattern is valid")
    })
}

/// An artist tag split into the credited artist and any featured guests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistCredit {
    pub artist: String,
    pub featured: Vec<String>,
}

/// Parse an artist tag. Returns `None` for a blank tag.
pub fn parse_artist_credit(tag: &str) -> Option<ArtistCredit> {
    let mut parts = featuring_credit()
        .split(tag)
        .map(str::trim)
        .filter(|part| !part.is_empty());
    let artist = parts.next()?.to_string();
    Some(ArtistCredit {
        artist,
        featured: parts.map(String::from).collect(),
    })
}

/// The name stored as the track's artist.
pub fn primary_artist(tag: &str) -> Option<String> {
    parse_artist_credit(tag).map(|credit| credit.artist)
}
