//! Track and playlist identifiers plus the metadata shown once a song is
//! revealed.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BingoError, Result};

static PLAYLIST_URI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"spotify:playlist:([A-Za-z0-9_-]+)").expect("playlist uri regex should compile")
});
static PLAYLIST_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"playlist/([A-Za-z0-9_-]+)").expect("playlist path regex should compile")
});
static PLAYLIST_QUERY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[?&]id=([A-Za-z0-9_-]+)").expect("playlist query regex should compile")
});
static TRACK_LINK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"open\.spotify\.com/(?:intl-[a-z]{2}/)?track/([A-Za-z0-9]+)")
        .expect("track link regex should compile")
});

/// Spotify track URI, e.g. `spotify:track:4uLU6hMCjMI75M1A2tKUQC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Turn a scanned share link (`https://open.spotify.com/track/<id>`,
    /// optionally localised as `/intl-de/track/<id>`) into a track URI.
    /// Whitespace anywhere in the input is ignored.
    pub fn from_share_link(input: &str) -> Result<Self> {
        let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        TRACK_LINK_PATTERN
            .captures(&cleaned)
            .and_then(|caps| caps.get(1))
            .map(|id| Self(format!("spotify:track:{}", id.as_str())))
            .ok_or_else(|| BingoError::InvalidTrack(input.to_string()))
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Playlist identifier extracted from whatever the player pasted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistRef(String);

impl PlaylistRef {
    /// Accepts `spotify:playlist:<id>`, `https://open.spotify.com/playlist/<id>?si=…`
    /// or any URL carrying an `id=<id>` query parameter.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        [
            &*PLAYLIST_URI_PATTERN,
            &*PLAYLIST_PATH_PATTERN,
            &*PLAYLIST_QUERY_PATTERN,
        ]
        .iter()
        .find_map(|pattern| pattern.captures(input).and_then(|caps| caps.get(1)))
        .map(|id| Self(id.as_str().to_string()))
        .ok_or_else(|| BingoError::InvalidPlaylist(input.to_string()))
    }

    pub fn from_id(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaylistRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spotify:playlist:{}", self.0)
    }
}

/// Song details revealed to the table after the round starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub release_year: Option<u16>,
    /// Playlist collaborator who added the song.
    pub added_by: Option<String>,
}

impl TrackMetadata {
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }

    /// Year from a Spotify release date (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`).
    pub fn year_from_release_date(date: &str) -> Option<u16> {
        date.get(..4).and_then(|year| year.parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub metadata: TrackMetadata,
}

impl Track {
    pub fn new(id: TrackId, metadata: TrackMetadata) -> Self {
        Self { id, metadata }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_reference_formats() {
        let cases = [
            ("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M", "37i9dQZF1DXcBWIGoYBM5M"),
            (
                "https://open.spotify.com/playlist/37i9dQZF1DX0XUsuxWHRQd?si=abc123",
                "37i9dQZF1DX0XUsuxWHRQd",
            ),
            ("https://example.com/share?foo=1&id=my_list-01", "my_list-01"),
            ("  spotify:playlist:abc  ", "abc"),
        ];
        for (input, expected) in cases {
            assert_eq!(PlaylistRef::parse(input).unwrap().id(), expected, "{input}");
        }
    }

    #[test]
    fn rejects_non_playlist_input() {
        assert!(matches!(
            PlaylistRef::parse("https://open.spotify.com/album/xyz"),
            Err(BingoError::InvalidPlaylist(_))
        ));
        assert!(PlaylistRef::parse("").is_err());
    }

    #[test]
    fn share_links_become_track_uris() {
        let link = "https://open.spotify.com/intl-de/track/4uLU6hMCjMI75M1A2tKUQC?si=x";
        let id = TrackId::from_share_link(link).unwrap();
        assert_eq!(id.as_str(), "spotify:track:4uLU6hMCjMI75M1A2tKUQC");

        let spaced = TrackId::from_share_link(" https://open.spotify.com/ track/abc123 ").unwrap();
        assert_eq!(spaced.as_str(), "spotify:track:abc123");

        assert!(TrackId::from_share_link("https://example.com/track/abc").is_err());
    }

    #[test]
    fn release_year_takes_leading_digits() {
        assert_eq!(TrackMetadata::year_from_release_date("1997-05-12"), Some(1997));
        assert_eq!(TrackMetadata::year_from_release_date("2004"), Some(2004));
        assert_eq!(TrackMetadata::year_from_release_date("19"), None);
        assert_eq!(TrackMetadata::year_from_release_date(""), None);
    }
}
