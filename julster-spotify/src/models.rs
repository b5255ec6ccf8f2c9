//! Wire shapes of the Spotify Web API responses we read. Only the fields the
//! game needs are modelled; everything else is ignored.

use julster_core::{Track, TrackId, TrackMetadata};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlaylistMeta {
    #[serde(default)]
    tracks: Option<TrackTotal>,
}

#[derive(Debug, Default, Deserialize)]
struct TrackTotal {
    #[serde(default)]
    total: u32,
}

impl PlaylistMeta {
    pub(crate) fn total(&self) -> u32 {
        self.tracks.as_ref().map(|t| t.total).unwrap_or(0)
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlaylistPage {
    #[serde(default)]
    pub(crate) items: Vec<Option<PlaylistItem>>,
}

impl PlaylistPage {
    /// Playable tracks of this page: local files and entries without a URI
    /// are dropped.
    pub(crate) fn into_tracks(self) -> impl Iterator<Item = Track> {
        self.items.into_iter().flatten().filter_map(PlaylistItem::into_track)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistItem {
    #[serde(default)]
    is_local: bool,
    #[serde(default)]
    track: Option<TrackObject>,
    #[serde(default)]
    added_by: Option<UserRef>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artists: Vec<ArtistRef>,
    #[serde(default)]
    album: Option<AlbumRef>,
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    #[serde(default)]
    id: Option<String>,
}

impl PlaylistItem {
    fn into_track(self) -> Option<Track> {
        if self.is_local {
            return None;
        }
        let track = self.track?;
        let uri = track.uri.filter(|uri| !uri.is_empty())?;

        let album = track.album;
        let metadata = TrackMetadata {
            title: track.name.unwrap_or_default(),
            artists: track
                .artists
                .into_iter()
                .map(|artist| artist.name)
                .filter(|name| !name.is_empty())
                .collect(),
            release_year: album
                .as_ref()
                .and_then(|album| album.release_date.as_deref())
                .and_then(TrackMetadata::year_from_release_date),
            album: album.and_then(|album| album.name),
            added_by: self
                .added_by
                .and_then(|user| user.id)
                .filter(|id| !id.is_empty()),
        };

        Some(Track::new(TrackId::new(uri), metadata))
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DevicesResponse {
    #[serde(default)]
    pub(crate) devices: Vec<Device>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Device {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) is_active: bool,
    #[serde(default)]
    pub(crate) is_restricted: bool,
}

impl DevicesResponse {
    /// Prefer the active device, otherwise the first one that accepts
    /// remote commands.
    pub(crate) fn pick(&self) -> Option<&Device> {
        let usable = |device: &&Device| device.id.is_some() && !device.is_restricted;
        self.devices
            .iter()
            .filter(usable)
            .find(|device| device.is_active)
            .or_else(|| self.devices.iter().find(usable))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PlayRequest<'a> {
    pub(crate) uris: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    #[serde(default)]
    pub(crate) refresh_token: Option<String>,
    #[serde(default)]
    pub(crate) expires_in: Option<u64>,
}

/// The logged-in Spotify user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
}
