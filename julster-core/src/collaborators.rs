//! Ports the session drives but does not implement: playback, the track
//! catalog, configuration, notifications, rendering and the buzzer.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::{PlaylistRef, Track, TrackId};
use crate::session::RenderSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("No playback device became available within {0:?}")]
    NoDevice(Duration),

    #[error("Unauthorized - please log in again")]
    Unauthorized,

    #[error("Playback request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Unauthorized - please log in again")]
    Unauthorized,

    #[error("Catalog request failed with status {status}: {body}")]
    Request { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed catalog response: {0}")]
    Decode(String),
}

/// Starts and stops songs on the player's device.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait PlaybackService: Send + Sync {
    async fn start_playback(&self, track: &TrackId) -> Result<(), PlaybackError>;

    /// Best-effort. Callers log failures and carry on.
    async fn stop_playback(&self) -> Result<(), PlaybackError>;
}

/// Loads the candidate tracks of a playlist. May return an empty list.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    async fn load_tracks(&self, playlist: &PlaylistRef) -> Result<Vec<Track>, CatalogError>;
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait ConfigurationSource: Send + Sync {
    /// Wheel labels in display order. Empty disables the wheel.
    fn categories(&self) -> Vec<String>;

    fn playlist_reference(&self) -> Option<PlaylistRef>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    TracksLoaded,
    EmptyPlaylist,
    MissingPlaylist,
    CatalogFailed,
    Exhausted,
    PlaybackFailed,
}

/// User-facing feedback, fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }

    pub fn exhausted() -> Self {
        Self::new(
            NoticeKind::Exhausted,
            Severity::Warning,
            "No songs remaining in this playlist",
        )
    }

    pub fn playback_failed(error: &PlaybackError) -> Self {
        Self::new(
            NoticeKind::PlaybackFailed,
            Severity::Error,
            format!("Could not start the song: {error}"),
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Paints the wheel, category and track details. Never read back.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait RenderSurface: Send + Sync {
    fn render(&self, snapshot: &RenderSnapshot);
}

/// The buzzer.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait AlertSink: Send + Sync {
    fn sound_alert(&self);
}
