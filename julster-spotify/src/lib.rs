//! Spotify Web API adapters for Julster.
//!
//! [`SpotifyClient`] implements both [`julster_core::TrackCatalog`] (playlist
//! paging) and [`julster_core::PlaybackService`] (start and pause on the
//! player's device), plus token refresh and a session check.

pub mod catalog;
pub mod client;
mod models;
pub mod playback;

pub use catalog::PAGE_LIMIT;
pub use client::{Credentials, SessionStatus, SpotifyClient};
pub use models::Profile;
