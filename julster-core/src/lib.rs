//! # Julster Core
//!
//! Round engine for Julster, a music-bingo party game played against a
//! Spotify playlist.
//!
//! ## Overview
//!
//! A round goes like this: the host spins a wheel of categories, the wheel
//! lands on one, a random unplayed song from the playlist starts, and the
//! table guesses. Clicking the wheel again starts a two-phase countdown (the
//! "pulse"); when it runs out the song stops and a buzzer sounds.
//!
//! The crate is organized into:
//!
//! - [`wheel`]: segment geometry and the target angle for a chosen category
//! - [`animator`]: time-based spin animation with exactly-once completion
//! - [`round`]: the pure per-song state machine
//! - [`pulse`]: the countdown timer with single-fire expiry and cancel
//! - [`pool`]: no-repeat track selection
//! - [`session`]: the event loop tying it all to the [`collaborators`]
//!
//! Presentation, playback and configuration live behind the traits in
//! [`collaborators`]; this crate never touches a screen or a network.

pub mod animator;
pub mod catalog;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod pool;
pub mod pulse;
pub mod round;
pub mod session;
pub mod wheel;

pub use catalog::{PlaylistRef, Track, TrackId, TrackMetadata};
pub use collaborators::{
    AlertSink, CatalogError, ConfigurationSource, Notice, NoticeKind, Notifier, PlaybackError,
    PlaybackService, RenderSurface, Severity, TrackCatalog,
};
pub use config::{PulseConfig, SessionConfig, SpinConfig};
pub use error::{BingoError, Result};
pub use round::{RoundState, Transition};
pub use session::{BingoSession, Collaborators, RenderSnapshot, UserInput};
