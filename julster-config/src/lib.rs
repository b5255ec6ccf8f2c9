//! Settings for Julster.
//!
//! Holds the playlist and wheel categories chosen at setup, the session
//! tuning from [`julster_core::SessionConfig`] and the Spotify access
//! details, and knows how to find, parse, validate and persist them.

pub mod error;
pub mod settings;
pub mod validation;

pub use error::ConfigLoadError;
pub use settings::{GameSettings, Settings, SettingsSource, SpotifySettings};
pub use validation::{ConfigWarning, ConfigWarnings};
