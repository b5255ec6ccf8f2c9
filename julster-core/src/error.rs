use thiserror::Error;

use crate::collaborators::{CatalogError, PlaybackError};
use crate::wheel::WheelError;

#[derive(Error, Debug)]
pub enum BingoError {
    #[error("Wheel error: {0}")]
    Wheel(#[from] WheelError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("No valid playlist configured")]
    MissingPlaylist,

    #[error("Invalid playlist reference: {0}")]
    InvalidPlaylist(String),

    #[error("Invalid track reference: {0}")]
    InvalidTrack(String),

    #[error("Session has no runtime: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, BingoError>;
