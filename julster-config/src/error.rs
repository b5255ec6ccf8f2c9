use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to load settings: {0}")]
    Settings(#[source] anyhow::Error),
    #[error("failed to write settings to {path}")]
    Save {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("invalid playlist reference '{input}'")]
    InvalidPlaylist {
        input: String,
        #[source]
        source: julster_core::BingoError,
    },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}
