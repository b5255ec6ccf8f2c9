use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};
use julster_core::{ConfigurationSource, PlaylistRef, SessionConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigLoadError;

pub const CONFIG_PATH_VAR: &str = "JULSTER_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "JULSTER_CONFIG_JSON";
pub const ACCESS_TOKEN_VAR: &str = "JULSTER_ACCESS_TOKEN";
pub const REFRESH_TOKEN_VAR: &str = "JULSTER_REFRESH_TOKEN";
pub const CLIENT_ID_VAR: &str = "JULSTER_CLIENT_ID";

/// Where the settings came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SettingsSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Everything a Julster table needs: what to play, how the wheel and the
/// pulse behave, and how to reach Spotify.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Playlist and wheel categories, as entered on the setup screen.
    pub game: GameSettings,
    /// Spin and pulse tuning.
    pub session: SessionConfig,
    /// Spotify Web API access.
    pub spotify: SpotifySettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Playlist link or URI as pasted by the host.
    pub playlist_url: String,
    /// Wheel labels in display order. Leave empty to play without the wheel.
    pub categories: Vec<String>,
}

impl GameSettings {
    /// Store categories the way the setup screen does: trimmed, blanks
    /// dropped, order kept.
    pub fn set_categories<I, S>(&mut self, categories: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.categories = clean_categories(categories);
    }

    pub fn wheel_enabled(&self) -> bool {
        self.categories.iter().any(|c| !c.trim().is_empty())
    }

    pub fn playlist(&self) -> Option<PlaylistRef> {
        PlaylistRef::parse(&self.playlist_url).ok()
    }

    /// Set the playlist after checking that it names one.
    pub fn set_playlist(&mut self, input: &str) -> Result<PlaylistRef, ConfigLoadError> {
        let playlist = PlaylistRef::parse(input).map_err(|source| {
            ConfigLoadError::InvalidPlaylist {
                input: input.to_string(),
                source,
            }
        })?;
        self.playlist_url = input.trim().to_string();
        Ok(playlist)
    }
}

fn clean_categories<I, S>(categories: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    categories
        .into_iter()
        .map(|c| c.as_ref().trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifySettings {
    /// Base URL of the Web API, without trailing slash.
    pub api_base: String,
    /// OAuth token endpoint used for refreshes.
    pub token_url: String,
    /// OAuth client id the refresh token was issued to.
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Fixed playback device. When unset the first available device is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// How long to wait for a playback device to show up (ms).
    pub device_wait_ms: u64,
    /// Device poll cadence while waiting (ms).
    pub device_poll_ms: u64,
    pub request_timeout_secs: u64,
    /// Access token refresh cadence during a session (s). 0 disables it.
    pub refresh_interval_secs: u64,
}

impl Default for SpotifySettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.spotify.com/v1".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            client_id: String::new(),
            access_token: None,
            refresh_token: None,
            device_id: None,
            device_wait_ms: 6_000,
            device_poll_ms: 200,
            request_timeout_secs: 30,
            refresh_interval_secs: 30 * 60,
        }
    }
}

impl Settings {
    /// Load settings, honouring `.env`.
    /// Evaluation order:
    /// 1) `$JULSTER_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$JULSTER_CONFIG_JSON` (inline JSON),
    /// 3) the first of `julster.toml`, `julster.json`, `config/julster.toml`,
    /// 4) defaults.
    ///
    /// Token variables override whatever the source provided.
    pub fn load_from_env() -> Result<(Self, SettingsSource), ConfigLoadError> {
        load_dotenv()?;
        let (mut settings, source) = Self::resolve().map_err(ConfigLoadError::Settings)?;
        settings.apply_env_overrides(|key| env::var(key).ok());
        info!(?source, "settings loaded");
        Ok((settings, source))
    }

    /// Like [`Settings::load_from_env`], but an explicit path wins.
    pub fn load(path: Option<&Path>) -> Result<(Self, SettingsSource), ConfigLoadError> {
        let Some(path) = path else {
            return Self::load_from_env();
        };
        load_dotenv()?;
        let mut settings = Self::load_from_file(path).map_err(ConfigLoadError::Settings)?;
        settings.apply_env_overrides(|key| env::var(key).ok());
        Ok((settings, SettingsSource::File(path.to_path_buf())))
    }

    fn resolve() -> anyhow::Result<(Self, SettingsSource)> {
        if let Ok(path_str) = env::var(CONFIG_PATH_VAR)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let settings = Self::load_from_file(&path)?;
            return Ok((settings, SettingsSource::EnvPath(path)));
        }

        if let Ok(raw) = env::var(CONFIG_JSON_VAR)
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_VAR}"))?;
            return Ok((parsed, SettingsSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file() {
            let settings = Self::load_from_file(&path)?;
            return Ok((settings, SettingsSource::File(path)));
        }

        Ok((Self::default(), SettingsSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents)
                .with_context(|| format!("invalid settings {}", path.display())),
            Some("toml") => toml::from_str(&contents)
                .map_err(|err| anyhow!("invalid settings {}: {}", path.display(), err)),
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse settings {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).map_err(|err| anyhow!("invalid settings json: {err}"))
    }

    /// Write settings as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigLoadError> {
        self.write_toml(path).map_err(|source| ConfigLoadError::Save {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "settings saved");
        Ok(())
    }

    fn write_toml(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("failed to serialize settings")?;
        fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
    }

    fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(token) = non_empty(ACCESS_TOKEN_VAR) {
            debug!("access token taken from {ACCESS_TOKEN_VAR}");
            self.spotify.access_token = Some(token);
        }
        if let Some(token) = non_empty(REFRESH_TOKEN_VAR) {
            debug!("refresh token taken from {REFRESH_TOKEN_VAR}");
            self.spotify.refresh_token = Some(token);
        }
        if let Some(client_id) = non_empty(CLIENT_ID_VAR) {
            self.spotify.client_id = client_id;
        }
    }

    fn find_default_file() -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &["julster.toml", "julster.json", "config/julster.toml"];

        CANDIDATES
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(|path| path.to_path_buf())
    }
}

fn load_dotenv() -> Result<(), ConfigLoadError> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), "loaded .env");
            Ok(())
        }
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err.into()),
    }
}

impl ConfigurationSource for Settings {
    fn categories(&self) -> Vec<String> {
        clean_categories(&self.game.categories)
    }

    fn playlist_reference(&self) -> Option<PlaylistRef> {
        self.game.playlist()
    }
}
