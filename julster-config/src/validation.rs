use std::collections::HashSet;
use std::fmt;

use julster_core::PlaylistRef;
use julster_core::wheel::{MAX_JITTER_FRACTION, MIN_FULL_TURNS};

use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hint {
            Some(hint) => write!(f, "{} ({hint})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(&mut self, message: S, hint: H) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

impl Settings {
    /// Checks that never block a session but usually mean a typo.
    pub fn validate(&self) -> ConfigWarnings {
        let mut warnings = ConfigWarnings::default();

        let playlist = self.game.playlist_url.trim();
        if playlist.is_empty() {
            warnings.push_with_hint(
                "no playlist configured",
                "run `julsterctl setup --playlist <url>`",
            );
        } else if PlaylistRef::parse(playlist).is_err() {
            warnings.push_with_hint(
                format!("'{playlist}' is not a Spotify playlist link"),
                "paste the share link of a playlist, e.g. https://open.spotify.com/playlist/<id>",
            );
        }

        let mut seen = HashSet::new();
        for category in &self.game.categories {
            let trimmed = category.trim();
            if trimmed.is_empty() {
                warnings.push("blank category is ignored");
            } else if !seen.insert(trimmed.to_lowercase()) {
                warnings.push(format!("category '{trimmed}' appears more than once"));
            }
        }

        let spin = &self.session.spin;
        if spin.min_turns < MIN_FULL_TURNS {
            warnings.push(format!(
                "spin.min_turns = {} is raised to {MIN_FULL_TURNS}",
                spin.min_turns
            ));
        }
        if spin.max_turns < spin.min_turns {
            warnings.push(format!(
                "spin.max_turns = {} is below spin.min_turns = {}",
                spin.max_turns, spin.min_turns
            ));
        }
        if !(spin.max_jitter_fraction.abs() < 0.5) {
            warnings.push(format!(
                "spin.max_jitter_fraction = {} is clamped to {MAX_JITTER_FRACTION}",
                spin.max_jitter_fraction
            ));
        }

        if self.session.pulse.warn_ms == 0 {
            warnings.push("pulse.warn_ms = 0 skips the yellow phase");
        }

        let spotify = &self.spotify;
        if spotify.access_token.is_none() {
            warnings.push_with_hint(
                "no Spotify access token",
                "set JULSTER_ACCESS_TOKEN or spotify.access_token",
            );
        }
        if spotify.refresh_token.is_some() && spotify.client_id.trim().is_empty() {
            warnings.push("spotify.refresh_token is set but spotify.client_id is empty");
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(warnings: &ConfigWarnings) -> Vec<String> {
        warnings.iter().map(|w| w.message.clone()).collect()
    }

    #[test]
    fn complete_settings_are_clean() {
        let mut settings = Settings::default();
        settings.game.playlist_url = "spotify:playlist:abc".into();
        settings.game.set_categories(["80s", "Movie"]);
        settings.spotify.access_token = Some("token".into());
        assert!(settings.validate().is_empty(), "{:?}", settings.validate());
    }

    #[test]
    fn flags_missing_and_invalid_playlists() {
        let settings = Settings::default();
        assert!(messages(&settings.validate()).contains(&"no playlist configured".to_string()));

        let mut settings = Settings::default();
        settings.game.playlist_url = "https://open.spotify.com/album/xyz".into();
        assert!(
            messages(&settings.validate())
                .iter()
                .any(|m| m.contains("not a Spotify playlist"))
        );
    }

    #[test]
    fn flags_category_and_tuning_mistakes() {
        let mut settings = Settings::default();
        settings.game.playlist_url = "spotify:playlist:abc".into();
        settings.spotify.access_token = Some("token".into());
        settings.game.categories = vec!["Duet".into(), " ".into(), "duet".into()];
        settings.session.spin.min_turns = 1;
        settings.session.spin.max_turns = 0;
        settings.session.spin.max_jitter_fraction = 0.5;
        settings.session.pulse.warn_ms = 0;

        let warnings = settings.validate();
        assert_eq!(warnings.len(), 6, "{warnings:?}");
    }
}
