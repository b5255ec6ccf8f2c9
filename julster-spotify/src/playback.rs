use std::time::Duration;

use async_trait::async_trait;
use julster_core::{PlaybackError, PlaybackService, TrackId};
use reqwest::StatusCode;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::{SpotifyClient, error_body};
use crate::models::{DevicesResponse, PlayRequest};

fn transport(error: reqwest::Error) -> PlaybackError {
    PlaybackError::Transport(error.to_string())
}

/// Map the response of a play request. Only `204 No Content` counts as
/// started.
pub(crate) fn play_outcome(
    status: StatusCode,
    body: String,
    waited: Duration,
) -> Result<(), PlaybackError> {
    match status {
        StatusCode::NO_CONTENT => Ok(()),
        StatusCode::UNAUTHORIZED => Err(PlaybackError::Unauthorized),
        StatusCode::NOT_FOUND => Err(PlaybackError::NoDevice(waited)),
        status => Err(PlaybackError::Rejected {
            status: status.as_u16(),
            body,
        }),
    }
}

impl SpotifyClient {
    /// The configured device, or the first usable one Spotify reports within
    /// the device wait window.
    pub async fn wait_for_device(&self) -> Option<String> {
        if let Some(id) = &self.device_id {
            return Some(id.clone());
        }

        let deadline = Instant::now() + self.device_wait;
        loop {
            match self.available_device().await {
                Ok(Some(id)) => return Some(id),
                Ok(None) => debug!("no playback device available yet"),
                Err(error) => debug!(%error, "device lookup failed"),
            }
            if Instant::now() + self.device_poll > deadline {
                return None;
            }
            tokio::time::sleep(self.device_poll).await;
        }
    }

    async fn available_device(&self) -> Result<Option<String>, PlaybackError> {
        let token = self.bearer().await.ok_or(PlaybackError::Unauthorized)?;
        let response = self
            .http
            .get(self.endpoint("me/player/devices"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::OK => {
                let devices: DevicesResponse = response.json().await.map_err(transport)?;
                Ok(devices.pick().and_then(|device| {
                    debug!(device = %device.name, "playback device found");
                    device.id.clone()
                }))
            }
            StatusCode::UNAUTHORIZED => Err(PlaybackError::Unauthorized),
            status => Err(PlaybackError::Rejected {
                status: status.as_u16(),
                body: error_body(response).await,
            }),
        }
    }
}

#[async_trait]
impl PlaybackService for SpotifyClient {
    async fn start_playback(&self, track: &TrackId) -> Result<(), PlaybackError> {
        let token = self.bearer().await.ok_or(PlaybackError::Unauthorized)?;

        let mut request = self
            .http
            .put(self.endpoint("me/player/play"))
            .bearer_auth(&token)
            .json(&PlayRequest {
                uris: [track.as_str()],
            });
        match self.wait_for_device().await {
            Some(device) => request = request.query(&[("device_id", device)]),
            None => warn!("no playback device found, falling back to the active one"),
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = if status == StatusCode::NO_CONTENT {
            String::new()
        } else {
            error_body(response).await
        };

        play_outcome(status, body, self.device_wait)?;
        info!(track = %track, "playback started");
        Ok(())
    }

    async fn stop_playback(&self) -> Result<(), PlaybackError> {
        let token = self.bearer().await.ok_or(PlaybackError::Unauthorized)?;
        let response = self
            .http
            .put(self.endpoint("me/player/pause"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            status if status.is_success() => {
                debug!("playback paused");
                Ok(())
            }
            StatusCode::UNAUTHORIZED => Err(PlaybackError::Unauthorized),
            status => Err(PlaybackError::Rejected {
                status: status.as_u16(),
                body: error_body(response).await,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use julster_config::SpotifySettings;

    const WAIT: Duration = Duration::from_millis(6_000);

    #[test]
    fn only_no_content_counts_as_started() {
        assert_eq!(play_outcome(StatusCode::NO_CONTENT, String::new(), WAIT), Ok(()));
        assert_eq!(
            play_outcome(StatusCode::OK, "{}".into(), WAIT),
            Err(PlaybackError::Rejected {
                status: 200,
                body: "{}".into()
            })
        );
        assert_eq!(
            play_outcome(StatusCode::UNAUTHORIZED, String::new(), WAIT),
            Err(PlaybackError::Unauthorized)
        );
        assert_eq!(
            play_outcome(StatusCode::NOT_FOUND, String::new(), WAIT),
            Err(PlaybackError::NoDevice(WAIT))
        );
    }

    #[tokio::test]
    async fn configured_device_skips_polling() {
        let client = SpotifyClient::new(&SpotifySettings {
            device_id: Some("kitchen".into()),
            ..SpotifySettings::default()
        })
        .unwrap();
        assert_eq!(client.wait_for_device().await.as_deref(), Some("kitchen"));
    }

    #[tokio::test(start_paused = true)]
    async fn device_wait_gives_up_without_a_token() {
        let client = SpotifyClient::new(&SpotifySettings {
            device_wait_ms: 1_000,
            device_poll_ms: 200,
            ..SpotifySettings::default()
        })
        .unwrap();
        let started = Instant::now();
        assert_eq!(client.wait_for_device().await, None);
        assert!(started.elapsed() <= Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn playback_without_token_is_unauthorized() {
        let client = SpotifyClient::new(&SpotifySettings::default()).unwrap();
        let track = TrackId::new("spotify:track:1");
        assert_eq!(client.start_playback(&track).await, Err(PlaybackError::Unauthorized));
        assert_eq!(client.stop_playback().await, Err(PlaybackError::Unauthorized));
    }
}
