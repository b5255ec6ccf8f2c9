use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use julster_config::SpotifySettings;
use reqwest::{Client, Response, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::{Profile, TokenResponse};

/// OAuth tokens shared by every clone of a client.
#[derive(Clone, Default)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Outcome of [`SpotifyClient::check_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    LoggedIn(Profile),
    LoggedOut,
}

/// Spotify Web API client used for both the playlist catalog and playback.
#[derive(Clone, Debug)]
pub struct SpotifyClient {
    pub(crate) http: Client,
    api_base: Url,
    token_url: Url,
    client_id: String,
    pub(crate) device_id: Option<String>,
    pub(crate) device_wait: Duration,
    pub(crate) device_poll: Duration,
    credentials: Arc<RwLock<Credentials>>,
}

impl SpotifyClient {
    pub fn new(settings: &SpotifySettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs.max(1)))
            .build()
            .context("failed to create HTTP client")?;

        let api_base = Url::parse(settings.api_base.trim_end_matches('/'))
            .with_context(|| format!("invalid Spotify API base '{}'", settings.api_base))?;
        let token_url = Url::parse(&settings.token_url)
            .with_context(|| format!("invalid Spotify token URL '{}'", settings.token_url))?;

        info!(api_base = %api_base, "creating Spotify client");

        Ok(Self {
            http,
            api_base,
            token_url,
            client_id: settings.client_id.trim().to_string(),
            device_id: settings.device_id.clone().filter(|id| !id.trim().is_empty()),
            device_wait: Duration::from_millis(settings.device_wait_ms),
            device_poll: Duration::from_millis(settings.device_poll_ms.max(1)),
            credentials: Arc::new(RwLock::new(Credentials {
                access_token: settings.access_token.clone(),
                refresh_token: settings.refresh_token.clone(),
            })),
        })
    }

    /// Absolute URL for an API path such as `me/player/play`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub async fn set_access_token(&self, token: Option<String>) {
        self.credentials.write().await.access_token = token;
    }

    pub async fn credentials(&self) -> Credentials {
        self.credentials.read().await.clone()
    }

    pub(crate) async fn bearer(&self) -> Option<String> {
        self.credentials.read().await.access_token.clone()
    }

    /// Exchange the stored refresh token for a new access token.
    pub async fn refresh_access_token(&self) -> Result<()> {
        let refresh_token = self
            .credentials
            .read()
            .await
            .refresh_token
            .clone()
            .ok_or_else(|| anyhow!("no refresh token stored - please log in again"))?;
        if self.client_id.is_empty() {
            bail!("cannot refresh the access token without a client id");
        }

        let response = self
            .http
            .post(self.token_url.clone())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .context("token refresh request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            bail!("token refresh failed with status {status}: {body}");
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("malformed token refresh response")?;

        let mut credentials = self.credentials.write().await;
        credentials.access_token = Some(token.access_token);
        if let Some(rotated) = token.refresh_token {
            credentials.refresh_token = Some(rotated);
        }
        info!(expires_in = ?token.expires_in, "access token refreshed");
        Ok(())
    }

    /// Refresh the access token every `every` until the task is dropped.
    /// Failures are logged and retried on the next tick.
    pub async fn keep_token_fresh(self, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately; the current token is fresh.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(error) = self.refresh_access_token().await {
                warn!(error = %error, "scheduled token refresh failed");
            }
        }
    }

    /// Ask Spotify who is logged in. A 401 means the stored token is no
    /// longer valid.
    pub async fn check_session(&self) -> Result<SessionStatus> {
        let Some(token) = self.bearer().await else {
            return Ok(SessionStatus::LoggedOut);
        };

        let response = self
            .http
            .get(self.endpoint("me"))
            .bearer_auth(token)
            .send()
            .await
            .context("session check request failed")?;

        match response.status() {
            StatusCode::OK => {
                let profile: Profile = response.json().await.context("malformed profile response")?;
                debug!(user = %profile.id, "session is valid");
                Ok(SessionStatus::LoggedIn(profile))
            }
            StatusCode::UNAUTHORIZED => {
                self.set_access_token(None).await;
                Ok(SessionStatus::LoggedOut)
            }
            status => {
                let body = error_body(response).await;
                Err(anyhow!("Request failed with status {}: {}", status, body))
            }
        }
    }
}

pub(crate) async fn error_body(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string())
}
