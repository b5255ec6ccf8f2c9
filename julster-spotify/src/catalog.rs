use async_trait::async_trait;
use julster_core::{CatalogError, PlaylistRef, Track, TrackCatalog};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::client::{SpotifyClient, error_body};
use crate::models::{PlaylistMeta, PlaylistPage};

/// Largest page the playlist tracks endpoint hands out.
pub const PAGE_LIMIT: u32 = 50;

fn transport(error: reqwest::Error) -> CatalogError {
    CatalogError::Transport(error.to_string())
}

#[async_trait]
impl TrackCatalog for SpotifyClient {
    /// Walk the playlist page by page. A failing page ends the walk early
    /// and whatever was collected so far is returned.
    async fn load_tracks(&self, playlist: &PlaylistRef) -> Result<Vec<Track>, CatalogError> {
        let token = self.bearer().await.ok_or(CatalogError::Unauthorized)?;

        let response = self
            .http
            .get(self.endpoint(&format!("playlists/{}", playlist.id())))
            .bearer_auth(&token)
            .query(&[("fields", "tracks.total")])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(CatalogError::Unauthorized);
        }
        if !status.is_success() {
            return Err(CatalogError::Request {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }
        let meta: PlaylistMeta = response
            .json()
            .await
            .map_err(|error| CatalogError::Decode(error.to_string()))?;

        let total = meta.total();
        let mut tracks = Vec::new();
        let mut offset = 0;
        while offset < total {
            let response = match self
                .http
                .get(self.endpoint(&format!("playlists/{}/tracks", playlist.id())))
                .bearer_auth(&token)
                .query(&[("limit", PAGE_LIMIT), ("offset", offset)])
                .send()
                .await
            {
                Ok(response) => response,
                Err(error) => {
                    warn!(%playlist, offset, %error, "playlist page request failed");
                    break;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = error_body(response).await;
                warn!(%playlist, offset, %status, %body, "playlist page rejected");
                break;
            }

            let page: PlaylistPage = match response.json().await {
                Ok(page) => page,
                Err(error) => {
                    warn!(%playlist, offset, %error, "malformed playlist page");
                    break;
                }
            };

            let fetched = page.items.len();
            tracks.extend(page.into_tracks());
            debug!(%playlist, offset, fetched, "playlist page loaded");

            offset += PAGE_LIMIT;
            if fetched == 0 {
                break;
            }
        }

        info!(%playlist, total, playable = tracks.len(), "playlist tracks fetched");
        Ok(tracks)
    }
}
