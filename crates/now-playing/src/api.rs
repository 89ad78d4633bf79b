//! Spotify Web API player endpoints.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::CONTENT_LENGTH;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::auth::{SpotifyAuth, SpotifyToken};
use crate::{PlaybackSnapshot, PlayerApi, PlayerCommand, PlayerError};

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

#[derive(Debug, Deserialize)]
struct PlaybackResponse {
    #[serde(default)]
    is_playing: bool,
    item: Option<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    name: Option<String>,
    #[serde(default)]
    artists: Vec<NamedEntity>,
    album: Option<Album>,
}

#[derive(Debug, Deserialize)]
struct NamedEntity {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Album {
    name: Option<String>,
    #[serde(default)]
    images: Vec<AlbumImage>,
}

#[derive(Debug, Deserialize)]
struct AlbumImage {
    url: Option<String>,
}

/// Parse a `GET /me/player` body.
///
/// Returns `None` when no track is loaded (for example during an ad).
pub fn parse_playback(
    body: &str,
    observed_at: DateTime<Utc>,
) -> Result<Option<PlaybackSnapshot>, PlayerError> {
    let resp: PlaybackResponse = serde_json::from_str(body)?;
    let Some(item) = resp.item else {
        return Ok(None);
    };
    let Some(title) = item.name.filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    let artists = item.artists.into_iter().filter_map(|a| a.name).collect();
    let (album, cover_url) = match item.album {
        Some(album) => (
            album.name,
            // Spotify lists the largest image first.
            album.images.into_iter().find_map(|i| i.url),
        ),
        None => (None, None),
    };
    Ok(Some(PlaybackSnapshot {
        title,
        artists,
        album,
        cover_url,
        is_playing: resp.is_playing,
        observed_at,
    }))
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    auth: SpotifyAuth,
    token: RwLock<SpotifyToken>,
}

/// Spotify player client. Cheap to clone.
#[derive(Clone)]
pub struct SpotifyClient {
    inner: Arc<ClientInner>,
}

impl SpotifyClient {
    pub fn new(auth: SpotifyAuth, token: SpotifyToken) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http: crate::http_client(crate::HTTP_TIMEOUT),
                base_url: SPOTIFY_API_BASE.into(),
                auth,
                token: RwLock::new(token),
            }),
        }
    }

    /// A valid access token, refreshed first if it is about to expire.
    async fn access_token(&self) -> Result<String, PlayerError> {
        {
            let token = self.inner.token.read().await;
            if !token.needs_refresh(Utc::now().timestamp()) {
                return Ok(token.access_token.clone());
            }
        }
        let mut token = self.inner.token.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(fresh) = self.inner.auth.get_or_refresh_token(&token).await? {
            *token = fresh;
        }
        Ok(token.access_token.clone())
    }

    /// Force a refresh on the next request.
    async fn invalidate_token(&self) {
        self.inner.token.write().await.expires_at = 0;
    }

    async fn api_error(&self, status: StatusCode, body: String) -> PlayerError {
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Spotify returned 401, token will be refreshed");
            self.invalidate_token().await;
        }
        PlayerError::Api {
            status: status.as_u16(),
            message: body,
        }
    }
}

impl PlayerApi for SpotifyClient {
    async fn current_playback(&self) -> Result<Option<PlaybackSnapshot>, PlayerError> {
        let token = self.access_token().await?;
        let url = format!("{}/me/player", self.inner.base_url);
        let resp = self.inner.http.get(&url).bearer_auth(&token).send().await?;

        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(self.api_error(status, body).await);
        }
        parse_playback(&body, Utc::now())
    }

    async fn send_command(&self, command: PlayerCommand) -> Result<(), PlayerError> {
        let token = self.access_token().await?;
        let base = &self.inner.base_url;
        let http = &self.inner.http;
        let req = match command {
            PlayerCommand::Next => http.post(format!("{base}/me/player/next")),
            PlayerCommand::Previous => http.post(format!("{base}/me/player/previous")),
            PlayerCommand::Pause => http.put(format!("{base}/me/player/pause")),
            PlayerCommand::Start => http.put(format!("{base}/me/player/play")),
        };
        let resp = req
            .bearer_auth(&token)
            .header(CONTENT_LENGTH, 0)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(self.api_error(status, body).await);
        }
        tracing::debug!(command = command.as_str(), "Spotify command sent");
        Ok(())
    }
}
