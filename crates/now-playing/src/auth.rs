//! OAuth token refresh for the Spotify Web API.
//!
//! Access tokens live for an hour; they are renewed from the long-lived
//! refresh token shortly before they expire.

use chrono::Utc;
use serde::Deserialize;

use crate::PlayerError;

const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
/// Refresh when the token expires within this many seconds.
const REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Spotify OAuth token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds).
    pub expires_at: i64,
}

impl SpotifyToken {
    /// A token that only holds a refresh token; the first use refreshes it.
    pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: String::new(),
            refresh_token: refresh_token.into(),
            expires_at: 0,
        }
    }

    pub fn needs_refresh(&self, now: i64) -> bool {
        self.access_token.is_empty() || now >= self.expires_at - REFRESH_MARGIN_SECS
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// Refreshes Spotify access tokens with client credentials.
pub struct SpotifyAuth {
    client_id: String,
    client_secret: String,
    token_url: String,
    http: reqwest::Client,
}

impl SpotifyAuth {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            token_url: SPOTIFY_TOKEN_URL.into(),
            http: crate::http_client(crate::HTTP_TIMEOUT),
        }
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<SpotifyToken, PlayerError> {
        tracing::info!("Refreshing Spotify OAuth token");

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        parse_token_response(status.as_u16(), &body, refresh_token, Utc::now().timestamp())
    }

    /// Get a valid token, refreshing it if it expires within five minutes.
    ///
    /// Returns `Ok(None)` when `current` is still usable.
    pub async fn get_or_refresh_token(
        &self,
        current: &SpotifyToken,
    ) -> Result<Option<SpotifyToken>, PlayerError> {
        let now = Utc::now().timestamp();
        if !current.needs_refresh(now) {
            return Ok(None);
        }
        if current.refresh_token.is_empty() {
            return Err(PlayerError::AuthRequired);
        }
        let token = self.refresh_token(&current.refresh_token).await?;
        Ok(Some(token))
    }
}

/// Build a token from a token-endpoint response.
///
/// Spotify may omit `refresh_token`; the previous one stays valid then.
pub(crate) fn parse_token_response(
    status: u16,
    body: &str,
    previous_refresh: &str,
    now: i64,
) -> Result<SpotifyToken, PlayerError> {
    if !(200..300).contains(&status) {
        let err: ErrorResponse = serde_json::from_str(body).unwrap_or(ErrorResponse {
            error: Some(status.to_string()),
            error_description: Some(body.to_string()),
        });
        return Err(PlayerError::TokenRefreshFailed(format!(
            "{}: {}",
            err.error.unwrap_or_default(),
            err.error_description.unwrap_or_default()
        )));
    }

    let resp: TokenResponse = serde_json::from_str(body)
        .map_err(|e| PlayerError::TokenRefreshFailed(format!("failed to parse response: {e}")))?;

    Ok(SpotifyToken {
        access_token: resp.access_token,
        refresh_token: resp
            .refresh_token
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| previous_refresh.to_string()),
        expires_at: now + resp.expires_in,
    })
}
