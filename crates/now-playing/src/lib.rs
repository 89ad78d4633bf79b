//! Now-playing state from the Spotify Web API.
//!
//! Provides the playback snapshot model, a cadence-driven poller with
//! track transition detection, fire-and-forget playback commands, OAuth
//! token refresh and best-effort cover art loading.

pub mod api;
pub mod artwork;
pub mod auth;
pub mod poller;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use api::SpotifyClient;
pub use artwork::{COVER_SIZE, CoverImage, ImageCache, decode_cover};
pub use auth::{SpotifyAuth, SpotifyToken};
pub use poller::{
    PlaybackCommander, PlaybackPoller, PollOutcome, PollerState, TransitionWindow,
    detect_transition,
};

/// Upper bound on any single HTTP request made by this crate.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// What the player reported at one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackSnapshot {
    pub title: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub cover_url: Option<String>,
    pub is_playing: bool,
    pub observed_at: DateTime<Utc>,
}

impl PlaybackSnapshot {
    /// Artist names joined for display.
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

/// Playback control requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Next,
    Previous,
    Pause,
    Start,
}

impl PlayerCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerCommand::Next => "next",
            PlayerCommand::Previous => "previous",
            PlayerCommand::Pause => "pause",
            PlayerCommand::Start => "start",
        }
    }
}

/// Unified error type for the now-playing crate.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication required")]
    AuthRequired,

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Access to a media player's playback state and controls.
pub trait PlayerApi: Send + Sync + 'static {
    /// Current playback, or `None` when nothing is playing.
    fn current_playback(
        &self,
    ) -> impl Future<Output = Result<Option<PlaybackSnapshot>, PlayerError>> + Send;

    fn send_command(
        &self,
        command: PlayerCommand,
    ) -> impl Future<Output = Result<(), PlayerError>> + Send;
}
