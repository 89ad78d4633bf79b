//! Live chat source adapters.
//!
//! Each adapter owns one connection to a platform feed, keeps it alive
//! with a capped exponential backoff, and publishes normalized
//! [`chat_bus::ChatEvent`]s. Three connection shapes are provided:
//! Twitch IRC (push stream), YouTube live chat (long-poll) and a
//! TikTok webcast relay (callback dispatch).

pub mod backoff;
pub mod irc;
pub mod runner;
pub mod tiktok;
pub mod youtube;

pub use runner::{ChatSource, Phase, SessionContext, SourceHandle, spawn_source};

/// Unified error type for the chat-sources crate.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Missing configuration: {0}")]
    Config(String),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Connection closed: {0}")]
    Closed(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl SourceError {
    /// Errors no amount of reconnecting will fix.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            SourceError::Api {
                status: 401 | 403,
                ..
            } | SourceError::AuthFailed(_)
                | SourceError::Config(_)
                | SourceError::UrlParse(_)
        )
    }
}
