//! Runtime application configuration loaded from the environment.

use super::validation::validate_setting;

pub const DEFAULT_TIKTOK_RELAY_URL: &str = "ws://127.0.0.1:8081/webcast";

/// Runtime configuration. Empty strings mean "not set".
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub twitch_channel: String,
    pub twitch_nick: String,
    pub twitch_oauth_token: String,
    pub youtube_api_key: String,
    pub youtube_access_token: String,
    pub youtube_live_chat_id: String,
    pub tiktok_unique_id: String,
    pub tiktok_relay_url: String,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_refresh_token: String,
    pub frame_rate: u32,
    pub playback_poll_secs: u64,
    pub track_change_display_secs: u64,
    pub max_chat_lines: usize,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            twitch_channel: String::new(),
            twitch_nick: String::new(),
            twitch_oauth_token: String::new(),
            youtube_api_key: String::new(),
            youtube_access_token: String::new(),
            youtube_live_chat_id: String::new(),
            tiktok_unique_id: String::new(),
            tiktok_relay_url: DEFAULT_TIKTOK_RELAY_URL.into(),
            spotify_client_id: String::new(),
            spotify_client_secret: String::new(),
            spotify_refresh_token: String::new(),
            frame_rate: 60,
            playback_poll_secs: 3,
            track_change_display_secs: 3,
            max_chat_lines: 30,
            server_port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from a key lookup.
    ///
    /// Numeric settings that fail validation fall back to their defaults
    /// with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let g = |key: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        let checked = |key: &str| -> String {
            let value = g(key);
            if value.is_empty() {
                return value;
            }
            match validate_setting(key, &value) {
                Ok(()) => value,
                Err(reason) => {
                    tracing::warn!(key, value = %value, reason = %reason, "Ignoring invalid setting");
                    String::new()
                }
            }
        };
        let defaults = Self::default();

        Self {
            twitch_channel: g("TWITCH_CHANNEL"),
            twitch_nick: g("TWITCH_NICK"),
            twitch_oauth_token: g("TWITCH_OAUTH_TOKEN"),
            youtube_api_key: g("YOUTUBE_API_KEY"),
            youtube_access_token: g("YOUTUBE_ACCESS_TOKEN"),
            youtube_live_chat_id: g("YOUTUBE_LIVE_CHAT_ID"),
            tiktok_unique_id: g("TIKTOK_UNIQUE_ID"),
            tiktok_relay_url: {
                let url = checked("TIKTOK_RELAY_URL");
                if url.is_empty() { defaults.tiktok_relay_url } else { url }
            },
            spotify_client_id: g("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: g("SPOTIFY_CLIENT_SECRET"),
            spotify_refresh_token: g("SPOTIFY_REFRESH_TOKEN"),
            frame_rate: parse_or(&checked("FRAME_RATE"), defaults.frame_rate),
            playback_poll_secs: parse_or(
                &checked("PLAYBACK_POLL_SECS"),
                defaults.playback_poll_secs,
            ),
            track_change_display_secs: parse_or(
                &checked("TRACK_CHANGE_DISPLAY_SECS"),
                defaults.track_change_display_secs,
            ),
            max_chat_lines: parse_or(&checked("MAX_CHAT_LINES"), defaults.max_chat_lines),
            server_port: parse_or(&checked("SERVER_PORT"), defaults.server_port),
        }
    }
}

fn parse_or<T: std::str::FromStr>(s: &str, default: T) -> T {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}
