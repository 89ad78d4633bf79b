//! Setting value validation and per-feature readiness.

use std::sync::LazyLock;

use regex::Regex;

use super::{AppConfig, FeatureStatus};

static RE_TWITCH_CHANNEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#?[A-Za-z0-9_]{2,25}$").unwrap());
static RE_WS_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^wss?://\S+$").unwrap());

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "TWITCH_CHANNEL" => {
            if !RE_TWITCH_CHANNEL.is_match(value) {
                return Err("must be 2-25 letters, digits or underscores".into());
            }
        }
        "TIKTOK_RELAY_URL" => {
            if !RE_WS_URL.is_match(value) {
                return Err("must be a ws:// or wss:// URL".into());
            }
        }
        "FRAME_RATE" => validate_int_range(value, 1, 240)?,
        "PLAYBACK_POLL_SECS" => validate_int_range(value, 1, 60)?,
        "TRACK_CHANGE_DISPLAY_SECS" => validate_int_range(value, 1, 60)?,
        "MAX_CHAT_LINES" => validate_int_range(value, 1, 500)?,
        "SERVER_PORT" => validate_int_range(value, 1, 65535)?,
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.parse().map_err(|_| "must be an integer")?;
    if !(min..=max).contains(&v) {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}

/// Decide which features have enough settings to start.
pub fn check_feature_status(config: &AppConfig) -> FeatureStatus {
    let mut status = FeatureStatus::default();

    // Twitch: channel is required; a token needs a nick to log in with.
    if config.twitch_channel.is_empty() {
        status.missing_settings.push("TWITCH_CHANNEL".into());
    } else if let Err(reason) = validate_setting("TWITCH_CHANNEL", &config.twitch_channel) {
        status.warnings.push(format!("TWITCH_CHANNEL {reason}"));
    } else if !config.twitch_oauth_token.is_empty() && config.twitch_nick.is_empty() {
        status.missing_settings.push("TWITCH_NICK".into());
    } else {
        status.twitch_configured = true;
        if config.twitch_oauth_token.is_empty() {
            status
                .warnings
                .push("TWITCH_OAUTH_TOKEN not set, joining chat anonymously".into());
        }
    }

    // YouTube: some credential, and a token when the chat id must be discovered.
    if config.youtube_api_key.is_empty() && config.youtube_access_token.is_empty() {
        status.missing_settings.push("YOUTUBE_API_KEY".into());
    } else if config.youtube_live_chat_id.is_empty() && config.youtube_access_token.is_empty() {
        status.missing_settings.push("YOUTUBE_LIVE_CHAT_ID".into());
    } else {
        status.youtube_configured = true;
    }

    if config.tiktok_unique_id.is_empty() {
        status.missing_settings.push("TIKTOK_UNIQUE_ID".into());
    } else {
        status.tiktok_configured = true;
    }

    let mut spotify_ready = true;
    for (key, value) in [
        ("SPOTIFY_CLIENT_ID", &config.spotify_client_id),
        ("SPOTIFY_CLIENT_SECRET", &config.spotify_client_secret),
        ("SPOTIFY_REFRESH_TOKEN", &config.spotify_refresh_token),
    ] {
        if value.is_empty() {
            status.missing_settings.push(key.into());
            spotify_ready = false;
        }
    }
    status.spotify_configured = spotify_ready;

    if !status.any_chat_source() {
        status
            .warnings
            .push("No chat source is configured, the feed will stay empty".into());
    }
    status
}
