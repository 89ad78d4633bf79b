//! Unified chat overlay: Twitch, YouTube and TikTok chat merged into one
//! feed, alongside the Spotify track that is currently playing.

pub mod app;
pub mod config;
pub mod frame_loop;
pub mod presentation;
pub mod server;
pub mod shutdown;
pub mod sources;

use std::path::PathBuf;

use config::{AppConfig, check_feature_status};

const APP_DIR_NAME: &str = "unified-overlay";

/// Candidate `.env` locations, most specific first.
fn dotenv_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(".env"), PathBuf::from("../.env")];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR_NAME).join(".env"));
    }
    candidates
}

/// Load .env from multiple candidate paths.
fn load_dotenv() {
    for path in dotenv_candidates() {
        if dotenvy::from_path(&path).is_ok() {
            tracing::info!("Loaded .env from: {}", path.display());
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}

/// Load `.env`, read the runtime config and report what is enabled.
pub fn init_foundation() -> anyhow::Result<AppConfig> {
    load_dotenv();

    let config = AppConfig::load();
    let status = check_feature_status(&config);
    if !status.missing_settings.is_empty() {
        tracing::warn!(
            "Missing settings: {:?}, warnings: {:?}",
            status.missing_settings,
            status.warnings
        );
    }
    tracing::info!(
        twitch = status.twitch_configured,
        youtube = status.youtube_configured,
        tiktok = status.tiktok_configured,
        spotify = status.spotify_configured,
        "Settings loaded (port={})",
        config.server_port
    );
    Ok(config)
}
