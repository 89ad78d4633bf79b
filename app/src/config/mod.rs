//! Configuration management: loading from `.env` + environment, validation.

pub mod app_config;
pub mod validation;

pub use app_config::AppConfig;
pub use validation::check_feature_status;

use serde::Serialize;

/// Feature availability status.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureStatus {
    pub twitch_configured: bool,
    pub youtube_configured: bool,
    pub tiktok_configured: bool,
    pub spotify_configured: bool,
    pub missing_settings: Vec<String>,
    pub warnings: Vec<String>,
}

impl FeatureStatus {
    pub fn any_chat_source(&self) -> bool {
        self.twitch_configured || self.youtube_configured || self.tiktok_configured
    }
}
