//! Start the chat adapters the configuration enables.

use chat_bus::Platform;
use chat_sources::irc::{IrcConfig, TwitchIrcSource};
use chat_sources::tiktok::{TikTokSource, WebcastConfig};
use chat_sources::youtube::{LongPollSource, YouTubeChatClient, YouTubeConfig};
use chat_sources::{SourceHandle, spawn_source};

use crate::app::SharedState;

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Spawn one adapter task per configured platform and register its
/// phase for the status endpoint.
pub async fn spawn_configured_sources(state: &SharedState) -> Vec<SourceHandle> {
    let config = state.config();
    let features = state.features();
    let shutdown = state.shutdown_token().clone();
    let mut handles = Vec::new();

    if features.twitch_configured {
        let irc = IrcConfig::twitch(
            &config.twitch_nick,
            non_empty(&config.twitch_oauth_token),
            &config.twitch_channel,
        );
        tracing::info!(channel = %irc.channel, "Starting Twitch chat");
        handles.push(spawn_source(
            TwitchIrcSource::new(irc),
            state.bus().publisher(),
            shutdown.clone(),
        ));
    }

    if features.youtube_configured {
        let client = YouTubeChatClient::new(YouTubeConfig {
            api_key: non_empty(&config.youtube_api_key),
            access_token: non_empty(&config.youtube_access_token),
            live_chat_id: non_empty(&config.youtube_live_chat_id),
        });
        tracing::info!("Starting YouTube live chat");
        handles.push(spawn_source(
            LongPollSource::new(client),
            state.bus().publisher(),
            shutdown.clone(),
        ));
    }

    if features.tiktok_configured {
        let webcast = WebcastConfig {
            relay_url: config.tiktok_relay_url.clone(),
            unique_id: config.tiktok_unique_id.clone(),
        };
        tracing::info!(unique_id = %webcast.unique_id, "Starting TikTok live comments");
        handles.push(spawn_source(
            TikTokSource::with_comments(webcast, state.bus().publisher()),
            state.bus().publisher(),
            shutdown.clone(),
        ));
    }

    for handle in &handles {
        state
            .register_source(handle.platform(), handle.phase_receiver())
            .await;
    }
    let platforms: Vec<Platform> = handles.iter().map(SourceHandle::platform).collect();
    tracing::info!(?platforms, "Chat sources started");
    handles
}

#[cfg(test)]
mod tests {
    use chat_sources::Phase;

    use super::*;
    use crate::config::AppConfig;

    #[tokio::test]
    async fn nothing_configured_starts_nothing() {
        let state = SharedState::new(AppConfig::default());
        let handles = spawn_configured_sources(&state).await;
        assert!(handles.is_empty());
        assert!(state.source_phases().await.is_empty());
    }

    #[tokio::test]
    async fn unusable_relay_stops_tiktok_adapter() {
        let config = AppConfig {
            tiktok_unique_id: "@someone".into(),
            tiktok_relay_url: "not a url".into(),
            ..Default::default()
        };
        let state = SharedState::new(config);
        let mut handles = spawn_configured_sources(&state).await;
        assert_eq!(handles.len(), 1);

        let handle = handles.remove(0);
        assert_eq!(handle.platform(), Platform::TikTok);
        assert!(handle.join().await.is_err());
        assert_eq!(
            state.source_phases().await,
            vec![(Platform::TikTok, Phase::Stopped)]
        );
    }
}
