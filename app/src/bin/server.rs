//! Headless overlay binary.
//!
//! Starts the chat adapters, the frame loop rendering to the terminal,
//! the axum status server and signal handling.

use std::time::Duration;

use now_playing::{PlaybackPoller, SpotifyAuth, SpotifyClient, SpotifyToken};
use tracing_subscriber::EnvFilter;

use unified_overlay_lib::app::SharedState;
use unified_overlay_lib::frame_loop::FrameLoop;
use unified_overlay_lib::presentation::ConsoleRenderer;
use unified_overlay_lib::{server, shutdown, sources};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting unified overlay (headless mode)");

    let config = unified_overlay_lib::init_foundation()?;
    let state = SharedState::new(config);

    let source_handles = sources::spawn_configured_sources(&state).await;

    let server_state = state.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::start_server(server_state).await {
            tracing::error!("Server failed: {e}");
        }
    });

    let poller = state.features().spotify_configured.then(|| {
        let config = state.config();
        let client = SpotifyClient::new(
            SpotifyAuth::new(
                config.spotify_client_id.clone(),
                config.spotify_client_secret.clone(),
            ),
            SpotifyToken::from_refresh_token(config.spotify_refresh_token.clone()),
        );
        PlaybackPoller::with_interval(client, Duration::from_secs(config.playback_poll_secs))
    });
    let commands = state
        .take_command_receiver()
        .await
        .ok_or_else(|| anyhow::anyhow!("command receiver already taken"))?;
    let frame_loop = FrameLoop::new(
        state.clone(),
        commands,
        poller,
        ConsoleRenderer::new(std::io::stdout()),
    );
    let frame_handle = tokio::spawn(frame_loop.run());

    tracing::info!(
        port = state.server_port(),
        "Headless server running. Press Ctrl+C to stop."
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    shutdown::graceful_shutdown(&state, source_handles).await;
    if let Err(e) = frame_handle.await {
        tracing::warn!("Frame loop task failed: {e}");
    }
    if let Err(e) = server_handle.await {
        tracing::warn!("Server task failed: {e}");
    }
    Ok(())
}
