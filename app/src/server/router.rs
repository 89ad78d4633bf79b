use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

use super::api;
use crate::app::SharedState;

/// Create the axum router with all routes.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        // --- Core ---
        .route("/status", get(status_handler))
        // --- Chat ---
        .route("/api/chat/history", get(api::chat::get_history))
        // --- Music ---
        .route("/api/music/status", get(api::music::get_music_status))
        .route("/api/music/control/{action}", post(api::music::music_control))
        // --- Middleware ---
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /status
pub async fn status_handler(State(state): State<SharedState>) -> Json<Value> {
    let sources: Vec<Value> = state
        .source_phases()
        .await
        .into_iter()
        .map(|(platform, phase)| json!({ "platform": platform, "state": phase }))
        .collect();

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "features": state.features(),
        "sources": sources,
    }))
}

#[cfg(test)]
mod tests {
    use chat_bus::Platform;
    use chat_sources::Phase;
    use tokio::sync::watch;

    use super::*;
    use crate::config::AppConfig;

    #[tokio::test]
    async fn status_reports_features_and_source_phases() {
        let config = AppConfig {
            twitch_channel: "somechannel".into(),
            ..Default::default()
        };
        let state = SharedState::new(config);
        let (tx, rx) = watch::channel(Phase::Connecting);
        state.register_source(Platform::Twitch, rx).await;
        tx.send_replace(Phase::Backoff {
            attempt: 2,
            delay_ms: 4000,
        });

        let Json(body) = status_handler(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["features"]["twitch_configured"], true);
        assert_eq!(body["features"]["spotify_configured"], false);
        assert_eq!(body["sources"][0]["platform"], "twitch");
        assert_eq!(body["sources"][0]["state"]["phase"], "backoff");
        assert_eq!(body["sources"][0]["state"]["delay_ms"], 4000);
    }
}
