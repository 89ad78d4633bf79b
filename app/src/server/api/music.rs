//! Now-playing status and playback control API.

use axum::Json;
use axum::extract::{Path, State};
use serde_json::json;
use tokio::sync::mpsc::error::TrySendError;

use super::{ApiResult, err_json};
use crate::app::SharedState;
use crate::frame_loop::ControlAction;

/// GET /api/music/status
pub async fn get_music_status(State(state): State<SharedState>) -> ApiResult {
    let view = state.playback().await;
    Ok(Json(json!({
        "status": "ok",
        "enabled": state.features().spotify_configured,
        "data": view,
    })))
}

/// POST /api/music/control/{action}
///
/// Queues the command for the frame loop and returns immediately; the
/// outcome only shows up in later polls.
pub async fn music_control(
    State(state): State<SharedState>,
    Path(action): Path<String>,
) -> ApiResult {
    let parsed = action
        .parse::<ControlAction>()
        .map_err(|e| err_json(400, &e.to_string()))?;
    if !state.features().spotify_configured {
        return Err(err_json(503, "Spotify is not configured"));
    }

    match state.command_sender().try_send(parsed) {
        Ok(()) => Ok(Json(json!({ "status": "ok", "action": parsed.as_str() }))),
        Err(TrySendError::Full(_)) => Err(err_json(429, "Too many pending playback commands")),
        Err(TrySendError::Closed(_)) => Err(err_json(503, "Playback control is not running")),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::config::AppConfig;

    fn spotify_config() -> AppConfig {
        AppConfig {
            spotify_client_id: "id".into(),
            spotify_client_secret: "secret".into(),
            spotify_refresh_token: "refresh".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn control_queues_action_for_frame_loop() {
        let state = SharedState::new(spotify_config());
        let mut rx = state.take_command_receiver().await.unwrap();

        let Json(body) = music_control(State(state), Path("next".into()))
            .await
            .unwrap();
        assert_eq!(body["action"], "next");
        assert_eq!(rx.try_recv().unwrap(), ControlAction::Next);
    }

    #[tokio::test]
    async fn unknown_action_is_bad_request() {
        let state = SharedState::new(spotify_config());
        let (status, Json(body)) = music_control(State(state), Path("rewind".into()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn control_without_spotify_is_unavailable() {
        let state = SharedState::new(AppConfig::default());
        let (status, _) = music_control(State(state), Path("toggle".into()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn status_reports_empty_playback() {
        let state = SharedState::new(AppConfig::default());
        let Json(body) = get_music_status(State(state)).await.unwrap();
        assert_eq!(body["enabled"], false);
        assert_eq!(body["data"]["snapshot"], serde_json::Value::Null);
        assert_eq!(body["data"]["track_changed"], false);
    }
}
