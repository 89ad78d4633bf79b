//! Chat history API.

use axum::Json;
use axum::extract::{Query, State};
use chat_bus::ChatEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::ApiResult;
use crate::app::SharedState;
use crate::presentation::derive_color;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// One chat line with its author's display color.
#[derive(Debug, Serialize)]
struct HistoryLine<'a> {
    #[serde(flatten)]
    event: &'a ChatEvent,
    color: String,
}

/// GET /api/chat/history
///
/// Newest `limit` lines of the display log, oldest first.
pub async fn get_history(
    State(state): State<SharedState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult {
    let cap = state.config().max_chat_lines;
    let limit = query.limit.unwrap_or(cap).min(cap);
    let history = state.chat_history(limit).await;
    let messages: Vec<HistoryLine<'_>> = history
        .iter()
        .map(|event| HistoryLine {
            event,
            color: derive_color(event.author()).to_hex(),
        })
        .collect();
    Ok(Json(json!({
        "status": "ok",
        "count": messages.len(),
        "messages": messages,
    })))
}

#[cfg(test)]
mod tests {
    use chat_bus::{ChatEvent, Platform};

    use super::*;
    use crate::config::AppConfig;

    fn event(author: &str) -> ChatEvent {
        ChatEvent::new(Platform::YouTube, author, "hi").unwrap()
    }

    #[tokio::test]
    async fn returns_newest_lines_oldest_first() {
        let state = SharedState::new(AppConfig::default());
        state
            .set_chat_history(vec![event("a"), event("b"), event("c")])
            .await;

        let Json(body) = get_history(State(state), Query(HistoryQuery { limit: Some(2) }))
            .await
            .unwrap();
        assert_eq!(body["count"], 2);
        assert_eq!(body["messages"][0]["author"], "b");
        assert_eq!(body["messages"][1]["author"], "c");
        assert_eq!(body["messages"][1]["platform"], "youtube");
        assert_eq!(body["messages"][1]["text"], "hi");
    }

    #[tokio::test]
    async fn lines_carry_author_color() {
        let state = SharedState::new(AppConfig::default());
        state.set_chat_history(vec![event("b"), event("b")]).await;

        let Json(body) = get_history(State(state), Query(HistoryQuery::default()))
            .await
            .unwrap();
        let expected = derive_color("b").to_hex();
        assert_eq!(body["messages"][0]["color"], expected.as_str());
        assert_eq!(body["messages"][1]["color"], body["messages"][0]["color"]);
        assert!(expected.starts_with('#') && expected.len() == 7);
    }

    #[tokio::test]
    async fn empty_history() {
        let state = SharedState::new(AppConfig::default());
        let Json(body) = get_history(State(state), Query(HistoryQuery::default()))
            .await
            .unwrap();
        assert_eq!(body["count"], 0);
        assert_eq!(body["messages"], json!([]));
    }
}
