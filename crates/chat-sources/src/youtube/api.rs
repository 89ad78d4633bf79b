use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use super::{ChatItem, ChatPage, ChatPageSource};
use crate::SourceError;

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
/// Upper bound on one request, body included.
pub(super) const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// 403 reasons that clear up on their own.
const RATE_LIMIT_REASONS: &[&str] = &[
    "quotaExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "dailyLimitExceeded",
];

/// Credentials and target chat for the YouTube client.
#[derive(Debug, Clone, Default)]
pub struct YouTubeConfig {
    pub api_key: Option<String>,
    /// OAuth bearer token. Required to discover the active broadcast.
    pub access_token: Option<String>,
    /// Fixed chat id; discovered from the active broadcast when unset.
    pub live_chat_id: Option<String>,
}

/// REST client for `liveChat/messages`.
pub struct YouTubeChatClient {
    http: reqwest::Client,
    base_url: String,
    config: YouTubeConfig,
    live_chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagesResponse {
    #[serde(default)]
    items: Vec<MessageItem>,
    next_page_token: Option<String>,
    polling_interval_millis: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageItem {
    snippet: Option<MessageSnippet>,
    author_details: Option<AuthorDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageSnippet {
    display_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorDetails {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BroadcastsResponse {
    #[serde(default)]
    items: Vec<BroadcastItem>,
}

#[derive(Debug, Deserialize)]
struct BroadcastItem {
    snippet: Option<BroadcastSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BroadcastSnippet {
    live_chat_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
    #[serde(default)]
    errors: Vec<ErrorReason>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    errors: Vec<ErrorReason>,
}

#[derive(Debug, Deserialize)]
struct ErrorReason {
    reason: Option<String>,
}

/// Parse a `liveChat/messages` response body.
///
/// Items without a display name or message text are skipped.
pub fn parse_page(body: &str) -> Result<ChatPage, SourceError> {
    let resp: MessagesResponse = serde_json::from_str(body)?;
    let total = resp.items.len();
    let items: Vec<ChatItem> = resp
        .items
        .into_iter()
        .filter_map(|item| {
            let author = item.author_details?.display_name?;
            let text = item.snippet?.display_message?;
            Some(ChatItem { author, text })
        })
        .collect();
    if items.len() < total {
        tracing::debug!(
            skipped = total - items.len(),
            "Skipping YouTube chat items without author or text"
        );
    }
    Ok(ChatPage {
        items,
        next_cursor: resp.next_page_token.filter(|t| !t.is_empty()),
        min_wait: resp.polling_interval_millis.map(Duration::from_millis),
    })
}

pub(super) fn parse_live_chat_id(body: &str) -> Result<Option<String>, SourceError> {
    let resp: BroadcastsResponse = serde_json::from_str(body)?;
    Ok(resp
        .items
        .into_iter()
        .filter_map(|item| item.snippet?.live_chat_id)
        .find(|id| !id.is_empty()))
}

/// `reason` fields of a Google API error body. Unparseable bodies have none.
fn error_reasons(body: &str) -> Vec<String> {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .error
        .map(|e| e.errors)
        .unwrap_or_default()
        .into_iter()
        .chain(parsed.errors)
        .filter_map(|e| e.reason)
        .collect()
}

/// Map a non-success response to an error. Quota and rate limits are
/// transient even when reported as 403.
pub(super) fn classify_failure(status: StatusCode, body: String) -> SourceError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return SourceError::RateLimited(status.to_string());
    }
    if let Some(reason) = error_reasons(&body)
        .into_iter()
        .find(|r| RATE_LIMIT_REASONS.contains(&r.as_str()))
    {
        return SourceError::RateLimited(reason);
    }
    SourceError::Api {
        status: status.as_u16(),
        message: body,
    }
}

fn request_error(e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout
    } else {
        SourceError::Http(e)
    }
}

/// The chat is gone for good (stream ended or chat disabled).
pub(super) fn is_chat_gone(status: StatusCode, body: &str) -> bool {
    status == StatusCode::NOT_FOUND
        || (status == StatusCode::FORBIDDEN
            && (body.contains("liveChatEnded") || body.contains("liveChatDisabled")))
}

impl YouTubeChatClient {
    pub fn new(config: YouTubeConfig) -> Self {
        Self::with_base_url(config, YOUTUBE_API_BASE)
    }

    pub fn with_base_url(mut config: YouTubeConfig, base_url: &str) -> Self {
        config.live_chat_id = config.live_chat_id.filter(|id| !id.trim().is_empty());
        let live_chat_id = config.live_chat_id.clone();
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Falling back to default HTTP client");
                    reqwest::Client::new()
                }),
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
            live_chat_id,
        }
    }

    fn validate(&self) -> Result<(), SourceError> {
        if self.config.api_key.is_none() && self.config.access_token.is_none() {
            return Err(SourceError::Config(
                "YouTube requires an API key or an access token".into(),
            ));
        }
        if self.live_chat_id.is_none() && self.config.access_token.is_none() {
            return Err(SourceError::Config(
                "YouTube chat id discovery requires an access token".into(),
            ));
        }
        Ok(())
    }

    /// GET with the configured credentials. Returns status and body.
    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<(StatusCode, String), SourceError> {
        let url = format!("{}/{path}", self.base_url);
        let mut req = self.http.get(&url).query(query);
        if let Some(token) = &self.config.access_token {
            req = req.bearer_auth(token);
        } else if let Some(key) = &self.config.api_key {
            req = req.query(&[("key", key.as_str())]);
        }
        let resp = req.send().await.map_err(request_error)?;
        let status = resp.status();
        let body = resp.text().await.map_err(request_error)?;
        Ok((status, body))
    }

    async fn discover_chat_id(&self) -> Result<Option<String>, SourceError> {
        let (status, body) = self
            .get(
                "liveBroadcasts",
                &[("part", "snippet"), ("broadcastStatus", "active")],
            )
            .await?;
        if !status.is_success() {
            return Err(classify_failure(status, body));
        }
        let id = parse_live_chat_id(&body)?;
        match &id {
            Some(id) => tracing::info!(live_chat_id = %id, "Found active YouTube broadcast"),
            None => tracing::debug!("No active YouTube broadcast"),
        }
        Ok(id)
    }
}

impl ChatPageSource for YouTubeChatClient {
    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Option<ChatPage>, SourceError> {
        self.validate()?;
        if self.live_chat_id.is_none() {
            self.live_chat_id = self.discover_chat_id().await?;
        }
        let Some(chat_id) = self.live_chat_id.clone() else {
            return Ok(None);
        };

        let mut query = vec![
            ("liveChatId", chat_id.as_str()),
            ("part", "snippet,authorDetails"),
        ];
        if let Some(cursor) = cursor {
            query.push(("pageToken", cursor));
        }
        let (status, body) = self.get("liveChat/messages", &query).await?;

        if is_chat_gone(status, &body) {
            tracing::info!(live_chat_id = %chat_id, "YouTube live chat no longer available");
            // A configured id is kept; a discovered one is looked up again.
            if self.config.live_chat_id.is_none() {
                self.live_chat_id = None;
            }
            return Ok(None);
        }
        if !status.is_success() {
            return Err(classify_failure(status, body));
        }
        parse_page(&body).map(Some)
    }
}
