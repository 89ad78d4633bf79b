//! YouTube live chat over cursor-paginated long-polling.
//!
//! Each request returns a page of messages, an optional cursor for the
//! next request and an optional server-dictated wait. The adapter never
//! requests again before that wait has elapsed.

mod api;

use std::future::Future;
use std::time::Duration;

use chat_bus::Platform;

pub use api::{YouTubeChatClient, YouTubeConfig, parse_page};

use crate::{ChatSource, SessionContext, SourceError};

/// Wait used when the server does not dictate one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Lower bound on any wait, even if the server asks for less.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// A page request unanswered for this long fails the session.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One display-ready message from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatItem {
    pub author: String,
    pub text: String,
}

/// One response of the chat-list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatPage {
    pub items: Vec<ChatItem>,
    pub next_cursor: Option<String>,
    pub min_wait: Option<Duration>,
}

/// Fetches chat pages. `Ok(None)` means there is no live chat right now.
pub trait ChatPageSource: Send + 'static {
    fn fetch_page(
        &mut self,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<Option<ChatPage>, SourceError>> + Send;
}

/// Long-poll adapter over any [`ChatPageSource`].
///
/// The cursor survives reconnects so a transient failure resumes where the
/// feed left off instead of replaying the backlog.
pub struct LongPollSource<F> {
    fetcher: F,
    cursor: Option<String>,
}

impl<F: ChatPageSource> LongPollSource<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cursor: None,
        }
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Apply one page and return how long to wait before the next request.
    fn apply_page(&mut self, page: Option<ChatPage>, ctx: &mut SessionContext) -> Duration {
        ctx.mark_streaming();
        let Some(page) = page else {
            if self.cursor.take().is_some() {
                tracing::info!("YouTube live chat ended");
            } else {
                tracing::debug!("No active YouTube live chat");
            }
            return DEFAULT_POLL_INTERVAL;
        };

        tracing::debug!(count = page.items.len(), "YouTube chat page");
        for item in &page.items {
            ctx.emit(&item.author, &item.text);
        }
        // Keep the last cursor when the server omits one.
        if let Some(next) = page.next_cursor {
            self.cursor = Some(next);
        }
        page.min_wait
            .unwrap_or(DEFAULT_POLL_INTERVAL)
            .max(MIN_POLL_INTERVAL)
    }
}

impl<F: ChatPageSource> ChatSource for LongPollSource<F> {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn session(&mut self, ctx: &mut SessionContext) -> Result<(), SourceError> {
        loop {
            let page = tokio::select! {
                _ = ctx.shutdown().cancelled() => return Ok(()),
                result = tokio::time::timeout(
                    FETCH_TIMEOUT,
                    self.fetcher.fetch_page(self.cursor.as_deref()),
                ) => result.map_err(|_| SourceError::Timeout)??,
            };
            let wait = self.apply_page(page, ctx);
            if ctx.sleep_or_cancel(wait).await {
                return Ok(());
            }
        }
    }
}
