use std::time::Duration;

use chat_bus::{BusPublisher, Platform};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use super::*;
use crate::{ChatSource, SessionContext};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const PING_INTERVAL: Duration = Duration::from_secs(30);
const IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Relay endpoint and the TikTok user whose live stream to follow.
#[derive(Debug, Clone)]
pub struct WebcastConfig {
    pub relay_url: String,
    pub unique_id: String,
}

impl WebcastConfig {
    pub(super) fn connect_url(&self) -> Result<String, SourceError> {
        let unique_id = self.unique_id.trim().trim_start_matches('@');
        if unique_id.is_empty() {
            return Err(SourceError::Config("TikTok unique id is empty".into()));
        }
        let mut url = url::Url::parse(&self.relay_url)?;
        url.query_pairs_mut().append_pair("uniqueId", unique_id);
        Ok(url.into())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

pub(super) enum FrameAction {
    Continue,
    End(String),
}

/// Callback adapter for TikTok live comments.
pub struct TikTokSource {
    config: WebcastConfig,
    dispatcher: Dispatcher,
}

impl TikTokSource {
    pub fn new(config: WebcastConfig, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher }
    }

    /// Adapter that publishes comments to the bus.
    pub fn with_comments(config: WebcastConfig, publisher: BusPublisher) -> Self {
        let mut dispatcher = Dispatcher::new();
        dispatcher.on(EVENT_COMMENT, CommentSink::new(publisher));
        Self::new(config, dispatcher)
    }
}

impl ChatSource for TikTokSource {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    async fn session(&mut self, ctx: &mut SessionContext) -> Result<(), SourceError> {
        let url = self.config.connect_url()?;
        tracing::info!(unique_id = %self.config.unique_id, "Connecting to TikTok webcast relay");

        let ws = tokio::select! {
            _ = ctx.shutdown().cancelled() => return Ok(()),
            result = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url.as_str())) => {
                let (ws, _) = result.map_err(|_| SourceError::Timeout)??;
                ws
            }
        };
        run_session(ws, &self.dispatcher, ctx).await
    }
}

/// Pump relay frames into the dispatcher until the connection ends.
pub(super) async fn run_session<S>(
    mut ws: S,
    dispatcher: &Dispatcher,
    ctx: &mut SessionContext,
) -> Result<(), SourceError>
where
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin + Send,
{
    let mut ping = tokio::time::interval_at(Instant::now() + PING_INTERVAL, PING_INTERVAL);
    let mut last_seen = Instant::now();
    loop {
        tokio::select! {
            _ = ctx.shutdown().cancelled() => {
                tracing::info!("TikTok relay shutdown during listen");
                let _ = ws.close().await;
                return Ok(());
            }
            _ = ping.tick() => {
                ws.send(Message::Ping(Default::default())).await?;
            }
            _ = tokio::time::sleep_until(last_seen + IDLE_TIMEOUT) => {
                tracing::warn!("TikTok relay idle timeout");
                return Err(SourceError::Timeout);
            }
            frame = ws.next() => {
                last_seen = Instant::now();
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let FrameAction::End(reason) = handle_frame(&text, dispatcher, ctx) {
                            let _ = ws.close().await;
                            return Err(SourceError::Closed(reason));
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        ws.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::warn!("TikTok relay closed by server");
                        return Err(SourceError::Closed("relay closed".into()));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(SourceError::WebSocket(e)),
                }
            }
        }
    }
}

/// Decode one relay envelope and dispatch it.
pub(super) fn handle_frame(
    text: &str,
    dispatcher: &Dispatcher,
    ctx: &mut SessionContext,
) -> FrameAction {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping undecodable TikTok relay frame");
            return FrameAction::Continue;
        }
    };
    match envelope.event.as_str() {
        EVENT_CONNECTED => {
            ctx.mark_streaming();
            FrameAction::Continue
        }
        EVENT_STREAM_END => FrameAction::End("TikTok live stream ended".into()),
        event_type => {
            if dispatcher.handles(event_type) {
                ctx.mark_streaming();
            }
            let handled = dispatcher.dispatch(event_type, &envelope.data);
            tracing::debug!(event_type, handled, "TikTok event");
            FrameAction::Continue
        }
    }
}
