//! TikTok live comments through a webcast relay.
//!
//! TikTok has no public chat API, so the adapter connects to a relay that
//! runs a webcast client and forwards its events as JSON envelopes
//! (`{"event": "comment", "data": {...}}`). Events are handed to handlers
//! registered per event type on a [`Dispatcher`].

mod connection;
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use chat_bus::{BusPublisher, ChatEvent, Platform};
use serde_json::Value;

use crate::SourceError;

pub use connection::{TikTokSource, WebcastConfig};

pub const EVENT_COMMENT: &str = "comment";
pub const EVENT_CONNECTED: &str = "connected";
pub const EVENT_STREAM_END: &str = "streamEnd";

/// Handler for one relay event type.
pub trait EventSink: Send + Sync {
    fn on_event(&self, data: &Value) -> Result<(), SourceError>;
}

impl<F> EventSink for F
where
    F: Fn(&Value) -> Result<(), SourceError> + Send + Sync,
{
    fn on_event(&self, data: &Value) -> Result<(), SourceError> {
        self(data)
    }
}

/// Routes relay events to their registered handlers.
///
/// A handler that errors or panics is logged and skipped; the remaining
/// handlers and later events are unaffected.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Vec<Box<dyn EventSink>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, event_type: &str, sink: impl EventSink + 'static) -> &mut Self {
        self.handlers
            .entry(event_type.to_string())
            .or_default()
            .push(Box::new(sink));
        self
    }

    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Invoke every handler for `event_type`. Returns how many succeeded.
    pub fn dispatch(&self, event_type: &str, data: &Value) -> usize {
        let Some(sinks) = self.handlers.get(event_type) else {
            tracing::trace!(event_type, "No handler for TikTok event");
            return 0;
        };
        let mut handled = 0;
        for sink in sinks {
            match catch_unwind(AssertUnwindSafe(|| sink.on_event(data))) {
                Ok(Ok(())) => handled += 1,
                Ok(Err(e)) => {
                    tracing::warn!(event_type, error = %e, "TikTok event handler failed");
                }
                Err(_) => {
                    tracing::error!(event_type, "TikTok event handler panicked");
                }
            }
        }
        handled
    }
}

/// Publishes `comment` events as chat events.
pub struct CommentSink {
    publisher: BusPublisher,
}

impl CommentSink {
    pub fn new(publisher: BusPublisher) -> Self {
        Self { publisher }
    }
}

/// Extract `(user.nickname, comment)` from a comment payload.
pub fn parse_comment(data: &Value) -> Result<(&str, &str), SourceError> {
    let nickname = data
        .get("user")
        .and_then(|u| u.get("nickname"))
        .and_then(Value::as_str)
        .ok_or_else(|| SourceError::Malformed("comment without user.nickname".into()))?;
    let comment = data
        .get("comment")
        .and_then(Value::as_str)
        .ok_or_else(|| SourceError::Malformed("comment without text".into()))?;
    Ok((nickname, comment))
}

impl EventSink for CommentSink {
    fn on_event(&self, data: &Value) -> Result<(), SourceError> {
        let (nickname, comment) = parse_comment(data)?;
        let event = ChatEvent::new(Platform::TikTok, nickname, comment)
            .ok_or_else(|| SourceError::Malformed("blank nickname or comment".into()))?;
        self.publisher.publish(event);
        Ok(())
    }
}
