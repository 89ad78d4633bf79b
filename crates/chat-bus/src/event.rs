use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Streaming platform a chat event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitch,
    YouTube,
    TikTok,
}

impl Platform {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Twitch => "Twitch",
            Self::YouTube => "YouTube",
            Self::TikTok => "TikTok",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One inbound chat message, normalized across platforms.
///
/// Fields are private so an event cannot change after an adapter creates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEvent {
    platform: Platform,
    author: String,
    text: String,
    received_at: DateTime<Utc>,
}

impl ChatEvent {
    /// Build an event stamped with the current time.
    ///
    /// Returns `None` when the author is blank or the text is empty, which
    /// adapters treat as a parse failure for the offending message.
    pub fn new(platform: Platform, author: &str, text: &str) -> Option<Self> {
        Self::at(platform, author, text, Utc::now())
    }

    /// Build an event with an explicit receive time.
    pub fn at(
        platform: Platform,
        author: &str,
        text: &str,
        received_at: DateTime<Utc>,
    ) -> Option<Self> {
        let author = author.trim();
        if author.is_empty() || text.trim().is_empty() {
            return None;
        }
        Some(Self {
            platform,
            author: author.to_string(),
            text: text.to_string(),
            received_at,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

impl fmt::Display for ChatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.platform, self.author, self.text)
    }
}
