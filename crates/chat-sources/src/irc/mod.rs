//! Twitch chat over plain IRC.
//!
//! Connects to irc.chat.twitch.tv, logs in with `PASS`/`NICK`, joins one
//! channel, answers server pings and turns `PRIVMSG` lines into chat events.

mod parser;
mod session;

use std::time::Duration;

use chat_bus::Platform;
use tokio::net::TcpStream;

pub use parser::{IrcLine, LineBuffer, parse_line};

use crate::{ChatSource, SessionContext, SourceError};

pub const TWITCH_IRC_HOST: &str = "irc.chat.twitch.tv";
pub const TWITCH_IRC_PORT: u16 = 6667;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// IRC connection settings.
#[derive(Debug, Clone)]
pub struct IrcConfig {
    pub host: String,
    pub port: u16,
    pub nick: String,
    /// OAuth token; `None` joins anonymously (read-only).
    pub token: Option<String>,
    pub channel: String,
}

impl IrcConfig {
    pub fn twitch(nick: &str, token: Option<String>, channel: &str) -> Self {
        Self {
            host: TWITCH_IRC_HOST.into(),
            port: TWITCH_IRC_PORT,
            nick: nick.trim().to_lowercase(),
            token: token.filter(|t| !t.trim().is_empty()),
            channel: normalize_channel(channel),
        }
    }

    fn validate(&self) -> Result<(), SourceError> {
        if self.channel.len() < 2 {
            return Err(SourceError::Config("Twitch channel is empty".into()));
        }
        if self.token.is_some() && self.nick.is_empty() {
            return Err(SourceError::Config(
                "Twitch nick is required with a token".into(),
            ));
        }
        Ok(())
    }

    /// `PASS`/`NICK`/`JOIN` sequence sent right after connecting.
    fn login_lines(&self) -> String {
        match &self.token {
            Some(token) => {
                let token = token.trim();
                let pass = if token.starts_with("oauth:") {
                    token.to_string()
                } else {
                    format!("oauth:{token}")
                };
                format!(
                    "PASS {pass}\r\nNICK {}\r\nJOIN {}\r\n",
                    self.nick, self.channel
                )
            }
            None => format!(
                "NICK justinfan{}\r\nJOIN {}\r\n",
                std::process::id() % 100_000,
                self.channel
            ),
        }
    }
}

fn normalize_channel(channel: &str) -> String {
    let name = channel.trim().trim_start_matches('#').to_lowercase();
    format!("#{name}")
}

/// Push-stream adapter for Twitch chat.
pub struct TwitchIrcSource {
    config: IrcConfig,
}

impl TwitchIrcSource {
    pub fn new(config: IrcConfig) -> Self {
        Self { config }
    }
}

impl ChatSource for TwitchIrcSource {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    async fn session(&mut self, ctx: &mut SessionContext) -> Result<(), SourceError> {
        self.config.validate()?;
        tracing::info!(
            host = %self.config.host,
            port = self.config.port,
            channel = %self.config.channel,
            "Connecting to Twitch IRC"
        );

        let connect = TcpStream::connect((self.config.host.as_str(), self.config.port));
        let stream = tokio::select! {
            _ = ctx.shutdown().cancelled() => return Ok(()),
            result = tokio::time::timeout(CONNECT_TIMEOUT, connect) => {
                result.map_err(|_| SourceError::Timeout)??
            }
        };
        stream.set_nodelay(true)?;

        session::run_session(stream, &self.config, ctx).await
    }
}
