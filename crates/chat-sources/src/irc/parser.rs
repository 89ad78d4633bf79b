//! Line framing and tokenizing for the Twitch IRC stream.

/// Pending bytes above this without a line break are discarded.
const MAX_PENDING: usize = 64 * 1024;

/// One decoded protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcLine {
    /// Server ping; must be answered with `PONG :<token>`.
    KeepAlive { token: String },
    /// A chat message posted to the channel.
    Content { sender: String, body: String },
    /// `001` numeric: login accepted.
    Welcome,
    /// Login rejected by the server.
    LoginFailed(String),
    /// Server is about to restart and asks clients to reconnect.
    Reconnect,
    Unrecognized,
}

/// Parse one line (without its `\r\n` delimiter).
pub fn parse_line(raw: &str) -> IrcLine {
    let line = strip_tags(raw.trim_end_matches(['\r', '\n']));

    if let Some(rest) = line.strip_prefix("PING") {
        let token = rest.trim().trim_start_matches(':');
        let token = if token.is_empty() {
            "tmi.twitch.tv"
        } else {
            token
        };
        return IrcLine::KeepAlive {
            token: token.to_string(),
        };
    }

    let Some(prefixed) = line.strip_prefix(':') else {
        return IrcLine::Unrecognized;
    };
    let mut head = prefixed.splitn(3, ' ');
    let _prefix = head.next();
    match head.next() {
        Some("PRIVMSG") => parse_privmsg(line),
        Some("001") => IrcLine::Welcome,
        Some("RECONNECT") => IrcLine::Reconnect,
        Some("NOTICE") => parse_notice(line),
        _ => IrcLine::Unrecognized,
    }
}

// `:alice!alice@alice.tmi.twitch.tv PRIVMSG #chan :body`
// The split stops at the third segment so colons inside the body survive.
fn parse_privmsg(line: &str) -> IrcLine {
    let mut parts = line.splitn(3, ':');
    let (Some(""), Some(prefix), Some(body)) = (parts.next(), parts.next(), parts.next()) else {
        return IrcLine::Unrecognized;
    };
    let sender = prefix.split('!').next().unwrap_or_default().trim();
    if sender.is_empty() || sender.contains(' ') {
        return IrcLine::Unrecognized;
    }
    IrcLine::Content {
        sender: sender.to_string(),
        body: body.to_string(),
    }
}

fn parse_notice(line: &str) -> IrcLine {
    let text = line.splitn(3, ':').nth(2).unwrap_or_default();
    if text.contains("Login authentication failed") || text.contains("Improperly formatted auth")
    {
        IrcLine::LoginFailed(text.to_string())
    } else {
        IrcLine::Unrecognized
    }
}

/// Drop an IRCv3 `@key=value;...` tag block if present.
fn strip_tags(line: &str) -> &str {
    if !line.starts_with('@') {
        return line;
    }
    line.split_once(' ').map(|(_, rest)| rest).unwrap_or_default()
}

/// Accumulates stream bytes and yields complete lines.
///
/// Incomplete trailing data is kept for the next read, so a line (or a
/// multi-byte character) split across reads is reassembled intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append `bytes` and return every line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            let mut line = &self.pending[start..end];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            if !line.is_empty() {
                lines.push(String::from_utf8_lossy(line).into_owned());
            }
            start = end + 1;
        }
        self.pending.drain(..start);

        if self.pending.len() > MAX_PENDING {
            tracing::warn!(
                pending = self.pending.len(),
                "Discarding oversized IRC line without delimiter"
            );
            self.pending.clear();
        }
        lines
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
