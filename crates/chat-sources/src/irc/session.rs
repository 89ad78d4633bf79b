use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::parser::{IrcLine, LineBuffer, parse_line};
use super::IrcConfig;
use crate::{SessionContext, SourceError};

// Twitch pings roughly every five minutes.
const READ_TIMEOUT: Duration = Duration::from_secs(6 * 60);
const READ_CHUNK: usize = 4096;

/// Log in and stream one IRC connection until it ends.
pub(crate) async fn run_session<S>(
    mut stream: S,
    config: &IrcConfig,
    ctx: &mut SessionContext,
) -> Result<(), SourceError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    stream.write_all(config.login_lines().as_bytes()).await?;
    stream.flush().await?;

    let mut lines = LineBuffer::default();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let read = tokio::select! {
            _ = ctx.shutdown().cancelled() => {
                tracing::info!(channel = %config.channel, "IRC shutdown during listen");
                let _ = stream.shutdown().await;
                return Ok(());
            }
            result = tokio::time::timeout(READ_TIMEOUT, stream.read(&mut buf)) => result,
        };
        let n = match read {
            Ok(Ok(0)) => return Err(SourceError::Closed("IRC server closed the stream".into())),
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                tracing::warn!("IRC read timeout");
                return Err(SourceError::Timeout);
            }
        };

        for line in lines.push(&buf[..n]) {
            match parse_line(&line) {
                IrcLine::KeepAlive { token } => {
                    stream
                        .write_all(format!("PONG :{token}\r\n").as_bytes())
                        .await?;
                    stream.flush().await?;
                    tracing::trace!("IRC keepalive answered");
                }
                IrcLine::Content { sender, body } => {
                    ctx.emit(&sender, &body);
                }
                IrcLine::Welcome => ctx.mark_streaming(),
                IrcLine::LoginFailed(reason) => return Err(SourceError::AuthFailed(reason)),
                IrcLine::Reconnect => {
                    return Err(SourceError::Closed("server requested reconnect".into()));
                }
                IrcLine::Unrecognized => tracing::trace!(line = %line, "Ignoring IRC line"),
            }
        }
    }
}
