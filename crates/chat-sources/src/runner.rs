//! Adapter lifecycle: connect, stream, back off, reconnect.
//!
//! A [`ChatSource`] implements one connection attempt. [`spawn_source`]
//! drives it through `Connecting -> Streaming -> Backoff -> Connecting`
//! on its own tokio task until shutdown or an unrecoverable error.

use std::future::Future;
use std::time::Duration;

use chat_bus::{BusPublisher, ChatEvent, Platform};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::SourceError;
use crate::backoff::Backoff;

/// A session streaming at least this long clears the failure count.
pub const HEALTHY_AFTER: Duration = Duration::from_secs(30);

/// Observable state of one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Connecting,
    Streaming,
    Backoff { attempt: u32, delay_ms: u64 },
    Stopped,
}

/// One platform connection.
pub trait ChatSource: Send + 'static {
    fn platform(&self) -> Platform;

    /// Run a single connection until it ends.
    ///
    /// Returns `Ok(())` only when shutdown was requested; every other
    /// ending is an error the runner classifies as transient or fatal.
    fn session(
        &mut self,
        ctx: &mut SessionContext,
    ) -> impl Future<Output = Result<(), SourceError>> + Send;
}

/// Per-adapter state shared between the runner and the active session.
pub struct SessionContext {
    platform: Platform,
    publisher: BusPublisher,
    shutdown: CancellationToken,
    backoff: Backoff,
    phase: watch::Sender<Phase>,
    streaming_since: Option<Instant>,
}

impl SessionContext {
    pub fn new(platform: Platform, publisher: BusPublisher, shutdown: CancellationToken) -> Self {
        let (phase, _) = watch::channel(Phase::Connecting);
        Self {
            platform,
            publisher,
            shutdown,
            backoff: Backoff::default(),
            phase,
            streaming_since: None,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Normalize and publish one message. Returns `false` if it was dropped.
    pub fn emit(&self, author: &str, text: &str) -> bool {
        match ChatEvent::new(self.platform, author, text) {
            Some(event) => {
                self.publisher.publish(event);
                true
            }
            None => {
                tracing::warn!(
                    platform = %self.platform,
                    "Dropping chat message with empty author or text"
                );
                false
            }
        }
    }

    /// Called by a session once its connection is healthy. Past failures
    /// are forgotten only if the session then lasts [`HEALTHY_AFTER`].
    pub fn mark_streaming(&mut self) {
        if self.phase() != Phase::Streaming {
            tracing::info!(platform = %self.platform, "Chat source streaming");
        }
        self.streaming_since.get_or_insert_with(Instant::now);
        self.phase.send_replace(Phase::Streaming);
    }

    /// Record a failed session and return the delay before reconnecting.
    fn session_failed(&mut self) -> Duration {
        let healthy = self
            .streaming_since
            .take()
            .is_some_and(|since| since.elapsed() >= HEALTHY_AFTER);
        if healthy {
            self.backoff.reset();
        }
        self.backoff.fail()
    }

    /// Sleep for `duration`, returning `true` if shutdown interrupted it.
    pub async fn sleep_or_cancel(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown.cancelled() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.send_replace(phase);
    }
}

/// Drive `source` until shutdown or an unrecoverable error.
pub async fn run_source<S: ChatSource>(
    mut source: S,
    mut ctx: SessionContext,
) -> Result<(), SourceError> {
    let platform = source.platform();
    loop {
        if ctx.is_shutdown() {
            break;
        }
        ctx.set_phase(Phase::Connecting);
        ctx.streaming_since = None;
        match source.session(&mut ctx).await {
            Ok(()) => break,
            Err(e) if e.is_auth_error() => {
                tracing::error!(
                    platform = %platform,
                    error = %e,
                    "Chat source stopped: unrecoverable configuration or auth error"
                );
                ctx.set_phase(Phase::Stopped);
                return Err(e);
            }
            Err(e) => {
                if ctx.is_shutdown() {
                    break;
                }
                let delay = ctx.session_failed();
                let attempt = ctx.backoff.failures();
                ctx.set_phase(Phase::Backoff {
                    attempt,
                    delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                });
                tracing::warn!(
                    platform = %platform,
                    error = %e,
                    attempt,
                    backoff_secs = delay.as_secs(),
                    "Chat source connection failed, will reconnect"
                );
                if ctx.sleep_or_cancel(delay).await {
                    break;
                }
            }
        }
    }
    ctx.set_phase(Phase::Stopped);
    tracing::info!(platform = %platform, "Chat source shut down");
    Ok(())
}

/// A running adapter task.
pub struct SourceHandle {
    platform: Platform,
    phase: watch::Receiver<Phase>,
    task: JoinHandle<Result<(), SourceError>>,
}

impl SourceHandle {
    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn phase_receiver(&self) -> watch::Receiver<Phase> {
        self.phase.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the adapter task to end.
    pub async fn join(self) -> Result<(), SourceError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(SourceError::Closed(format!("adapter task aborted: {e}"))),
        }
    }
}

/// Start `source` on its own task.
pub fn spawn_source<S: ChatSource>(
    source: S,
    publisher: BusPublisher,
    shutdown: CancellationToken,
) -> SourceHandle {
    let platform = source.platform();
    let ctx = SessionContext::new(platform, publisher, shutdown);
    let phase = ctx.subscribe();
    let task = tokio::spawn(run_source(source, ctx));
    SourceHandle {
        platform,
        phase,
        task,
    }
}
