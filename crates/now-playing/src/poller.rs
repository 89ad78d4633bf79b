//! Cadence-driven playback polling and fire-and-forget commands.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::{PlaybackSnapshot, PlayerApi, PlayerCommand, PlayerError};

/// Default poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Longest a single poll may take before it counts as failed.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);
/// How long the "track changed" window stays open.
pub const DEFAULT_TRANSITION_WINDOW: Duration = Duration::from_secs(3);

/// True only when both snapshots exist and their titles differ.
pub fn detect_transition(
    previous: Option<&PlaybackSnapshot>,
    current: Option<&PlaybackSnapshot>,
) -> bool {
    match (previous, current) {
        (Some(prev), Some(cur)) => prev.title != cur.title,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
}

/// Result of one [`PlaybackPoller::poll`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The query succeeded and replaced the snapshot.
    Updated { transition: bool },
    /// The query failed; the previous snapshot is kept.
    Retained,
}

/// Owns the current playback snapshot and refreshes it on demand.
///
/// The caller decides the cadence; [`PlaybackPoller::interval`] is the
/// configured spacing between polls.
pub struct PlaybackPoller<A> {
    api: Arc<A>,
    snapshot: Option<PlaybackSnapshot>,
    state: PollerState,
    interval: Duration,
    timeout: Duration,
}

impl<A: PlayerApi> PlaybackPoller<A> {
    pub fn new(api: A) -> Self {
        Self::with_interval(api, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(api: A, interval: Duration) -> Self {
        Self {
            api: Arc::new(api),
            snapshot: None,
            state: PollerState::Idle,
            interval,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn snapshot(&self) -> Option<&PlaybackSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Command handle sharing this poller's API client.
    pub fn commander(&self) -> PlaybackCommander<A> {
        PlaybackCommander {
            api: self.api.clone(),
        }
    }

    /// Query the player once. Never fails: errors keep the last snapshot.
    pub async fn poll(&mut self) -> PollOutcome {
        self.state = PollerState::Polling;
        let result = tokio::time::timeout(self.timeout, self.api.current_playback())
            .await
            .unwrap_or(Err(PlayerError::Timeout));
        self.state = PollerState::Idle;

        match result {
            Ok(current) => {
                let transition = detect_transition(self.snapshot.as_ref(), current.as_ref());
                if let Some(cur) = current.as_ref().filter(|_| transition) {
                    tracing::info!(
                        title = %cur.title,
                        artists = %cur.artist_line(),
                        "Track changed"
                    );
                }
                self.snapshot = current;
                PollOutcome::Updated { transition }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Playback poll failed, keeping last snapshot");
                PollOutcome::Retained
            }
        }
    }
}

/// Fire-and-forget playback controls.
///
/// Every method logs its own failure and returns whether it succeeded;
/// none of them touch the poller's snapshot.
pub struct PlaybackCommander<A> {
    api: Arc<A>,
}

impl<A> Clone for PlaybackCommander<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
        }
    }
}

impl<A: PlayerApi> PlaybackCommander<A> {
    pub async fn skip(&self) -> bool {
        self.send(PlayerCommand::Next).await
    }

    pub async fn previous(&self) -> bool {
        self.send(PlayerCommand::Previous).await
    }

    /// Pause when the player reports playing, start otherwise.
    pub async fn toggle_play(&self) -> bool {
        let playing = match self.api.current_playback().await {
            Ok(state) => state.is_some_and(|s| s.is_playing),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read playback state for toggle");
                return false;
            }
        };
        let command = if playing {
            PlayerCommand::Pause
        } else {
            PlayerCommand::Start
        };
        self.send(command).await
    }

    async fn send(&self, command: PlayerCommand) -> bool {
        match self.api.send_command(command).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(command = command.as_str(), error = %e, "Playback command failed");
                false
            }
        }
    }
}

/// Bounded "track changed" window.
#[derive(Debug, Clone, Copy)]
pub struct TransitionWindow {
    opened_at: Option<Instant>,
    length: Duration,
}

impl Default for TransitionWindow {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSITION_WINDOW)
    }
}

impl TransitionWindow {
    pub fn new(length: Duration) -> Self {
        Self {
            opened_at: None,
            length,
        }
    }

    /// Open (or restart) the window at `now`.
    pub fn open(&mut self, now: Instant) {
        self.opened_at = Some(now);
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.opened_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.length)
    }
}
