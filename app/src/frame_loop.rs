//! Fixed-rate frame loop.
//!
//! Each tick drains the event bus into the display log, picks up the
//! latest playback state, refreshes the shared state read by the HTTP
//! surface and hands one [`FrameView`] to the renderer. Nothing in a tick
//! waits on the network: playback is polled on its own task and published
//! through a `watch` channel, and control requests run on their own tasks.

use std::str::FromStr;
use std::time::Duration;

use chat_bus::DisplayLog;
use now_playing::{
    CoverImage, ImageCache, PlaybackCommander, PlaybackPoller, PlaybackSnapshot, PlayerApi,
    PollOutcome, TransitionWindow,
};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::app::{PlaybackView, SharedState};
use crate::presentation::{FrameView, Renderer};

/// Playback control requested from outside the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Next,
    Previous,
    Toggle,
}

impl ControlAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlAction::Next => "next",
            ControlAction::Previous => "previous",
            ControlAction::Toggle => "toggle",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown control action: {0}")]
pub struct UnknownAction(String);

impl FromStr for ControlAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "next" | "skip" => Ok(ControlAction::Next),
            "previous" | "prev" => Ok(ControlAction::Previous),
            "toggle" | "play_pause" => Ok(ControlAction::Toggle),
            _ => Err(UnknownAction(s.to_string())),
        }
    }
}

/// Latest playback state published by the polling task.
#[derive(Debug, Clone, Default)]
struct PlaybackFeed {
    snapshot: Option<PlaybackSnapshot>,
    cover: Option<CoverImage>,
    /// Track transitions seen since the task started
    transitions: u64,
}

/// Poll on the poller's cadence until shutdown, fetching the cover of
/// each new snapshot before publishing it.
async fn run_playback<A: PlayerApi>(
    mut poller: PlaybackPoller<A>,
    mut covers: ImageCache,
    feed: watch::Sender<PlaybackFeed>,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(poller.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let outcome = tokio::select! {
            _ = shutdown.cancelled() => break,
            outcome = poller.poll() => outcome,
        };
        let PollOutcome::Updated { transition } = outcome else {
            continue;
        };

        let snapshot = poller.snapshot().cloned();
        let cover = match snapshot.as_ref().and_then(|s| s.cover_url.as_deref()) {
            Some(url) => tokio::select! {
                _ = shutdown.cancelled() => break,
                cover = covers.fetch(url) => cover,
            },
            None => None,
        };
        feed.send_modify(|current| {
            current.snapshot = snapshot;
            current.cover = cover;
            if transition {
                current.transitions += 1;
            }
        });
    }
    tracing::debug!("Playback polling stopped");
}

pub struct FrameLoop<A, R> {
    state: SharedState,
    /// Handed to the polling task on the first tick
    poller: Option<PlaybackPoller<A>>,
    commander: Option<PlaybackCommander<A>>,
    playback: Option<watch::Receiver<PlaybackFeed>>,
    feed: PlaybackFeed,
    seen_transitions: u64,
    renderer: R,
    log: DisplayLog,
    window: TransitionWindow,
    commands: mpsc::Receiver<ControlAction>,
    frame_interval: Duration,
    published: PlaybackView,
}

impl<A: PlayerApi, R: Renderer> FrameLoop<A, R> {
    /// `poller` is `None` when no player is configured; the loop then
    /// only shows chat.
    pub fn new(
        state: SharedState,
        commands: mpsc::Receiver<ControlAction>,
        poller: Option<PlaybackPoller<A>>,
        renderer: R,
    ) -> Self {
        let config = state.config();
        let frame_interval = Duration::from_secs(1) / config.frame_rate.max(1);
        let log = DisplayLog::with_capacity(config.max_chat_lines);
        let window = TransitionWindow::new(Duration::from_secs(config.track_change_display_secs));
        let commander = poller.as_ref().map(PlaybackPoller::commander);

        Self {
            state,
            poller,
            commander,
            playback: None,
            feed: PlaybackFeed::default(),
            seen_transitions: 0,
            renderer,
            log,
            window,
            commands,
            frame_interval,
            published: PlaybackView::default(),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Run until the shared shutdown token is cancelled.
    pub async fn run(mut self) {
        let shutdown = self.state.shutdown_token().clone();
        let mut ticker = tokio::time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            frame_ms = self.frame_interval.as_millis() as u64,
            playback = self.commander.is_some(),
            "Frame loop started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.tick().await,
                Some(action) = self.commands.recv() => self.dispatch(action),
            }
        }

        tracing::info!("Frame loop stopped");
    }

    fn start_playback(&mut self) {
        let Some(poller) = self.poller.take() else {
            return;
        };
        let (tx, rx) = watch::channel(PlaybackFeed::default());
        tokio::spawn(run_playback(
            poller,
            ImageCache::default(),
            tx,
            self.state.shutdown_token().clone(),
        ));
        self.playback = Some(rx);
    }

    /// One frame.
    pub async fn tick(&mut self) {
        let now = Instant::now();
        self.start_playback();

        let new_events = self.state.bus().drain_all();
        self.log.extend(new_events.iter().cloned());

        if let Some(rx) = self.playback.as_mut() {
            if rx.has_changed().unwrap_or(false) {
                self.feed = rx.borrow_and_update().clone();
            }
        }
        if self.feed.transitions != self.seen_transitions {
            self.seen_transitions = self.feed.transitions;
            self.window.open(now);
        }
        let track_changed = self.feed.snapshot.is_some() && self.window.is_active(now);

        if !new_events.is_empty() {
            self.state
                .set_chat_history(self.log.iter().cloned().collect())
                .await;
        }
        let view = PlaybackView {
            snapshot: self.feed.snapshot.clone(),
            track_changed,
        };
        if view != self.published {
            self.state.set_playback(view.clone()).await;
            self.published = view;
        }

        let frame = FrameView {
            new_events: &new_events,
            log: &self.log,
            playback: self.published.snapshot.as_ref(),
            track_changed,
            cover: self.feed.cover.as_ref(),
        };
        if let Err(e) = self.renderer.render(&frame) {
            tracing::warn!(error = %e, "Render failed");
        }
    }

    fn dispatch(&self, action: ControlAction) {
        let Some(commander) = self.commander.clone() else {
            tracing::warn!(
                action = action.as_str(),
                "Playback control ignored: no player configured"
            );
            return;
        };
        tokio::spawn(async move {
            let ok = match action {
                ControlAction::Next => commander.skip().await,
                ControlAction::Previous => commander.previous().await,
                ControlAction::Toggle => commander.toggle_play().await,
            };
            tracing::debug!(action = action.as_str(), ok, "Playback control finished");
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use chat_bus::{ChatEvent, Platform};
    use chrono::Utc;
    use now_playing::{PlaybackSnapshot, PlayerCommand, PlayerError};

    use super::*;
    use crate::config::AppConfig;

    type Reply = Result<Option<PlaybackSnapshot>, PlayerError>;

    #[derive(Default)]
    struct FakePlayer {
        replies: Mutex<VecDeque<Reply>>,
        commands: Arc<Mutex<Vec<PlayerCommand>>>,
    }

    impl PlayerApi for FakePlayer {
        async fn current_playback(&self) -> Reply {
            self.replies.lock().unwrap().pop_front().unwrap_or(Err(PlayerError::Api {
                status: 503,
                message: "unavailable".into(),
            }))
        }

        async fn send_command(&self, command: PlayerCommand) -> Result<(), PlayerError> {
            self.commands.lock().unwrap().push(command);
            Ok(())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Frame {
        new_events: usize,
        log_len: usize,
        title: Option<String>,
        track_changed: bool,
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Frame>>>);

    impl Recorder {
        fn frames(&self) -> Vec<Frame> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Renderer for Recorder {
        fn render(&mut self, frame: &FrameView<'_>) -> std::io::Result<()> {
            self.0.lock().unwrap().push(Frame {
                new_events: frame.new_events.len(),
                log_len: frame.log.len(),
                title: frame.playback.map(|s| s.title.clone()),
                track_changed: frame.track_changed,
            });
            Ok(())
        }
    }

    fn track(title: &str) -> PlaybackSnapshot {
        PlaybackSnapshot {
            title: title.into(),
            artists: vec!["Artist".into()],
            album: None,
            cover_url: None,
            is_playing: true,
            observed_at: Utc::now(),
        }
    }

    fn chat(author: &str, text: &str) -> ChatEvent {
        ChatEvent::new(Platform::Twitch, author, text).unwrap()
    }

    /// Never answers.
    struct HungPlayer;

    impl PlayerApi for HungPlayer {
        async fn current_playback(&self) -> Reply {
            std::future::pending().await
        }

        async fn send_command(&self, _command: PlayerCommand) -> Result<(), PlayerError> {
            std::future::pending().await
        }
    }

    async fn build<P: PlayerApi>(
        config: AppConfig,
        player: Option<P>,
    ) -> (SharedState, FrameLoop<P, Recorder>, Recorder) {
        let state = SharedState::new(config);
        let commands = state.take_command_receiver().await.unwrap();
        let recorder = Recorder::default();
        let poller = player.map(PlaybackPoller::new);
        let frame_loop = FrameLoop::new(state.clone(), commands, poller, recorder.clone());
        (state, frame_loop, recorder)
    }

    #[test]
    fn control_actions_parse() {
        assert_eq!("next".parse::<ControlAction>().unwrap(), ControlAction::Next);
        assert_eq!(" Previous ".parse::<ControlAction>().unwrap(), ControlAction::Previous);
        assert_eq!("toggle".parse::<ControlAction>().unwrap(), ControlAction::Toggle);
        assert!("rewind".parse::<ControlAction>().is_err());
    }

    #[tokio::test]
    async fn frame_interval_follows_frame_rate() {
        let config = AppConfig {
            frame_rate: 50,
            ..Default::default()
        };
        let (_, frame_loop, _) = build::<FakePlayer>(config, None).await;
        assert_eq!(frame_loop.frame_interval(), Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn tick_drains_bus_into_bounded_log() {
        let config = AppConfig {
            max_chat_lines: 2,
            ..Default::default()
        };
        let (state, mut frame_loop, recorder) = build::<FakePlayer>(config, None).await;

        state.bus().publish(chat("alice", "one"));
        state.bus().publish(chat("bob", "two"));
        state.bus().publish(chat("carol", "three"));
        frame_loop.tick().await;
        frame_loop.tick().await;

        assert!(state.bus().is_empty());
        let frames = recorder.frames();
        assert_eq!(frames[0].new_events, 3);
        assert_eq!(frames[0].log_len, 2);
        assert_eq!(frames[1].new_events, 0);
        assert_eq!(frames[1].title, None);

        let history = state.chat_history(10).await;
        let authors: Vec<&str> = history.iter().map(|e| e.author()).collect();
        assert_eq!(authors, ["bob", "carol"]);
    }

    #[tokio::test(start_paused = true)]
    async fn track_change_window_spans_display_time() {
        let player = FakePlayer {
            replies: Mutex::new(vec![Ok(Some(track("Song A"))), Ok(Some(track("Song B")))].into()),
            ..Default::default()
        };
        let (state, mut frame_loop, recorder) = build(AppConfig::default(), Some(player)).await;

        // First frame starts polling; nothing has been published yet.
        frame_loop.tick().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        frame_loop.tick().await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        frame_loop.tick().await;
        assert!(state.playback().await.track_changed);

        tokio::time::sleep(Duration::from_secs(1)).await;
        frame_loop.tick().await;
        // Third poll fails; the last snapshot stays on screen.
        tokio::time::sleep(Duration::from_secs(2)).await;
        frame_loop.tick().await;

        let frames = recorder.frames();
        let seen: Vec<(Option<&str>, bool)> = frames
            .iter()
            .map(|f| (f.title.as_deref(), f.track_changed))
            .collect();
        assert_eq!(
            seen,
            [
                (None, false),
                (Some("Song A"), false),
                (Some("Song B"), true),
                (Some("Song B"), true),
                (Some("Song B"), false),
            ]
        );
        let published = state.playback().await;
        assert_eq!(published.snapshot.unwrap().title, "Song B");
        assert!(!published.track_changed);
        state.shutdown_token().cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn hung_player_never_stalls_frames() {
        let (state, frame_loop, recorder) = build(AppConfig::default(), Some(HungPlayer)).await;
        let task = tokio::spawn(frame_loop.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        state.bus().publish(chat("alice", "still here"));
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(state.bus().is_empty());
        assert_eq!(state.chat_history(10).await.len(), 1);
        assert!(recorder.frames().iter().any(|f| f.new_events == 1));
        assert_eq!(state.playback().await, PlaybackView::default());

        state.shutdown_token().cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("frame loop stops after shutdown")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn run_dispatches_commands_until_shutdown() {
        let player = FakePlayer::default();
        let sent = player.commands.clone();
        let (state, frame_loop, recorder) = build(AppConfig::default(), Some(player)).await;

        let task = tokio::spawn(frame_loop.run());
        state.command_sender().send(ControlAction::Next).await.unwrap();
        state.command_sender().send(ControlAction::Previous).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        state.shutdown_token().cancel();
        task.await.unwrap();

        assert_eq!(
            *sent.lock().unwrap(),
            vec![PlayerCommand::Next, PlayerCommand::Previous]
        );
        assert!(!recorder.frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn commands_without_player_are_ignored() {
        let (state, frame_loop, _) = build::<FakePlayer>(AppConfig::default(), None).await;
        let task = tokio::spawn(frame_loop.run());
        state.command_sender().send(ControlAction::Toggle).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        state.shutdown_token().cancel();
        task.await.unwrap();
    }
}
