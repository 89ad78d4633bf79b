use std::sync::Arc;

use chat_bus::{ChatEvent, EventBus, Platform};
use chat_sources::Phase;
use now_playing::PlaybackSnapshot;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, FeatureStatus, check_feature_status};
use crate::frame_loop::ControlAction;

const COMMAND_QUEUE: usize = 16;

/// Now-playing state as published to the HTTP surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaybackView {
    pub snapshot: Option<PlaybackSnapshot>,
    pub track_changed: bool,
}

/// Application shared state accessible from the frame loop and axum handlers.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<SharedStateInner>,
}

struct SharedStateInner {
    config: AppConfig,
    features: FeatureStatus,
    /// Chat events from every adapter, drained by the frame loop
    bus: EventBus,
    shutdown_token: CancellationToken,
    /// Copy of the display log, refreshed by the frame loop
    chat_history: RwLock<Vec<ChatEvent>>,
    playback: RwLock<PlaybackView>,
    command_tx: mpsc::Sender<ControlAction>,
    command_rx: Mutex<Option<mpsc::Receiver<ControlAction>>>,
    sources: RwLock<Vec<(Platform, watch::Receiver<Phase>)>>,
}

impl SharedState {
    pub fn new(config: AppConfig) -> Self {
        let features = check_feature_status(&config);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);

        Self {
            inner: Arc::new(SharedStateInner {
                config,
                features,
                bus: EventBus::new(),
                shutdown_token: CancellationToken::new(),
                chat_history: RwLock::new(Vec::new()),
                playback: RwLock::new(PlaybackView::default()),
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                sources: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn features(&self) -> &FeatureStatus {
        &self.inner.features
    }

    pub fn server_port(&self) -> u16 {
        self.inner.config.server_port
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown_token
    }

    pub fn command_sender(&self) -> mpsc::Sender<ControlAction> {
        self.inner.command_tx.clone()
    }

    /// Take the command receiver. Only the first caller gets it.
    pub async fn take_command_receiver(&self) -> Option<mpsc::Receiver<ControlAction>> {
        self.inner.command_rx.lock().await.take()
    }

    pub async fn chat_history(&self, limit: usize) -> Vec<ChatEvent> {
        let history = self.inner.chat_history.read().await;
        let skip = history.len().saturating_sub(limit);
        history[skip..].to_vec()
    }

    pub async fn set_chat_history(&self, events: Vec<ChatEvent>) {
        *self.inner.chat_history.write().await = events;
    }

    pub async fn playback(&self) -> PlaybackView {
        self.inner.playback.read().await.clone()
    }

    pub async fn set_playback(&self, view: PlaybackView) {
        *self.inner.playback.write().await = view;
    }

    pub async fn register_source(&self, platform: Platform, phase: watch::Receiver<Phase>) {
        self.inner.sources.write().await.push((platform, phase));
    }

    /// Current phase of every started adapter.
    pub async fn source_phases(&self) -> Vec<(Platform, Phase)> {
        self.inner
            .sources
            .read()
            .await
            .iter()
            .map(|(platform, phase)| (*platform, *phase.borrow()))
            .collect()
    }
}
