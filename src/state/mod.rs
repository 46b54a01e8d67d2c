pub mod action;
pub mod engine;
pub mod game;
/// Games attached to this instance.
pub mod session;
mod sse;
/// Allowed game status transitions.
pub mod state_machine;
pub mod stats;
pub mod validation;

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::game_store::GameStore,
    error::ServiceError,
    sports::registry::SportRegistry,
    state::{game::GameCode, session::GameSession},
    sync::SyncAdapter,
};

pub use self::sse::{GAME_SSE_CAPACITY, SseHub};

/// Handle to the application state shared by routes and tasks.
pub type SharedState = Arc<AppState>;

/// Central application state: configuration, sport registry, store handle and attached games.
pub struct AppState {
    config: AppConfig,
    registry: SportRegistry,
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    sessions: DashMap<GameCode, Arc<GameSession>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, registry: SportRegistry) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            registry,
            game_store: RwLock::new(None),
            sessions: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Sports this instance can score.
    pub fn registry(&self) -> &SportRegistry {
        &self.registry
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a game store implementation. Degraded mode is left once it passes a health check.
    pub async fn set_game_store(&self, store: Arc<dyn GameStore>) {
        let mut guard = self.game_store.write().await;
        *guard = Some(store);
    }

    /// Sync adapter over the installed store, whether or not it is currently healthy.
    pub async fn sync(&self) -> Result<SyncAdapter, ServiceError> {
        self.game_store()
            .await
            .map(SyncAdapter::new)
            .ok_or(ServiceError::Degraded)
    }

    /// Sync adapter over a healthy store; fails while degraded.
    pub async fn require_sync(&self) -> Result<SyncAdapter, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.sync().await
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, notifying watchers only when the value changes.
    pub fn update_degraded(&self, value: bool) -> bool {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        })
    }

    /// Session of an attached game.
    pub fn session(&self, code: &GameCode) -> Option<Arc<GameSession>> {
        self.sessions.get(code).map(|entry| Arc::clone(entry.value()))
    }

    /// Attach `session` unless another request attached the same game first; returns the
    /// session that ended up attached and whether it is the one passed in.
    pub fn attach_session(&self, session: GameSession) -> (Arc<GameSession>, bool) {
        match self.sessions.entry(session.code().clone()) {
            Entry::Occupied(existing) => (Arc::clone(existing.get()), false),
            Entry::Vacant(slot) => {
                let session = Arc::new(session);
                slot.insert(Arc::clone(&session));
                (session, true)
            }
        }
    }

    /// Detach a game from this instance.
    pub fn detach_session(&self, code: &GameCode) -> Option<Arc<GameSession>> {
        self.sessions.remove(code).map(|(_, session)| session)
    }

    /// Snapshot of every attached session.
    pub fn sessions(&self) -> Vec<Arc<GameSession>> {
        self.sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
