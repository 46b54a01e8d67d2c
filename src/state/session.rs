use std::sync::{
    OnceLock,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::Mutex;

use crate::{
    state::{SseHub, engine::GameEngine, game::GameCode},
    sync::Subscription,
};

/// A game attached to this process: its engine, viewers, and store watch.
///
/// The engine mutex serialises commands, persistence, clock ticks, and remote
/// reconciliation for the game.
pub struct GameSession {
    code: GameCode,
    sport: String,
    engine: Mutex<GameEngine>,
    sse: SseHub,
    watch: OnceLock<Subscription>,
    controlling: AtomicBool,
}

impl GameSession {
    /// Wrap an engine for a game that was just created or loaded.
    pub fn new(engine: GameEngine, sse: SseHub) -> Self {
        let game = engine.game();
        Self {
            code: game.code.clone(),
            sport: game.sport.clone(),
            engine: Mutex::new(engine),
            sse,
            watch: OnceLock::new(),
            controlling: AtomicBool::new(false),
        }
    }

    /// Join code of the attached game.
    pub fn code(&self) -> &GameCode {
        &self.code
    }

    /// Sport identifier of the attached game.
    pub fn sport(&self) -> &str {
        &self.sport
    }

    /// The engine, behind the per-game lock.
    pub fn engine(&self) -> &Mutex<GameEngine> {
        &self.engine
    }

    /// SSE hub of the game's viewers.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Attach the store watch; later calls are ignored.
    pub fn set_watch(&self, subscription: Subscription) {
        let _ = self.watch.set(subscription);
    }

    /// Whether the store watch is installed and still running.
    pub fn is_watching(&self) -> bool {
        self.watch
            .get()
            .is_some_and(|subscription| !subscription.is_finished())
    }

    /// Mark this process as the game's scorer; its clocks are then run locally.
    pub fn take_control(&self) {
        self.controlling.store(true, Ordering::Release);
    }

    /// Stop running the game's clocks here, e.g. after another instance scored it.
    pub fn release_control(&self) -> bool {
        self.controlling.swap(false, Ordering::AcqRel)
    }

    /// Whether commands for the game were issued through this process.
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::Acquire)
    }
}
