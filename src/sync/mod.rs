//! Bridge between attached engines and the external game store.
//!
//! Snapshots produced locally are pushed with [`SyncAdapter::persist`]; changes made by
//! other instances come back through [`SyncAdapter::subscribe`] and are merged with
//! [`reconcile`], where the snapshot with the strictly newer `lastUpdate` wins.

use std::{future::Future, sync::Arc, time::Duration};

use futures::StreamExt;
use thiserror::Error;
use tokio::{task::JoinHandle, time::sleep};
use tracing::{debug, error, warn};

use crate::{
    dao::{game_store::GameStore, storage::StorageError},
    state::{
        engine::GameEngine,
        game::{Game, GameCode},
    },
};

const WATCH_INITIAL_DELAY: Duration = Duration::from_secs(1);
const WATCH_MAX_DELAY: Duration = Duration::from_secs(10);

/// Failure raised while exchanging snapshots with the store.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The store rejected or could not serve the request.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A remote snapshot was stored under another game's code.
    #[error("remote snapshot `{remote}` does not belong to game `{local}`")]
    CodeMismatch {
        /// Code of the attached game.
        local: String,
        /// Code carried by the remote snapshot.
        remote: String,
    },
    /// A remote snapshot switched sports.
    #[error("remote snapshot of game `{code}` is a {remote} game, expected {local}")]
    SportMismatch {
        /// Game code.
        code: String,
        /// Sport of the attached game.
        local: String,
        /// Sport carried by the remote snapshot.
        remote: String,
    },
}

/// Outcome of merging a remote snapshot into an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The remote snapshot was newer and replaced the local one.
    Applied,
    /// The remote snapshot was not newer and was ignored.
    Stale,
}

/// Install `remote` into `engine` when its `lastUpdate` is strictly newer.
///
/// Echoes of snapshots this instance persisted carry the same `lastUpdate` and are
/// therefore ignored.
pub fn reconcile(engine: &mut GameEngine, remote: Game) -> Result<Reconciled, SyncError> {
    let local = engine.game();
    if remote.code != local.code {
        return Err(SyncError::CodeMismatch {
            local: local.code.to_string(),
            remote: remote.code.to_string(),
        });
    }
    if remote.sport != local.sport {
        return Err(SyncError::SportMismatch {
            code: local.code.to_string(),
            local: local.sport.clone(),
            remote: remote.sport,
        });
    }
    if remote.last_update <= local.last_update {
        debug!(
            code = %local.code,
            local = local.last_update,
            remote = remote.last_update,
            "ignoring stale remote snapshot"
        );
        return Ok(Reconciled::Stale);
    }

    engine.replace_state(remote);
    Ok(Reconciled::Applied)
}

/// Live watch on one game document. Dropping it stops the watch.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Stop receiving changes.
    pub fn unsubscribe(self) {}

    /// Whether the watch ended on its own, after a terminal `None`.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Store-facing half of the synchronization contract.
#[derive(Clone)]
pub struct SyncAdapter {
    store: Arc<dyn GameStore>,
}

impl SyncAdapter {
    /// Wrap a store handle.
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self { store }
    }

    /// Store a freshly created game; fails when the code is already taken.
    pub async fn create(&self, game: &Game) -> Result<(), SyncError> {
        self.store.create_game(game.clone()).await?;
        debug!(code = %game.code, sport = %game.sport, "game created in store");
        Ok(())
    }

    /// Fetch the stored snapshot of `code`.
    pub async fn load(&self, code: &GameCode) -> Result<Option<Game>, SyncError> {
        Ok(self.store.find_game(code.clone()).await?)
    }

    /// Remove the stored game, reporting whether it existed.
    pub async fn delete(&self, code: &GameCode) -> Result<bool, SyncError> {
        Ok(self.store.delete_game(code.clone()).await?)
    }

    /// Push a snapshot. Failures are logged and returned; nothing is rolled back.
    pub async fn persist(&self, game: &Game) -> Result<(), SyncError> {
        match self.store.save_game(game.clone()).await {
            Ok(()) => {
                debug!(code = %game.code, last_update = game.last_update, "snapshot persisted");
                Ok(())
            }
            Err(err) => {
                warn!(code = %game.code, error = %err, "failed to persist game snapshot");
                Err(err.into())
            }
        }
    }

    /// Forward every stored value of `code` to `on_change`.
    ///
    /// The current value arrives first. `None` (missing or deleted) is terminal: it is
    /// delivered once and the watch stops. Broken watches are reopened with backoff.
    pub fn subscribe<F, Fut>(&self, code: GameCode, mut on_change: F) -> Subscription
    where
        F: FnMut(Option<Game>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let handle = tokio::spawn(async move {
            let mut delay = WATCH_INITIAL_DELAY;
            loop {
                let mut changes = store.watch_game(code.clone());
                while let Some(change) = changes.next().await {
                    match change {
                        Ok(Some(game)) => {
                            delay = WATCH_INITIAL_DELAY;
                            on_change(Some(game)).await;
                        }
                        Ok(None) => {
                            error!(code = %code, "game no longer exists in store; closing watch");
                            on_change(None).await;
                            return;
                        }
                        Err(err) => {
                            warn!(code = %code, error = %err, "game watch failed");
                            break;
                        }
                    }
                }

                debug!(code = %code, delay_ms = delay.as_millis() as u64, "reopening game watch");
                sleep(delay).await;
                delay = (delay * 2).min(WATCH_MAX_DELAY);
            }
        });

        Subscription { handle }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{sync::mpsc, time::timeout};

    use super::*;
    use crate::{
        dao::game_store::memory::MemoryGameStore,
        sports::{GameSetup, registry::SportRegistry},
        state::engine::Origin,
    };

    fn engine() -> GameEngine {
        let registry = SportRegistry::builtin(&[]).unwrap();
        let config = registry.get("basketball").unwrap();
        let game = config.create_game(GameCode::parse("SYNC22").unwrap(), GameSetup::default());
        GameEngine::new(game, config)
    }

    fn remote_copy(engine: &GameEngine, last_update: u64) -> Game {
        let mut game = engine.game().clone();
        game.settings.game_name = "remote".into();
        game.last_update = last_update;
        game
    }

    #[test]
    fn newer_remote_snapshot_is_applied() {
        let mut engine = engine();
        let mut notifications = engine.subscribe();
        let newer = remote_copy(&engine, engine.game().last_update + 5);

        assert_eq!(reconcile(&mut engine, newer.clone()).unwrap(), Reconciled::Applied);
        assert_eq!(*engine.game(), newer);
        let notification = notifications.try_recv().unwrap();
        assert_eq!(notification.origin, Origin::Remote);
    }

    #[test]
    fn equal_or_older_remote_snapshot_is_ignored() {
        let mut engine = engine();
        let local = engine.game().clone();

        for last_update in [local.last_update, local.last_update.saturating_sub(1)] {
            let remote = remote_copy(&engine, last_update);
            assert_eq!(reconcile(&mut engine, remote).unwrap(), Reconciled::Stale);
            assert_eq!(*engine.game(), local);
        }
    }

    #[test]
    fn remote_snapshot_of_another_game_is_refused() {
        let mut engine = engine();
        let mut other = remote_copy(&engine, u64::MAX);
        other.code = GameCode::parse("XTHER2").unwrap();

        assert!(matches!(
            reconcile(&mut engine, other),
            Err(SyncError::CodeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn subscription_delivers_changes_and_stops_after_deletion() {
        let store = MemoryGameStore::new();
        let adapter = SyncAdapter::new(Arc::new(store.clone()));
        let engine = engine();
        let game = engine.game().clone();
        adapter.create(&game).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = adapter.subscribe(game.code.clone(), move |change| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(change);
            }
        });

        let first = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(first, Some(game.clone()));

        let mut updated = game.clone();
        updated.last_update += 1;
        adapter.persist(&updated).await.unwrap();
        let second = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(second, Some(updated));

        assert!(adapter.delete(&game.code).await.unwrap());
        let last = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(last, None);

        // the sender lives in the task; it is dropped once the watch ends
        assert!(timeout(Duration::from_secs(1), rx.recv()).await.unwrap().is_none());
        subscription.unsubscribe();
    }

    #[tokio::test]
    async fn persist_failure_is_reported() {
        let store = MemoryGameStore::new();
        store.set_online(false);
        let adapter = SyncAdapter::new(Arc::new(store));

        let result = adapter.persist(engine().game()).await;
        assert!(matches!(result, Err(SyncError::Storage(StorageError::Unavailable { .. }))));
    }
}
