//! In-process game store backed by a concurrent map and a broadcast change feed.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_stream::stream;
use dashmap::{DashMap, mapref::entry::Entry};
use futures::{future::BoxFuture, stream::BoxStream};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::{
    dao::{
        game_store::GameStore,
        storage::{StorageError, StorageResult},
    },
    state::game::{Game, GameCode},
};

const CHANGE_FEED_CAPACITY: usize = 256;

/// Failure reported while the store is switched offline.
#[derive(Debug, Error)]
#[error("in-memory store is offline")]
pub struct MemoryOffline;

type Change = (GameCode, Option<Game>);

/// Game store keeping every document in memory.
///
/// It can be switched offline to exercise degraded-mode and persistence-failure paths.
#[derive(Clone)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    games: DashMap<GameCode, Game>,
    changes: broadcast::Sender<Change>,
    online: AtomicBool,
}

impl Default for MemoryGameStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGameStore {
    /// Create an empty, online store.
    pub fn new() -> Self {
        let (changes, _receiver) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            inner: Arc::new(MemoryInner {
                games: DashMap::new(),
                changes,
                online: AtomicBool::new(true),
            }),
        }
    }

    /// Toggle availability; while offline every operation fails with `Unavailable`.
    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
    }

    /// Number of stored games.
    pub fn len(&self) -> usize {
        self.inner.games.len()
    }

    /// Whether the store holds no game.
    pub fn is_empty(&self) -> bool {
        self.inner.games.is_empty()
    }

    fn ensure_online(&self) -> StorageResult<()> {
        if self.inner.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::unavailable(
                "memory store offline".into(),
                MemoryOffline,
            ))
        }
    }

    fn current(&self, code: &GameCode) -> Option<Game> {
        self.inner.games.get(code).map(|entry| entry.value().clone())
    }

    fn publish(&self, code: GameCode, game: Option<Game>) {
        let _ = self.inner.changes.send((code, game));
    }
}

impl GameStore for MemoryGameStore {
    fn create_game(&self, game: Game) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            let code = game.code.clone();
            match store.inner.games.entry(code.clone()) {
                Entry::Occupied(_) => Err(StorageError::AlreadyExists {
                    code: code.to_string(),
                }),
                Entry::Vacant(slot) => {
                    slot.insert(game.clone());
                    debug!(code = %code, "game created in memory store");
                    store.publish(code, Some(game));
                    Ok(())
                }
            }
        })
    }

    fn save_game(&self, game: Game) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            let code = game.code.clone();
            store.inner.games.insert(code.clone(), game.clone());
            store.publish(code, Some(game));
            Ok(())
        })
    }

    fn find_game(&self, code: GameCode) -> BoxFuture<'static, StorageResult<Option<Game>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            Ok(store.current(&code))
        })
    }

    fn delete_game(&self, code: GameCode) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            let existed = store.inner.games.remove(&code).is_some();
            if existed {
                store.publish(code, None);
            }
            Ok(existed)
        })
    }

    fn watch_game(&self, code: GameCode) -> BoxStream<'static, StorageResult<Option<Game>>> {
        let store = self.clone();
        Box::pin(stream! {
            if let Err(err) = store.ensure_online() {
                yield Err(err);
                return;
            }

            // Subscribe before reading so no change can slip in between.
            let mut changes = store.inner.changes.subscribe();
            yield Ok(store.current(&code));

            loop {
                match changes.recv().await {
                    Ok((changed, game)) if changed == code => yield Ok(game),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(code = %code, skipped, "memory change feed lagged; resending current value");
                        yield Ok(store.current(&code));
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online() })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online() })
    }
}
