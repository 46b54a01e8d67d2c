/// CouchDB backend.
#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::{future::BoxFuture, stream::BoxStream};

use crate::{
    dao::storage::StorageResult,
    state::game::{Game, GameCode},
};

/// Abstraction over the document store holding one JSON document per game, keyed by code.
pub trait GameStore: Send + Sync {
    /// Insert a new game, failing with `AlreadyExists` when the code is taken.
    fn create_game(&self, game: Game) -> BoxFuture<'static, StorageResult<()>>;
    /// Insert or overwrite the game stored under its code.
    fn save_game(&self, game: Game) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch the game stored under `code`.
    fn find_game(&self, code: GameCode) -> BoxFuture<'static, StorageResult<Option<Game>>>;
    /// Remove the game stored under `code`, reporting whether it existed.
    fn delete_game(&self, code: GameCode) -> BoxFuture<'static, StorageResult<bool>>;
    /// Observe the document stored under `code`.
    ///
    /// The stream yields the current value first, then one item per change. `None` means
    /// the document does not exist (or was deleted). The stream ends after an error.
    fn watch_game(&self, code: GameCode) -> BoxStream<'static, StorageResult<Option<Game>>>;
    /// Check that the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
