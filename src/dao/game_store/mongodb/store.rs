use std::sync::Arc;

use async_stream::stream;
use futures::{StreamExt, future::BoxFuture, stream::BoxStream};
use mongodb::{
    Client, Collection, Database,
    bson::doc,
    change_stream::event::OperationType,
    options::FullDocumentType,
};
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{MongoGameDocument, doc_id, watch_filter},
};
use crate::{
    dao::{game_store::GameStore, storage::StorageResult},
    state::game::{Game, GameCode},
};

const GAME_COLLECTION_NAME: &str = "games";

/// Game store backed by a MongoDB collection; watching requires a replica set.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        Ok(Self { inner })
    }

    async fn collection(&self) -> Collection<MongoGameDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    async fn create_game(&self, game: Game) -> MongoResult<()> {
        let code = game.code.to_string();
        let document: MongoGameDocument = game.into();
        let collection = self.collection().await;
        collection
            .insert_one(&document)
            .await
            .map_err(|source| {
                if is_duplicate_key(&source) {
                    MongoDaoError::DuplicateGame { code: code.clone() }
                } else {
                    MongoDaoError::CreateGame {
                        code: code.clone(),
                        source,
                    }
                }
            })?;
        Ok(())
    }

    async fn save_game(&self, game: Game) -> MongoResult<()> {
        let code = game.code.clone();
        let document: MongoGameDocument = game.into();
        let collection = self.collection().await;
        collection
            .replace_one(doc_id(&code), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGame {
                code: code.to_string(),
                source,
            })?;

        Ok(())
    }

    async fn find_game(&self, code: &GameCode) -> MongoResult<Option<Game>> {
        let collection = self.collection().await;
        let document = collection
            .find_one(doc_id(code))
            .await
            .map_err(|source| MongoDaoError::LoadGame {
                code: code.to_string(),
                source,
            })?;

        Ok(document.map(Into::into))
    }

    async fn delete_game(&self, code: &GameCode) -> MongoResult<bool> {
        let collection = self.collection().await;
        let result = collection
            .delete_one(doc_id(code))
            .await
            .map_err(|source| MongoDaoError::DeleteGame {
                code: code.to_string(),
                source,
            })?;
        Ok(result.deleted_count > 0)
    }
}

impl GameStore for MongoGameStore {
    fn create_game(&self, game: Game) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_game(game).await.map_err(Into::into) })
    }

    fn save_game(&self, game: Game) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, code: GameCode) -> BoxFuture<'static, StorageResult<Option<Game>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(&code).await.map_err(Into::into) })
    }

    fn delete_game(&self, code: GameCode) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_game(&code).await.map_err(Into::into) })
    }

    fn watch_game(&self, code: GameCode) -> BoxStream<'static, StorageResult<Option<Game>>> {
        let store = self.clone();
        Box::pin(stream! {
            let collection = store.collection().await;
            // Open the stream before reading so no change can slip in between.
            let opened = collection
                .watch()
                .pipeline([watch_filter(&code)])
                .full_document(FullDocumentType::UpdateLookup)
                .await;
            let mut changes = match opened {
                Ok(changes) => changes,
                Err(source) => {
                    yield Err(MongoDaoError::WatchGame { code: code.to_string(), source }.into());
                    return;
                }
            };

            match store.find_game(&code).await {
                Ok(current) => yield Ok(current),
                Err(err) => {
                    yield Err(err.into());
                    return;
                }
            }

            while let Some(event) = changes.next().await {
                match event {
                    Ok(event) => match event.operation_type {
                        OperationType::Delete => yield Ok(None),
                        OperationType::Insert | OperationType::Update | OperationType::Replace => {
                            if let Some(document) = event.full_document {
                                yield Ok(Some(document.into()));
                            }
                        }
                        other => debug!(code = %code, operation = ?other, "ignoring change stream event"),
                    },
                    Err(source) => {
                        yield Err(MongoDaoError::WatchGame { code: code.to_string(), source }.into());
                        return;
                    }
                }
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
