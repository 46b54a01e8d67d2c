use std::{sync::Arc, time::Duration};

use async_stream::stream;
use futures::{future::BoxFuture, stream::BoxStream};
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value};
use tracing::debug;

use crate::{
    dao::{game_store::GameStore, storage::StorageResult},
    state::game::{Game, GameCode},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        ChangeRow, ChangesResponse, CouchGameDocument, DocIdsFilter, RevisionOnly, game_doc_id,
        sequence_token,
    },
};

const CHANGES: &str = "_changes";
/// Server-side wait of a long-poll `_changes` request.
const LONGPOLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Game store over a CouchDB database, watching games through its `_changes` feed.
#[derive(Clone)]
pub struct CouchGameStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchGameStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .credentials
            .map(|(user, pass)| (Arc::<str>::from(user), Arc::<str>::from(pass)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.with_auth(self.client.request(method, url))
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .with_auth(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let value = response.json::<Value>().await.map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })?;
                from_value(value)
                    .map(Some)
                    .map_err(|source| CouchDaoError::DeserializeValue {
                        path: doc_id.to_string(),
                        source,
                    })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict {
                path: doc_id.to_string(),
            }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn delete_document(&self, doc_id: &str) -> CouchResult<bool> {
        let Some(current) = self.get_document::<RevisionOnly>(doc_id).await? else {
            return Ok(false);
        };

        let response = self
            .request(Method::DELETE, doc_id)
            .query(&[("rev", current.rev)])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// Fetch changes of one document after `since`; a long-poll waits for the next change.
    async fn changes(&self, doc_id: &str, since: &str, longpoll: bool) -> CouchResult<ChangesResponse> {
        let mut query = vec![
            ("filter", "_doc_ids".to_string()),
            ("include_docs", "true".to_string()),
            ("since", since.to_string()),
        ];
        if longpoll {
            query.push(("feed", "longpoll".to_string()));
            query.push(("timeout", LONGPOLL_TIMEOUT.as_millis().to_string()));
        }

        let response = self
            .request(Method::POST, CHANGES)
            .query(&query)
            .json(&DocIdsFilter { doc_ids: [doc_id] })
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: CHANGES.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: CHANGES.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<ChangesResponse>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: CHANGES.to_string(),
                source,
            })
    }
}

/// Decode one `_changes` row; deleted documents map to `None`.
fn decode_change(row: ChangeRow) -> CouchResult<Option<Game>> {
    if row.deleted {
        return Ok(None);
    }
    match row.doc {
        Some(doc) => from_value::<CouchGameDocument>(doc)
            .map(|doc| Some(doc.game))
            .map_err(|source| CouchDaoError::DeserializeValue { path: row.id, source }),
        None => Ok(None),
    }
}

impl GameStore for CouchGameStore {
    fn create_game(&self, game: Game) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = game_doc_id(&game.code);
            let doc = CouchGameDocument::from((game, None));
            store.put_document(&doc_id, &doc).await.map_err(Into::into)
        })
    }

    fn save_game(&self, game: Game) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = game_doc_id(&game.code);
            let rev = store
                .get_document::<RevisionOnly>(&doc_id)
                .await?
                .map(|existing| existing.rev);
            let doc = CouchGameDocument::from((game, rev));
            store.put_document(&doc_id, &doc).await.map_err(Into::into)
        })
    }

    fn find_game(&self, code: GameCode) -> BoxFuture<'static, StorageResult<Option<Game>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = game_doc_id(&code);
            let maybe_doc = store.get_document::<CouchGameDocument>(&doc_id).await?;
            Ok(maybe_doc.map(|doc| doc.game))
        })
    }

    fn delete_game(&self, code: GameCode) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = game_doc_id(&code);
            store.delete_document(&doc_id).await.map_err(Into::into)
        })
    }

    fn watch_game(&self, code: GameCode) -> BoxStream<'static, StorageResult<Option<Game>>> {
        let store = self.clone();
        Box::pin(stream! {
            let doc_id = game_doc_id(&code);

            // A normal feed from the start reports the latest revision only.
            let initial = match store.changes(&doc_id, "0", false).await {
                Ok(initial) => initial,
                Err(err) => {
                    yield Err(err.into());
                    return;
                }
            };
            let mut since = sequence_token(&initial.last_seq);
            match initial.results.into_iter().last() {
                Some(row) => match decode_change(row) {
                    Ok(game) => yield Ok(game),
                    Err(err) => {
                        yield Err(err.into());
                        return;
                    }
                },
                None => yield Ok(None),
            }

            loop {
                let batch = match store.changes(&doc_id, &since, true).await {
                    Ok(batch) => batch,
                    Err(err) => {
                        yield Err(err.into());
                        return;
                    }
                };
                since = sequence_token(&batch.last_seq);
                if batch.results.is_empty() {
                    debug!(code = %code, "CouchDB long-poll timed out without changes");
                    continue;
                }
                for row in batch.results {
                    match decode_change(row) {
                        Ok(game) => yield Ok(game),
                        Err(err) => {
                            yield Err(err.into());
                            return;
                        }
                    }
                }
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .with_auth(store.client.get(&url))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sports::{GameSetup, kabaddi};

    #[test]
    fn deleted_rows_decode_to_none() {
        let row = ChangeRow {
            id: "game::ABCDEF".into(),
            deleted: true,
            doc: None,
        };
        assert!(decode_change(row).unwrap().is_none());
    }

    #[test]
    fn rows_with_documents_decode_to_games() {
        let game = kabaddi::config().create_game(GameCode::generate(), GameSetup::default());
        let doc = serde_json::to_value(CouchGameDocument::from((game.clone(), Some("1-a".into()))))
            .unwrap();
        let row = ChangeRow {
            id: game_doc_id(&game.code),
            deleted: false,
            doc: Some(doc),
        };
        assert_eq!(decode_change(row).unwrap(), Some(game));
    }

    #[test]
    fn malformed_rows_are_reported() {
        let row = ChangeRow {
            id: "game::ABCDEF".into(),
            deleted: false,
            doc: Some(serde_json::json!({ "_id": "game::ABCDEF", "sport": 3 })),
        };
        assert!(matches!(
            decode_change(row),
            Err(CouchDaoError::DeserializeValue { .. })
        ));
    }
}
