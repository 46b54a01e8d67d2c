use std::time::Duration;

use mongodb::{
    Client, Database,
    bson::{Document, doc},
};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

/// Pings sent before a connection attempt is reported as failed.
const PING_ATTEMPTS: u32 = 4;
const FIRST_PING_DELAY: Duration = Duration::from_millis(250);
const MAX_PING_DELAY: Duration = Duration::from_secs(2);

/// Build a client for `config` and wait until the server answers a ping.
///
/// The storage supervisor retries whole connections, so the ping loop here stays short.
pub async fn establish_connection(config: &MongoConfig) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    let mut delay = FIRST_PING_DELAY;
    for attempt in 1..=PING_ATTEMPTS {
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => break,
            Err(source) if attempt == PING_ATTEMPTS => {
                return Err(MongoDaoError::InitialPing {
                    attempts: attempt,
                    source,
                });
            }
            Err(err) => {
                debug!(attempt, error = %err, "MongoDB ping failed; retrying");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_PING_DELAY);
            }
        }
    }

    warn_without_replica_set(&database).await;
    Ok((client, database))
}

/// Change streams only exist on replica sets and sharded clusters.
async fn warn_without_replica_set(database: &Database) {
    match database.run_command(doc! { "hello": 1 }).await {
        Ok(reply) if supports_change_streams(&reply) => {}
        Ok(_) => warn!(
            database = %database.name(),
            "MongoDB is a standalone server; game watches will fail until it runs as a replica set"
        ),
        Err(err) => debug!(error = %err, "MongoDB hello command failed"),
    }
}

fn supports_change_streams(hello: &Document) -> bool {
    hello.contains_key("setName") || hello.get_str("msg").is_ok_and(|msg| msg == "isdbgrid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replica_sets_and_routers_support_watches() {
        assert!(supports_change_streams(&doc! { "isWritablePrimary": true, "setName": "rs0" }));
        assert!(supports_change_streams(&doc! { "isWritablePrimary": true, "msg": "isdbgrid" }));
        assert!(!supports_change_streams(&doc! { "isWritablePrimary": true }));
    }
}
