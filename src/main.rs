//! Multisport scoreboard binary entrypoint wiring REST, SSE, and the game store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use futures::{FutureExt, future::BoxFuture};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use multisport_score_back::{
    config::AppConfig,
    dao::{
        game_store::{GameStore, memory::MemoryGameStore},
        storage::StorageError,
    },
    routes,
    services::{clock_ticker, storage_supervisor},
    sports::registry::SportRegistry,
    state::{AppState, SharedState},
};

type Connect = BoxFuture<'static, Result<Arc<dyn GameStore>, StorageError>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let registry =
        SportRegistry::builtin(config.disabled_sports()).context("building sport registry")?;
    let clock_tick = config.clock_tick();
    let app_state = AppState::new(config, registry);

    let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| default_backend().into());
    info!(backend = %backend, "selected game store backend");
    let connect = store_connector(&backend)?;
    tokio::spawn(storage_supervisor::run(
        app_state.clone(),
        storage_supervisor::SupervisorTiming::default(),
        connect,
    ));

    if let Some(period) = clock_tick {
        tokio::spawn(clock_ticker::run(app_state.clone(), period));
    }

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

fn default_backend() -> &'static str {
    if cfg!(feature = "mongo-store") {
        "mongo"
    } else if cfg!(feature = "couch-store") {
        "couch"
    } else {
        "memory"
    }
}

/// Connection factory handed to the storage supervisor for the chosen backend.
fn store_connector(backend: &str) -> anyhow::Result<impl FnMut() -> Connect + Send + 'static> {
    let connect: Box<dyn FnMut() -> Connect + Send> = match backend {
        "memory" => {
            let store = MemoryGameStore::new();
            Box::new(move || {
                let store: Arc<dyn GameStore> = Arc::new(store.clone());
                async move { Ok::<_, StorageError>(store) }.boxed()
            })
        }
        #[cfg(feature = "couch-store")]
        "couch" => {
            use multisport_score_back::dao::game_store::couchdb::{CouchConfig, CouchGameStore};

            let config = CouchConfig::from_env().context("reading CouchDB configuration")?;
            Box::new(move || {
                let config = config.clone();
                async move {
                    let store = CouchGameStore::connect(config).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn GameStore>)
                }
                .boxed()
            })
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => Box::new(|| {
            use multisport_score_back::dao::game_store::mongodb::{MongoConfig, MongoGameStore};

            async move {
                let config = MongoConfig::from_env().await?;
                let store = MongoGameStore::connect(config).await?;
                Ok::<_, StorageError>(Arc::new(store) as Arc<dyn GameStore>)
            }
            .boxed()
        }),
        other => bail!("unsupported STORE_BACKEND `{other}` (memory, couch, or mongo)"),
    };

    Ok(connect)
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
