use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{game_store::GameStore, storage::StorageError},
    services::sse_events,
    state::SharedState,
};

/// Delays and limits used while watching the storage backend.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorTiming {
    /// First delay between connection attempts.
    pub initial_delay: Duration,
    /// Upper bound of the doubling delay.
    pub max_delay: Duration,
    /// Delay between health checks of a connected store.
    pub health_poll_interval: Duration,
    /// Reconnect attempts before the store is dropped and reconnected from scratch.
    pub max_reconnect_attempts: u32,
}

impl Default for SupervisorTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_secs(10),
            health_poll_interval: Duration::from_secs(5),
            max_reconnect_attempts: 3,
        }
    }
}

/// Reconnect to the storage backend and keep the shared state in degraded mode when it is unavailable.
pub async fn run<F, Fut>(state: SharedState, timing: SupervisorTiming, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut delay = timing.initial_delay;

    loop {
        match connect().await {
            Ok(store) => {
                state.set_game_store(store.clone()).await;
                info!("storage connection established");
                delay = timing.initial_delay;

                loop {
                    match store.health_check().await {
                        Ok(()) => {
                            if state.is_degraded() {
                                info!("storage healthy; leaving degraded mode");
                                set_degraded(&state, false);
                            }
                            sleep(timing.health_poll_interval).await;
                        }
                        Err(err) => {
                            warn!(error = %err, "storage health check failed");
                            if reconnect(&state, store.as_ref(), &timing).await {
                                set_degraded(&state, false);
                                sleep(timing.health_poll_interval).await;
                                continue;
                            }
                            warn!("exhausted storage reconnect attempts; staying in degraded mode");
                            break;
                        }
                    }
                }

                sleep(delay).await;
                delay = (delay * 2).min(timing.max_delay);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(timing.max_delay);
            }
        }
    }
}

async fn reconnect(state: &SharedState, store: &dyn GameStore, timing: &SupervisorTiming) -> bool {
    let mut reconnect_delay = timing.initial_delay;

    for attempt in 0..timing.max_reconnect_attempts {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(reconnect_err) => {
                if attempt == 0 {
                    warn!(
                        attempt, error = %reconnect_err,
                        "storage reconnect first attempt failed; entering degraded mode"
                    );
                    set_degraded(state, true);
                } else {
                    warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(timing.max_delay);
            }
        }
    }

    false
}

fn set_degraded(state: &SharedState, degraded: bool) {
    if state.update_degraded(degraded) {
        sse_events::broadcast_system_status(state, degraded);
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::timeout;

    use super::*;
    use crate::{
        config::AppConfig, dao::game_store::memory::MemoryGameStore,
        sports::registry::SportRegistry, state::AppState,
    };

    fn fast() -> SupervisorTiming {
        SupervisorTiming {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            health_poll_interval: Duration::from_millis(5),
            max_reconnect_attempts: 2,
        }
    }

    async fn wait_for(state: &SharedState, degraded: bool) {
        let mut watcher = state.degraded_watcher();
        timeout(Duration::from_secs(2), watcher.wait_for(|value| *value == degraded))
            .await
            .expect("degraded flag did not change in time")
            .unwrap();
    }

    #[tokio::test]
    async fn supervisor_tracks_store_health() {
        let state = AppState::new(
            AppConfig::default(),
            SportRegistry::builtin(&[]).unwrap(),
        );
        assert!(state.is_degraded());

        let store = MemoryGameStore::new();
        let handle = {
            let store = store.clone();
            tokio::spawn(run(state.clone(), fast(), move || {
                let store = store.clone();
                async move { Ok(Arc::new(store) as Arc<dyn GameStore>) }
            }))
        };

        wait_for(&state, false).await;
        assert!(state.game_store().await.is_some());

        store.set_online(false);
        wait_for(&state, true).await;

        store.set_online(true);
        wait_for(&state, false).await;

        handle.abort();
    }
}
