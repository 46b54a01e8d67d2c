use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether the backend is serving with a healthy store, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.game_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("no storage backend installed (degraded mode)"),
    }

    let attached = state.sessions().len();
    let sports = state.registry().enabled_configs().count();
    if state.is_degraded() {
        HealthResponse::degraded(attached, sports)
    } else {
        HealthResponse::ok(attached, sports)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::game_store::memory::MemoryGameStore,
        sports::registry::SportRegistry, state::AppState,
    };

    #[tokio::test]
    async fn reports_degraded_until_store_is_healthy() {
        let state = AppState::new(AppConfig::default(), SportRegistry::builtin(&[]).unwrap());
        let report = health_status(&state).await;
        assert_eq!(report.status, "degraded");
        assert_eq!(report.attached_games, 0);
        assert_eq!(report.enabled_sports, 3);

        state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        state.update_degraded(false);
        assert_eq!(health_status(&state).await.status, "ok");
    }
}
