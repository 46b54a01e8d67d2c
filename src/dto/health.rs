use serde::Serialize;
use utoipa::ToSchema;

/// Body of `GET /healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok`, or `degraded` while no healthy store is reachable.
    pub status: &'static str,
    /// Games currently attached to this instance.
    pub attached_games: usize,
    /// Sports this instance accepts.
    pub enabled_sports: usize,
}

impl HealthResponse {
    /// Healthy instance.
    pub fn ok(attached_games: usize, enabled_sports: usize) -> Self {
        Self {
            status: "ok",
            attached_games,
            enabled_sports,
        }
    }

    /// Instance serving attached games without a healthy store.
    pub fn degraded(attached_games: usize, enabled_sports: usize) -> Self {
        Self {
            status: "degraded",
            attached_games,
            enabled_sports,
        }
    }
}
